//! Notification inbox operations

use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::Type;
use serde::Serialize;

use super::{format_ts, ts_col, Database};
use crate::error::{Error, Result};

/// A notification row as stored in the inbox
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredNotification {
    pub id: i64,
    pub owner_id: i64,
    /// `alert`, `insight` or `summary`
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub priority: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredNotification> {
    let data: String = row.get(5)?;
    let data = serde_json::from_str(&data)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(StoredNotification {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        data,
        priority: row.get(6)?,
        is_read: row.get(7)?,
        created_at: ts_col(row, 8)?,
    })
}

impl Database {
    /// Record a notification in the owner's inbox
    #[allow(clippy::too_many_arguments)]
    pub fn insert_notification(
        &self,
        owner_id: i64,
        kind: &str,
        title: &str,
        message: &str,
        data: &serde_json::Value,
        priority: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO notifications (owner_id, kind, title, message, data, priority, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                owner_id,
                kind,
                title,
                message,
                serde_json::to_string(data)?,
                priority,
                format_ts(created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List an owner's notifications, newest first
    pub fn list_notifications(
        &self,
        owner_id: i64,
        unread_only: bool,
    ) -> Result<Vec<StoredNotification>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, owner_id, kind, title, message, data, priority, is_read, created_at
            FROM notifications
            WHERE owner_id = ? AND (? = 0 OR is_read = 0)
            ORDER BY created_at DESC, id DESC
            "#,
        )?;
        let rows = stmt.query_map(params![owner_id, unread_only], row_to_notification)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Mark a notification as read
    pub fn mark_notification_read(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?",
            params![id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("notification {}", id)));
        }
        Ok(())
    }

    pub fn count_unread_notifications(&self, owner_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE owner_id = ? AND is_read = 0",
            params![owner_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
