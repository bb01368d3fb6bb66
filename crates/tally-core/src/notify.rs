//! Notification delivery
//!
//! Alerts, insights and weekly summaries leave the core through a
//! [`NotificationDispatcher`]. Delivery is best-effort: callers go through
//! [`deliver_best_effort`], which bounds each attempt with a timeout and
//! logs failures instead of returning them.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::Result;
use crate::insights::{Impact, Insight};
use crate::models::{AlertEvent, AlertLevel, WeeklySummary};

/// Something worth telling a user about
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Notification {
    Alert(AlertEvent),
    Insight(Insight),
    Summary(WeeklySummary),
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Alert(_) => "alert",
            Notification::Insight(_) => "insight",
            Notification::Summary(_) => "summary",
        }
    }

    pub fn title(&self) -> String {
        match self {
            Notification::Alert(_) => "Budget Alert".to_string(),
            Notification::Insight(insight) => insight.title.clone(),
            Notification::Summary(_) => "Weekly Summary".to_string(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notification::Alert(event) => event.message.clone(),
            Notification::Insight(insight) => insight.message.clone(),
            Notification::Summary(summary) => summary.message(),
        }
    }

    /// `high`, `medium` or `low`
    pub fn priority(&self) -> &'static str {
        match self {
            Notification::Alert(event) if event.level == AlertLevel::Exceeded => "high",
            Notification::Alert(_) => "medium",
            Notification::Insight(insight) => match insight.impact {
                Impact::High => "high",
                Impact::Medium => "medium",
                Impact::Low => "low",
            },
            Notification::Summary(_) => "low",
        }
    }

    /// Structured payload stored alongside the message
    pub fn data(&self) -> serde_json::Value {
        let value = match self {
            Notification::Alert(event) => serde_json::to_value(event),
            Notification::Insight(insight) => serde_json::to_value(insight),
            Notification::Summary(summary) => serde_json::to_value(summary),
        };
        value.unwrap_or_default()
    }
}

/// Delivery seam for notifications
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn deliver(&self, owner_id: i64, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn deliver(&self, owner_id: i64, notification: &Notification) -> Result<()> {
        info!(
            owner_id,
            kind = notification.kind(),
            priority = notification.priority(),
            title = %notification.title(),
            "{}",
            notification.message()
        );
        Ok(())
    }
}

/// Records notifications in the SQLite inbox
pub struct InboxDispatcher {
    db: Database,
}

impl InboxDispatcher {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationDispatcher for InboxDispatcher {
    async fn deliver(&self, owner_id: i64, notification: &Notification) -> Result<()> {
        let id = self.db.insert_notification(
            owner_id,
            notification.kind(),
            &notification.title(),
            &notification.message(),
            &notification.data(),
            notification.priority(),
            Utc::now(),
        )?;
        debug!(owner_id, notification_id = id, "Notification stored");
        Ok(())
    }
}

/// Deliver with a bounded timeout, logging any failure
///
/// Returns whether the notification was delivered.
pub async fn deliver_best_effort(
    dispatcher: &dyn NotificationDispatcher,
    owner_id: i64,
    notification: &Notification,
    timeout: Duration,
) -> bool {
    match tokio::time::timeout(timeout, dispatcher.deliver(owner_id, notification)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(owner_id, kind = notification.kind(), error = %e, "Notification delivery failed");
            false
        }
        Err(_) => {
            warn!(
                owner_id,
                kind = notification.kind(),
                timeout_ms = timeout.as_millis() as u64,
                "Notification delivery timed out"
            );
            false
        }
    }
}
