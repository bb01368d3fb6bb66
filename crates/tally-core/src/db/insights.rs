//! Generated insight storage

use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::Type;

use super::{format_ts, opt_ts_col, parsed_col, ts_col, Database};
use crate::error::Result;
use crate::insights::Insight;
use crate::repository::InsightRepository;

fn row_to_insight(row: &rusqlite::Row<'_>) -> rusqlite::Result<Insight> {
    let data: String = row.get(8)?;
    let data = serde_json::from_str(&data)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;

    Ok(Insight {
        owner_id: row.get(0)?,
        insight_type: parsed_col(row, 1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        confidence: row.get(4)?,
        impact: parsed_col(row, 5)?,
        actionable: row.get(6)?,
        category: row.get(7)?,
        data,
        generated_at: ts_col(row, 9)?,
        expires_at: opt_ts_col(row, 10)?,
    })
}

impl InsightRepository for Database {
    fn replace_insights(&self, owner_id: i64, insights: &[Insight]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM insights WHERE owner_id = ?", params![owner_id])?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO insights (
                    owner_id, insight_type, title, message, confidence, impact,
                    actionable, category, data, generated_at, expires_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;
            for insight in insights {
                stmt.execute(params![
                    owner_id,
                    insight.insight_type.as_str(),
                    insight.title,
                    insight.message,
                    insight.confidence,
                    insight.impact.as_str(),
                    insight.actionable,
                    insight.category,
                    serde_json::to_string(&insight.data)?,
                    format_ts(insight.generated_at),
                    insight.expires_at.map(format_ts),
                ])?;
            }
        }
        tx.commit()?;

        Ok(insights.len())
    }

    fn list_insights(&self, owner_id: i64, now: DateTime<Utc>) -> Result<Vec<Insight>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT owner_id, insight_type, title, message, confidence, impact,
                   actionable, category, data, generated_at, expires_at
            FROM insights
            WHERE owner_id = ? AND (expires_at IS NULL OR expires_at > ?)
            ORDER BY
                CASE impact
                    WHEN 'high' THEN 1
                    WHEN 'medium' THEN 2
                    ELSE 3
                END,
                confidence DESC,
                id
            "#,
        )?;
        let rows = stmt.query_map(params![owner_id, format_ts(now)], row_to_insight)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn prune_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM insights WHERE expires_at IS NOT NULL AND expires_at <= ?",
            params![format_ts(now)],
        )?;
        Ok(deleted)
    }
}
