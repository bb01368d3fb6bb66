//! Budget storage

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;

use super::{decimal_col, format_ts, parsed_col, ts_col, Database};
use crate::error::{Error, Result};
use crate::models::{AlertLevel, Budget};
use crate::period::Period;
use crate::repository::BudgetRepository;

const BUDGET_COLUMNS: &str = r#"
    id, owner_id, name, category, limit_amount, period_kind, rollover, alerts_enabled,
    thresholds, period_start, period_end, spent, last_notified_level, created_at
"#;

fn encode_thresholds(thresholds: &[Decimal]) -> String {
    thresholds
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn thresholds_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Vec<Decimal>> {
    let s: String = row.get(idx)?;
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            Decimal::from_str(part.trim()).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })
        })
        .collect()
}

fn row_to_budget(row: &rusqlite::Row<'_>) -> rusqlite::Result<Budget> {
    let last_notified: Option<String> = row.get(12)?;
    let last_notified_level = match last_notified {
        Some(_) => Some(parsed_col::<AlertLevel>(row, 12)?),
        None => None,
    };

    Ok(Budget {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        limit: decimal_col(row, 4)?,
        period_kind: parsed_col(row, 5)?,
        rollover: row.get(6)?,
        alerts_enabled: row.get(7)?,
        thresholds: thresholds_col(row, 8)?,
        period: Period::new(ts_col(row, 9)?, ts_col(row, 10)?),
        spent: decimal_col(row, 11)?,
        last_notified_level,
        created_at: ts_col(row, 13)?,
    })
}

impl Database {
    fn query_budgets(&self, filter: &str, params: impl rusqlite::Params) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM budgets {} ORDER BY id",
            BUDGET_COLUMNS, filter
        ))?;
        let rows = stmt.query_map(params, row_to_budget)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

impl BudgetRepository for Database {
    fn insert_budget(&self, budget: &Budget) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO budgets (
                owner_id, name, category, limit_amount, period_kind, rollover, alerts_enabled,
                thresholds, period_start, period_end, spent, last_notified_level, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                budget.owner_id,
                budget.name,
                budget.category,
                budget.limit.to_string(),
                budget.period_kind.as_str(),
                budget.rollover,
                budget.alerts_enabled,
                encode_thresholds(&budget.thresholds),
                format_ts(budget.period.start),
                format_ts(budget.period.end),
                budget.spent.to_string(),
                budget.last_notified_level.map(|l| l.as_str()),
                format_ts(budget.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_budget(&self, id: i64) -> Result<Budget> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM budgets WHERE id = ?", BUDGET_COLUMNS),
            params![id],
            row_to_budget,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("budget {}", id)))
    }

    fn save_budget(&self, budget: &Budget) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE budgets
            SET name = ?, category = ?, limit_amount = ?, period_kind = ?, rollover = ?,
                alerts_enabled = ?, thresholds = ?, period_start = ?, period_end = ?,
                spent = ?, last_notified_level = ?
            WHERE id = ?
            "#,
            params![
                budget.name,
                budget.category,
                budget.limit.to_string(),
                budget.period_kind.as_str(),
                budget.rollover,
                budget.alerts_enabled,
                encode_thresholds(&budget.thresholds),
                format_ts(budget.period.start),
                format_ts(budget.period.end),
                budget.spent.to_string(),
                budget.last_notified_level.map(|l| l.as_str()),
                budget.id,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("budget {}", budget.id)));
        }
        Ok(())
    }

    fn delete_budget(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM budgets WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("budget {}", id)));
        }
        Ok(())
    }

    fn list_budgets(&self) -> Result<Vec<Budget>> {
        self.query_budgets("", params![])
    }

    fn list_for_owner(&self, owner_id: i64) -> Result<Vec<Budget>> {
        self.query_budgets("WHERE owner_id = ?", params![owner_id])
    }

    fn list_for_category(&self, owner_id: i64, category: &str) -> Result<Vec<Budget>> {
        self.query_budgets(
            "WHERE owner_id = ? AND category = ?",
            params![owner_id, category],
        )
    }

    fn list_active(&self, owner_id: i64, now: DateTime<Utc>) -> Result<Vec<Budget>> {
        let now = format_ts(now);
        self.query_budgets(
            "WHERE owner_id = ? AND period_start <= ? AND period_end > ?",
            params![owner_id, now, now],
        )
    }

    fn set_spent(&self, id: i64, spent: Decimal) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE budgets SET spent = ? WHERE id = ?",
            params![spent.to_string(), id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("budget {}", id)));
        }
        Ok(())
    }

    fn set_last_notified(&self, id: i64, level: Option<AlertLevel>) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE budgets SET last_notified_level = ? WHERE id = ?",
            params![level.map(|l| l.as_str()), id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("budget {}", id)));
        }
        Ok(())
    }
}
