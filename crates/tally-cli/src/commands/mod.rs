//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (open_db, Services) and init
//! - `budgets` - Budget commands (list, add, edit, delete, resync, show)
//! - `transactions` - Ledger commands (list, add, edit, delete)
//! - `reconcile` - One-off reconciliation pass
//! - `insights` - Insight generation and listing
//! - `notifications` - Notification inbox
//! - `run` - Long-running scheduler

pub mod budgets;
pub mod core;
pub mod insights;
pub mod notifications;
pub mod reconcile;
pub mod run;
pub mod transactions;

// Re-export command functions for main.rs
pub use budgets::*;
pub use core::*;
pub use insights::*;
pub use notifications::*;
pub use reconcile::*;
pub use run::*;
pub use transactions::*;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Parse a YYYY-MM-DD date as UTC midnight
pub fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}
