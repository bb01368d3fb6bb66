//! SQLite storage adapter with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `transactions` - Ledger CRUD and the `LedgerRepository` query
//! - `budgets` - Budget storage (`BudgetRepository`)
//! - `insights` - Generated insight storage (`InsightRepository`)
//! - `notifications` - Notification inbox written by `InboxDispatcher`

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::Result;

mod budgets;
mod insights;
mod notifications;
mod transactions;


pub use notifications::StoredNotification;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Format an instant for storage
///
/// Fixed-width RFC 3339 in UTC with milliseconds, so text comparison in SQL
/// matches chronological order.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Read a stored instant from a row column
pub(crate) fn ts_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn opt_ts_col(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    match s {
        Some(_) => ts_col(row, idx).map(Some),
        None => Ok(None),
    }
}

/// Read a decimal stored as text
pub(crate) fn decimal_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = row.get(idx)?;
    Decimal::from_str(&s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a text column through `FromStr`
pub(crate) fn parsed_col<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let s: String = row.get(idx)?;
    s.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Open (creating if needed) the database at `path` and run migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because every pooled
    /// connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tally_test_{}_{}.db",
            std::process::id(),
            id
        ));

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path.to_string_lossy())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the writer during batch jobs
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Ledger entries. Amounts are decimal strings with two places.
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                owner_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
                amount TEXT NOT NULL,
                category TEXT NOT NULL,
                occurred_at TEXT NOT NULL,
                excluded INTEGER NOT NULL DEFAULT 0,
                description TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_owner_category_date
                ON transactions(owner_id, category, occurred_at);
            CREATE INDEX IF NOT EXISTS idx_transactions_owner_date
                ON transactions(owner_id, occurred_at);

            -- Budgets with their current period and spend accumulator
            CREATE TABLE IF NOT EXISTS budgets (
                id INTEGER PRIMARY KEY,
                owner_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                limit_amount TEXT NOT NULL,
                period_kind TEXT NOT NULL CHECK (period_kind IN ('weekly', 'monthly', 'yearly')),
                rollover INTEGER NOT NULL DEFAULT 0,
                alerts_enabled INTEGER NOT NULL DEFAULT 1,
                thresholds TEXT NOT NULL,
                period_start TEXT NOT NULL,
                period_end TEXT NOT NULL,
                spent TEXT NOT NULL DEFAULT '0',
                last_notified_level TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_budgets_owner_category
                ON budgets(owner_id, category);
            CREATE INDEX IF NOT EXISTS idx_budgets_owner_period
                ON budgets(owner_id, period_start, period_end);

            -- Generated insights, replaced per owner on each run
            CREATE TABLE IF NOT EXISTS insights (
                id INTEGER PRIMARY KEY,
                owner_id INTEGER NOT NULL,
                insight_type TEXT NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                confidence REAL NOT NULL,
                impact TEXT NOT NULL,
                actionable INTEGER NOT NULL DEFAULT 0,
                category TEXT,
                data TEXT NOT NULL DEFAULT 'null',
                generated_at TEXT NOT NULL,
                expires_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_insights_owner ON insights(owner_id, generated_at);
            CREATE INDEX IF NOT EXISTS idx_insights_expires ON insights(expires_at);

            -- Notification inbox
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY,
                owner_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                data TEXT NOT NULL DEFAULT 'null',
                priority TEXT NOT NULL DEFAULT 'medium',
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notifications_owner_read
                ON notifications(owner_id, is_read);
            "#,
        )?;

        info!(path = %self.db_path, "Database migrations complete");
        Ok(())
    }
}
