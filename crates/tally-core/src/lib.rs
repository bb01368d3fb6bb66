//! Tally Core Library
//!
//! Budget tracking and spending insights over a personal ledger:
//! - Budget periods and incremental spend tracking with full resync
//! - Threshold alerts announced once per level per period
//! - Statistical insights (trend, savings rate, concentration, anomalies)
//! - Provider chain with a remote insight service and local fallback
//! - Notification dispatch and the SQLite notification inbox
//! - Scheduled work units for reconciliation, insights and weekly summaries

pub mod alerts;
pub mod config;
pub mod db;
pub mod error;
pub mod insights;
pub mod jobs;
pub mod locks;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod period;
pub mod repository;
pub mod tracker;

/// Test utilities including a scripted insight provider and recording dispatcher
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use alerts::AlertEvaluator;
pub use config::TallyConfig;
pub use db::{Database, StoredNotification};
pub use error::{Error, Result};
pub use insights::{
    ChainOutcome, Impact, Insight, InsightEngine, InsightProvider, InsightProviderChain,
    InsightRequest, InsightType, LocalInsightProvider, ProviderSource, RemoteInsightProvider,
};
pub use jobs::{BatchReport, InsightBatch, ReconcileReport, Reconciler, SummaryReport, WeeklySummaries};
pub use locks::BudgetLocks;
pub use models::{
    AlertEvent, AlertLevel, Budget, BudgetStatus, BudgetUpdate, LedgerEvent, NewBudget,
    NewTransaction, Transaction, TransactionKind, TransactionUpdate, WeeklySummary,
};
pub use monitor::BudgetMonitor;
pub use notify::{InboxDispatcher, LogDispatcher, Notification, NotificationDispatcher};
pub use period::{bounds_for, Period, PeriodKind};
pub use repository::{BudgetRepository, InsightRepository, LedgerRepository};
pub use tracker::BudgetSpendTracker;
