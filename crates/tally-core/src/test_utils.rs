//! Test utilities for tally-core
//!
//! Fixtures for building ledger data plus in-process doubles for the two
//! async seams: a scripted insight provider and a recording dispatcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::alerts::AlertEvaluator;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::insights::{Insight, InsightProvider, InsightRequest};
use crate::locks::BudgetLocks;
use crate::models::{NewTransaction, Transaction, TransactionKind};
use crate::notify::{Notification, NotificationDispatcher};
use crate::repository::{BudgetRepository, LedgerRepository};
use crate::tracker::BudgetSpendTracker;

/// Midnight UTC on the given date
pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    at(year, month, day, 0, 0)
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid test date")
}

pub fn expense(
    owner_id: i64,
    category: &str,
    amount: Decimal,
    occurred_at: DateTime<Utc>,
) -> NewTransaction {
    NewTransaction {
        owner_id,
        kind: TransactionKind::Expense,
        amount,
        category: category.to_string(),
        occurred_at,
        excluded: false,
        description: None,
    }
}

pub fn income(owner_id: i64, amount: Decimal, occurred_at: DateTime<Utc>) -> NewTransaction {
    NewTransaction {
        owner_id,
        kind: TransactionKind::Income,
        amount,
        category: "Salary".to_string(),
        occurred_at,
        excluded: false,
        description: None,
    }
}

/// A stored-looking transaction for building snapshots directly
pub fn snapshot_tx(
    id: i64,
    kind: TransactionKind,
    category: &str,
    amount: Decimal,
    occurred_at: DateTime<Utc>,
) -> Transaction {
    Transaction {
        id,
        owner_id: 1,
        kind,
        amount,
        category: category.to_string(),
        occurred_at,
        excluded: false,
        description: None,
    }
}

/// Tracker and evaluator sharing one database and lock registry
pub fn budget_services(db: &Database) -> (Arc<BudgetSpendTracker>, Arc<AlertEvaluator>) {
    let ledger: Arc<dyn LedgerRepository> = Arc::new(db.clone());
    let budgets: Arc<dyn BudgetRepository> = Arc::new(db.clone());
    let locks = Arc::new(BudgetLocks::new());

    let tracker = BudgetSpendTracker::new(ledger, Arc::clone(&budgets), Arc::clone(&locks));
    let evaluator = AlertEvaluator::new(budgets, locks);
    (Arc::new(tracker), Arc::new(evaluator))
}

/// How a `MockInsightProvider` answers
#[derive(Debug, Clone)]
pub enum MockBehavior {
    Succeed(Vec<Insight>),
    Fail,
    /// Sleep far longer than any test timeout
    Hang,
}

/// Scripted insight provider
pub struct MockInsightProvider {
    behavior: MockBehavior,
    calls: AtomicUsize,
}

impl MockInsightProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InsightProvider for MockInsightProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, _request: &InsightRequest) -> Result<Vec<Insight>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Succeed(insights) => Ok(insights.clone()),
            MockBehavior::Fail => Err(Error::Dispatch("mock provider failure".to_string())),
            MockBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
        }
    }
}

/// Dispatcher that remembers every delivery
#[derive(Default)]
pub struct RecordingDispatcher {
    delivered: Mutex<Vec<(i64, Notification)>>,
    fail: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher whose every delivery fails
    pub fn failing() -> Self {
        Self {
            delivered: Mutex::new(vec![]),
            fail: true,
        }
    }

    pub fn delivered(&self) -> Vec<(i64, Notification)> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn deliver(&self, owner_id: i64, notification: &Notification) -> Result<()> {
        if self.fail {
            return Err(Error::Dispatch("recording dispatcher set to fail".to_string()));
        }
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push((owner_id, notification.clone()));
        }
        Ok(())
    }
}
