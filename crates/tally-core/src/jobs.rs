//! Scheduled work units
//!
//! Each unit is one pass over all budgets or all owners. The scheduler in the
//! CLI decides when they run; nothing here knows about timers.
//!
//! Failures are isolated to the budget or owner they belong to: they are
//! logged, counted in the report, and the pass moves on. Batch units accept a
//! `CancellationToken` that is honored between owners, never mid-owner.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alerts::AlertEvaluator;
use crate::error::Result;
use crate::insights::{Impact, InsightEngine, InsightProviderChain, InsightRequest, ProviderSource};
use crate::models::{round_money, TransactionKind, WeeklySummary};
use crate::notify::{deliver_best_effort, Notification, NotificationDispatcher};
use crate::period::Period;
use crate::repository::{BudgetRepository, InsightRepository, LedgerRepository};
use crate::tracker::BudgetSpendTracker;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub budgets: usize,
    /// Budgets moved into a new period
    pub rolled: usize,
    /// Budgets whose stored spend had drifted from the ledger
    pub corrected: usize,
    pub alerts: usize,
    pub failed: usize,
}

/// Resync and evaluate every budget
pub struct Reconciler {
    tracker: Arc<BudgetSpendTracker>,
    evaluator: Arc<AlertEvaluator>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    dispatch_timeout: Duration,
}

impl Reconciler {
    pub fn new(
        tracker: Arc<BudgetSpendTracker>,
        evaluator: Arc<AlertEvaluator>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            tracker,
            evaluator,
            dispatcher,
            dispatch_timeout,
        }
    }

    pub async fn run_periodic_reconciliation(&self, now: DateTime<Utc>) -> Result<ReconcileReport> {
        let budgets = self.tracker.budgets().list_budgets()?;
        let mut report = ReconcileReport {
            budgets: budgets.len(),
            ..Default::default()
        };

        for budget in budgets {
            let budget_id = budget.id;
            let outcome = (|| -> Result<_> {
                let rolled = self.tracker.roll_period_if_needed(budget_id, now)?;
                let resynced = self.tracker.resync(budget_id)?;
                let corrected = !rolled && resynced.spent != budget.spent;
                let event = self.evaluator.evaluate_budget(budget_id)?;
                Ok((rolled, corrected, event))
            })();

            match outcome {
                Ok((rolled, corrected, event)) => {
                    report.rolled += usize::from(rolled);
                    report.corrected += usize::from(corrected);
                    if let Some(event) = event {
                        report.alerts += 1;
                        deliver_best_effort(
                            self.dispatcher.as_ref(),
                            event.owner_id,
                            &Notification::Alert(event),
                            self.dispatch_timeout,
                        )
                        .await;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(budget_id, error = %e, "Budget reconciliation failed");
                }
            }
        }

        info!(
            budgets = report.budgets,
            rolled = report.rolled,
            corrected = report.corrected,
            alerts = report.alerts,
            failed = report.failed,
            "Reconciliation complete"
        );
        Ok(report)
    }
}

/// Outcome of one insight batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub owners: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Owners never started because the batch was cancelled
    pub skipped: usize,
    /// Owners served by the primary provider
    pub from_primary: usize,
    pub insights: usize,
    pub pruned: usize,
}

struct OwnerOutcome {
    insights: usize,
    source: ProviderSource,
}

/// Regenerate insights for every owner
#[derive(Clone)]
pub struct InsightBatch {
    ledger: Arc<dyn LedgerRepository>,
    engine: Arc<InsightEngine>,
    chain: Arc<InsightProviderChain>,
    store: Arc<dyn InsightRepository>,
    dispatcher: Option<Arc<dyn NotificationDispatcher>>,
    dispatch_timeout: Duration,
    max_concurrency: usize,
}

impl InsightBatch {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        engine: Arc<InsightEngine>,
        chain: Arc<InsightProviderChain>,
        store: Arc<dyn InsightRepository>,
    ) -> Self {
        let max_concurrency = engine.config().max_concurrency.max(1);
        Self {
            ledger,
            engine,
            chain,
            store,
            dispatcher: None,
            dispatch_timeout: Duration::from_secs(5),
            max_concurrency,
        }
    }

    /// Deliver high-impact insights through `dispatcher`
    pub fn with_dispatcher(
        mut self,
        dispatcher: Arc<dyn NotificationDispatcher>,
        timeout: Duration,
    ) -> Self {
        self.dispatcher = Some(dispatcher);
        self.dispatch_timeout = timeout;
        self
    }

    pub async fn run_insight_batch(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let owners = self.ledger.list_owners()?;
        let mut report = BatchReport {
            owners: owners.len(),
            ..Default::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut started = 0;

        for owner_id in owners.iter().copied() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                break;
            };

            let batch = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                (owner_id, batch.run_for_owner(owner_id, now).await)
            });
            started += 1;
        }
        report.skipped = owners.len() - started;
        if report.skipped > 0 {
            info!(skipped = report.skipped, "Insight batch cancelled");
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) => {
                    report.succeeded += 1;
                    report.insights += outcome.insights;
                    if outcome.source == ProviderSource::Primary {
                        report.from_primary += 1;
                    }
                }
                Ok((owner_id, Err(e))) => {
                    report.failed += 1;
                    warn!(owner_id, error = %e, "Insight generation failed");
                }
                Err(e) => {
                    report.failed += 1;
                    error!(error = %e, "Insight task panicked");
                }
            }
        }

        match self.store.prune_expired(now) {
            Ok(pruned) => report.pruned = pruned,
            Err(e) => warn!(error = %e, "Failed to prune expired insights"),
        }

        info!(
            owners = report.owners,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            insights = report.insights,
            "Insight batch complete"
        );
        Ok(report)
    }

    async fn run_for_owner(&self, owner_id: i64, now: DateTime<Utc>) -> Result<OwnerOutcome> {
        let general_window_days = self.engine.config().general_window_days;
        // SQLite reads and writes stay off the async workers
        let engine = self.engine.clone();
        let snapshot = task::spawn_blocking(move || {
            engine.snapshot(owner_id, now, general_window_days)
        })
        .await??;
        let request = InsightRequest {
            owner_id,
            now,
            general_window_days,
            snapshot,
        };

        let outcome = self.chain.generate(&request).await?;
        let source = outcome.source;
        let store = self.store.clone();
        let insights = task::spawn_blocking(move || {
            store
                .replace_insights(owner_id, &outcome.insights)
                .map(|_| outcome.insights)
        })
        .await??;
        debug!(
            owner_id,
            count = insights.len(),
            source = ?source,
            "Stored insights"
        );

        if let Some(dispatcher) = &self.dispatcher {
            for insight in insights.iter().filter(|i| i.impact == Impact::High) {
                deliver_best_effort(
                    dispatcher.as_ref(),
                    owner_id,
                    &Notification::Insight(insight.clone()),
                    self.dispatch_timeout,
                )
                .await;
            }
        }

        Ok(OwnerOutcome {
            insights: insights.len(),
            source,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryReport {
    pub owners: usize,
    pub delivered: usize,
    /// Owners with no activity in the week
    pub quiet: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Income and expenses over the trailing week, per owner
pub struct WeeklySummaries {
    ledger: Arc<dyn LedgerRepository>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    dispatch_timeout: Duration,
}

impl WeeklySummaries {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            dispatcher,
            dispatch_timeout,
        }
    }

    /// Summary for one owner, `None` when the week had no activity
    pub fn summarize(&self, owner_id: i64, now: DateTime<Utc>) -> Result<Option<WeeklySummary>> {
        let window = Period::lookback(now, 7);
        let total = |kind| -> Result<Decimal> {
            let transactions = self.ledger.find_matching(owner_id, None, Some(kind), &window)?;
            Ok(round_money(transactions.iter().map(|tx| tx.amount).sum()))
        };
        let income = total(TransactionKind::Income)?;
        let expenses = total(TransactionKind::Expense)?;

        if income.is_zero() && expenses.is_zero() {
            return Ok(None);
        }
        Ok(Some(WeeklySummary {
            owner_id,
            income,
            expenses,
            net: income - expenses,
            window,
        }))
    }

    pub async fn run(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> Result<SummaryReport> {
        let owners = self.ledger.list_owners()?;
        let mut report = SummaryReport {
            owners: owners.len(),
            ..Default::default()
        };

        for (i, owner_id) in owners.iter().copied().enumerate() {
            if cancel.is_cancelled() {
                report.skipped = owners.len() - i;
                break;
            }

            match self.summarize(owner_id, now) {
                Ok(Some(summary)) => {
                    let delivered = deliver_best_effort(
                        self.dispatcher.as_ref(),
                        owner_id,
                        &Notification::Summary(summary),
                        self.dispatch_timeout,
                    )
                    .await;
                    if delivered {
                        report.delivered += 1;
                    } else {
                        report.failed += 1;
                    }
                }
                Ok(None) => report.quiet += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(owner_id, error = %e, "Weekly summary failed");
                }
            }
        }

        info!(
            owners = report.owners,
            delivered = report.delivered,
            quiet = report.quiet,
            failed = report.failed,
            "Weekly summaries complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InsightConfig;
    use crate::db::Database;
    use crate::insights::{InsightProvider, LocalInsightProvider};
    use crate::models::{AlertLevel, NewBudget};
    use crate::period::PeriodKind;
    use crate::test_utils::{
        budget_services, expense, income, utc, MockBehavior, MockInsightProvider,
        RecordingDispatcher,
    };
    use rust_decimal_macros::dec;

    fn batch(db: &Database, primary: Option<Arc<dyn InsightProvider>>) -> InsightBatch {
        let engine = Arc::new(InsightEngine::new(
            Arc::new(db.clone()),
            Arc::new(db.clone()),
            InsightConfig::default(),
        ));
        let local: Arc<dyn InsightProvider> = Arc::new(LocalInsightProvider::new(engine.clone()));
        let chain = Arc::new(InsightProviderChain::new(
            primary,
            local,
            Duration::from_millis(200),
        ));
        InsightBatch::new(Arc::new(db.clone()), engine, chain, Arc::new(db.clone()))
    }

    fn seed_low_savings(db: &Database, owner_id: i64) {
        db.insert_transaction(&income(owner_id, dec!(1000), utc(2024, 6, 1)))
            .unwrap();
        db.insert_transaction(&expense(owner_id, "Rent", dec!(950), utc(2024, 6, 2)))
            .unwrap();
    }

    #[tokio::test]
    async fn test_reconciliation_repairs_drift_and_alerts() {
        let db = Database::in_memory().unwrap();
        let (tracker, evaluator) = budget_services(&db);
        let budget = tracker
            .create_budget(
                NewBudget::new(1, "Food", dec!(400), PeriodKind::Monthly),
                utc(2024, 6, 1),
            )
            .unwrap();

        // Inserted without an event: only reconciliation will notice
        db.insert_transaction(&expense(1, "Food", dec!(380), utc(2024, 6, 3)))
            .unwrap();

        let dispatcher = Arc::new(RecordingDispatcher::new());
        let reconciler = Reconciler::new(
            tracker,
            evaluator,
            dispatcher.clone(),
            Duration::from_secs(1),
        );

        let report = reconciler
            .run_periodic_reconciliation(utc(2024, 6, 10))
            .await
            .unwrap();
        assert_eq!(report.budgets, 1);
        assert_eq!(report.corrected, 1);
        assert_eq!(report.alerts, 1);
        assert_eq!(report.failed, 0);

        let stored = db.get_budget(budget.id).unwrap();
        assert_eq!(stored.spent, dec!(380));
        assert_eq!(stored.last_notified_level, Some(AlertLevel::Critical));
        assert_eq!(dispatcher.delivered().len(), 1);

        // Second pass is a no-op
        let again = reconciler
            .run_periodic_reconciliation(utc(2024, 6, 10))
            .await
            .unwrap();
        assert_eq!(again.corrected, 0);
        assert_eq!(again.alerts, 0);
    }

    #[tokio::test]
    async fn test_reconciliation_rolls_period() {
        let db = Database::in_memory().unwrap();
        let (tracker, evaluator) = budget_services(&db);
        let budget = tracker
            .create_budget(
                NewBudget::new(1, "Food", dec!(100), PeriodKind::Monthly),
                utc(2024, 5, 20),
            )
            .unwrap();
        let tx = db
            .insert_transaction(&expense(1, "Food", dec!(150), utc(2024, 5, 21)))
            .unwrap();
        tracker.on_transaction_created(&tx).unwrap();
        evaluator.evaluate_budget(budget.id).unwrap();

        let reconciler = Reconciler::new(
            tracker,
            evaluator,
            Arc::new(RecordingDispatcher::new()),
            Duration::from_secs(1),
        );
        let report = reconciler
            .run_periodic_reconciliation(utc(2024, 6, 2))
            .await
            .unwrap();
        assert_eq!(report.rolled, 1);

        let stored = db.get_budget(budget.id).unwrap();
        assert_eq!(stored.period.start, utc(2024, 6, 1));
        assert_eq!(stored.spent, Decimal::ZERO);
        assert_eq!(stored.last_notified_level, None);
    }

    #[tokio::test]
    async fn test_batch_stores_insights_per_owner() {
        let db = Database::in_memory().unwrap();
        seed_low_savings(&db, 1);
        seed_low_savings(&db, 2);

        let dispatcher = Arc::new(RecordingDispatcher::new());
        let batch = batch(&db, None).with_dispatcher(dispatcher.clone(), Duration::from_secs(1));
        let report = batch
            .run_insight_batch(utc(2024, 6, 15), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.owners, 2);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.from_primary, 0);
        for owner in [1, 2] {
            let stored = db.list_insights(owner, utc(2024, 6, 15)).unwrap();
            assert!(stored.iter().any(|i| i.title == "Low Savings Rate"));
        }
        // Low savings is high impact, so each owner got a notification
        assert!(dispatcher.delivered().len() >= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batch_on_multi_thread_runtime() {
        let db = Database::in_memory().unwrap();
        for owner in 1..=12 {
            seed_low_savings(&db, owner);
        }

        let report = batch(&db, None)
            .run_insight_batch(utc(2024, 6, 15), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.owners, 12);
        assert_eq!(report.succeeded, 12);
        assert_eq!(report.failed, 0);
        for owner in 1..=12 {
            let stored = db.list_insights(owner, utc(2024, 6, 15)).unwrap();
            assert!(stored.iter().any(|i| i.title == "Low Savings Rate"));
        }
    }

    #[tokio::test]
    async fn test_malformed_owner_is_isolated() {
        let db = Database::in_memory().unwrap();
        seed_low_savings(&db, 1);
        let bad = db
            .insert_transaction(&expense(2, "Food", dec!(10), utc(2024, 6, 3)))
            .unwrap();
        db.conn()
            .unwrap()
            .execute(
                "UPDATE transactions SET amount = '-10' WHERE id = ?",
                [bad.id],
            )
            .unwrap();
        seed_low_savings(&db, 3);

        let report = batch(&db, None)
            .run_insight_batch(utc(2024, 6, 15), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert!(!db.list_insights(1, utc(2024, 6, 15)).unwrap().is_empty());
        assert!(!db.list_insights(3, utc(2024, 6, 15)).unwrap().is_empty());
        assert!(db.list_insights(2, utc(2024, 6, 15)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_primary_provider_is_used_when_healthy() {
        let db = Database::in_memory().unwrap();
        seed_low_savings(&db, 1);

        let primary = Arc::new(MockInsightProvider::new(MockBehavior::Succeed(vec![])));
        let report = batch(&db, Some(primary.clone()))
            .run_insight_batch(utc(2024, 6, 15), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.from_primary, 1);
        assert_eq!(primary.calls(), 1);
        assert!(db.list_insights(1, utc(2024, 6, 15)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_batch_starts_nothing() {
        let db = Database::in_memory().unwrap();
        seed_low_savings(&db, 1);
        seed_low_savings(&db, 2);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = batch(&db, None)
            .run_insight_batch(utc(2024, 6, 15), &cancel)
            .await
            .unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(report.succeeded, 0);
        assert!(db.list_insights(1, utc(2024, 6, 15)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_weekly_summary_delivery() {
        let db = Database::in_memory().unwrap();
        db.insert_transaction(&income(1, dec!(500), utc(2024, 6, 10)))
            .unwrap();
        db.insert_transaction(&expense(1, "Food", dec!(120), utc(2024, 6, 11)))
            .unwrap();
        // Outside the trailing week
        db.insert_transaction(&expense(1, "Food", dec!(999), utc(2024, 5, 1)))
            .unwrap();
        db.insert_transaction(&expense(2, "Food", dec!(5), utc(2024, 4, 1)))
            .unwrap();

        let dispatcher = Arc::new(RecordingDispatcher::new());
        let summaries =
            WeeklySummaries::new(Arc::new(db.clone()), dispatcher.clone(), Duration::from_secs(1));
        let report = summaries
            .run(utc(2024, 6, 15), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.quiet, 1);
        let delivered = dispatcher.delivered();
        let Notification::Summary(summary) = &delivered[0].1 else {
            panic!("expected a summary notification");
        };
        assert_eq!(summary.net, dec!(380));
        assert!(summary.message().contains("You saved $380.00"));
    }

    #[tokio::test]
    async fn test_cancelled_summaries_skip_owners() {
        let db = Database::in_memory().unwrap();
        db.insert_transaction(&income(1, dec!(500), utc(2024, 6, 10)))
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let summaries = WeeklySummaries::new(
            Arc::new(db.clone()),
            Arc::new(RecordingDispatcher::new()),
            Duration::from_secs(1),
        );
        let report = summaries.run(utc(2024, 6, 15), &cancel).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.delivered, 0);
    }
}
