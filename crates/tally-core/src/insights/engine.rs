//! Insight Engine - runs analyzers over a read-only snapshot of one user

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::InsightConfig;
use crate::error::{Error, Result};
use crate::models::{Budget, Transaction, TransactionKind};
use crate::period::Period;
use crate::repository::{BudgetRepository, LedgerRepository};

use super::types::{Insight, InsightType};
use super::{
    AnomalyAnalyzer, BudgetPressureAnalyzer, ConcentrationAnalyzer, SavingsRateAnalyzer,
    TrendAnalyzer,
};

/// Everything an analyzer may look at for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Non-excluded transactions over the widest analysis window
    pub transactions: Vec<Transaction>,
    /// Budgets whose period contains the analysis instant
    pub budgets: Vec<Budget>,
}

impl Snapshot {
    /// Reject data no analyzer can reason about
    pub fn validate(&self) -> Result<()> {
        if let Some(tx) = self
            .transactions
            .iter()
            .find(|tx| tx.amount <= rust_decimal::Decimal::ZERO)
        {
            return Err(Error::InvalidData(format!(
                "transaction {} has non-positive amount {}",
                tx.id, tx.amount
            )));
        }
        Ok(())
    }
}

/// Context provided to insight analyzers
pub struct AnalysisContext<'a> {
    pub owner_id: i64,
    /// Instant the analysis is anchored to
    pub now: DateTime<Utc>,
    pub snapshot: &'a Snapshot,
    pub config: &'a InsightConfig,
    general_window_days: u32,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(
        owner_id: i64,
        now: DateTime<Utc>,
        snapshot: &'a Snapshot,
        config: &'a InsightConfig,
    ) -> Self {
        Self {
            owner_id,
            now,
            snapshot,
            config,
            general_window_days: config.general_window_days,
        }
    }

    /// Override the general lookback window
    pub fn with_general_window(mut self, days: u32) -> Self {
        self.general_window_days = days;
        self
    }

    pub fn general_window(&self) -> Period {
        Period::lookback(self.now, self.general_window_days)
    }

    pub fn trend_window(&self) -> Period {
        Period::lookback(self.now, self.config.trend_window_days)
    }

    pub fn anomaly_window(&self) -> Period {
        Period::lookback(self.now, self.config.anomaly_window_days)
    }

    /// Snapshot transactions of `kind` inside `window`
    pub fn transactions_in(
        &self,
        kind: TransactionKind,
        window: Period,
    ) -> impl Iterator<Item = &'a Transaction> + 'a {
        let snapshot = self.snapshot;
        snapshot
            .transactions
            .iter()
            .filter(move |tx| tx.kind == kind && !tx.excluded && window.contains(tx.occurred_at))
    }

    pub fn expenses_in(&self, window: Period) -> impl Iterator<Item = &'a Transaction> + 'a {
        self.transactions_in(TransactionKind::Expense, window)
    }

    pub fn budgets(&self) -> &'a [Budget] {
        &self.snapshot.budgets
    }
}

/// A side-effect-free insight generator
pub trait Analyzer: Send + Sync {
    fn insight_type(&self) -> InsightType;

    /// Human-readable name
    fn name(&self) -> &'static str;

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Insight>>;
}

/// Runs every registered analyzer for a user
pub struct InsightEngine {
    analyzers: Vec<Box<dyn Analyzer>>,
    ledger: Arc<dyn LedgerRepository>,
    budgets: Arc<dyn BudgetRepository>,
    config: InsightConfig,
}

impl InsightEngine {
    /// Create an engine with the built-in analyzers
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        budgets: Arc<dyn BudgetRepository>,
        config: InsightConfig,
    ) -> Self {
        let mut engine = Self {
            analyzers: vec![],
            ledger,
            budgets,
            config,
        };

        engine.register(Box::new(TrendAnalyzer));
        engine.register(Box::new(SavingsRateAnalyzer));
        engine.register(Box::new(ConcentrationAnalyzer));
        engine.register(Box::new(BudgetPressureAnalyzer));
        engine.register(Box::new(AnomalyAnalyzer));

        engine
    }

    pub fn register(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn insight_types(&self) -> Vec<InsightType> {
        self.analyzers.iter().map(|a| a.insight_type()).collect()
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    /// Load the data the analyzers need for `owner_id`
    pub fn snapshot(
        &self,
        owner_id: i64,
        now: DateTime<Utc>,
        general_window_days: u32,
    ) -> Result<Snapshot> {
        let days = general_window_days
            .max(self.config.trend_window_days)
            .max(self.config.anomaly_window_days);
        let window = Period::lookback(now, days);

        Ok(Snapshot {
            transactions: self.ledger.find_matching(owner_id, None, None, &window)?,
            budgets: self.budgets.list_active(owner_id, now)?,
        })
    }

    /// Run all analyzers over a prepared context
    ///
    /// A failing analyzer is logged and skipped; malformed snapshot data fails
    /// the whole run for this user.
    pub fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Insight>> {
        ctx.snapshot.validate()?;

        let mut insights = vec![];
        for analyzer in &self.analyzers {
            match analyzer.analyze(ctx) {
                Ok(found) => {
                    debug!(
                        owner_id = ctx.owner_id,
                        analyzer = analyzer.name(),
                        count = found.len(),
                        "Analyzer complete"
                    );
                    insights.extend(found);
                }
                Err(e) => {
                    warn!(
                        owner_id = ctx.owner_id,
                        analyzer = analyzer.name(),
                        error = %e,
                        "Analyzer failed"
                    );
                }
            }
        }

        let insights: Vec<Insight> = insights
            .into_iter()
            .map(|i| i.expiring_after(self.config.expiry_days))
            .collect();
        Ok(sort_insights(insights))
    }

    /// Snapshot and analyze one user; `window_days` overrides the general window
    pub fn generate_all(
        &self,
        owner_id: i64,
        now: DateTime<Utc>,
        window_days: Option<u32>,
    ) -> Result<Vec<Insight>> {
        let days = window_days.unwrap_or(self.config.general_window_days);
        let snapshot = self.snapshot(owner_id, now, days)?;
        let ctx = AnalysisContext::new(owner_id, now, &snapshot, &self.config)
            .with_general_window(days);
        self.analyze(&ctx)
    }
}

/// Highest impact first, then most confident
pub fn sort_insights(mut insights: Vec<Insight>) -> Vec<Insight> {
    insights.sort_by(|a, b| {
        b.impact
            .priority()
            .cmp(&a.impact.priority())
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::insights::Impact;
    use crate::models::NewBudget;
    use crate::period::PeriodKind;
    use crate::test_utils::{budget_services, expense, income, snapshot_tx, utc};
    use rust_decimal_macros::dec;

    fn engine(db: &Database) -> InsightEngine {
        InsightEngine::new(
            Arc::new(db.clone()),
            Arc::new(db.clone()),
            InsightConfig::default(),
        )
    }

    struct FailingAnalyzer;

    impl Analyzer for FailingAnalyzer {
        fn insight_type(&self) -> InsightType {
            InsightType::Trend
        }

        fn name(&self) -> &'static str {
            "Failing"
        }

        fn analyze(&self, _ctx: &AnalysisContext<'_>) -> Result<Vec<Insight>> {
            Err(Error::InvalidData("boom".to_string()))
        }
    }

    #[test]
    fn test_engine_creation() {
        let db = Database::in_memory().unwrap();
        let types = engine(&db).insight_types();
        assert_eq!(types.len(), 5);
        assert!(types.contains(&InsightType::Anomaly));
        assert!(types.contains(&InsightType::BudgetPressure));
    }

    #[test]
    fn test_empty_ledger_produces_nothing() {
        let db = Database::in_memory().unwrap();
        let insights = engine(&db).generate_all(1, utc(2024, 6, 15), None).unwrap();
        assert!(insights.is_empty());
    }

    #[test]
    fn test_generate_all_end_to_end() {
        let db = Database::in_memory().unwrap();
        let now = utc(2024, 6, 15);
        let (tracker, _) = budget_services(&db);

        db.insert_transaction(&income(1, dec!(1000), utc(2024, 6, 1)))
            .unwrap();
        db.insert_transaction(&expense(1, "Rent", dec!(900), utc(2024, 6, 2)))
            .unwrap();
        db.insert_transaction(&expense(1, "Food", dec!(50), utc(2024, 6, 3)))
            .unwrap();
        // Other users never leak in
        db.insert_transaction(&income(2, dec!(99999), utc(2024, 6, 1)))
            .unwrap();
        tracker
            .create_budget(NewBudget::new(1, "Rent", dec!(950), PeriodKind::Monthly), now)
            .unwrap();

        let insights = engine(&db).generate_all(1, now, None).unwrap();
        let types: Vec<InsightType> = insights.iter().map(|i| i.insight_type).collect();

        assert!(types.contains(&InsightType::SavingsRate));
        assert!(types.contains(&InsightType::CategoryConcentration));
        assert!(types.contains(&InsightType::BudgetPressure));
        assert!(insights.iter().all(|i| i.owner_id == 1));
        assert!(insights
            .iter()
            .all(|i| i.expires_at == Some(now + chrono::Duration::days(7))));
        assert!(insights
            .windows(2)
            .all(|w| w[0].impact.priority() >= w[1].impact.priority()));
    }

    #[test]
    fn test_invalid_snapshot_is_rejected() {
        let db = Database::in_memory().unwrap();
        let engine = engine(&db);
        let now = utc(2024, 6, 15);
        let snapshot = Snapshot {
            transactions: vec![snapshot_tx(
                1,
                TransactionKind::Expense,
                "Food",
                dec!(-5),
                utc(2024, 6, 1),
            )],
            budgets: vec![],
        };
        let config = InsightConfig::default();
        let ctx = AnalysisContext::new(1, now, &snapshot, &config);

        assert!(matches!(engine.analyze(&ctx), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_failing_analyzer_is_skipped() {
        let db = Database::in_memory().unwrap();
        let mut engine = engine(&db);
        engine.register(Box::new(FailingAnalyzer));

        let now = utc(2024, 6, 15);
        let snapshot = Snapshot {
            transactions: vec![
                snapshot_tx(1, TransactionKind::Income, "Salary", dec!(1000), utc(2024, 6, 1)),
                snapshot_tx(2, TransactionKind::Expense, "Food", dec!(950), utc(2024, 6, 2)),
            ],
            budgets: vec![],
        };
        let config = InsightConfig::default();
        let ctx = AnalysisContext::new(1, now, &snapshot, &config);

        let insights = engine.analyze(&ctx).unwrap();
        assert!(insights
            .iter()
            .any(|i| i.insight_type == InsightType::SavingsRate && i.impact == Impact::High));
    }

    #[test]
    fn test_window_override_narrows_general_window() {
        let now = utc(2024, 6, 15);
        let snapshot = Snapshot {
            transactions: vec![
                snapshot_tx(1, TransactionKind::Income, "Salary", dec!(1000), utc(2024, 4, 1)),
                snapshot_tx(2, TransactionKind::Expense, "Food", dec!(100), utc(2024, 6, 10)),
            ],
            budgets: vec![],
        };
        let config = InsightConfig::default();

        let wide = AnalysisContext::new(1, now, &snapshot, &config);
        assert_eq!(wide.transactions_in(TransactionKind::Income, wide.general_window()).count(), 1);

        let narrow = AnalysisContext::new(1, now, &snapshot, &config).with_general_window(30);
        assert_eq!(
            narrow
                .transactions_in(TransactionKind::Income, narrow.general_window())
                .count(),
            0
        );
    }
}
