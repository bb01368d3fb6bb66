//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `Services` - The core components wired over one database and config
//! - `cmd_init` - Initialize the database

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tally_core::insights::{InsightProvider, InsightProviderChain, LocalInsightProvider};
use tally_core::{
    AlertEvaluator, BudgetLocks, BudgetMonitor, BudgetSpendTracker, Database, InboxDispatcher,
    InsightBatch, InsightEngine, LogDispatcher, NotificationDispatcher, Reconciler,
    RemoteInsightProvider, TallyConfig, WeeklySummaries,
};

/// Open the database, running migrations
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

/// Core components sharing one database, config and lock registry
pub struct Services {
    pub db: Database,
    pub config: TallyConfig,
    pub tracker: Arc<BudgetSpendTracker>,
    pub evaluator: Arc<AlertEvaluator>,
    pub engine: Arc<InsightEngine>,
}

impl Services {
    pub fn open(db_path: &Path, config_path: Option<&Path>) -> Result<Self> {
        let config = TallyConfig::load(config_path).context("Failed to load config")?;
        let db = open_db(db_path)?;
        Ok(Self::new(db, config))
    }

    pub fn new(db: Database, config: TallyConfig) -> Self {
        let ledger = Arc::new(db.clone());
        let budgets = Arc::new(db.clone());
        let locks = Arc::new(BudgetLocks::new());

        let tracker = Arc::new(BudgetSpendTracker::new(
            ledger.clone(),
            budgets.clone(),
            locks.clone(),
        ));
        let evaluator = Arc::new(AlertEvaluator::new(budgets.clone(), locks));
        let engine = Arc::new(InsightEngine::new(
            ledger,
            budgets,
            config.insights.clone(),
        ));

        Self {
            db,
            config,
            tracker,
            evaluator,
            engine,
        }
    }

    /// Inbox dispatcher, or the log when `log_only`
    pub fn dispatcher(&self, log_only: bool) -> Arc<dyn NotificationDispatcher> {
        if log_only {
            Arc::new(LogDispatcher)
        } else {
            Arc::new(InboxDispatcher::new(self.db.clone()))
        }
    }

    pub fn monitor(&self) -> BudgetMonitor {
        BudgetMonitor::new(
            self.tracker.clone(),
            self.evaluator.clone(),
            self.dispatcher(false),
            self.config.notifications.dispatch_timeout(),
        )
    }

    pub fn reconciler(&self, log_only: bool) -> Reconciler {
        Reconciler::new(
            self.tracker.clone(),
            self.evaluator.clone(),
            self.dispatcher(log_only),
            self.config.notifications.dispatch_timeout(),
        )
    }

    /// Remote service first when configured, local engine as fallback
    pub fn provider_chain(&self) -> InsightProviderChain {
        let local: Arc<dyn InsightProvider> =
            Arc::new(LocalInsightProvider::new(self.engine.clone()));
        let remote = self.config.provider.service_url.as_deref().map(|url| {
            Arc::new(RemoteInsightProvider::new(
                url,
                self.config.insights.expiry_days,
            )) as Arc<dyn InsightProvider>
        });
        InsightProviderChain::new(remote, local, self.config.provider.timeout())
    }

    pub fn insight_batch(&self, log_only: bool) -> InsightBatch {
        let batch = InsightBatch::new(
            Arc::new(self.db.clone()),
            self.engine.clone(),
            Arc::new(self.provider_chain()),
            Arc::new(self.db.clone()),
        );
        if self.config.notifications.deliver_insights {
            batch.with_dispatcher(
                self.dispatcher(log_only),
                self.config.notifications.dispatch_timeout(),
            )
        } else {
            batch
        }
    }

    pub fn weekly_summaries(&self, log_only: bool) -> WeeklySummaries {
        WeeklySummaries::new(
            Arc::new(self.db.clone()),
            self.dispatcher(log_only),
            self.config.notifications.dispatch_timeout(),
        )
    }
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path)?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create a budget: tally budgets add Food 400");
    println!("  2. Record spending: tally tx add expense 32.50 Food");
    println!("  3. Start the scheduler: tally run");

    Ok(())
}
