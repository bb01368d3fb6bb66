//! Insight Engine - Statistical Spending Insights
//!
//! The Insight Engine runs a set of side-effect-free analyzers over a
//! read-only snapshot of one user's transactions and budgets. Confidence and
//! impact come from a fixed table keyed by insight type and magnitude.
//!
//! ## Analyzers
//!
//! - **Spending Trend** - Last completed month vs the month before
//! - **Savings Rate** - Share of income kept over the window
//! - **Category Concentration** - One category dominating expenses
//! - **Budget Pressure** - Budgets past 90% of their limit
//! - **Anomaly Detection** - Per-category z-score outliers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_core::insights::InsightEngine;
//!
//! let engine = InsightEngine::new(ledger, budgets, config.insights.clone());
//! let insights = engine.generate_all(owner_id, Utc::now(), None)?;
//! ```
//!
//! Batch runs go through [`InsightProviderChain`], which tries the remote
//! service first when one is configured.

pub mod anomaly;
pub mod budget_pressure;
pub mod concentration;
pub mod engine;
pub mod provider;
pub mod savings;
pub mod trend;
pub mod types;

pub use anomaly::AnomalyAnalyzer;
pub use budget_pressure::BudgetPressureAnalyzer;
pub use concentration::ConcentrationAnalyzer;
pub use engine::{sort_insights, AnalysisContext, Analyzer, InsightEngine, Snapshot};
pub use provider::{
    ChainOutcome, InsightProvider, InsightProviderChain, InsightRequest, LocalInsightProvider,
    ProviderSource, RemoteInsightProvider,
};
pub use savings::SavingsRateAnalyzer;
pub use trend::TrendAnalyzer;
pub use types::{Impact, Insight, InsightType, Signal};
