//! Storage seams injected into the tracker, evaluator, insight engine and jobs
//!
//! The core never reaches for a global handle; each component receives the
//! repositories it needs. `Database` implements all three traits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::insights::Insight;
use crate::models::{AlertLevel, Budget, Transaction, TransactionKind};
use crate::period::Period;

/// Read access to the ledger
pub trait LedgerRepository: Send + Sync {
    /// Non-excluded transactions for `owner_id` with `occurred_at` in `range`,
    /// optionally narrowed to one category and kind
    fn find_matching(
        &self,
        owner_id: i64,
        category: Option<&str>,
        kind: Option<TransactionKind>,
        range: &Period,
    ) -> Result<Vec<Transaction>>;

    /// Every owner with at least one transaction or budget
    fn list_owners(&self) -> Result<Vec<i64>>;
}

/// Budget storage
pub trait BudgetRepository: Send + Sync {
    /// Store a new budget and return its id
    fn insert_budget(&self, budget: &Budget) -> Result<i64>;

    /// Load a budget, failing with `NotFound` when absent
    fn get_budget(&self, id: i64) -> Result<Budget>;

    /// Overwrite every mutable field of an existing budget
    fn save_budget(&self, budget: &Budget) -> Result<()>;

    fn delete_budget(&self, id: i64) -> Result<()>;

    fn list_budgets(&self) -> Result<Vec<Budget>>;

    fn list_for_owner(&self, owner_id: i64) -> Result<Vec<Budget>>;

    fn list_for_category(&self, owner_id: i64, category: &str) -> Result<Vec<Budget>>;

    /// Budgets whose stored period contains `now`
    fn list_active(&self, owner_id: i64, now: DateTime<Utc>) -> Result<Vec<Budget>>;

    fn set_spent(&self, id: i64, spent: Decimal) -> Result<()>;

    fn set_last_notified(&self, id: i64, level: Option<AlertLevel>) -> Result<()>;
}

/// Persistence for generated insights
pub trait InsightRepository: Send + Sync {
    /// Replace every stored insight of `owner_id` with `insights`
    fn replace_insights(&self, owner_id: i64, insights: &[Insight]) -> Result<usize>;

    /// Unexpired insights for `owner_id`, highest impact first
    fn list_insights(&self, owner_id: i64, now: DateTime<Utc>) -> Result<Vec<Insight>>;

    /// Delete expired insights, returning how many were removed
    fn prune_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
