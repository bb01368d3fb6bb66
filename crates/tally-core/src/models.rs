//! Domain models for Tally

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::period::{Period, PeriodKind};

/// Thresholds used when a budget is created without explicit ones
pub const DEFAULT_THRESHOLDS: [Decimal; 3] = [dec!(70), dec!(90), dec!(100)];

const MAX_CATEGORY_LEN: usize = 50;
const MAX_BUDGET_NAME_LEN: usize = 100;

/// Round a money amount to cents
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Income or expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(Error::Validation(format!("Unknown transaction kind: {}", s))),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub owner_id: i64,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: String,
    pub occurred_at: DateTime<Utc>,
    /// Excluded transactions never count toward budgets or insights
    pub excluded: bool,
    pub description: Option<String>,
}

impl Transaction {
    pub fn is_countable_expense(&self) -> bool {
        self.kind == TransactionKind::Expense && !self.excluded
    }
}

/// New transaction to insert into the ledger
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub owner_id: i64,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: String,
    pub occurred_at: DateTime<Utc>,
    pub excluded: bool,
    pub description: Option<String>,
}

impl NewTransaction {
    /// Check field constraints and normalize amount and category
    pub fn validated(mut self) -> Result<Self> {
        self.amount = validate_amount(self.amount)?;
        self.category = validate_category(&self.category)?;
        Ok(self)
    }
}

/// Editable transaction fields (identity and owner are fixed)
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub kind: Option<TransactionKind>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub excluded: Option<bool>,
    pub description: Option<String>,
}

impl TransactionUpdate {
    /// Produce the edited transaction, validating changed fields
    pub fn apply_to(&self, tx: &Transaction) -> Result<Transaction> {
        let mut updated = tx.clone();
        if let Some(kind) = self.kind {
            updated.kind = kind;
        }
        if let Some(amount) = self.amount {
            updated.amount = validate_amount(amount)?;
        }
        if let Some(ref category) = self.category {
            updated.category = validate_category(category)?;
        }
        if let Some(occurred_at) = self.occurred_at {
            updated.occurred_at = occurred_at;
        }
        if let Some(excluded) = self.excluded {
            updated.excluded = excluded;
        }
        if let Some(ref description) = self.description {
            updated.description = Some(description.clone());
        }
        Ok(updated)
    }
}

fn validate_amount(amount: Decimal) -> Result<Decimal> {
    let amount = round_money(amount);
    if amount <= Decimal::ZERO {
        return Err(Error::Validation(format!(
            "Amount must be greater than 0, got {}",
            amount
        )));
    }
    Ok(amount)
}

fn validate_category(category: &str) -> Result<String> {
    let category = category.trim();
    if category.is_empty() {
        return Err(Error::Validation("Category is required".to_string()));
    }
    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err(Error::Validation(format!(
            "Category cannot exceed {} characters",
            MAX_CATEGORY_LEN
        )));
    }
    Ok(category.to_string())
}

/// A change notification emitted by the ledger
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    Created(Transaction),
    Updated { old: Transaction, new: Transaction },
    Deleted(Transaction),
}

impl LedgerEvent {
    pub fn owner_id(&self) -> i64 {
        match self {
            Self::Created(tx) | Self::Deleted(tx) => tx.owner_id,
            Self::Updated { new, .. } => new.owner_id,
        }
    }
}

/// Severity of a budget alert, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
    Exceeded,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Exceeded => "exceeded",
        }
    }
}

impl std::str::FromStr for AlertLevel {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            "exceeded" => Ok(Self::Exceeded),
            _ => Err(Error::InvalidData(format!("Unknown alert level: {}", s))),
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A spending limit on one category for a recurring period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub category: String,
    pub limit: Decimal,
    pub period_kind: PeriodKind,
    /// Carry unused amount into the next period (reporting only)
    pub rollover: bool,
    pub alerts_enabled: bool,
    /// Strictly ascending percentages in (0, 100]
    pub thresholds: Vec<Decimal>,
    pub period: Period,
    pub spent: Decimal,
    /// Highest alert level already sent for the current period
    pub last_notified_level: Option<AlertLevel>,
    pub created_at: DateTime<Utc>,
}

/// New budget to create
#[derive(Debug, Clone)]
pub struct NewBudget {
    pub owner_id: i64,
    pub name: Option<String>,
    pub category: String,
    pub limit: Decimal,
    pub period_kind: PeriodKind,
    pub rollover: bool,
    pub alerts_enabled: bool,
    pub thresholds: Option<Vec<Decimal>>,
}

impl NewBudget {
    pub fn new(owner_id: i64, category: &str, limit: Decimal, period_kind: PeriodKind) -> Self {
        Self {
            owner_id,
            name: None,
            category: category.to_string(),
            limit,
            period_kind,
            rollover: false,
            alerts_enabled: true,
            thresholds: None,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Vec<Decimal>) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    /// Build the stored budget for the given period; id is assigned by storage
    pub(crate) fn into_budget(self, period: Period, now: DateTime<Utc>) -> Result<Budget> {
        let category = validate_category(&self.category)?;
        let limit = validate_limit(self.limit)?;
        let thresholds = match self.thresholds {
            Some(t) => validate_thresholds(t)?,
            None => DEFAULT_THRESHOLDS.to_vec(),
        };
        let name = validate_name(self.name.as_deref().unwrap_or(&category))?;

        Ok(Budget {
            id: 0,
            owner_id: self.owner_id,
            name,
            category,
            limit,
            period_kind: self.period_kind,
            rollover: self.rollover,
            alerts_enabled: self.alerts_enabled,
            thresholds,
            period,
            spent: Decimal::ZERO,
            last_notified_level: None,
            created_at: now,
        })
    }
}

/// Editable budget fields
#[derive(Debug, Clone, Default)]
pub struct BudgetUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub limit: Option<Decimal>,
    pub period_kind: Option<PeriodKind>,
    pub rollover: Option<bool>,
    pub alerts_enabled: Option<bool>,
    pub thresholds: Option<Vec<Decimal>>,
}

impl BudgetUpdate {
    /// Apply edits to `budget`, returning true when the tracked window or
    /// category changed and the spend state must be rebuilt
    pub(crate) fn apply_to(&self, budget: &mut Budget) -> Result<bool> {
        let mut needs_reset = false;

        if let Some(ref category) = self.category {
            let category = validate_category(category)?;
            if category != budget.category {
                budget.category = category;
                needs_reset = true;
            }
        }
        if let Some(kind) = self.period_kind {
            if kind != budget.period_kind {
                budget.period_kind = kind;
                needs_reset = true;
            }
        }
        if let Some(limit) = self.limit {
            budget.limit = validate_limit(limit)?;
        }
        if let Some(ref thresholds) = self.thresholds {
            budget.thresholds = validate_thresholds(thresholds.clone())?;
        }
        if let Some(ref name) = self.name {
            budget.name = validate_name(name)?;
        }
        if let Some(rollover) = self.rollover {
            budget.rollover = rollover;
        }
        if let Some(enabled) = self.alerts_enabled {
            budget.alerts_enabled = enabled;
        }

        Ok(needs_reset)
    }
}

fn validate_limit(limit: Decimal) -> Result<Decimal> {
    let limit = round_money(limit);
    if limit <= Decimal::ZERO {
        return Err(Error::Validation(format!(
            "Budget limit must be greater than 0, got {}",
            limit
        )));
    }
    Ok(limit)
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Budget name is required".to_string()));
    }
    if name.chars().count() > MAX_BUDGET_NAME_LEN {
        return Err(Error::Validation(format!(
            "Budget name cannot exceed {} characters",
            MAX_BUDGET_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Alert thresholds must be strictly ascending percentages in (0, 100]
pub fn validate_thresholds(thresholds: Vec<Decimal>) -> Result<Vec<Decimal>> {
    for t in &thresholds {
        if *t <= Decimal::ZERO || *t > Decimal::ONE_HUNDRED {
            return Err(Error::Validation(format!(
                "Alert threshold {} must be in (0, 100]",
                t
            )));
        }
    }
    if thresholds.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::Validation(
            "Alert thresholds must be strictly ascending without duplicates".to_string(),
        ));
    }
    Ok(thresholds)
}

/// Budget health band used for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Good,
    Warning,
    Critical,
    Exceeded,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Exceeded => "exceeded",
        }
    }
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Uncapped spend percentage; `None` when the limit is zero
pub fn spend_percentage(budget: &Budget) -> Option<Decimal> {
    if budget.limit.is_zero() {
        return None;
    }
    Some(budget.spent / budget.limit * Decimal::ONE_HUNDRED)
}

/// Percentage of the limit used, capped at 100
pub fn percentage_used(budget: &Budget) -> Decimal {
    spend_percentage(budget)
        .map(|p| p.min(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

/// Amount left before the limit is reached, never negative
pub fn remaining(budget: &Budget) -> Decimal {
    (budget.limit - budget.spent).max(Decimal::ZERO)
}

pub fn status(budget: &Budget) -> BudgetStatus {
    let pct = percentage_used(budget);
    if pct >= dec!(100) {
        BudgetStatus::Exceeded
    } else if pct >= dec!(90) {
        BudgetStatus::Critical
    } else if pct >= dec!(70) {
        BudgetStatus::Warning
    } else {
        BudgetStatus::Good
    }
}

/// Unused amount carried from the previous period when rollover is enabled
pub fn rollover_carry(budget: &Budget, previous_spent: Decimal) -> Decimal {
    if !budget.rollover {
        return Decimal::ZERO;
    }
    (budget.limit - previous_spent).max(Decimal::ZERO)
}

/// Limit plus any carried amount, for reporting
pub fn available(budget: &Budget, carry: Decimal) -> Decimal {
    budget.limit + carry
}

/// A budget threshold crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub budget_id: i64,
    pub owner_id: i64,
    pub category: String,
    pub level: AlertLevel,
    /// Spend as a percentage of the limit, two decimal places
    pub percentage: Decimal,
    pub message: String,
}

/// Income and expenses over the trailing week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub owner_id: i64,
    pub income: Decimal,
    pub expenses: Decimal,
    pub net: Decimal,
    pub window: Period,
}

impl WeeklySummary {
    pub fn message(&self) -> String {
        let mut message = format!(
            "Last week: Income: ${:.2}, Expenses: ${:.2}. ",
            self.income, self.expenses
        );
        if self.net > Decimal::ZERO {
            message.push_str(&format!("You saved ${:.2}. Great job!", self.net));
        } else {
            message.push_str(&format!("You overspent by ${:.2}.", self.net.abs()));
        }
        message
    }
}
