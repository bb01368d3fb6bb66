//! Budget threshold alerts
//!
//! A budget moves through `warning`, `critical` and `exceeded` as its spend
//! ratio climbs past its thresholds. Each level is announced at most once
//! per period: an alert fires only when the new level is strictly above the
//! budget's `last_notified_level`, which resets when the period rolls.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::Result;
use crate::locks::BudgetLocks;
use crate::models::{round_money, spend_percentage, AlertEvent, AlertLevel, Budget};
use crate::repository::BudgetRepository;

/// Level each threshold maps to, in threshold order
///
/// Thresholds at 100 mean exceeded. Below 100, the highest threshold is
/// critical when there are at least two of them; the rest are warnings.
pub fn threshold_levels(thresholds: &[Decimal]) -> Vec<AlertLevel> {
    let below_full = thresholds
        .iter()
        .filter(|t| **t < Decimal::ONE_HUNDRED)
        .count();

    thresholds
        .iter()
        .enumerate()
        .map(|(i, t)| {
            if *t >= Decimal::ONE_HUNDRED {
                AlertLevel::Exceeded
            } else if below_full >= 2 && i + 1 == below_full {
                AlertLevel::Critical
            } else {
                AlertLevel::Warning
            }
        })
        .collect()
}

/// Current alert level of `budget`, if any threshold has been reached
pub fn level_for(budget: &Budget) -> Option<AlertLevel> {
    let Some(percentage) = spend_percentage(budget) else {
        return (budget.spent > Decimal::ZERO).then_some(AlertLevel::Exceeded);
    };

    if percentage >= Decimal::ONE_HUNDRED {
        return Some(AlertLevel::Exceeded);
    }

    budget
        .thresholds
        .iter()
        .zip(threshold_levels(&budget.thresholds))
        .filter(|(threshold, _)| percentage >= **threshold)
        .map(|(_, level)| level)
        .max()
}

fn alert_message(budget: &Budget, level: AlertLevel, percentage: Decimal) -> String {
    match level {
        AlertLevel::Warning => format!("Your {} budget is {:.1}% used.", budget.name, percentage),
        AlertLevel::Critical => format!(
            "Your {} budget is {:.1}% used - almost at limit!",
            budget.name, percentage
        ),
        AlertLevel::Exceeded => format!(
            "Your {} budget has been exceeded! ({:.1}% used)",
            budget.name, percentage
        ),
    }
}

/// Decides when a budget's spend crosses into a new alert level
pub struct AlertEvaluator {
    budgets: Arc<dyn BudgetRepository>,
    locks: Arc<BudgetLocks>,
}

impl AlertEvaluator {
    pub fn new(budgets: Arc<dyn BudgetRepository>, locks: Arc<BudgetLocks>) -> Self {
        Self { budgets, locks }
    }

    /// Compare the budget's level with what was already announced
    ///
    /// On a new, higher level this records it in `last_notified_level` and
    /// returns the event. The caller persists the budget.
    pub fn evaluate(&self, budget: &mut Budget) -> Option<AlertEvent> {
        if !budget.alerts_enabled {
            return None;
        }

        let level = level_for(budget)?;
        if budget.last_notified_level.is_some_and(|last| level <= last) {
            return None;
        }

        let percentage = match spend_percentage(budget) {
            Some(p) => round_money(p),
            None => Decimal::ONE_HUNDRED,
        };
        budget.last_notified_level = Some(level);

        Some(AlertEvent {
            budget_id: budget.id,
            owner_id: budget.owner_id,
            category: budget.category.clone(),
            level,
            percentage,
            message: alert_message(budget, level, percentage),
        })
    }

    /// Load, evaluate and persist one budget under its lock
    pub fn evaluate_budget(&self, budget_id: i64) -> Result<Option<AlertEvent>> {
        self.locks.with_lock(budget_id, || {
            let mut budget = self.budgets.get_budget(budget_id)?;
            let event = self.evaluate(&mut budget);
            if let Some(ref event) = event {
                self.budgets
                    .set_last_notified(budget_id, Some(event.level))?;
                debug!(
                    budget_id,
                    level = %event.level,
                    percentage = %event.percentage,
                    "Budget alert fired"
                );
            }
            Ok(event)
        })
    }
}
