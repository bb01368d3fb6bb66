//! Budget Pressure
//!
//! Recommends attention for every active budget past 90% of its limit.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::Result;
use crate::models::{remaining, round_money, spend_percentage};

use super::engine::{AnalysisContext, Analyzer};
use super::types::{Insight, InsightType, Signal};

const PRESSURE_PERCENT: Decimal = dec!(90);

pub struct BudgetPressureAnalyzer;

impl Analyzer for BudgetPressureAnalyzer {
    fn insight_type(&self) -> InsightType {
        InsightType::BudgetPressure
    }

    fn name(&self) -> &'static str {
        "Budget Pressure"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Insight>> {
        let mut insights = vec![];

        for budget in ctx.budgets() {
            let Some(used) = spend_percentage(budget) else {
                continue;
            };
            if used <= PRESSURE_PERCENT {
                continue;
            }

            let used = round_money(used);
            let left = remaining(budget);
            let message = if left.is_zero() {
                format!(
                    "Your {} budget is {:.1}% used. Consider pausing {} spending until {}.",
                    budget.name,
                    used,
                    budget.category,
                    budget.period.end.format("%b %d")
                )
            } else {
                format!(
                    "Your {} budget is {:.1}% used with ${:.2} left until {}.",
                    budget.name,
                    used,
                    left,
                    budget.period.end.format("%b %d")
                )
            };

            let used_f64 = used.to_f64().unwrap_or_default();
            insights.push(
                Insight::from_signal(
                    ctx.owner_id,
                    Signal::BudgetPressure {
                        used_percent: used_f64,
                    },
                    "Budget Near Limit",
                    message,
                    ctx.now,
                )
                .with_category(budget.category.clone())
                .with_data(serde_json::json!({
                    "budget_id": budget.id,
                    "budget_name": budget.name,
                    "spent": budget.spent.to_f64(),
                    "limit": budget.limit.to_f64(),
                    "percentage_used": used_f64,
                })),
            );
        }

        Ok(insights)
    }
}
