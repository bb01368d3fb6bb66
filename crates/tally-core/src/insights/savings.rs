//! Savings Rate
//!
//! `(income - expenses) / income` over the general window. Below 10% is
//! flagged as low, above 30% is called out as excellent.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::Result;
use crate::models::{round_money, TransactionKind};

use super::engine::{AnalysisContext, Analyzer};
use super::types::{Insight, InsightType, Signal};

const LOW_SAVINGS_PERCENT: Decimal = dec!(10);
const HIGH_SAVINGS_PERCENT: Decimal = dec!(30);

pub struct SavingsRateAnalyzer;

impl Analyzer for SavingsRateAnalyzer {
    fn insight_type(&self) -> InsightType {
        InsightType::SavingsRate
    }

    fn name(&self) -> &'static str {
        "Savings Rate"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Insight>> {
        let window = ctx.general_window();
        let income: Decimal = ctx
            .transactions_in(TransactionKind::Income, window)
            .map(|tx| tx.amount)
            .sum();
        let expenses: Decimal = ctx.expenses_in(window).map(|tx| tx.amount).sum();

        // Undefined without income
        if income.is_zero() {
            return Ok(vec![]);
        }

        // Thresholds apply to the exact rate; rounding is for display only
        let exact = (income - expenses) / income * Decimal::ONE_HUNDRED;
        let rate = round_money(exact);
        let (signal, title, message) = if exact < LOW_SAVINGS_PERCENT {
            (
                Signal::LowSavings,
                "Low Savings Rate",
                format!(
                    "Your savings rate is {:.1}%. Try to save at least 10% of your income.",
                    rate
                ),
            )
        } else if exact > HIGH_SAVINGS_PERCENT {
            (
                Signal::HighSavings,
                "Excellent Savings Rate",
                format!("Great job! You're saving {:.1}% of your income.", rate),
            )
        } else {
            return Ok(vec![]);
        };

        let insight = Insight::from_signal(ctx.owner_id, signal, title, message, ctx.now)
            .with_data(serde_json::json!({
                "income": income.to_f64(),
                "expenses": expenses.to_f64(),
                "savings_rate": rate.to_f64(),
                "window_days": window.duration().num_days(),
            }));

        Ok(vec![insight])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InsightConfig;
    use crate::insights::engine::Snapshot;
    use crate::insights::Impact;
    use crate::test_utils::{snapshot_tx, utc};

    fn run(income: Decimal, expense: Decimal) -> Vec<Insight> {
        let day = utc(2024, 6, 1);
        let mut transactions = vec![];
        if !income.is_zero() {
            transactions.push(snapshot_tx(1, TransactionKind::Income, "Salary", income, day));
        }
        if !expense.is_zero() {
            transactions.push(snapshot_tx(2, TransactionKind::Expense, "Rent", expense, day));
        }
        let snapshot = Snapshot {
            transactions,
            budgets: vec![],
        };
        let config = InsightConfig::default();
        let ctx = AnalysisContext::new(1, utc(2024, 6, 15), &snapshot, &config);
        SavingsRateAnalyzer.analyze(&ctx).unwrap()
    }

    #[test]
    fn test_low_savings() {
        let insights = run(dec!(1000), dec!(950));
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].title, "Low Savings Rate");
        assert_eq!(insights[0].impact, Impact::High);
        assert_eq!(insights[0].data["savings_rate"], 5.0);
    }

    #[test]
    fn test_high_savings() {
        let insights = run(dec!(1000), dec!(600));
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].title, "Excellent Savings Rate");
        assert_eq!(insights[0].impact, Impact::Low);
        assert_eq!(insights[0].data["savings_rate"], 40.0);
    }

    #[test]
    fn test_moderate_savings_emits_nothing() {
        assert!(run(dec!(1000), dec!(800)).is_empty());
        // Boundaries are exclusive
        assert!(run(dec!(1000), dec!(900)).is_empty());
        assert!(run(dec!(1000), dec!(700)).is_empty());
    }

    #[test]
    fn test_thresholds_compare_unrounded_rate() {
        // 9.996% displays as 10.0% but is still below the floor
        let insights = run(dec!(100000), dec!(90004));
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].title, "Low Savings Rate");
        assert_eq!(insights[0].data["savings_rate"], 10.0);

        // 30.004% displays as 30.0% but is above the ceiling
        let insights = run(dec!(100000), dec!(69996));
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].title, "Excellent Savings Rate");
    }

    #[test]
    fn test_no_income_emits_nothing() {
        assert!(run(Decimal::ZERO, dec!(500)).is_empty());
    }

    #[test]
    fn test_overspending_is_low_savings() {
        let insights = run(dec!(1000), dec!(1200));
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].data["savings_rate"], -20.0);
    }
}
