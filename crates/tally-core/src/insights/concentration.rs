//! Category Concentration
//!
//! Flags the category taking the largest share of expenses when that share
//! exceeds 30%.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::Result;
use crate::models::round_money;

use super::engine::{AnalysisContext, Analyzer};
use super::types::{Insight, InsightType, Signal};

const MIN_SHARE_PERCENT: Decimal = dec!(30);

pub struct ConcentrationAnalyzer;

impl Analyzer for ConcentrationAnalyzer {
    fn insight_type(&self) -> InsightType {
        InsightType::CategoryConcentration
    }

    fn name(&self) -> &'static str {
        "Category Concentration"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Insight>> {
        let mut by_category: BTreeMap<&str, Decimal> = BTreeMap::new();
        for tx in ctx.expenses_in(ctx.general_window()) {
            *by_category.entry(tx.category.as_str()).or_default() += tx.amount;
        }

        let total: Decimal = by_category.values().copied().sum();
        if total.is_zero() {
            return Ok(vec![]);
        }

        // Ordered by name, so the first of equal maxima wins
        let Some((category, amount)) = by_category
            .iter()
            .fold(None, |best: Option<(&str, Decimal)>, (name, amount)| match best {
                Some((_, best_amount)) if best_amount >= *amount => best,
                _ => Some((*name, *amount)),
            })
        else {
            return Ok(vec![]);
        };

        let exact = amount / total * Decimal::ONE_HUNDRED;
        if exact <= MIN_SHARE_PERCENT {
            return Ok(vec![]);
        }
        let share = round_money(exact);

        let share_f64 = share.to_f64().unwrap_or_default();
        let insight = Insight::from_signal(
            ctx.owner_id,
            Signal::Concentration {
                share_percent: share_f64,
            },
            "Spending Concentration",
            format!(
                "{} accounts for {:.1}% of your spending (${:.2} of ${:.2}).",
                category, share, amount, total
            ),
            ctx.now,
        )
        .with_category(category)
        .with_data(serde_json::json!({
            "category": category,
            "amount": amount.to_f64(),
            "total": total.to_f64(),
            "share_percent": share_f64,
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
    use crate::models::TransactionKind;
    use crate::test_utils::{snapshot_tx, utc};

    fn run(expenses: &[(&str, Decimal)]) -> Vec<Insight> {
        let transactions = expenses
            .iter()
            .enumerate()
            .map(|(i, (category, amount))| {
                snapshot_tx(i as i64, TransactionKind::Expense, category, *amount, utc(2024, 6, 1))
            })
            .collect();
        let snapshot = Snapshot {
            transactions,
            budgets: vec![],
        };
        let config = InsightConfig::default();
        let ctx = AnalysisContext::new(1, utc(2024, 6, 15), &snapshot, &config);
        ConcentrationAnalyzer.analyze(&ctx).unwrap()
    }

    #[test]
    fn test_dominant_category() {
        let insights = run(&[
            ("Rent", dec!(600)),
            ("Food", dec!(200)),
            ("Travel", dec!(100)),
            ("Food", dec!(100)),
        ]);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].category.as_deref(), Some("Rent"));
        assert_eq!(insights[0].data["share_percent"], 60.0);
        assert_eq!(insights[0].impact, Impact::High);
    }

    #[test]
    fn test_spread_spending_emits_nothing() {
        let insights = run(&[
            ("A", dec!(25)),
            ("B", dec!(25)),
            ("C", dec!(25)),
            ("D", dec!(25)),
        ]);
        assert!(insights.is_empty());
    }

    #[test]
    fn test_tie_broken_by_name() {
        let insights = run(&[("Travel", dec!(100)), ("Food", dec!(100))]);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].category.as_deref(), Some("Food"));
        assert_eq!(insights[0].impact, Impact::Medium);
    }

    #[test]
    fn test_share_just_over_threshold_is_flagged() {
        // 30.004% rounds to 30.00 for display only
        let insights = run(&[
            ("Food", dec!(30004)),
            ("Rent", dec!(29998)),
            ("Travel", dec!(29998)),
            ("Misc", dec!(10000)),
        ]);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].category.as_deref(), Some("Food"));
        assert_eq!(insights[0].data["share_percent"], 30.0);
    }

    #[test]
    fn test_no_expenses() {
        assert!(run(&[]).is_empty());
    }
}
