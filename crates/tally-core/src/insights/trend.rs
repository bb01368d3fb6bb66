//! Spending Trend
//!
//! Compares total expenses of the last completed calendar month with the
//! month before it.

use chrono::Duration;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::Result;
use crate::models::round_money;
use crate::period::{month_start, Period};

use super::engine::{AnalysisContext, Analyzer};
use super::types::{Insight, InsightType, Signal};

/// Minimum month-over-month change worth reporting, in percent
const MIN_CHANGE_PERCENT: Decimal = dec!(10);

pub struct TrendAnalyzer;

impl TrendAnalyzer {
    /// The last two completed months before `ctx.now`, oldest first
    fn months(ctx: &AnalysisContext<'_>) -> (Period, Period) {
        let current_start = month_start(ctx.now);
        let last_start = month_start(current_start - Duration::milliseconds(1));
        let previous_start = month_start(last_start - Duration::milliseconds(1));
        (
            Period::new(previous_start, last_start),
            Period::new(last_start, current_start),
        )
    }
}

impl Analyzer for TrendAnalyzer {
    fn insight_type(&self) -> InsightType {
        InsightType::Trend
    }

    fn name(&self) -> &'static str {
        "Spending Trend"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Insight>> {
        let (previous, last) = Self::months(ctx);
        if previous.start < ctx.trend_window().start {
            return Ok(vec![]);
        }

        let previous_total: Decimal = ctx.expenses_in(previous).map(|tx| tx.amount).sum();
        let last_total: Decimal = ctx.expenses_in(last).map(|tx| tx.amount).sum();
        if previous_total.is_zero() {
            return Ok(vec![]);
        }

        let change = (last_total - previous_total) / previous_total * Decimal::ONE_HUNDRED;
        if change.abs() <= MIN_CHANGE_PERCENT {
            return Ok(vec![]);
        }

        let change = round_money(change);
        let direction = if change > Decimal::ZERO {
            "increased"
        } else {
            "decreased"
        };
        let signal = Signal::Trend {
            change_percent: change.to_f64().unwrap_or_default(),
        };

        let insight = Insight::from_signal(
            ctx.owner_id,
            signal,
            "Spending Trend",
            format!(
                "Your spending {} by {:.1}% in {} compared to {} (${:.2} vs ${:.2}).",
                direction,
                change.abs(),
                last.start.format("%B"),
                previous.start.format("%B"),
                last_total,
                previous_total
            ),
            ctx.now,
        )
        .with_data(serde_json::json!({
            "current_month": last.start.format("%Y-%m").to_string(),
            "current_total": last_total.to_f64(),
            "previous_month": previous.start.format("%Y-%m").to_string(),
            "previous_total": previous_total.to_f64(),
            "change_percent": change.to_f64(),
        }));

        Ok(vec![insight])
    }
}
