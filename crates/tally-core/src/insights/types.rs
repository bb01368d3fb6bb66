//! Core types for the Insight Engine

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Types of insights that can be generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    /// Month-over-month expense change
    Trend,
    /// Share of income kept over the window
    SavingsRate,
    /// One category dominating expenses
    CategoryConcentration,
    /// Unusually large transaction for its category
    Anomaly,
    /// Budget close to its limit
    BudgetPressure,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::Trend => "trend",
            InsightType::SavingsRate => "savings_rate",
            InsightType::CategoryConcentration => "category_concentration",
            InsightType::Anomaly => "anomaly",
            InsightType::BudgetPressure => "budget_pressure",
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trend" => Ok(InsightType::Trend),
            "savings_rate" => Ok(InsightType::SavingsRate),
            "category_concentration" => Ok(InsightType::CategoryConcentration),
            "anomaly" => Ok(InsightType::Anomaly),
            "budget_pressure" => Ok(InsightType::BudgetPressure),
            _ => Err(Error::InvalidData(format!("Unknown insight type: {}", s))),
        }
    }
}

/// How much an insight matters to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Low => "low",
            Impact::Medium => "medium",
            Impact::High => "high",
        }
    }

    /// Numeric priority for sorting (higher = more important)
    pub fn priority(&self) -> u8 {
        match self {
            Impact::Low => 1,
            Impact::Medium => 2,
            Impact::High => 3,
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Impact {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Impact::Low),
            "medium" => Ok(Impact::Medium),
            "high" => Ok(Impact::High),
            _ => Err(Error::InvalidData(format!("Unknown impact: {}", s))),
        }
    }
}

/// What an analyzer observed, with the magnitude that drives scoring
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    Trend { change_percent: f64 },
    LowSavings,
    HighSavings,
    Concentration { share_percent: f64 },
    BudgetPressure { used_percent: f64 },
    Anomaly { z_score: f64 },
}

impl Signal {
    pub fn insight_type(&self) -> InsightType {
        match self {
            Signal::Trend { .. } => InsightType::Trend,
            Signal::LowSavings | Signal::HighSavings => InsightType::SavingsRate,
            Signal::Concentration { .. } => InsightType::CategoryConcentration,
            Signal::BudgetPressure { .. } => InsightType::BudgetPressure,
            Signal::Anomaly { .. } => InsightType::Anomaly,
        }
    }

    /// Fixed confidence/impact table
    pub fn score(&self) -> (f64, Impact) {
        match *self {
            Signal::Trend { change_percent } if change_percent.abs() > 30.0 => (0.85, Impact::High),
            Signal::Trend { .. } => (0.85, Impact::Medium),
            Signal::LowSavings => (0.9, Impact::High),
            Signal::HighSavings => (0.95, Impact::Low),
            Signal::Concentration { share_percent } if share_percent > 50.0 => {
                (0.8, Impact::High)
            }
            Signal::Concentration { .. } => (0.8, Impact::Medium),
            Signal::BudgetPressure { .. } => (0.95, Impact::High),
            Signal::Anomaly { z_score } if z_score >= 3.0 => (0.85, Impact::High),
            Signal::Anomaly { .. } => (0.75, Impact::Medium),
        }
    }

    /// Whether the user can act on it
    pub fn actionable(&self) -> bool {
        match *self {
            Signal::Trend { change_percent } => change_percent.abs() > 20.0,
            Signal::HighSavings => false,
            _ => true,
        }
    }
}

/// A generated insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub owner_id: i64,
    pub insight_type: InsightType,
    /// Short title (e.g., "Spending Trend")
    pub title: String,
    pub message: String,
    /// In [0, 1]
    pub confidence: f64,
    pub impact: Impact,
    pub actionable: bool,
    pub category: Option<String>,
    /// Insight-specific structured data
    pub data: serde_json::Value,
    pub generated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Insight {
    /// Create an insight scored from `signal`
    pub fn from_signal(
        owner_id: i64,
        signal: Signal,
        title: impl Into<String>,
        message: impl Into<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let (confidence, impact) = signal.score();
        Self {
            owner_id,
            insight_type: signal.insight_type(),
            title: title.into(),
            message: message.into(),
            confidence,
            impact,
            actionable: signal.actionable(),
            category: None,
            data: serde_json::Value::Null,
            generated_at,
            expires_at: None,
        }
    }

    /// Add structured data payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Expire `days` after generation
    pub fn expiring_after(mut self, days: u32) -> Self {
        self.expires_at = Some(self.generated_at + Duration::days(i64::from(days)));
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insight_type_round_trip_names() {
        assert_eq!(InsightType::SavingsRate.as_str(), "savings_rate");
        assert_eq!(
            InsightType::from_str("category_concentration").unwrap(),
            InsightType::CategoryConcentration
        );
        assert!(InsightType::from_str("forecast").is_err());
    }

    #[test]
    fn test_impact_priority() {
        assert!(Impact::High.priority() > Impact::Medium.priority());
        assert!(Impact::Medium.priority() > Impact::Low.priority());
    }

    #[test]
    fn test_score_table() {
        assert_eq!(
            Signal::Trend { change_percent: -35.0 }.score(),
            (0.85, Impact::High)
        );
        assert_eq!(
            Signal::Trend { change_percent: 15.0 }.score(),
            (0.85, Impact::Medium)
        );
        assert_eq!(Signal::HighSavings.score().1, Impact::Low);
        assert_eq!(Signal::Anomaly { z_score: 2.0 }.score(), (0.75, Impact::Medium));
        assert_eq!(Signal::Anomaly { z_score: 3.5 }.score().1, Impact::High);

        for signal in [
            Signal::LowSavings,
            Signal::Concentration { share_percent: 80.0 },
            Signal::BudgetPressure { used_percent: 95.0 },
        ] {
            let (confidence, _) = signal.score();
            assert!((0.0..=1.0).contains(&confidence));
        }
    }

    #[test]
    fn test_builder_and_expiry() {
        let now = Utc::now();
        let insight = Insight::from_signal(7, Signal::LowSavings, "Low Savings Rate", "msg", now)
            .with_category("Food")
            .with_data(serde_json::json!({"savings_rate": 5.0}))
            .expiring_after(7);

        assert_eq!(insight.insight_type, InsightType::SavingsRate);
        assert!(insight.actionable);
        assert_eq!(insight.data["savings_rate"], 5.0);
        assert!(!insight.is_expired(now));
        assert!(insight.is_expired(now + Duration::days(7)));
    }
}
