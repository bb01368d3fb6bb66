//! Runtime configuration
//!
//! Config is resolved in three layers:
//! 1. Embedded defaults (`config/tally.toml`, compiled into the binary)
//! 2. An override file (`--config`, else ~/.local/share/tally/config.toml),
//!    which replaces the embedded file when present
//! 3. `TALLY_*` environment variables

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{validate_thresholds, DEFAULT_THRESHOLDS};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/tally.toml");

/// Insight engine and batch settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub general_window_days: u32,
    pub trend_window_days: u32,
    pub anomaly_window_days: u32,
    pub anomaly_z_threshold: Decimal,
    pub anomaly_min_excess_ratio: Decimal,
    pub expiry_days: u32,
    pub max_concurrency: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            general_window_days: 90,
            trend_window_days: 180,
            anomaly_window_days: 30,
            anomaly_z_threshold: dec!(2),
            anomaly_min_excess_ratio: dec!(0.25),
            expiry_days: 7,
            max_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Used for budgets created without explicit thresholds
    pub default_thresholds: Vec<Decimal>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            default_thresholds: DEFAULT_THRESHOLDS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub dispatch_timeout_secs: u64,
    pub deliver_insights: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_secs: 5,
            deliver_insights: true,
        }
    }
}

impl NotificationConfig {
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}

/// Cadence of each scheduled work unit
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub reconcile_interval_minutes: u64,
    pub insight_interval_hours: u64,
    pub summary_interval_hours: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_minutes: 60,
            insight_interval_hours: 24,
            summary_interval_hours: 168,
        }
    }
}

/// Remote insight service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub service_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            timeout_secs: 10,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub insights: InsightConfig,
    pub alerts: AlertConfig,
    pub notifications: NotificationConfig,
    pub scheduler: SchedulerConfig,
    pub provider: ProviderConfig,
}

impl TallyConfig {
    /// Load config (override file first, then embedded default), then apply
    /// environment overrides
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let content = match override_path
            .map(Path::to_path_buf)
            .or_else(default_config_path)
        {
            Some(path) if path.exists() => fs::read_to_string(&path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?,
            _ => DEFAULT_CONFIG.to_string(),
        };

        let mut config = Self::parse(&content)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse config from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))
    }

    /// Apply `TALLY_*` overrides read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("TALLY_INSIGHT_SERVICE_URL") {
            let url = url.trim().to_string();
            self.provider.service_url = (!url.is_empty()).then_some(url);
        }
        if let Some(value) = lookup("TALLY_DISPATCH_TIMEOUT_SECS") {
            self.notifications.dispatch_timeout_secs =
                parse_env("TALLY_DISPATCH_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("TALLY_RECONCILE_MINUTES") {
            self.scheduler.reconcile_interval_minutes =
                parse_env("TALLY_RECONCILE_MINUTES", &value)?;
        }
        if let Some(value) = lookup("TALLY_INSIGHT_HOURS") {
            self.scheduler.insight_interval_hours = parse_env("TALLY_INSIGHT_HOURS", &value)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        validate_thresholds(self.alerts.default_thresholds.clone())
            .map_err(|e| Error::Config(e.to_string()))?;

        if self.insights.max_concurrency == 0 {
            return Err(Error::Config(
                "insights.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.insights.anomaly_z_threshold <= Decimal::ZERO {
            return Err(Error::Config(
                "insights.anomaly_z_threshold must be positive".to_string(),
            ));
        }
        let intervals = [
            self.scheduler.reconcile_interval_minutes,
            self.scheduler.insight_interval_hours,
            self.scheduler.summary_interval_hours,
        ];
        if intervals.contains(&0) {
            return Err(Error::Config(
                "scheduler intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a whole number, got {:?}", key, value)))
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_default_config() {
        let config = TallyConfig::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, TallyConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = TallyConfig::parse(
            r#"
            [insights]
            general_window_days = 60

            [provider]
            service_url = "http://insights.local"
            "#,
        )
        .unwrap();
        assert_eq!(config.insights.general_window_days, 60);
        assert_eq!(config.insights.trend_window_days, 180);
        assert_eq!(config.provider.service_url.as_deref(), Some("http://insights.local"));
        assert_eq!(config.scheduler, SchedulerConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_INSIGHT_SERVICE_URL", "http://remote:8001"),
            ("TALLY_DISPATCH_TIMEOUT_SECS", "2"),
            ("TALLY_RECONCILE_MINUTES", "15"),
        ]
        .into_iter()
        .collect();

        let mut config = TallyConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.provider.service_url.as_deref(), Some("http://remote:8001"));
        assert_eq!(config.notifications.dispatch_timeout(), Duration::from_secs(2));
        assert_eq!(config.scheduler.reconcile_interval_minutes, 15);
        assert_eq!(config.scheduler.insight_interval_hours, 24);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = TallyConfig::default();
        let err = config
            .apply_env(|key| (key == "TALLY_INSIGHT_HOURS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validation() {
        let mut config = TallyConfig::default();
        config.alerts.default_thresholds = vec![dec!(90), dec!(70)];
        assert!(config.validate().is_err());

        let mut config = TallyConfig::default();
        config.insights.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = TallyConfig::default();
        config.scheduler.summary_interval_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        fs::write(&path, "[notifications]\ndispatch_timeout_secs = 9\n").unwrap();

        let config = TallyConfig::load(Some(&path)).unwrap();
        assert_eq!(config.notifications.dispatch_timeout_secs, 9);
    }
}
