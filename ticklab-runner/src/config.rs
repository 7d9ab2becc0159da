//! Serializable backtest configuration.
//!
//! One TOML file carries everything a run needs:
//! - `[entry]`: hard filters and the ordered `[[entry.conditions]]` list
//! - `[exit]`: exit rule parameters, optional rules switched by `enabled`
//! - `[execution]`: fill delays, sizing, fees
//! - `[analytics]`: outlier ceiling for trimmed averages
//!
//! Every field has a default, so an empty file is a valid configuration.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ticklab_core::analytics::{AnalyticsConfig, DEFAULT_OUTLIER_CEILING};
use ticklab_core::components::{Bounds, ConditionKind, EntryConfig, ExitConfig};
use ticklab_core::engine::{EngineConfig, ExecutionConfig};

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Records with a profit rate at or above this are left out of averages.
    pub outlier_ceiling: f64,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            outlier_ceiling: DEFAULT_OUTLIER_CEILING,
        }
    }
}

/// Complete configuration for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub entry: EntryConfig,
    pub exit: ExitConfig,
    pub execution: ExecutionConfig,
    pub analytics: AnalyticsSettings,
}

impl BacktestConfig {
    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deterministic content hash (blake3 over the JSON encoding).
    ///
    /// Two configurations with the same hash produce identical runs on the
    /// same tapes.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    /// First 12 hex characters of the hash, used for directory names.
    pub fn short_hash(&self) -> String {
        self.config_hash()[..12].to_string()
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig::new(self.entry.clone(), self.exit.clone(), self.execution.clone())
    }

    pub fn analytics_config(&self) -> AnalyticsConfig {
        AnalyticsConfig::from_entry(&self.entry, self.analytics.outlier_ceiling)
    }

    /// Reject parameter sets the engine cannot interpret.
    ///
    /// Bad bucket lists are not errors here; the aggregator drops them with a
    /// warning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let hard = &self.entry.hard;
        check_bounds("entry.hard.market_cap", hard.market_cap)?;
        check_bounds("entry.hard.trade_amount", hard.trade_amount)?;
        check_bounds("entry.hard.trailing_sum.range", hard.trailing_sum.range)?;

        let mut names = BTreeSet::new();
        for (i, spec) in self.entry.conditions.iter().enumerate() {
            if !names.insert(spec.name()) {
                return Err(ConfigError::Invalid(format!(
                    "entry.conditions.{i}: duplicate condition name '{}'",
                    spec.name()
                )));
            }
            if let Some(range) = spec.kind.range() {
                check_bounds(&format!("entry.conditions.{i}.range"), range)?;
            }
            if let ConditionKind::RecentTradeCount { window_seconds, .. } = spec.kind {
                if window_seconds < 0 {
                    return Err(ConfigError::Invalid(format!(
                        "entry.conditions.{i}.window_seconds must not be negative"
                    )));
                }
            }
        }

        if self.exit.retracement.inflection_window == 0 {
            return Err(ConfigError::Invalid(
                "exit.retracement.inflection_window must be at least 1".into(),
            ));
        }
        if self.exit.retracement.low > self.exit.retracement.high {
            return Err(ConfigError::Invalid(
                "exit.retracement.low must not exceed exit.retracement.high".into(),
            ));
        }

        let exec = &self.execution;
        if exec.buy_delay_ms < 0 || exec.sell_delay_ms < 0 {
            return Err(ConfigError::Invalid("execution delays must not be negative".into()));
        }
        if !(0.0..1.0).contains(&exec.fee_rate) {
            return Err(ConfigError::Invalid(format!(
                "execution.fee_rate must be in [0, 1), got {}",
                exec.fee_rate
            )));
        }
        if exec.min_size_sol <= 0.0 {
            return Err(ConfigError::Invalid("execution.min_size_sol must be positive".into()));
        }

        if self.analytics.outlier_ceiling.is_nan() {
            return Err(ConfigError::Invalid("analytics.outlier_ceiling is NaN".into()));
        }
        Ok(())
    }
}

fn check_bounds(field: &str, bounds: Bounds) -> Result<(), ConfigError> {
    if bounds.is_valid() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field}: expected [min, max] with min <= max, got [{}, {}]",
            bounds.min(),
            bounds.max()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticklab_core::components::{ConditionMode, TradeDirection};

    #[test]
    fn empty_file_is_default() {
        let config = BacktestConfig::from_toml_str("").unwrap();
        assert_eq!(config, BacktestConfig::default());
        assert_eq!(config.entry.conditions.len(), 14);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let text = r#"
            [entry.hard]
            market_cap = [120, 200]
            direction = "both"

            [exit.sell_pressure]
            enabled = true
            lookback = 5

            [execution]
            buy_delay_ms = 0
        "#;
        let config = BacktestConfig::from_toml_str(text).unwrap();
        assert_eq!(config.entry.hard.market_cap, Bounds(120.0, 200.0));
        assert_eq!(config.entry.hard.direction, TradeDirection::Both);
        assert_eq!(config.entry.hard.trade_amount, Bounds(4.0, 15.0));
        assert!(config.exit.sell_pressure.enabled);
        assert_eq!(config.exit.sell_pressure.lookback, 5);
        assert_eq!(config.exit.sell_pressure.sum_threshold, -20.0);
        assert!(config.exit.spike.enabled);
        assert_eq!(config.execution.buy_delay_ms, 0);
        assert_eq!(config.execution.sell_delay_ms, 200);
    }

    #[test]
    fn conditions_array_replaces_defaults() {
        let text = r#"
            [[entry.conditions]]
            type = "BUY_COUNT"
            mode = "online"
            lookback = 10
            min = 4

            [[entry.conditions]]
            type = "PRICE_RATIO"
            name = "ratio_short"
            lookback = 5
            range = [0.0, 2.0]
            buckets = [0, 1, 2]
        "#;
        let config = BacktestConfig::from_toml_str(text).unwrap();
        let conditions = &config.entry.conditions;
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].mode, ConditionMode::Online);
        assert_eq!(conditions[1].mode, ConditionMode::Off);
        assert_eq!(conditions[1].name(), "ratio_short");
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = BacktestConfig::from_toml_str("[entry.hard]\nmarket_cap = [250, 100]")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("market_cap")));
    }

    #[test]
    fn duplicate_condition_names_are_rejected() {
        let text = r#"
            [[entry.conditions]]
            type = "BUY_COUNT"
            lookback = 10
            min = 4

            [[entry.conditions]]
            type = "BUY_COUNT"
            lookback = 20
            min = 4
        "#;
        assert!(matches!(
            BacktestConfig::from_toml_str(text),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn zero_inflection_window_is_rejected() {
        let text = "[exit.retracement]\ninflection_window = 0";
        assert!(BacktestConfig::from_toml_str(text).is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            BacktestConfig::from_toml_str("[entry\nbroken"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = BacktestConfig::default();
        let text = config.to_toml().unwrap();
        let back = BacktestConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn hash_is_deterministic_and_parameter_sensitive() {
        let a = BacktestConfig::default();
        let mut b = a.clone();
        assert_eq!(a.config_hash(), b.config_hash());
        b.exit.loss_stop.loss_fraction = 0.25;
        assert_ne!(a.config_hash(), b.config_hash());
        assert_eq!(a.short_hash().len(), 12);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = BacktestConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
