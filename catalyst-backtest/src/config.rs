//! Run configuration.
//!
//! Defaults reproduce the standard 30-day horizon with the catalyst on
//! day 20. A TOML file may override any subset of fields.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::RISK_FREE_RATE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for backtest execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Number of simulated days.
    pub days: u32,

    /// Day of the catalyst event; must satisfy 1 < catalyst_day < days.
    pub catalyst_day: u32,

    /// Annualized risk-free rate for the performance statistics.
    pub risk_free_rate: f64,

    /// Floor applied to the simulated close.
    pub min_spot: f64,

    /// Starting level of the benchmark series.
    pub benchmark_base: f64,

    /// Scale of the benchmark's daily move.
    pub benchmark_daily_volatility: f64,

    /// Minimum daily share volume.
    pub base_volume: f64,

    /// Random volume added on top of the base.
    pub volume_range: f64,

    /// Volume multiplier on the catalyst day.
    pub catalyst_volume_multiplier: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            days: 30,
            catalyst_day: 20,
            risk_free_rate: RISK_FREE_RATE,
            min_spot: 1.0,
            benchmark_base: 1000.0,
            benchmark_daily_volatility: 0.03,
            base_volume: 1_000_000.0,
            volume_range: 5_000_000.0,
            catalyst_volume_multiplier: 5.0,
        }
    }
}

impl BacktestConfig {
    /// Load and validate a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.days < 3 {
            return Err(ConfigError::Invalid(format!(
                "days must be at least 3, got {}",
                self.days
            )));
        }
        if self.catalyst_day <= 1 || self.catalyst_day >= self.days {
            return Err(ConfigError::Invalid(format!(
                "catalyst_day {} must lie strictly inside 1..{}",
                self.catalyst_day, self.days
            )));
        }
        if !(self.min_spot > 0.0) {
            return Err(ConfigError::Invalid("min_spot must be positive".to_string()));
        }
        if !(self.benchmark_base > 0.0) {
            return Err(ConfigError::Invalid(
                "benchmark_base must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BacktestConfig::default();
        assert_eq!(config.days, 30);
        assert_eq!(config.catalyst_day, 20);
        assert_eq!(config.risk_free_rate, 0.02);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_override() {
        let config = BacktestConfig::from_toml("days = 45\ncatalyst_day = 30\n").unwrap();
        assert_eq!(config.days, 45);
        assert_eq!(config.catalyst_day, 30);
        assert_eq!(config.benchmark_base, 1000.0);
    }

    #[test]
    fn test_bundled_default_file_matches() {
        let config = BacktestConfig::from_toml(include_str!("../config/default.toml")).unwrap();
        assert_eq!(config, BacktestConfig::default());
    }

    #[test]
    fn test_catalyst_outside_range_rejected() {
        for catalyst_day in [0, 1, 30, 31] {
            let config = BacktestConfig {
                catalyst_day,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            BacktestConfig::from_toml("days = \"thirty\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
