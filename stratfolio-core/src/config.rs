//! Allocator configuration.
//!
//! Loaded from TOML with every key optional: a partial file overrides only
//! the keys it names and the rest keep their defaults.

use crate::domain::Cents;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How shifted scores become raw weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// exp(s / T), max-subtracted.
    #[default]
    Softmax,
    /// s / Σs.
    Proportional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocatorConfig {
    /// Smallest accepted capital, in dollars.
    pub min_capital: f64,

    /// Minimum weight every eligible ticker receives.
    pub floor_fraction: f64,

    /// Trading days of history to score.
    pub lookback_days: usize,

    pub max_strategies: usize,

    pub normalization: Normalization,

    /// Softmax temperature. Ignored for proportional normalization.
    pub temperature: f64,

    /// Scores are shifted so the smallest is at least this.
    pub epsilon: f64,

    pub bias_min: f64,
    pub bias_max: f64,

    pub fetch_threads: usize,

    /// Convert dollar amounts to whole shares at the last close.
    pub compute_shares: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            min_capital: 5000.0,
            floor_fraction: 0.05,
            lookback_days: 5,
            max_strategies: 2,
            normalization: Normalization::Softmax,
            temperature: 1.0,
            epsilon: 1e-6,
            bias_min: 0.8,
            bias_max: 1.2,
            fetch_threads: 4,
            compute_shares: true,
        }
    }
}

impl AllocatorConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !self.min_capital.is_finite() || self.min_capital < 0.0 {
            return invalid(format!("min_capital must be >= 0, got {}", self.min_capital));
        }
        if !(self.floor_fraction > 0.0 && self.floor_fraction <= 1.0) {
            return invalid(format!(
                "floor_fraction must be in (0, 1], got {}",
                self.floor_fraction
            ));
        }
        if self.lookback_days == 0 {
            return invalid("lookback_days must be at least 1".into());
        }
        if self.max_strategies == 0 {
            return invalid("max_strategies must be at least 1".into());
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return invalid(format!("temperature must be > 0, got {}", self.temperature));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return invalid(format!("epsilon must be > 0, got {}", self.epsilon));
        }
        if !(self.bias_min.is_finite() && self.bias_max.is_finite())
            || self.bias_min <= 0.0
            || self.bias_min > self.bias_max
        {
            return invalid(format!(
                "bias bounds must satisfy 0 < bias_min <= bias_max, got [{}, {}]",
                self.bias_min, self.bias_max
            ));
        }
        if self.fetch_threads == 0 {
            return invalid("fetch_threads must be at least 1".into());
        }
        Ok(())
    }

    /// Minimum capital in whole cents.
    pub fn min_capital_cents(&self) -> Cents {
        Cents::from_dollars(self.min_capital).unwrap_or(Cents::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AllocatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_capital_cents(), Cents(500_000));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AllocatorConfig::from_toml(
            r#"
            floor_fraction = 0.1
            normalization = "proportional"
            "#,
        )
        .unwrap();
        assert_eq!(config.floor_fraction, 0.1);
        assert_eq!(config.normalization, Normalization::Proportional);
        assert_eq!(config.lookback_days, 5);
        assert_eq!(config.max_strategies, 2);
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(matches!(
            AllocatorConfig::from_toml("floor = 0.1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for text in [
            "floor_fraction = 0.0",
            "floor_fraction = 1.5",
            "lookback_days = 0",
            "temperature = -1.0",
            "bias_min = 1.3",
            "fetch_threads = 0",
        ] {
            assert!(
                matches!(AllocatorConfig::from_toml(text), Err(ConfigError::Invalid(_))),
                "{text} should be invalid"
            );
        }
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stratfolio.toml");
        std::fs::write(&path, "min_capital = 10000.0\ncompute_shares = false\n").unwrap();
        let config = AllocatorConfig::from_file(&path).unwrap();
        assert_eq!(config.min_capital, 10000.0);
        assert!(!config.compute_shares);
    }
}
