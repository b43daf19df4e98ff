//! Decision fusion configuration parsing from environment variables.
//!
//! This module handles loading order sizing, risk multipliers and the
//! execution confidence threshold.

use crate::domain::config::FusionConfig;
use anyhow::{Context, Result};
use std::env;

/// Fusion environment configuration
#[derive(Debug, Clone)]
pub struct FusionEnvConfig {
    pub base_quantity: u64,
    pub max_quantity: u64,
    pub confidence_threshold: f64,
    /// Applied when risk is low (high headroom)
    pub risk_multiplier_low: f64,
    /// Applied when risk is high (low headroom)
    pub risk_multiplier_high: f64,
    pub decision_history_size: usize,
}

impl Default for FusionEnvConfig {
    fn default() -> Self {
        let defaults = FusionConfig::default();
        Self {
            base_quantity: defaults.base_quantity,
            max_quantity: defaults.max_quantity,
            confidence_threshold: defaults.confidence_threshold,
            risk_multiplier_low: defaults.high_headroom_multiplier,
            risk_multiplier_high: defaults.low_headroom_multiplier,
            decision_history_size: defaults.history_size,
        }
    }
}

impl FusionEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_quantity: Self::parse_u64("BASE_QUANTITY", 100)?,
            max_quantity: Self::parse_u64("MAX_QUANTITY", 500)?,
            confidence_threshold: Self::parse_f64("CONFIDENCE_THRESHOLD", 60.0)?,
            risk_multiplier_low: Self::parse_f64("RISK_MULTIPLIER_LOW", 1.2)?,
            risk_multiplier_high: Self::parse_f64("RISK_MULTIPLIER_HIGH", 0.5)?,
            decision_history_size: Self::parse_usize("DECISION_HISTORY_SIZE", 100)?,
        })
    }

    fn parse_u64(key: &str, default: u64) -> Result<u64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<u64>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_f64(key: &str, default: f64) -> Result<f64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<f64>()
            .context(format!("Failed to parse {}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fusion_config_defaults() {
        let config = FusionEnvConfig::from_env().expect("Should parse with defaults");
        assert_eq!(config.base_quantity, 100);
        assert_eq!(config.max_quantity, 500);
        assert_eq!(config.confidence_threshold, 60.0);
        assert_eq!(config.risk_multiplier_low, 1.2);
        assert_eq!(config.risk_multiplier_high, 0.5);
    }
}
