//! Risk management configuration parsing from environment variables.
//!
//! This module handles loading position limits, headroom bands and the
//! starting cash of the simulated portfolio.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::env;

/// Risk management environment configuration
#[derive(Debug, Clone)]
pub struct RiskEnvConfig {
    pub max_position_percent: f64,
    pub high_headroom_pct: f64,
    pub moderate_headroom_pct: f64,
    pub initial_cash: Decimal,
}

impl Default for RiskEnvConfig {
    fn default() -> Self {
        Self {
            max_position_percent: 0.20,
            high_headroom_pct: 0.15,
            moderate_headroom_pct: 0.10,
            initial_cash: Decimal::from(100_000),
        }
    }
}

impl RiskEnvConfig {
    pub fn from_env() -> Result<Self> {
        let initial_cash_f64 = Self::parse_f64("INITIAL_CASH", 100_000.0)?;
        let initial_cash = Decimal::from_f64(initial_cash_f64)
            .context("INITIAL_CASH is not representable as a decimal")?;

        Ok(Self {
            max_position_percent: Self::parse_f64("MAX_POSITION_PERCENT", 0.20)?,
            high_headroom_pct: Self::parse_f64("HIGH_HEADROOM_PCT", 0.15)?,
            moderate_headroom_pct: Self::parse_f64("MODERATE_HEADROOM_PCT", 0.10)?,
            initial_cash,
        })
    }

    fn parse_f64(key: &str, default: f64) -> Result<f64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<f64>()
            .context(format!("Failed to parse {}", key))
    }
}
