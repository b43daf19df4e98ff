//! Configuration module for Fusiontrade.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Cycle, Fusion, Risk, Ensemble, Simulation and Observability.
//!
//! `Config` is built once at startup and passed by handle into every component;
//! nothing reads settings from a global after that.

mod cycle_config;
mod ensemble_config;
mod fusion_env_config;
mod observability_config;
mod risk_env_config;
mod simulation_config;

pub use cycle_config::CycleEnvConfig;
pub use ensemble_config::EnsembleEnvConfig;
pub use fusion_env_config::FusionEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use risk_env_config::RiskEnvConfig;
pub use simulation_config::SimulationEnvConfig;

use crate::domain::config::{FusionConfig, RiskLimits};
use crate::domain::validation::symbols::normalize_symbols;
use anyhow::{Context, Result};
use std::env;

/// One hundred years of daily history.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub cycle: CycleEnvConfig,
    pub fusion: FusionEnvConfig,
    pub risk: RiskEnvConfig,
    pub ensemble: EnsembleEnvConfig,
    pub simulation: SimulationEnvConfig,
    pub observability: ObservabilityEnvConfig,
    pub database_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cycle: CycleEnvConfig::default(),
            fusion: FusionEnvConfig::default(),
            risk: RiskEnvConfig::default(),
            ensemble: EnsembleEnvConfig::default(),
            simulation: SimulationEnvConfig::default(),
            observability: ObservabilityEnvConfig::default(),
            database_url: "sqlite://fusiontrade.db".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Any parse or validation failure here is fatal: the cycle loop never
    /// starts with a half-valid configuration.
    pub fn from_env() -> Result<Self> {
        let cycle = CycleEnvConfig::from_env().context("Failed to load cycle config")?;
        let fusion = FusionEnvConfig::from_env().context("Failed to load fusion config")?;
        let risk = RiskEnvConfig::from_env().context("Failed to load risk config")?;
        let ensemble = EnsembleEnvConfig::from_env();
        let simulation = SimulationEnvConfig::from_env();
        let observability = ObservabilityEnvConfig::from_env();
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://fusiontrade.db".to_string());

        let config = Self {
            cycle,
            fusion,
            risk,
            ensemble,
            simulation,
            observability,
            database_url,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every cross-field invariant.
    pub fn validate(&self) -> Result<()> {
        normalize_symbols(&self.cycle.tickers).context("Invalid ticker list")?;
        self.to_fusion_config()?;
        self.to_risk_limits()?;
        if self.cycle.lookback_days <= 0 || self.cycle.lookback_days > MAX_LOOKBACK_DAYS {
            anyhow::bail!(
                "Invalid LOOKBACK_DAYS: {}. Must be between 1 and {}",
                self.cycle.lookback_days,
                MAX_LOOKBACK_DAYS
            );
        }
        Ok(())
    }

    /// Create the FusionConfig domain value object from this Config
    pub fn to_fusion_config(&self) -> Result<FusionConfig> {
        FusionConfig::new(
            self.fusion.base_quantity,
            self.fusion.max_quantity,
            self.fusion.confidence_threshold,
            self.fusion.risk_multiplier_low,
            self.fusion.risk_multiplier_high,
            self.fusion.decision_history_size,
        )
        .map_err(|e| anyhow::anyhow!("Invalid fusion config: {}", e))
    }

    /// Create the RiskLimits domain value object from this Config
    pub fn to_risk_limits(&self) -> Result<RiskLimits> {
        RiskLimits::new(
            self.risk.max_position_percent,
            self.risk.high_headroom_pct,
            self.risk.moderate_headroom_pct,
        )
        .map_err(|e| anyhow::anyhow!("Invalid risk config: {}", e))
    }
}
