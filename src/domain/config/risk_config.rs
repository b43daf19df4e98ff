//! Risk Limits Domain Value Object
//!
//! Position headroom parameters used by the risk manager agent.

use crate::domain::errors::ConfigError;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// Per-ticker position limits
///
/// # Invariants
///
/// - All fractions are in (0.0, 1.0]
/// - `moderate_headroom_pct` < `high_headroom_pct`
#[derive(Debug, Clone, PartialEq)]
pub struct RiskLimits {
    /// Largest share of total portfolio value one ticker may occupy (e.g. 0.20 = 20%)
    pub max_position_pct: f64,

    /// Headroom above this fraction of the portfolio counts as high
    pub high_headroom_pct: f64,

    /// Headroom above this fraction (and not high) counts as moderate
    pub moderate_headroom_pct: f64,
}

impl RiskLimits {
    pub fn new(
        max_position_pct: f64,
        high_headroom_pct: f64,
        moderate_headroom_pct: f64,
    ) -> Result<Self, ConfigError> {
        let limits = Self {
            max_position_pct,
            high_headroom_pct,
            moderate_headroom_pct,
        };
        limits.validate()?;
        Ok(limits)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_fraction("max_position_pct", self.max_position_pct)?;
        self.validate_fraction("high_headroom_pct", self.high_headroom_pct)?;
        self.validate_fraction("moderate_headroom_pct", self.moderate_headroom_pct)?;

        if self.moderate_headroom_pct >= self.high_headroom_pct {
            return Err(ConfigError::InvalidValue {
                field: "moderate_headroom_pct".to_string(),
                value: self.moderate_headroom_pct.to_string(),
                reason: format!("Must be below high_headroom_pct ({})", self.high_headroom_pct),
            });
        }
        Ok(())
    }

    fn validate_fraction(&self, field: &str, value: f64) -> Result<(), ConfigError> {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason: "Must be between 0.0 (exclusive) and 1.0".to_string(),
            });
        }
        Ok(())
    }

    /// `max_position_pct` as a Decimal for money arithmetic, to 6 places
    pub fn max_position_decimal(&self) -> Decimal {
        Decimal::from_f64(self.max_position_pct)
            .map(|d| d.round_dp(6))
            .unwrap_or(Decimal::ZERO)
    }
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_pct: 0.20,
            high_headroom_pct: 0.15,
            moderate_headroom_pct: 0.10,
        }
    }
}
