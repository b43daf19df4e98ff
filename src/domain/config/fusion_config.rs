//! Fusion Configuration Domain Value Object
//!
//! Sizing and gating parameters for the decision fusion engine. Built once at
//! startup from the environment and handed to the engine and orchestrator by
//! value; nothing reads these settings from a global.

use crate::domain::errors::ConfigError;

/// Decision fusion parameters
///
/// # Invariants
///
/// - `base_quantity` and `max_quantity` are > 0
/// - `confidence_threshold` is within [0, 100]
/// - both risk multipliers are finite and >= 0
/// - `history_size` is > 0
#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    /// Shares traded at 100% confidence and full alignment
    pub base_quantity: u64,

    /// Hard cap applied after risk adjustment
    pub max_quantity: u64,

    /// Decisions at or below this confidence are not executed
    pub confidence_threshold: f64,

    /// Quantity multiplier when the risk manager reports high headroom (low risk)
    pub high_headroom_multiplier: f64,

    /// Quantity multiplier when the risk manager reports low headroom (high risk)
    pub low_headroom_multiplier: f64,

    /// Size of the rolling decision history
    pub history_size: usize,

    /// Count the risk manager's converted capacity as a consensus vote
    pub count_risk_in_consensus: bool,
}

impl FusionConfig {
    pub fn new(
        base_quantity: u64,
        max_quantity: u64,
        confidence_threshold: f64,
        high_headroom_multiplier: f64,
        low_headroom_multiplier: f64,
        history_size: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            base_quantity,
            max_quantity,
            confidence_threshold,
            high_headroom_multiplier,
            low_headroom_multiplier,
            history_size,
            count_risk_in_consensus: true,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_quantity == 0 {
            return Err(invalid("base_quantity", self.base_quantity, "Must be positive"));
        }
        if self.max_quantity == 0 {
            return Err(invalid("max_quantity", self.max_quantity, "Must be positive"));
        }
        if !(0.0..=100.0).contains(&self.confidence_threshold) {
            return Err(invalid(
                "confidence_threshold",
                self.confidence_threshold,
                "Must be between 0 and 100",
            ));
        }
        for (field, value) in [
            ("high_headroom_multiplier", self.high_headroom_multiplier),
            ("low_headroom_multiplier", self.low_headroom_multiplier),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, value, "Must be a non-negative number"));
            }
        }
        if self.history_size == 0 {
            return Err(invalid("history_size", self.history_size, "Must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            base_quantity: 100,
            max_quantity: 500,
            confidence_threshold: 60.0,
            high_headroom_multiplier: 1.2,
            low_headroom_multiplier: 0.5,
            history_size: 100,
            count_risk_in_consensus: true,
        }
    }
}
