//! Risk capacity value object
//!
//! The risk manager does not forecast price. It reports how much room is left
//! under the per-ticker position limit. That answer is kept in its own type so
//! it cannot be mistaken for a directional vote; the fusion engine converts it
//! explicitly through [`RiskCapacity::as_direction`].

use crate::domain::signal::{Confidence, Direction, Rationale, Signal};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remaining position headroom, bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadroomLevel {
    /// Plenty of room left: low risk already committed.
    High,
    Moderate,
    /// Little room left: high risk already committed.
    Low,
    /// Capacity could not be assessed.
    Unknown,
}

impl HeadroomLevel {
    /// Buckets `headroom_fraction` (max position value / total portfolio value).
    pub fn classify(headroom_fraction: f64, high_threshold: f64, moderate_threshold: f64) -> Self {
        if !headroom_fraction.is_finite() {
            HeadroomLevel::Unknown
        } else if headroom_fraction > high_threshold {
            HeadroomLevel::High
        } else if headroom_fraction > moderate_threshold {
            HeadroomLevel::Moderate
        } else {
            HeadroomLevel::Low
        }
    }

    /// High headroom reads as bullish, low headroom as bearish.
    pub fn as_direction(self) -> Direction {
        match self {
            HeadroomLevel::High => Direction::Bullish,
            HeadroomLevel::Low => Direction::Bearish,
            HeadroomLevel::Moderate | HeadroomLevel::Unknown => Direction::Neutral,
        }
    }

    pub fn confidence(self) -> Confidence {
        match self {
            HeadroomLevel::High => Confidence::new(80.0),
            HeadroomLevel::Moderate => Confidence::new(60.0),
            HeadroomLevel::Low => Confidence::new(70.0),
            HeadroomLevel::Unknown => Confidence::ZERO,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HeadroomLevel::High => "high",
            HeadroomLevel::Moderate => "moderate",
            HeadroomLevel::Low => "low",
            HeadroomLevel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HeadroomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCapacity {
    pub level: HeadroomLevel,
    pub confidence: Confidence,
    /// `max_position_value / total_portfolio_value`
    pub headroom_fraction: f64,
    /// Dollar amount still purchasable for this ticker.
    pub max_position_value: Decimal,
    /// Whole shares purchasable at `current_price`; the risk-adjusted position limit.
    pub max_shares: Option<u64>,
    pub current_price: Option<f64>,
    pub rationale: Rationale,
}

impl RiskCapacity {
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            level: HeadroomLevel::Unknown,
            confidence: Confidence::ZERO,
            headroom_fraction: 0.0,
            max_position_value: Decimal::ZERO,
            max_shares: None,
            current_price: None,
            rationale: Rationale::Text(reason.into()),
        }
    }

    pub fn as_direction(&self) -> Direction {
        self.level.as_direction()
    }

    /// Converts capacity into a consensus vote with the level's direction.
    pub fn as_consensus_signal(&self) -> Signal {
        Signal::new(self.as_direction(), self.confidence, self.rationale.clone())
    }
}
