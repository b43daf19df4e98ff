use crate::domain::config::FusionConfig;
use crate::domain::decision::Alignment;
use crate::domain::errors::FusionError;
use crate::domain::risk::{HeadroomLevel, RiskCapacity};
use crate::domain::signal::{Confidence, Direction, TradeAction};
use tracing::debug;

/// Sized share count plus a note describing the risk adjustment.
#[derive(Debug, Clone, PartialEq)]
pub struct SizedQuantity {
    pub quantity: u64,
    pub risk_note: String,
}

pub struct SizingEngine;

impl SizingEngine {
    /// Converts a fused signal into a bounded share count.
    ///
    /// Order of operations:
    /// 1. `floor(base * confidence / 100 * alignment multiplier)`
    /// 2. risk adjustment by the risk manager's headroom level, floored
    /// 3. hard cap at `max_quantity`
    /// 4. BUY only: cap at the risk manager's purchasable share count
    pub fn calculate_quantity(
        config: &FusionConfig,
        ticker: &str,
        signal: TradeAction,
        confidence: Confidence,
        alignment: Alignment,
        risk: Option<&RiskCapacity>,
    ) -> Result<SizedQuantity, FusionError> {
        if !signal.is_directional() {
            return Ok(SizedQuantity {
                quantity: 0,
                risk_note: "Risk adjustment: none (holding)".to_string(),
            });
        }

        let base = config.base_quantity as f64
            * (confidence.value() / 100.0)
            * alignment.quantity_multiplier();
        let mut quantity = checked_floor("base_quantity", base)?;

        debug!(
            "SizingEngine: Initial quantity for {} ({} x {:.2}% x {}): {}",
            ticker,
            config.base_quantity,
            confidence.value(),
            alignment.quantity_multiplier(),
            quantity
        );

        let (multiplier, mut risk_note) = match risk.map(|r| (r.level, r.as_direction())) {
            Some((level, Direction::Bullish)) => (
                config.high_headroom_multiplier,
                format!(
                    "Risk adjustment: {} headroom (x{:.2})",
                    level, config.high_headroom_multiplier
                ),
            ),
            Some((level, Direction::Bearish)) => (
                config.low_headroom_multiplier,
                format!(
                    "Risk adjustment: {} headroom (x{:.2})",
                    level, config.low_headroom_multiplier
                ),
            ),
            Some((HeadroomLevel::Unknown, _)) | None => (
                1.0,
                "Risk adjustment: none (risk capacity unavailable)".to_string(),
            ),
            Some((level, Direction::Neutral)) => {
                (1.0, format!("Risk adjustment: none ({} headroom)", level))
            }
        };

        if multiplier != 1.0 {
            let before = quantity;
            quantity = checked_floor("risk_adjusted_quantity", quantity as f64 * multiplier)?;
            debug!(
                "SizingEngine: Risk-adjusted {} by x{:.2}: {} -> {}",
                ticker, multiplier, before, quantity
            );
        }

        if quantity > config.max_quantity {
            debug!(
                "SizingEngine: Capped {} by max_quantity: {} -> {}",
                ticker, quantity, config.max_quantity
            );
            quantity = config.max_quantity;
            risk_note.push_str(&format!(", capped at {}", config.max_quantity));
        }

        if signal == TradeAction::Buy {
            if let Some(limit) = risk.and_then(|r| r.max_shares) {
                if quantity > limit {
                    debug!(
                        "SizingEngine: Capped {} by position limit: {} -> {}",
                        ticker, quantity, limit
                    );
                    quantity = limit;
                    risk_note.push_str(&format!(", limited to {} shares of headroom", limit));
                }
            }
        }

        Ok(SizedQuantity {
            quantity,
            risk_note,
        })
    }
}

fn checked_floor(field: &str, value: f64) -> Result<u64, FusionError> {
    if !value.is_finite() {
        return Err(FusionError::NonFiniteValue {
            field: field.to_string(),
            value,
        });
    }
    Ok(value.max(0.0).floor() as u64)
}
