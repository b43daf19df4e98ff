//! Risk manager: position headroom under the per-ticker limit.
//!
//! The output is a [`RiskCapacity`], not a price forecast. High headroom
//! means little risk is committed to the ticker yet.

use super::AgentContext;
use crate::domain::config::RiskLimits;
use crate::domain::errors::AgentError;
use crate::domain::risk::{HeadroomLevel, RiskCapacity};
use crate::domain::signal::Rationale;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct RiskManagerAgent {
    limits: RiskLimits,
}

impl RiskManagerAgent {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    pub fn name(&self) -> &'static str {
        "risk_manager"
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Remaining purchasable value for the ticker, bucketed into a level.
    ///
    /// `max_position_value = min(limit_pct * total - position_value, cash)`,
    /// floored at zero. Total value is cash plus the market value of every
    /// position.
    pub fn assess(&self, ctx: &AgentContext) -> Result<RiskCapacity, AgentError> {
        let current_price = ctx.latest_close().ok_or_else(|| AgentError::DataUnavailable {
            ticker: ctx.ticker.clone(),
            what: "price history".to_string(),
        })?;

        let portfolio = &ctx.portfolio;
        let total_value = portfolio.total_value();
        if total_value <= Decimal::ZERO {
            return Err(AgentError::InvalidInput {
                ticker: ctx.ticker.clone(),
                reason: format!("total portfolio value is {}", total_value),
            });
        }

        let position_value = portfolio.position_value(&ctx.ticker);
        let position_limit = total_value * self.limits.max_position_decimal();
        let remaining_limit = position_limit - position_value;
        let max_position_value = remaining_limit.min(portfolio.cash).max(Decimal::ZERO);

        let headroom_fraction = (max_position_value / total_value).to_f64().unwrap_or(0.0);
        let level = HeadroomLevel::classify(
            headroom_fraction,
            self.limits.high_headroom_pct,
            self.limits.moderate_headroom_pct,
        );

        let max_shares = Decimal::from_f64(current_price)
            .filter(|p| *p > Decimal::ZERO)
            .and_then(|p| (max_position_value / p).floor().to_u64());

        let mut metrics = BTreeMap::new();
        metrics.insert("portfolio_value".to_string(), to_f64(total_value));
        metrics.insert("current_position".to_string(), to_f64(position_value));
        metrics.insert("position_limit".to_string(), to_f64(position_limit));
        metrics.insert("remaining_limit".to_string(), to_f64(remaining_limit));
        metrics.insert("available_cash".to_string(), to_f64(portfolio.cash));
        metrics.insert("max_position_size".to_string(), to_f64(max_position_value));

        debug!(
            "RiskManager: {} headroom={:.4} level={} max_shares={:?}",
            ctx.ticker, headroom_fraction, level, max_shares
        );

        Ok(RiskCapacity {
            level,
            confidence: level.confidence(),
            headroom_fraction,
            max_position_value,
            max_shares,
            current_price: Some(current_price),
            rationale: Rationale::Metrics(metrics),
        })
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
