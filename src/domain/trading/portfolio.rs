use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub shares: Decimal,
    pub cost_basis: Decimal,
    pub market_value: Decimal,
}

/// Read-only view of the portfolio, taken once per cycle.
///
/// Nothing in the decision path mutates a snapshot; sizing and limit
/// computations derive new values from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub cash: Decimal,
    pub positions: BTreeMap<String, Holding>,
}

impl PortfolioSnapshot {
    pub fn new(cash: Decimal) -> Self {
        Self {
            cash,
            positions: BTreeMap::new(),
        }
    }

    pub fn with_position(
        mut self,
        ticker: impl Into<String>,
        shares: Decimal,
        cost_basis: Decimal,
        market_value: Decimal,
    ) -> Self {
        self.positions.insert(
            ticker.into(),
            Holding {
                shares,
                cost_basis,
                market_value,
            },
        );
        self
    }

    /// Cash plus the market value of every position.
    pub fn total_value(&self) -> Decimal {
        self.cash + self.positions.values().map(|h| h.market_value).sum::<Decimal>()
    }

    pub fn position_value(&self, ticker: &str) -> Decimal {
        self.positions
            .get(ticker)
            .map(|h| h.market_value)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn shares_held(&self, ticker: &str) -> Decimal {
        self.positions
            .get(ticker)
            .map(|h| h.shares)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn open_positions(&self) -> usize {
        self.positions.values().filter(|h| h.shares > Decimal::ZERO).count()
    }
}
