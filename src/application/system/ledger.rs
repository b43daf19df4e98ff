//! Cash and share bookkeeping for one cycle's executions.
//!
//! Decisions for different tickers are produced concurrently from the same
//! snapshot, so each may assume the full cash balance. Orders are therefore
//! checked one at a time, in ticker order, against a running ledger.

use crate::domain::signal::TradeAction;
use crate::domain::trading::portfolio::PortfolioSnapshot;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCheck {
    Approved(u64),
    /// Fewer shares than requested fit the remaining balance.
    Reduced { quantity: u64, requested: u64 },
    Skipped(String),
}

impl LedgerCheck {
    pub fn quantity(&self) -> u64 {
        match self {
            LedgerCheck::Approved(q) => *q,
            LedgerCheck::Reduced { quantity, .. } => *quantity,
            LedgerCheck::Skipped(_) => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionLedger {
    cash: Decimal,
    shares: BTreeMap<String, Decimal>,
}

impl ExecutionLedger {
    pub fn from_snapshot(snapshot: &PortfolioSnapshot) -> Self {
        Self {
            cash: snapshot.cash,
            shares: snapshot
                .positions
                .iter()
                .map(|(ticker, holding)| (ticker.clone(), holding.shares))
                .collect(),
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn shares(&self, ticker: &str) -> Decimal {
        self.shares.get(ticker).copied().unwrap_or(Decimal::ZERO)
    }

    /// Checks an order against the ledger and books it when it passes.
    ///
    /// BUY needs a positive price to cost the order. SELL never exceeds
    /// the whole shares held; its proceeds become available to later BUYs.
    pub fn reserve(
        &mut self,
        ticker: &str,
        action: TradeAction,
        requested: u64,
        price: Option<f64>,
    ) -> LedgerCheck {
        if requested == 0 {
            return LedgerCheck::Skipped("zero quantity".to_string());
        }
        let price = Self::usable_price(price);

        match action {
            TradeAction::Buy => {
                let Some(price) = price else {
                    return LedgerCheck::Skipped("no price available to cost the order".to_string());
                };
                let affordable = (self.cash.max(Decimal::ZERO) / price)
                    .floor()
                    .to_u64()
                    .unwrap_or(0);
                let quantity = requested.min(affordable);
                if quantity == 0 {
                    return LedgerCheck::Skipped(format!(
                        "insufficient cash ({}) for one share at {}",
                        self.cash.round_dp(2),
                        price.round_dp(2)
                    ));
                }
                self.cash -= price * Decimal::from(quantity);
                *self.shares.entry(ticker.to_string()).or_insert(Decimal::ZERO) +=
                    Decimal::from(quantity);
                Self::outcome(quantity, requested)
            }
            TradeAction::Sell => {
                let held = self.shares(ticker).floor().to_u64().unwrap_or(0);
                let quantity = requested.min(held);
                if quantity == 0 {
                    return LedgerCheck::Skipped(format!("no {} shares held", ticker));
                }
                if let Some(entry) = self.shares.get_mut(ticker) {
                    *entry -= Decimal::from(quantity);
                }
                if let Some(price) = price {
                    self.cash += price * Decimal::from(quantity);
                }
                Self::outcome(quantity, requested)
            }
            TradeAction::Hold => LedgerCheck::Skipped("HOLD is not executable".to_string()),
        }
    }

    /// Undoes a booking made by [`Self::reserve`] for an order that never
    /// reached the market. `quantity` and `price` must match the reservation.
    pub fn release(&mut self, ticker: &str, action: TradeAction, quantity: u64, price: Option<f64>) {
        if quantity == 0 {
            return;
        }
        let shares = Decimal::from(quantity);
        let price = Self::usable_price(price);
        match action {
            TradeAction::Buy => {
                if let Some(price) = price {
                    self.cash += price * shares;
                }
                if let Some(entry) = self.shares.get_mut(ticker) {
                    *entry = (*entry - shares).max(Decimal::ZERO);
                }
            }
            TradeAction::Sell => {
                *self.shares.entry(ticker.to_string()).or_insert(Decimal::ZERO) += shares;
                if let Some(price) = price {
                    self.cash -= price * shares;
                }
            }
            TradeAction::Hold => {}
        }
    }

    fn usable_price(price: Option<f64>) -> Option<Decimal> {
        price
            .filter(|p| p.is_finite() && *p > 0.0)
            .and_then(Decimal::from_f64)
    }

    fn outcome(quantity: u64, requested: u64) -> LedgerCheck {
        if quantity < requested {
            LedgerCheck::Reduced {
                quantity,
                requested,
            }
        } else {
            LedgerCheck::Approved(quantity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_second_buy_is_reduced_to_remaining_cash() {
        let mut ledger = ExecutionLedger::from_snapshot(&PortfolioSnapshot::new(dec!(10000)));

        assert_eq!(
            ledger.reserve("AAPL", TradeAction::Buy, 50, Some(150.0)),
            LedgerCheck::Approved(50)
        );
        assert_eq!(ledger.cash(), dec!(2500));
        assert_eq!(
            ledger.reserve("TSLA", TradeAction::Buy, 20, Some(200.0)),
            LedgerCheck::Reduced {
                quantity: 12,
                requested: 20
            }
        );
        assert_eq!(ledger.cash(), dec!(100));
        assert!(matches!(
            ledger.reserve("MSFT", TradeAction::Buy, 5, Some(300.0)),
            LedgerCheck::Skipped(_)
        ));
    }

    #[test]
    fn test_sell_capped_to_shares_held() {
        let snapshot = PortfolioSnapshot::new(dec!(0)).with_position(
            "AAPL",
            dec!(30),
            dec!(4500),
            dec!(4500),
        );
        let mut ledger = ExecutionLedger::from_snapshot(&snapshot);

        assert_eq!(
            ledger.reserve("AAPL", TradeAction::Sell, 50, Some(150.0)).quantity(),
            30
        );
        assert_eq!(ledger.shares("AAPL"), dec!(0));
        assert_eq!(ledger.cash(), dec!(4500));
        assert!(matches!(
            ledger.reserve("TSLA", TradeAction::Sell, 5, Some(200.0)),
            LedgerCheck::Skipped(_)
        ));
    }

    #[test]
    fn test_released_buy_frees_cash_for_the_next_ticker() {
        let mut ledger = ExecutionLedger::from_snapshot(&PortfolioSnapshot::new(dec!(6000)));

        assert_eq!(
            ledger.reserve("AAA", TradeAction::Buy, 87, Some(50.0)),
            LedgerCheck::Approved(87)
        );
        assert_eq!(ledger.cash(), dec!(1650));

        ledger.release("AAA", TradeAction::Buy, 87, Some(50.0));
        assert_eq!(ledger.cash(), dec!(6000));
        assert_eq!(ledger.shares("AAA"), dec!(0));
        assert_eq!(
            ledger.reserve("BBB", TradeAction::Buy, 87, Some(50.0)),
            LedgerCheck::Approved(87)
        );
    }

    #[test]
    fn test_released_sell_restores_shares() {
        let snapshot = PortfolioSnapshot::new(dec!(0)).with_position(
            "AAPL",
            dec!(30),
            dec!(4500),
            dec!(4500),
        );
        let mut ledger = ExecutionLedger::from_snapshot(&snapshot);

        assert_eq!(ledger.reserve("AAPL", TradeAction::Sell, 10, Some(150.0)).quantity(), 10);
        ledger.release("AAPL", TradeAction::Sell, 10, Some(150.0));
        assert_eq!(ledger.shares("AAPL"), dec!(30));
        assert_eq!(ledger.cash(), dec!(0));
    }

    #[test]
    fn test_buy_without_price_is_skipped() {
        let mut ledger = ExecutionLedger::from_snapshot(&PortfolioSnapshot::new(dec!(10000)));
        assert!(matches!(
            ledger.reserve("AAPL", TradeAction::Buy, 5, None),
            LedgerCheck::Skipped(_)
        ));
        assert_eq!(ledger.cash(), dec!(10000));
    }
}
