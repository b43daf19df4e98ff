use crate::domain::errors::ExecutionError;
use crate::domain::ports::{ExecutionSink, MarketDataSource, PortfolioProvider};
use crate::domain::trading::portfolio::{Holding, PortfolioSnapshot};
use crate::domain::trading::types::{DateRange, OrderConfirmation, OrderRequest, OrderSide};
use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Days of history requested to find a fill price.
const PRICE_LOOKBACK_DAYS: i64 = 10;

/// In-memory paper broker. Fills market orders at the latest simulated close
/// and doubles as the portfolio provider.
pub struct PaperBroker {
    portfolio: Arc<RwLock<PortfolioSnapshot>>,
    market_data: Arc<dyn MarketDataSource>,
    reject_rate: f64,
    rng: Mutex<StdRng>,
}

impl PaperBroker {
    pub fn new(initial_cash: Decimal, market_data: Arc<dyn MarketDataSource>) -> Self {
        Self {
            portfolio: Arc::new(RwLock::new(PortfolioSnapshot::new(initial_cash))),
            market_data,
            reject_rate: 0.0,
            rng: Mutex::new(StdRng::seed_from_u64(0)),
        }
    }

    /// Randomly rejects a share of orders, reproducibly for a given seed.
    pub fn with_reject_rate(mut self, reject_rate: f64, seed: u64) -> Self {
        self.reject_rate = if reject_rate.is_finite() {
            reject_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_portfolio(self, snapshot: PortfolioSnapshot) -> Self {
        Self {
            portfolio: Arc::new(RwLock::new(snapshot)),
            ..self
        }
    }

    async fn latest_price(&self, ticker: &str) -> Option<Decimal> {
        let range = DateRange::ending(chrono::Utc::now().date_naive(), PRICE_LOOKBACK_DAYS);
        match self.market_data.get_prices(ticker, &range).await {
            Ok(candles) => candles
                .last()
                .map(|c| c.close)
                .filter(|p| p.is_finite() && *p > 0.0)
                .and_then(Decimal::from_f64),
            Err(e) => {
                warn!("PaperBroker: Price lookup failed for {}: {}", ticker, e);
                None
            }
        }
    }

    fn roll_rejection(&self) -> bool {
        if self.reject_rate <= 0.0 {
            return false;
        }
        match self.rng.lock() {
            Ok(mut rng) => rng.random_bool(self.reject_rate),
            Err(_) => false,
        }
    }
}

fn rejected(order: &OrderRequest, reason: impl Into<String>) -> ExecutionError {
    ExecutionError::Rejected {
        ticker: order.ticker.clone(),
        reason: reason.into(),
    }
}

#[async_trait]
impl ExecutionSink for PaperBroker {
    async fn submit_order(
        &self,
        order: &OrderRequest,
    ) -> std::result::Result<OrderConfirmation, ExecutionError> {
        if order.quantity == 0 {
            return Err(ExecutionError::InvalidOrder {
                reason: "quantity must be positive".to_string(),
            });
        }
        if self.roll_rejection() {
            return Err(rejected(order, "simulated broker rejection"));
        }
        let price = self
            .latest_price(&order.ticker)
            .await
            .ok_or_else(|| rejected(order, "no market price"))?;

        let quantity = Decimal::from(order.quantity);
        let notional = price * quantity;
        let mut portfolio = self.portfolio.write().await;

        match order.side {
            OrderSide::Buy => {
                if portfolio.cash < notional {
                    return Err(rejected(
                        order,
                        format!("insufficient cash: need {}, have {}", notional.round_dp(2), portfolio.cash.round_dp(2)),
                    ));
                }
                portfolio.cash -= notional;
                let holding = portfolio
                    .positions
                    .entry(order.ticker.clone())
                    .or_insert_with(Holding::default);
                holding.shares += quantity;
                holding.cost_basis += notional;
                holding.market_value = holding.shares * price;
            }
            OrderSide::Sell => {
                let held = portfolio.shares_held(&order.ticker);
                if held < quantity {
                    return Err(rejected(
                        order,
                        format!("insufficient shares: need {}, have {}", quantity, held),
                    ));
                }
                portfolio.cash += notional;
                if let Some(holding) = portfolio.positions.get_mut(&order.ticker) {
                    if holding.shares > Decimal::ZERO {
                        let average_cost = holding.cost_basis / holding.shares;
                        holding.cost_basis -= average_cost * quantity;
                    }
                    holding.shares -= quantity;
                    holding.market_value = holding.shares * price;
                }
                if portfolio.shares_held(&order.ticker) == Decimal::ZERO {
                    portfolio.positions.remove(&order.ticker);
                }
            }
        }

        let confirmation = OrderConfirmation {
            order_id: Uuid::new_v4().to_string(),
            ticker: order.ticker.clone(),
            side: order.side,
            quantity: order.quantity,
            fill_price: Some(price),
        };
        info!(
            "PaperBroker: Filled {} {} {} @ {} (order {})",
            order.side,
            order.quantity,
            order.ticker,
            price.round_dp(2),
            confirmation.order_id
        );
        Ok(confirmation)
    }
}

#[async_trait]
impl PortfolioProvider for PaperBroker {
    /// Positions are marked to the latest simulated close.
    async fn snapshot(&self) -> Result<PortfolioSnapshot> {
        let tickers: Vec<String> = self.portfolio.read().await.positions.keys().cloned().collect();
        let mut marks = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            if let Some(price) = self.latest_price(&ticker).await {
                marks.push((ticker, price));
            }
        }

        let mut portfolio = self.portfolio.write().await;
        for (ticker, price) in marks {
            if let Some(holding) = portfolio.positions.get_mut(&ticker) {
                holding.market_value = holding.shares * price;
            }
        }
        Ok(portfolio.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::simulation::SimulatedMarketData;
    use rust_decimal_macros::dec;

    fn broker(cash: Decimal) -> PaperBroker {
        PaperBroker::new(cash, Arc::new(SimulatedMarketData::new(42, 100.0, 0.01)))
    }

    #[tokio::test]
    async fn test_buy_then_sell_round_trip() {
        let broker = broker(dec!(1000000));
        let buy = OrderRequest::new("AAPL", OrderSide::Buy, 10).unwrap();
        let confirmation = broker.submit_order(&buy).await.unwrap();
        assert!(confirmation.fill_price.is_some());

        let snapshot = broker.snapshot().await.unwrap();
        assert_eq!(snapshot.shares_held("AAPL"), dec!(10));
        assert!(snapshot.cash < dec!(1000000));

        let sell = OrderRequest::new("AAPL", OrderSide::Sell, 10).unwrap();
        broker.submit_order(&sell).await.unwrap();
        let snapshot = broker.snapshot().await.unwrap();
        assert_eq!(snapshot.open_positions(), 0);
    }

    #[tokio::test]
    async fn test_rejects_oversell_and_overspend() {
        let broker = broker(dec!(1));
        let buy = OrderRequest::new("AAPL", OrderSide::Buy, 10).unwrap();
        assert!(matches!(
            broker.submit_order(&buy).await,
            Err(ExecutionError::Rejected { .. })
        ));
        let sell = OrderRequest::new("AAPL", OrderSide::Sell, 1).unwrap();
        assert!(broker.submit_order(&sell).await.is_err());
    }

    #[tokio::test]
    async fn test_full_reject_rate_rejects_everything() {
        let broker = broker(dec!(1000000)).with_reject_rate(1.0, 9);
        let buy = OrderRequest::new("AAPL", OrderSide::Buy, 1).unwrap();
        assert!(broker.submit_order(&buy).await.is_err());
    }
}
