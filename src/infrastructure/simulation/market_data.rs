use super::ticker_rng;
use crate::domain::ports::MarketDataSource;
use crate::domain::trading::types::{Candle, DateRange};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use rand::Rng;
use std::collections::HashSet;
use tracing::debug;

/// First simulated trading day. Every walk starts here, so a given date has
/// the same bar whatever range it is requested through.
const WALK_START: (i32, u32, u32) = (2015, 1, 2);

/// Seeded random-walk daily bars, weekdays only.
///
/// Bars depend only on the seed, the ticker and the date.
#[derive(Debug, Clone)]
pub struct SimulatedMarketData {
    seed: u64,
    base_price: f64,
    daily_volatility: f64,
    unavailable: HashSet<String>,
}

impl SimulatedMarketData {
    pub fn new(seed: u64, base_price: f64, daily_volatility: f64) -> Self {
        Self {
            seed,
            base_price: if base_price.is_finite() && base_price > 0.0 {
                base_price
            } else {
                100.0
            },
            daily_volatility: daily_volatility.abs(),
            unavailable: HashSet::new(),
        }
    }

    /// Tickers that return an empty history, as a data gap would.
    pub fn with_unavailable<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unavailable.extend(tickers.into_iter().map(Into::into));
        self
    }

    pub fn generate(&self, ticker: &str, range: &DateRange) -> Vec<Candle> {
        let mut rng = ticker_rng(self.seed, ticker);
        // Uniform(-1, 1) scaled so the daily return has the configured std
        let scale = self.daily_volatility * 3f64.sqrt();
        let mut close = self.base_price * rng.random_range(0.5..1.5);
        let mut candles = Vec::new();

        let Some(mut date) = NaiveDate::from_ymd_opt(WALK_START.0, WALK_START.1, WALK_START.2)
        else {
            return candles;
        };
        while date <= range.end {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                let open = close;
                let drift = rng.random_range(-1.0..1.0) * scale;
                close = (open * (1.0 + drift)).max(0.01);
                let wick = open.max(close) * rng.random_range(0.0..self.daily_volatility.max(1e-6));
                let high = open.max(close) + wick;
                let low = (open.min(close) - wick).max(0.01);
                let volume = (rng.random_range(0.5..1.5) * 1_000_000.0_f64).round();
                if date >= range.start {
                    candles.push(Candle {
                        date,
                        open,
                        high,
                        low,
                        close,
                        volume,
                    });
                }
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        candles
    }
}

#[async_trait]
impl MarketDataSource for SimulatedMarketData {
    async fn get_prices(&self, ticker: &str, range: &DateRange) -> Result<Vec<Candle>> {
        if self.unavailable.contains(ticker) {
            debug!("SimulatedMarketData: No history for {}", ticker);
            return Ok(Vec::new());
        }
        Ok(self.generate(ticker, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> DateRange {
        DateRange::ending(NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(), 365)
    }

    #[tokio::test]
    async fn test_walk_is_deterministic_per_ticker() {
        let source = SimulatedMarketData::new(42, 150.0, 0.02);
        let first = source.get_prices("AAPL", &range()).await.unwrap();
        let second = source.get_prices("AAPL", &range()).await.unwrap();
        let other = source.get_prices("TSLA", &range()).await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        // Roughly 261 weekdays in a year
        assert!(first.len() > 250 && first.len() < 265);
        assert!(first.windows(2).all(|w| w[0].date < w[1].date));
        assert!(first.iter().all(|c| c.low <= c.close && c.close <= c.high && c.low > 0.0));
    }

    #[tokio::test]
    async fn test_bars_do_not_depend_on_range() {
        let source = SimulatedMarketData::new(42, 150.0, 0.02);
        let long = source.get_prices("AAPL", &range()).await.unwrap();
        let short_range = DateRange::ending(NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(), 10);
        let short = source.get_prices("AAPL", &short_range).await.unwrap();
        assert_eq!(long.last(), short.last());
    }

    #[tokio::test]
    async fn test_unavailable_ticker_is_empty() {
        let source = SimulatedMarketData::new(42, 150.0, 0.02).with_unavailable(["TSLA"]);
        assert!(source.get_prices("TSLA", &range()).await.unwrap().is_empty());
        assert!(!source.get_prices("AAPL", &range()).await.unwrap().is_empty());
    }
}
