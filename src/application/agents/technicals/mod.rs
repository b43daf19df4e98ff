//! Technicals agent: five price-based sub-strategies combined into one signal.

pub mod indicators;
pub mod strategies;

use super::{AgentContext, SignalAgent};
use crate::domain::errors::AgentError;
use crate::domain::signal::{Rationale, Signal};
use async_trait::async_trait;
use std::collections::BTreeMap;
use strategies::{SubStrategy, combine};
use tracing::debug;

#[derive(Debug, Default)]
pub struct TechnicalsAgent;

impl TechnicalsAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SignalAgent for TechnicalsAgent {
    fn name(&self) -> &'static str {
        "technicals"
    }

    async fn analyze(&self, ctx: &AgentContext) -> Result<Signal, AgentError> {
        if ctx.prices.is_empty() {
            return Err(AgentError::DataUnavailable {
                ticker: ctx.ticker.clone(),
                what: "price history".to_string(),
            });
        }

        let evaluated: Vec<_> = SubStrategy::ALL
            .iter()
            .map(|strategy| (*strategy, strategy.evaluate(&ctx.prices)))
            .collect();
        let combined = combine(&evaluated);

        let mut details = BTreeMap::new();
        for (strategy, signal) in &evaluated {
            let metrics: Vec<String> = signal
                .metrics
                .iter()
                .map(|(k, v)| format!("{}={:.4}", k, v))
                .collect();
            details.insert(
                strategy.as_str().to_string(),
                format!(
                    "{} ({:.0}%) {}",
                    signal.direction,
                    (signal.confidence * 100.0).round(),
                    metrics.join(", ")
                )
                .trim_end()
                .to_string(),
            );
        }

        debug!(
            "TechnicalsAgent: {} score={:.4} -> {}",
            ctx.ticker, combined.score, combined.direction
        );

        Ok(Signal::new(
            combined.direction,
            combined.confidence_pct(),
            Rationale::Details(details),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Direction;
    use crate::domain::trading::portfolio::PortfolioSnapshot;
    use crate::domain::trading::types::{Candle, DateRange};
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn context(prices: Vec<Candle>) -> AgentContext {
        let end = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        AgentContext {
            ticker: "AAPL".to_string(),
            range: DateRange::ending(end, 365),
            portfolio: Arc::new(PortfolioSnapshot::new(dec!(100000))),
            prices: prices.into(),
        }
    }

    #[tokio::test]
    async fn test_empty_prices_is_data_unavailable() {
        let result = TechnicalsAgent::new().analyze(&context(Vec::new())).await;
        assert!(matches!(result, Err(AgentError::DataUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_rationale_lists_every_sub_strategy() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let prices: Vec<Candle> = (0..200)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.2).sin() * 3.0;
                Candle {
                    date: start + Duration::days(i),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1000.0,
                }
            })
            .collect();

        let signal = TechnicalsAgent::new().analyze(&context(prices)).await.unwrap();
        let Rationale::Details(details) = &signal.rationale else {
            panic!("expected detailed rationale");
        };
        assert_eq!(details.len(), 5);
        assert!(details.contains_key("statistical_arbitrage"));
        assert!((0.0..=100.0).contains(&signal.confidence.value()));
        assert!(Direction::ALL.contains(&signal.direction));
    }
}
