//! Sentiment agent built from insider transactions.

use super::{AgentContext, SignalAgent};
use crate::domain::errors::AgentError;
use crate::domain::ports::InsiderTradeSource;
use crate::domain::signal::{Direction, Rationale, Signal};
use crate::domain::trading::types::InsiderTrade;
use async_trait::async_trait;
use std::sync::Arc;

pub const INSIDER_TRADE_LIMIT: usize = 1000;

pub struct SentimentAgent {
    source: Arc<dyn InsiderTradeSource>,
}

impl SentimentAgent {
    pub fn new(source: Arc<dyn InsiderTradeSource>) -> Self {
        Self { source }
    }

    /// Majority of buy versus sell transactions.
    ///
    /// Trades without a share count are ignored; a zero share count reads as
    /// a buy. A tie is neutral with zero confidence.
    pub fn evaluate(trades: &[InsiderTrade]) -> Option<Signal> {
        let shares: Vec<f64> = trades
            .iter()
            .filter_map(|t| t.transaction_shares)
            .filter(|s| s.is_finite())
            .collect();
        if shares.is_empty() {
            return None;
        }

        let bearish = shares.iter().filter(|s| **s < 0.0).count();
        let bullish = shares.len() - bearish;
        let total = shares.len() as f64;

        let (direction, confidence) = if bullish > bearish {
            (Direction::Bullish, bullish as f64 / total * 100.0)
        } else if bearish > bullish {
            (Direction::Bearish, bearish as f64 / total * 100.0)
        } else {
            (Direction::Neutral, 0.0)
        };

        Some(Signal::new(
            direction,
            confidence,
            Rationale::text(format!(
                "Bullish signals: {}, Bearish signals: {}",
                bullish, bearish
            )),
        ))
    }
}

#[async_trait]
impl SignalAgent for SentimentAgent {
    fn name(&self) -> &'static str {
        "sentiment"
    }

    async fn analyze(&self, ctx: &AgentContext) -> Result<Signal, AgentError> {
        let trades = self
            .source
            .get_insider_trades(&ctx.ticker, ctx.range.end, INSIDER_TRADE_LIMIT)
            .await
            .map_err(|e| AgentError::SourceFailed {
                ticker: ctx.ticker.clone(),
                reason: e.to_string(),
            })?;

        Self::evaluate(&trades).ok_or_else(|| AgentError::DataUnavailable {
            ticker: ctx.ticker.clone(),
            what: "insider trades".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trade(shares: Option<f64>) -> InsiderTrade {
        InsiderTrade {
            ticker: "AAPL".to_string(),
            filing_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            insider_name: None,
            transaction_shares: shares,
            transaction_value: None,
        }
    }

    #[test]
    fn test_majority_of_sales_is_bearish() {
        let trades = vec![trade(Some(-100.0)), trade(Some(-50.0)), trade(Some(10.0)), trade(None)];
        let signal = SentimentAgent::evaluate(&trades).unwrap();
        assert_eq!(signal.direction, Direction::Bearish);
        assert!((signal.confidence.value() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(signal.rationale.to_string(), "Bullish signals: 1, Bearish signals: 2");
    }

    #[test]
    fn test_zero_shares_count_as_bullish() {
        let signal = SentimentAgent::evaluate(&[trade(Some(0.0))]).unwrap();
        assert_eq!(signal.direction, Direction::Bullish);
        assert_eq!(signal.confidence.value(), 100.0);
    }

    #[test]
    fn test_tie_is_neutral_zero() {
        let signal = SentimentAgent::evaluate(&[trade(Some(5.0)), trade(Some(-5.0))]).unwrap();
        assert_eq!(signal.direction, Direction::Neutral);
        assert_eq!(signal.confidence.value(), 0.0);
    }

    #[test]
    fn test_no_usable_trades() {
        assert!(SentimentAgent::evaluate(&[]).is_none());
        assert!(SentimentAgent::evaluate(&[trade(None)]).is_none());
    }
}
