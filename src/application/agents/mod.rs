//! Analytical signal agents.
//!
//! Each agent is an independent `(ticker, date range, portfolio) -> Signal`
//! function. Agents never see each other's output and may run in any order;
//! the [`panel::AgentPanel`] runs them concurrently and turns every failure
//! into a neutral, zero-confidence signal.

pub mod fundamentals;
pub mod panel;
pub mod risk_manager;
pub mod sentiment;
pub mod technicals;
pub mod valuation;

use crate::domain::errors::AgentError;
use crate::domain::signal::Signal;
use crate::domain::trading::portfolio::PortfolioSnapshot;
use crate::domain::trading::types::{Candle, DateRange};
use async_trait::async_trait;
use std::sync::Arc;

pub use fundamentals::FundamentalsAgent;
pub use panel::{AgentFailure, AgentPanel, AgentReport};
pub use risk_manager::RiskManagerAgent;
pub use sentiment::SentimentAgent;
pub use technicals::TechnicalsAgent;
pub use valuation::ValuationAgent;

/// Read-only inputs shared by every agent for one ticker in one cycle.
///
/// Prices are fetched once by the orchestrator and shared, so the
/// price-based agents and the feature extractor see the same history.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub ticker: String,
    pub range: DateRange,
    pub portfolio: Arc<PortfolioSnapshot>,
    pub prices: Arc<[Candle]>,
}

impl AgentContext {
    pub fn latest_close(&self) -> Option<f64> {
        self.prices.last().map(|c| c.close).filter(|p| p.is_finite() && *p > 0.0)
    }
}

#[async_trait]
pub trait SignalAgent: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze(&self, ctx: &AgentContext) -> Result<Signal, AgentError>;
}
