//! Fundamentals agent: rule bands over the latest reported ratios.

use super::{AgentContext, SignalAgent};
use crate::domain::errors::AgentError;
use crate::domain::ports::FundamentalsSource;
use crate::domain::signal::{Direction, Rationale, Signal};
use crate::domain::trading::types::FinancialMetrics;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

const SUB_SIGNALS: f64 = 4.0;

/// Result of one rule group.
#[derive(Debug, Clone, PartialEq)]
pub struct BandResult {
    pub direction: Direction,
    pub detail: String,
}

pub struct FundamentalsAgent {
    source: Arc<dyn FundamentalsSource>,
}

impl FundamentalsAgent {
    pub fn new(source: Arc<dyn FundamentalsSource>) -> Self {
        Self { source }
    }

    /// Pure evaluation of the four rule groups.
    pub fn evaluate(metrics: &FinancialMetrics) -> Signal {
        let bands = [
            ("profitability", profitability(metrics)),
            ("growth", growth(metrics)),
            ("financial_health", financial_health(metrics)),
            ("price_ratios", price_ratios(metrics)),
        ];

        let bullish = bands
            .iter()
            .filter(|(_, b)| b.direction == Direction::Bullish)
            .count();
        let bearish = bands
            .iter()
            .filter(|(_, b)| b.direction == Direction::Bearish)
            .count();

        let direction = if bullish > bearish {
            Direction::Bullish
        } else if bearish > bullish {
            Direction::Bearish
        } else {
            Direction::Neutral
        };
        let confidence = bullish.max(bearish) as f64 / SUB_SIGNALS * 100.0;

        let details: BTreeMap<String, String> = bands
            .into_iter()
            .map(|(name, band)| {
                (
                    name.to_string(),
                    format!("{}: {}", band.direction, band.detail),
                )
            })
            .collect();

        Signal::new(direction, confidence, Rationale::Details(details))
    }
}

#[async_trait]
impl SignalAgent for FundamentalsAgent {
    fn name(&self) -> &'static str {
        "fundamentals"
    }

    async fn analyze(&self, ctx: &AgentContext) -> Result<Signal, AgentError> {
        let metrics = self
            .source
            .get_financial_metrics(&ctx.ticker, ctx.range.end)
            .await
            .map_err(|e| AgentError::SourceFailed {
                ticker: ctx.ticker.clone(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| AgentError::DataUnavailable {
                ticker: ctx.ticker.clone(),
                what: "financial metrics".to_string(),
            })?;

        Ok(Self::evaluate(&metrics))
    }
}

/// Counts how many of the present metrics pass their rule.
///
/// Returns `None` when every metric of the group is missing.
fn score(checks: &[Option<bool>]) -> Option<usize> {
    if checks.iter().all(Option::is_none) {
        return None;
    }
    Some(checks.iter().filter(|c| **c == Some(true)).count())
}

fn format_opt(label: &str, value: Option<f64>, pct: bool) -> String {
    match value {
        Some(v) if pct => format!("{}: {:.2}%", label, v * 100.0),
        Some(v) => format!("{}: {:.2}", label, v),
        None => format!("{}: N/A", label),
    }
}

/// ≥2 passing rules is the "good" outcome; 0 passing is the "bad" one.
fn band(passing: Option<usize>, good: Direction, bad: Direction) -> Direction {
    match passing {
        Some(n) if n >= 2 => good,
        Some(0) => bad,
        _ => Direction::Neutral,
    }
}

fn profitability(m: &FinancialMetrics) -> BandResult {
    let passing = score(&[
        m.return_on_equity.map(|v| v > 0.15),
        m.net_margin.map(|v| v > 0.20),
        m.operating_margin.map(|v| v > 0.15),
    ]);
    BandResult {
        direction: band(passing, Direction::Bullish, Direction::Bearish),
        detail: [
            format_opt("ROE", m.return_on_equity, true),
            format_opt("Net Margin", m.net_margin, true),
            format_opt("Op Margin", m.operating_margin, true),
        ]
        .join(", "),
    }
}

fn growth(m: &FinancialMetrics) -> BandResult {
    let passing = score(&[
        m.revenue_growth.map(|v| v > 0.10),
        m.earnings_growth.map(|v| v > 0.10),
        m.book_value_growth.map(|v| v > 0.10),
    ]);
    BandResult {
        direction: band(passing, Direction::Bullish, Direction::Bearish),
        detail: [
            format_opt("Revenue Growth", m.revenue_growth, true),
            format_opt("Earnings Growth", m.earnings_growth, true),
            format_opt("Book Value Growth", m.book_value_growth, true),
        ]
        .join(", "),
    }
}

fn financial_health(m: &FinancialMetrics) -> BandResult {
    let fcf_check = match (m.free_cash_flow_per_share, m.earnings_per_share) {
        (Some(fcf), Some(eps)) => Some(fcf > eps * 0.8),
        _ => None,
    };
    let passing = score(&[
        m.current_ratio.map(|v| v > 1.5),
        m.debt_to_equity.map(|v| v < 0.5),
        fcf_check,
    ]);
    BandResult {
        direction: band(passing, Direction::Bullish, Direction::Bearish),
        detail: [
            format_opt("Current Ratio", m.current_ratio, false),
            format_opt("D/E", m.debt_to_equity, false),
        ]
        .join(", "),
    }
}

fn price_ratios(m: &FinancialMetrics) -> BandResult {
    let passing = score(&[
        m.price_to_earnings_ratio.map(|v| v > 25.0),
        m.price_to_book_ratio.map(|v| v > 3.0),
        m.price_to_sales_ratio.map(|v| v > 5.0),
    ]);
    // Expensive multiples read bearish
    BandResult {
        direction: band(passing, Direction::Bearish, Direction::Bullish),
        detail: [
            format_opt("P/E", m.price_to_earnings_ratio, false),
            format_opt("P/B", m.price_to_book_ratio, false),
            format_opt("P/S", m.price_to_sales_ratio, false),
        ]
        .join(", "),
    }
}
