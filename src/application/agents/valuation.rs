//! Valuation agent: intrinsic value estimates against market capitalization.
//!
//! Two estimates are computed independently from the two most recent
//! line-item periods: a discounted cash flow projection and an owner
//! earnings model with a margin of safety. The signal comes from the mean
//! of their fractional gaps versus market cap.

use super::{AgentContext, SignalAgent};
use crate::domain::errors::AgentError;
use crate::domain::ports::FundamentalsSource;
use crate::domain::signal::{Direction, Rationale, Signal};
use crate::domain::trading::types::{LineItem, LineItemField};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Gaps beyond ±15% are directional.
pub const VALUATION_GAP_THRESHOLD: f64 = 0.15;
const DEFAULT_GROWTH_RATE: f64 = 0.05;
const PROJECTION_YEARS: i32 = 5;

const LINE_ITEM_FIELDS: [LineItemField; 5] = [
    LineItemField::FreeCashFlow,
    LineItemField::NetIncome,
    LineItemField::DepreciationAndAmortization,
    LineItemField::CapitalExpenditure,
    LineItemField::WorkingCapital,
];

/// Owner earnings model parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OwnerEarningsInputs {
    pub net_income: f64,
    pub depreciation: f64,
    pub capex: f64,
    pub working_capital_change: f64,
    pub growth_rate: f64,
}

/// Owner earnings projected five years at `required_return` with a capped
/// terminal value, then reduced by `margin_of_safety`.
///
/// Non-positive owner earnings are worth nothing.
pub fn owner_earnings_value(
    inputs: OwnerEarningsInputs,
    required_return: f64,
    margin_of_safety: f64,
) -> f64 {
    let owner_earnings =
        inputs.net_income + inputs.depreciation - inputs.capex - inputs.working_capital_change;
    if owner_earnings <= 0.0 {
        return 0.0;
    }

    let discounted: Vec<f64> = (1..=PROJECTION_YEARS)
        .map(|year| {
            owner_earnings * (1.0 + inputs.growth_rate).powi(year)
                / (1.0 + required_return).powi(year)
        })
        .collect();

    let terminal_growth = inputs.growth_rate.min(0.03);
    let last = discounted.last().copied().unwrap_or(0.0);
    let terminal_value = last * (1.0 + terminal_growth) / (required_return - terminal_growth);
    let terminal_discounted = terminal_value / (1.0 + required_return).powi(PROJECTION_YEARS);

    let intrinsic = discounted.iter().sum::<f64>() + terminal_discounted;
    intrinsic * (1.0 - margin_of_safety)
}

/// Free cash flow grown for five years with a perpetuity terminal value.
pub fn discounted_cash_flow_value(
    free_cash_flow: f64,
    growth_rate: f64,
    discount_rate: f64,
    terminal_growth_rate: f64,
) -> f64 {
    let cash_flows: Vec<f64> = (0..PROJECTION_YEARS)
        .map(|i| free_cash_flow * (1.0 + growth_rate).powi(i))
        .collect();
    let present: f64 = cash_flows
        .iter()
        .enumerate()
        .map(|(i, cf)| cf / (1.0 + discount_rate).powi(i as i32 + 1))
        .sum();

    let last = cash_flows.last().copied().unwrap_or(0.0);
    let terminal_value =
        last * (1.0 + terminal_growth_rate) / (discount_rate - terminal_growth_rate);
    present + terminal_value / (1.0 + discount_rate).powi(PROJECTION_YEARS)
}

fn gap(value: f64, market_cap: f64) -> f64 {
    (value - market_cap) / market_cap
}

fn classify(gap: f64) -> Direction {
    Direction::from_score(gap, VALUATION_GAP_THRESHOLD)
}

/// Outcome of the valuation math, independent of any data source.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationOutcome {
    pub dcf_value: Option<f64>,
    pub owner_earnings_value: Option<f64>,
    pub valuation_gap: f64,
}

impl ValuationOutcome {
    /// Evaluates every method the line items support and averages their gaps.
    pub fn compute(
        current: &LineItem,
        previous: &LineItem,
        earnings_growth: Option<f64>,
        market_cap: f64,
    ) -> Option<Self> {
        let growth_rate = earnings_growth
            .filter(|g| g.is_finite())
            .unwrap_or(DEFAULT_GROWTH_RATE);

        let owner_earnings = match (
            current.net_income,
            current.depreciation_and_amortization,
            current.capital_expenditure,
            current.working_capital,
            previous.working_capital,
        ) {
            (Some(ni), Some(da), Some(capex), Some(wc_now), Some(wc_prev)) => Some(
                owner_earnings_value(
                    OwnerEarningsInputs {
                        net_income: ni,
                        depreciation: da,
                        capex,
                        working_capital_change: wc_now - wc_prev,
                        growth_rate,
                    },
                    0.15,
                    0.25,
                ),
            ),
            _ => None,
        };
        let dcf = current
            .free_cash_flow
            .map(|fcf| discounted_cash_flow_value(fcf, growth_rate, 0.10, 0.03));

        let gaps: Vec<f64> = [dcf, owner_earnings]
            .iter()
            .flatten()
            .map(|v| gap(*v, market_cap))
            .filter(|g| g.is_finite())
            .collect();
        if gaps.is_empty() {
            return None;
        }

        Some(Self {
            dcf_value: dcf,
            owner_earnings_value: owner_earnings,
            valuation_gap: gaps.iter().sum::<f64>() / gaps.len() as f64,
        })
    }

    pub fn direction(&self) -> Direction {
        classify(self.valuation_gap)
    }

    /// `round(|gap|, 2) * 100`, at most 100.
    pub fn confidence(&self) -> f64 {
        ((self.valuation_gap.abs() * 100.0).round()).min(100.0)
    }
}

pub struct ValuationAgent {
    source: Arc<dyn FundamentalsSource>,
}

impl ValuationAgent {
    pub fn new(source: Arc<dyn FundamentalsSource>) -> Self {
        Self { source }
    }

    fn source_failed(ticker: &str, e: anyhow::Error) -> AgentError {
        AgentError::SourceFailed {
            ticker: ticker.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl SignalAgent for ValuationAgent {
    fn name(&self) -> &'static str {
        "valuation"
    }

    async fn analyze(&self, ctx: &AgentContext) -> Result<Signal, AgentError> {
        let ticker = ctx.ticker.as_str();
        let end = ctx.range.end;

        let metrics = self
            .source
            .get_financial_metrics(ticker, end)
            .await
            .map_err(|e| Self::source_failed(ticker, e))?
            .ok_or_else(|| AgentError::DataUnavailable {
                ticker: ticker.to_string(),
                what: "financial metrics".to_string(),
            })?;

        let line_items = self
            .source
            .search_line_items(ticker, &LINE_ITEM_FIELDS, end, 2)
            .await
            .map_err(|e| Self::source_failed(ticker, e))?;
        let [current, previous, ..] = line_items.as_slice() else {
            return Err(AgentError::InsufficientHistory {
                ticker: ticker.to_string(),
                required: 2,
                available: line_items.len(),
            });
        };

        let market_cap = self
            .source
            .get_market_cap(ticker, end)
            .await
            .map_err(|e| Self::source_failed(ticker, e))?
            .filter(|m| m.is_finite() && *m > 0.0)
            .ok_or_else(|| AgentError::InvalidInput {
                ticker: ticker.to_string(),
                reason: "market cap missing or non-positive".to_string(),
            })?;

        let outcome = ValuationOutcome::compute(current, previous, metrics.earnings_growth, market_cap)
            .ok_or_else(|| AgentError::DataUnavailable {
                ticker: ticker.to_string(),
                what: "valuation line items".to_string(),
            })?;

        let mut details = BTreeMap::new();
        if let Some(value) = outcome.dcf_value {
            let g = gap(value, market_cap);
            details.insert(
                "dcf_analysis".to_string(),
                format!(
                    "{}: Intrinsic Value: ${:.2}, Market Cap: ${:.2}, Gap: {:.1}%",
                    classify(g),
                    value,
                    market_cap,
                    g * 100.0
                ),
            );
        }
        if let Some(value) = outcome.owner_earnings_value {
            let g = gap(value, market_cap);
            details.insert(
                "owner_earnings_analysis".to_string(),
                format!(
                    "{}: Owner Earnings Value: ${:.2}, Market Cap: ${:.2}, Gap: {:.1}%",
                    classify(g),
                    value,
                    market_cap,
                    g * 100.0
                ),
            );
        }

        debug!(
            "ValuationAgent: {} gap={:.4} -> {}",
            ticker,
            outcome.valuation_gap,
            outcome.direction()
        );

        Ok(Signal::new(
            outcome.direction(),
            outcome.confidence(),
            Rationale::Details(details),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(fcf: f64, ni: f64, wc: f64) -> LineItem {
        LineItem {
            ticker: "AAPL".to_string(),
            report_period: None,
            free_cash_flow: Some(fcf),
            net_income: Some(ni),
            depreciation_and_amortization: Some(10.0),
            capital_expenditure: Some(20.0),
            working_capital: Some(wc),
        }
    }

    #[test]
    fn test_non_positive_owner_earnings_is_worthless() {
        let inputs = OwnerEarningsInputs {
            net_income: 10.0,
            depreciation: 5.0,
            capex: 20.0,
            working_capital_change: 0.0,
            growth_rate: 0.05,
        };
        assert_eq!(owner_earnings_value(inputs, 0.15, 0.25), 0.0);
    }

    #[test]
    fn test_dcf_grows_with_cash_flow() {
        let small = discounted_cash_flow_value(100.0, 0.05, 0.10, 0.03);
        let large = discounted_cash_flow_value(200.0, 0.05, 0.10, 0.03);
        assert!(small > 0.0);
        assert!((large - 2.0 * small).abs() < 1e-6);
    }

    #[test]
    fn test_undervalued_is_bullish() {
        let outcome =
            ValuationOutcome::compute(&item(100.0, 100.0, 50.0), &item(90.0, 90.0, 50.0), Some(0.05), 500.0)
                .unwrap();
        assert!(outcome.valuation_gap > VALUATION_GAP_THRESHOLD);
        assert_eq!(outcome.direction(), Direction::Bullish);
        assert!(outcome.confidence() <= 100.0);
    }

    #[test]
    fn test_overvalued_is_bearish() {
        let outcome = ValuationOutcome::compute(
            &item(100.0, 100.0, 50.0),
            &item(90.0, 90.0, 50.0),
            None,
            1_000_000.0,
        )
        .unwrap();
        assert_eq!(outcome.direction(), Direction::Bearish);
        assert_eq!(outcome.confidence(), 100.0);
    }

    #[test]
    fn test_missing_line_items_yield_nothing() {
        let empty = LineItem {
            ticker: "AAPL".to_string(),
            report_period: None,
            free_cash_flow: None,
            net_income: None,
            depreciation_and_amortization: None,
            capital_expenditure: None,
            working_capital: None,
        };
        assert!(ValuationOutcome::compute(&empty, &empty, None, 100.0).is_none());
    }
}
