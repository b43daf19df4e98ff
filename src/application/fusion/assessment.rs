use crate::domain::decision::{ConfidenceStats, DecisionAssessment, RiskLevel};
use crate::domain::signal::Signal;
use crate::domain::trading::portfolio::PortfolioSnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use statrs::statistics::{Data, Distribution, Max, Min};
use std::collections::HashSet;

const MAX_OPEN_POSITIONS: usize = 10;
const LOW_CASH_RESERVE: Decimal = dec!(10000);
const MAX_DISTINCT_DIRECTIONS: usize = 2;
const MAX_CONFIDENCE_STD: f64 = 20.0;

pub fn confidence_stats<'a, I>(signals: I) -> ConfidenceStats
where
    I: IntoIterator<Item = &'a Signal>,
{
    let values: Vec<f64> = signals.into_iter().map(|s| s.confidence.value()).collect();
    if values.is_empty() {
        return ConfidenceStats::default();
    }

    let count = values.len();
    let data = Data::new(values);
    let finite_or_zero = |v: Option<f64>| v.filter(|x| x.is_finite()).unwrap_or(0.0);

    ConfidenceStats {
        mean: finite_or_zero(data.mean()),
        max: data.max(),
        min: data.min(),
        // A single value has no dispersion
        std_dev: if count > 1 { finite_or_zero(data.std_dev()) } else { 0.0 },
        count,
    }
}

/// Portfolio and signal-quality risk factors for one decision.
pub fn assess<'a, I>(signals: I, portfolio: &PortfolioSnapshot) -> DecisionAssessment
where
    I: IntoIterator<Item = &'a Signal> + Clone,
{
    let stats = confidence_stats(signals.clone());
    let mut risk_factors = Vec::new();

    if portfolio.open_positions() > MAX_OPEN_POSITIONS {
        risk_factors.push("High portfolio concentration".to_string());
    }
    if portfolio.cash < LOW_CASH_RESERVE {
        risk_factors.push("Low cash reserves".to_string());
    }
    let distinct: HashSet<_> = signals.into_iter().map(|s| s.direction).collect();
    if distinct.len() > MAX_DISTINCT_DIRECTIONS {
        risk_factors.push("High signal divergence".to_string());
    }
    if stats.std_dev > MAX_CONFIDENCE_STD {
        risk_factors.push("High confidence dispersion".to_string());
    }

    DecisionAssessment {
        confidence_stats: stats,
        risk_level: RiskLevel::from_factor_count(risk_factors.len()),
        risk_factors,
    }
}
