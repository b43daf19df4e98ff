//! Periodic performance report
//!
//! Every N cycles the orchestrator emits one structured JSON line with the
//! running totals, the decision history summary and the portfolio. It only
//! writes to the log; nothing is served.

use super::orchestrator::CycleSummary;
use crate::application::fusion::HistorySummary;
use crate::domain::signal::ActionCounts;
use crate::domain::trading::portfolio::PortfolioSnapshot;
use crate::infrastructure::observability::Metrics;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

/// Totals accumulated across every completed cycle of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunTotals {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub decisions: usize,
    pub trades_executed: usize,
    pub errors: usize,
    pub signal_distribution: ActionCounts,
}

impl RunTotals {
    pub fn record(&mut self, summary: &CycleSummary) {
        self.cycles_completed += 1;
        self.decisions += summary.decisions.len();
        self.trades_executed += summary.trades_executed;
        self.errors += summary.errors.len();
        self.signal_distribution.buy += summary.signal_distribution.buy;
        self.signal_distribution.sell += summary.signal_distribution.sell;
        self.signal_distribution.hold += summary.signal_distribution.hold;
    }

    pub fn record_failure(&mut self) {
        self.cycles_failed += 1;
    }
}

#[derive(Debug, Serialize)]
pub struct PerformanceReport {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub totals: RunTotals,
    pub history: HistorySummary,
    pub portfolio: PortfolioReport,
}

#[derive(Debug, Serialize)]
pub struct PortfolioReport {
    pub cash_usd: f64,
    pub total_value_usd: f64,
    pub positions_count: usize,
    pub positions: Vec<PositionReport>,
}

#[derive(Debug, Serialize)]
pub struct PositionReport {
    pub ticker: String,
    pub shares: f64,
    pub market_value: f64,
}

pub struct PerformanceReporter {
    metrics: Metrics,
    start_time: Instant,
}

impl PerformanceReporter {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
        }
    }

    pub fn build(
        &self,
        totals: &RunTotals,
        history: HistorySummary,
        portfolio: &PortfolioSnapshot,
    ) -> PerformanceReport {
        let cash = portfolio.cash.to_f64().unwrap_or(0.0);
        let total_value = portfolio.total_value().to_f64().unwrap_or(0.0);
        self.metrics.portfolio_value_usd.set(total_value);

        let positions = portfolio
            .positions
            .iter()
            .filter(|(_, h)| h.shares > rust_decimal::Decimal::ZERO)
            .map(|(ticker, holding)| PositionReport {
                ticker: ticker.clone(),
                shares: holding.shares.to_f64().unwrap_or(0.0),
                market_value: holding.market_value.to_f64().unwrap_or(0.0),
            })
            .collect::<Vec<_>>();

        PerformanceReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            totals: totals.clone(),
            history,
            portfolio: PortfolioReport {
                cash_usd: cash,
                total_value_usd: total_value,
                positions_count: positions.len(),
                positions,
            },
        }
    }

    /// Logs the report as a single `PERFORMANCE_JSON:` line.
    pub fn emit(&self, report: &PerformanceReport) {
        match serde_json::to_string(report) {
            Ok(json) => {
                info!("PERFORMANCE_JSON:{}", json);
                info!(
                    "Performance: {} cycles | {} decisions | {} trades | avg confidence (last 10) {:.2} | {}",
                    report.totals.cycles_completed,
                    report.totals.decisions,
                    report.totals.trades_executed,
                    report.history.recent_average_confidence,
                    report.history.recent_distribution
                );
            }
            Err(e) => warn!("Failed to serialize performance report: {}", e),
        }
    }
}
