//! Prometheus metrics definitions for Fusiontrade
//!
//! All metrics use the `fusiontrade_` prefix and are read-only.

use prometheus::{
    Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the decision loop
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Fused decisions by signal
    pub decisions_total: CounterVec,
    /// Forwarded orders by side and execution status
    pub trades_total: CounterVec,
    /// Agent failures (errors and panics) by agent name
    pub agent_failures_total: CounterVec,
    /// Per-ticker pipeline errors
    pub cycle_errors_total: Counter,
    /// Number of RL policies that loaded successfully
    pub models_available: GenericGauge<AtomicF64>,
    /// Completed cycles
    pub cycles_total: Counter,
    /// Wall-clock duration of one cycle
    pub cycle_duration_seconds: Histogram,
    /// Portfolio value seen by the last cycle, in USD
    pub portfolio_value_usd: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let decisions_total = CounterVec::new(
            Opts::new("fusiontrade_decisions_total", "Fused decisions by signal"),
            &["signal"],
        )?;
        registry.register(Box::new(decisions_total.clone()))?;

        let trades_total = CounterVec::new(
            Opts::new(
                "fusiontrade_trades_total",
                "Forwarded orders by side and status",
            ),
            &["side", "status"],
        )?;
        registry.register(Box::new(trades_total.clone()))?;

        let agent_failures_total = CounterVec::new(
            Opts::new(
                "fusiontrade_agent_failures_total",
                "Agent failures converted to neutral signals",
            ),
            &["agent"],
        )?;
        registry.register(Box::new(agent_failures_total.clone()))?;

        let cycle_errors_total = Counter::with_opts(Opts::new(
            "fusiontrade_cycle_errors_total",
            "Per-ticker pipeline errors",
        ))?;
        registry.register(Box::new(cycle_errors_total.clone()))?;

        let models_available = Gauge::with_opts(Opts::new(
            "fusiontrade_models_available",
            "RL policies loaded and voting",
        ))?;
        registry.register(Box::new(models_available.clone()))?;

        let cycles_total = Counter::with_opts(Opts::new(
            "fusiontrade_cycles_total",
            "Completed decision cycles",
        ))?;
        registry.register(Box::new(cycles_total.clone()))?;

        let cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "fusiontrade_cycle_duration_seconds",
                "Decision cycle duration in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;
        registry.register(Box::new(cycle_duration_seconds.clone()))?;

        let portfolio_value_usd = Gauge::with_opts(Opts::new(
            "fusiontrade_portfolio_value_usd",
            "Total portfolio value in USD",
        ))?;
        registry.register(Box::new(portfolio_value_usd.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            decisions_total,
            trades_total,
            agent_failures_total,
            cycle_errors_total,
            models_available,
            cycles_total,
            cycle_duration_seconds,
            portfolio_value_usd,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_decisions(&self, signal: &str) {
        self.decisions_total.with_label_values(&[signal]).inc();
    }

    pub fn inc_trades(&self, side: &str, status: &str) {
        self.trades_total.with_label_values(&[side, status]).inc();
    }

    pub fn inc_agent_failures(&self, agent: &str) {
        self.agent_failures_total.with_label_values(&[agent]).inc();
    }
}
