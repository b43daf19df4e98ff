//! Cycle orchestration
//!
//! One cycle:
//! 1. take a single portfolio snapshot
//! 2. evaluate every ticker concurrently (prices, agents, RL panel, fusion)
//! 3. in configured ticker order: persist each decision and, when the gate
//!    passes, forward it to execution through the [`ExecutionLedger`]
//! 4. report a [`CycleSummary`]
//!
//! A failing ticker never aborts the others; only an unavailable portfolio
//! fails the whole cycle.

use super::ledger::{ExecutionLedger, LedgerCheck};
use super::reporter::{PerformanceReporter, RunTotals};
use crate::application::agents::{AgentContext, AgentPanel};
use crate::application::feature_engineering_service::FeatureEngineeringService;
use crate::application::fusion::{DecisionFusionEngine, DecisionHistory};
use crate::application::ml::{PolicyPanel, RlAggregator};
use crate::config::Config;
use crate::domain::decision::{Decision, DecisionRecord, ExecutionRecord, ExecutionStatus};
use crate::domain::errors::FeatureError;
use crate::domain::ml::policy::RlAggregate;
use crate::domain::ports::{ExecutionSink, MarketDataSource, PortfolioProvider};
use crate::domain::repositories::DecisionRepository;
use crate::domain::signal::ActionCounts;
use crate::domain::trading::portfolio::PortfolioSnapshot;
use crate::domain::trading::types::{Candle, DateRange, OrderRequest, OrderSide};
use crate::infrastructure::observability::Metrics;
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore, watch};
use tracing::{debug, error, info, warn};

/// Settings the orchestrator reads from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSettings {
    pub tickers: Vec<String>,
    pub lookback_days: i64,
    pub max_concurrent_tickers: usize,
    pub confidence_threshold: f64,
    pub dry_run: bool,
    pub interval: Duration,
    pub max_cycles: Option<u64>,
    pub error_backoff_max: Duration,
    pub reports_enabled: bool,
    pub report_every_cycles: u64,
}

impl CycleSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tickers: config.cycle.tickers.clone(),
            lookback_days: config.cycle.lookback_days,
            max_concurrent_tickers: config.cycle.max_concurrent_tickers.max(1),
            confidence_threshold: config.fusion.confidence_threshold,
            dry_run: config.cycle.dry_run,
            interval: Duration::from_secs(config.cycle.cycle_interval_secs),
            max_cycles: config.cycle.max_cycles,
            error_backoff_max: Duration::from_secs(config.cycle.error_backoff_max_secs),
            reports_enabled: config.observability.enabled,
            report_every_cycles: config.observability.report_every_cycles.max(1),
        }
    }
}

/// External collaborators the orchestrator talks to.
#[derive(Clone)]
pub struct CycleDependencies {
    pub market_data: Arc<dyn MarketDataSource>,
    pub portfolio: Arc<dyn PortfolioProvider>,
    pub execution: Arc<dyn ExecutionSink>,
    pub repository: Arc<dyn DecisionRepository>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle: u64,
    pub tickers_analyzed: usize,
    pub decisions: Vec<Decision>,
    pub executions: Vec<ExecutionRecord>,
    pub trades_executed: usize,
    pub errors: Vec<String>,
    pub signal_distribution: ActionCounts,
    pub duration: Duration,
}

/// What one ticker's evaluation produced.
struct TickerOutcome {
    decision: Decision,
    latest_price: Option<f64>,
    errors: Vec<String>,
    agent_failures: Vec<String>,
}

/// Per-ticker decision pipeline. Cheap to clone into a task.
#[derive(Clone)]
struct TickerPipeline {
    market_data: Arc<dyn MarketDataSource>,
    panel: AgentPanel,
    policies: Arc<PolicyPanel>,
    aggregator: RlAggregator,
    features: FeatureEngineeringService,
    engine: Arc<DecisionFusionEngine>,
}

impl TickerPipeline {
    async fn evaluate(
        &self,
        ticker: String,
        range: DateRange,
        portfolio: Arc<PortfolioSnapshot>,
    ) -> TickerOutcome {
        let mut errors = Vec::new();

        let prices: Vec<Candle> = match self.market_data.get_prices(&ticker, &range).await {
            Ok(prices) => prices,
            Err(e) => {
                warn!("Price fetch failed for {}: {}. Treating as empty history", ticker, e);
                errors.push(format!("{}: price fetch failed: {}", ticker, e));
                Vec::new()
            }
        };

        let ctx = Arc::new(AgentContext {
            ticker: ticker.clone(),
            range,
            portfolio: Arc::clone(&portfolio),
            prices: Arc::from(prices),
        });
        let latest_price = ctx.latest_close();

        let report = self.panel.evaluate(Arc::clone(&ctx)).await;
        let agent_failures: Vec<String> = report.failures.iter().map(|f| f.agent.clone()).collect();
        errors.extend(
            report
                .failures
                .iter()
                .map(|f| format!("{}: agent {} failed: {}", ticker, f.agent, f.reason)),
        );

        let rl = match self.features.observe(&ctx.prices) {
            Ok(observation) => {
                let results = Arc::clone(&self.policies).predict(observation).await;
                self.aggregator.aggregate_results(results)
            }
            Err(FeatureError::EmptyHistory) => {
                debug!("No price history for {}; RL ensemble abstains", ticker);
                RlAggregate::unavailable()
            }
            Err(e) => {
                warn!("Feature extraction failed for {}: {}", ticker, e);
                errors.push(format!("{}: feature extraction failed: {}", ticker, e));
                RlAggregate::unavailable()
            }
        };

        let decision = self.engine.fuse(
            &ticker,
            &report.signals,
            report.risk.as_ref(),
            &rl,
            &portfolio,
        );

        TickerOutcome {
            decision,
            latest_price,
            errors,
            agent_failures,
        }
    }
}

pub struct CycleOrchestrator {
    settings: CycleSettings,
    deps: CycleDependencies,
    pipeline: TickerPipeline,
    history: Mutex<DecisionHistory>,
    metrics: Metrics,
    cycle: AtomicU64,
}

impl CycleOrchestrator {
    pub fn new(
        settings: CycleSettings,
        deps: CycleDependencies,
        panel: AgentPanel,
        policies: Arc<PolicyPanel>,
        engine: DecisionFusionEngine,
        metrics: Metrics,
    ) -> Self {
        let history = DecisionHistory::new(engine.config().history_size);
        metrics
            .models_available
            .set(policies.available_count() as f64);

        Self {
            pipeline: TickerPipeline {
                market_data: Arc::clone(&deps.market_data),
                panel,
                policies,
                aggregator: RlAggregator::new(),
                features: FeatureEngineeringService::new(),
                engine: Arc::new(engine),
            },
            settings,
            deps,
            history: Mutex::new(history),
            metrics,
            cycle: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    pub fn cycles_started(&self) -> u64 {
        self.cycle.load(Ordering::SeqCst)
    }

    pub async fn history_summary(&self) -> crate::application::fusion::HistorySummary {
        self.history.lock().await.summary()
    }

    /// Runs one full cycle over every configured ticker.
    ///
    /// Errors only when the portfolio snapshot cannot be taken.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();
        info!(
            "Cycle {}: evaluating {} tickers",
            cycle,
            self.settings.tickers.len()
        );

        let snapshot = Arc::new(
            self.deps
                .portfolio
                .snapshot()
                .await
                .context("Portfolio snapshot unavailable")?,
        );
        let range = DateRange::ending(
            chrono::Utc::now().date_naive(),
            self.settings.lookback_days,
        );

        let outcomes = self.evaluate_all(range, Arc::clone(&snapshot)).await;

        let mut ledger = ExecutionLedger::from_snapshot(&snapshot);
        let mut summary = CycleSummary {
            cycle,
            tickers_analyzed: self.settings.tickers.len(),
            decisions: Vec::new(),
            executions: Vec::new(),
            trades_executed: 0,
            errors: Vec::new(),
            signal_distribution: ActionCounts::default(),
            duration: Duration::ZERO,
        };

        for (ticker, outcome) in self.settings.tickers.iter().zip(outcomes) {
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(reason) => {
                    error!("Ticker {} pipeline aborted: {}", ticker, reason);
                    summary.errors.push(format!("{}: pipeline aborted: {}", ticker, reason));
                    continue;
                }
            };
            for agent in &outcome.agent_failures {
                self.metrics.inc_agent_failures(agent);
            }
            summary.errors.extend(outcome.errors);
            self.record_decision(cycle, outcome.decision, outcome.latest_price, &mut ledger, &mut summary)
                .await;
        }

        summary.duration = started.elapsed();
        self.metrics.cycles_total.inc();
        self.metrics
            .cycle_duration_seconds
            .observe(summary.duration.as_secs_f64());
        self.metrics.cycle_errors_total.inc_by(summary.errors.len() as f64);

        info!(
            "Cycle {} complete in {:.2}s: {} decisions, {} trades, {} errors | {}",
            cycle,
            summary.duration.as_secs_f64(),
            summary.decisions.len(),
            summary.trades_executed,
            summary.errors.len(),
            summary.signal_distribution
        );
        for e in &summary.errors {
            debug!("Cycle {} error: {}", cycle, e);
        }

        Ok(summary)
    }

    /// Evaluates every ticker as its own task, at most
    /// `max_concurrent_tickers` at a time. Results come back in ticker order.
    async fn evaluate_all(
        &self,
        range: DateRange,
        snapshot: Arc<PortfolioSnapshot>,
    ) -> Vec<std::result::Result<TickerOutcome, String>> {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_tickers));

        let handles: Vec<_> = self
            .settings
            .tickers
            .iter()
            .map(|ticker| {
                let pipeline = self.pipeline.clone();
                let semaphore = Arc::clone(&semaphore);
                let snapshot = Arc::clone(&snapshot);
                let ticker = ticker.clone();
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    pipeline.evaluate(ticker, range, snapshot).await
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await.map_err(|e| e.to_string()));
        }
        outcomes
    }

    async fn record_decision(
        &self,
        cycle: u64,
        decision: Decision,
        latest_price: Option<f64>,
        ledger: &mut ExecutionLedger,
        summary: &mut CycleSummary,
    ) {
        info!(
            "Decision {}: {} qty={} conf={} ({:?}) | {}",
            decision.ticker,
            decision.signal,
            decision.quantity,
            decision.confidence,
            decision.alignment,
            decision.rationale
        );
        self.metrics.inc_decisions(decision.signal.as_str());
        summary.signal_distribution.record(decision.signal);

        let record = DecisionRecord::new(cycle, decision.clone());
        if let Err(e) = self.deps.repository.append_decision(&record).await {
            warn!("Failed to persist decision for {}: {}", decision.ticker, e);
            summary
                .errors
                .push(format!("{}: failed to persist decision: {}", decision.ticker, e));
        }
        self.history.lock().await.push(decision.clone());

        if decision.is_actionable(self.settings.confidence_threshold) {
            if let Some(execution) = self.execute(&record, latest_price, ledger, summary).await {
                if let Err(e) = self.deps.repository.append_execution_result(&execution).await {
                    warn!("Failed to persist execution for {}: {}", decision.ticker, e);
                    summary
                        .errors
                        .push(format!("{}: failed to persist execution: {}", decision.ticker, e));
                }
                summary.executions.push(execution);
            }
        } else {
            debug!(
                "No-op hold for {}: {} at {} (threshold {})",
                decision.ticker, decision.signal, decision.confidence, self.settings.confidence_threshold
            );
        }

        summary.decisions.push(decision);
    }

    /// Sizes the order against the ledger and forwards it. Returns `None`
    /// when the decision cannot be expressed as an order at all.
    async fn execute(
        &self,
        record: &DecisionRecord,
        latest_price: Option<f64>,
        ledger: &mut ExecutionLedger,
        summary: &mut CycleSummary,
    ) -> Option<ExecutionRecord> {
        let decision = &record.decision;
        let side = match OrderSide::try_from(decision.signal) {
            Ok(side) => side,
            Err(e) => {
                summary.errors.push(format!("{}: {}", decision.ticker, e));
                return None;
            }
        };

        let check = ledger.reserve(&decision.ticker, decision.signal, decision.quantity, latest_price);
        let quantity = match &check {
            LedgerCheck::Skipped(reason) => {
                info!("Skipping {} {}: {}", side, decision.ticker, reason);
                self.metrics.inc_trades(side.as_str(), ExecutionStatus::Skipped.as_str());
                return Some(ExecutionRecord::new(
                    record.id,
                    &decision.ticker,
                    side,
                    0,
                    ExecutionStatus::Skipped,
                    None,
                    reason.clone(),
                ));
            }
            LedgerCheck::Reduced {
                quantity,
                requested,
            } => {
                info!(
                    "Reducing {} {} from {} to {} shares",
                    side, decision.ticker, requested, quantity
                );
                *quantity
            }
            LedgerCheck::Approved(quantity) => *quantity,
        };

        if self.settings.dry_run {
            info!("[DRY RUN] Would {} {} {}", side, quantity, decision.ticker);
            self.metrics.inc_trades(side.as_str(), ExecutionStatus::DryRun.as_str());
            return Some(ExecutionRecord::new(
                record.id,
                &decision.ticker,
                side,
                quantity,
                ExecutionStatus::DryRun,
                None,
                "dry run",
            ));
        }

        let order = match OrderRequest::new(&decision.ticker, side, quantity) {
            Ok(order) => order,
            Err(e) => {
                ledger.release(&decision.ticker, decision.signal, quantity, latest_price);
                summary.errors.push(format!("{}: {}", decision.ticker, e));
                return None;
            }
        };

        let execution = match self.deps.execution.submit_order(&order).await {
            Ok(confirmation) => {
                info!(
                    "Executed {} {} {} (order {})",
                    side, quantity, decision.ticker, confirmation.order_id
                );
                summary.trades_executed += 1;
                ExecutionRecord::new(
                    record.id,
                    &decision.ticker,
                    side,
                    quantity,
                    ExecutionStatus::Filled,
                    Some(confirmation.order_id),
                    "filled",
                )
            }
            Err(e) => {
                warn!("Order for {} rejected: {}", decision.ticker, e);
                // The order never filled, so its booking goes back to the ledger
                ledger.release(&decision.ticker, decision.signal, quantity, latest_price);
                summary
                    .errors
                    .push(format!("{}: execution failed: {}", decision.ticker, e));
                ExecutionRecord::new(
                    record.id,
                    &decision.ticker,
                    side,
                    quantity,
                    ExecutionStatus::Rejected,
                    None,
                    e.to_string(),
                )
            }
        };
        self.metrics.inc_trades(side.as_str(), execution.status.as_str());
        Some(execution)
    }

    /// Runs cycles on the configured interval until shutdown or `max_cycles`.
    ///
    /// A failed cycle backs off exponentially up to `error_backoff_max`. An
    /// in-flight cycle always completes before shutdown is honoured.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> RunTotals {
        let reporter = PerformanceReporter::new(self.metrics.clone());
        let mut totals = RunTotals::default();
        let mut consecutive_failures: u32 = 0;
        let mut last_portfolio = PortfolioSnapshot::default();

        loop {
            if *shutdown.borrow() {
                info!("Shutdown requested; stopping before next cycle");
                break;
            }

            match self.run_cycle().await {
                Ok(summary) => {
                    consecutive_failures = 0;
                    totals.record(&summary);
                    debug!("Metrics after cycle {}:\n{}", summary.cycle, self.metrics.render());
                    if self.settings.reports_enabled
                        && summary.cycle % self.settings.report_every_cycles.max(1) == 0
                    {
                        if let Ok(snapshot) = self.deps.portfolio.snapshot().await {
                            last_portfolio = snapshot;
                        }
                        let report =
                            reporter.build(&totals, self.history_summary().await, &last_portfolio);
                        reporter.emit(&report);
                    }
                }
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    totals.record_failure();
                    error!("Cycle failed ({} in a row): {:#}", consecutive_failures, e);
                }
            }

            if let Some(max) = self.settings.max_cycles {
                if self.cycles_started() >= max {
                    info!("Reached max cycles ({})", max);
                    break;
                }
            }

            let delay = backoff_delay(
                self.settings.interval,
                consecutive_failures,
                self.settings.error_backoff_max,
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested; stopping before next cycle");
                        break;
                    }
                }
            }
        }

        if self.settings.reports_enabled {
            if let Ok(snapshot) = self.deps.portfolio.snapshot().await {
                last_portfolio = snapshot;
            }
            let report = reporter.build(&totals, self.history_summary().await, &last_portfolio);
            reporter.emit(&report);
        }
        totals
    }
}

/// `interval` while healthy; `interval * 2^failures` capped at `max` otherwise.
pub fn backoff_delay(interval: Duration, consecutive_failures: u32, max: Duration) -> Duration {
    if consecutive_failures == 0 {
        return interval;
    }
    let factor = 2u32.saturating_pow(consecutive_failures.min(16));
    interval.saturating_mul(factor).min(max).max(interval.min(max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let interval = Duration::from_secs(60);
        let max = Duration::from_secs(600);
        assert_eq!(backoff_delay(interval, 0, max), Duration::from_secs(60));
        assert_eq!(backoff_delay(interval, 1, max), Duration::from_secs(120));
        assert_eq!(backoff_delay(interval, 2, max), Duration::from_secs(240));
        assert_eq!(backoff_delay(interval, 5, max), Duration::from_secs(600));
        assert_eq!(backoff_delay(interval, 40, max), Duration::from_secs(600));
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings = CycleSettings::from_config(&Config::default());
        assert_eq!(settings.tickers, vec!["AAPL", "TSLA", "GOOGL"]);
        assert_eq!(settings.confidence_threshold, 60.0);
        assert_eq!(settings.report_every_cycles, 10);
        assert!(!settings.dry_run);
    }
}
