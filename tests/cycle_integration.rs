//! Full cycles against a flat market, the paper broker and an in-memory store.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, Duration as ChronoDuration, Weekday};
use fusiontrade::application::agents::{AgentContext, AgentPanel, RiskManagerAgent, SignalAgent};
use fusiontrade::application::fusion::DecisionFusionEngine;
use fusiontrade::application::ml::{ModelKind, PolicyModel, PolicyPanel};
use fusiontrade::application::system::{
    CycleDependencies, CycleOrchestrator, CycleSettings, ShutdownService,
};
use fusiontrade::domain::config::{FusionConfig, RiskLimits};
use fusiontrade::domain::decision::{Alignment, ExecutionStatus};
use fusiontrade::domain::errors::{AgentError, ExecutionError, ModelError};
use fusiontrade::domain::ml::feature_registry::Observation;
use fusiontrade::domain::ml::policy::PolicyOutput;
use fusiontrade::domain::ports::{ExecutionSink, MarketDataSource, PortfolioProvider};
use fusiontrade::domain::repositories::DecisionRepository;
use fusiontrade::domain::signal::{Direction, Rationale, Signal, TradeAction};
use fusiontrade::domain::trading::types::{Candle, DateRange, OrderConfirmation, OrderRequest};
use fusiontrade::infrastructure::InMemoryDecisionRepository;
use fusiontrade::infrastructure::observability::Metrics;
use fusiontrade::infrastructure::simulation::PaperBroker;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

const PRICE: f64 = 50.0;

/// Flat market at a fixed price. `GAP` has no history at all.
struct FlatMarket;

#[async_trait]
impl MarketDataSource for FlatMarket {
    async fn get_prices(&self, ticker: &str, range: &DateRange) -> Result<Vec<Candle>> {
        if ticker == "GAP" {
            return Ok(Vec::new());
        }
        let mut candles = Vec::new();
        let mut date = range.end;
        while date >= range.start && candles.len() < 120 {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                candles.push(Candle {
                    date,
                    open: PRICE,
                    high: PRICE + 0.5,
                    low: PRICE - 0.5,
                    close: PRICE,
                    volume: 1_000_000.0,
                });
            }
            date -= ChronoDuration::days(1);
        }
        candles.reverse();
        Ok(candles)
    }
}

/// Bullish whenever there is price history.
struct Bullish(&'static str);

#[async_trait]
impl SignalAgent for Bullish {
    fn name(&self) -> &'static str {
        self.0
    }

    async fn analyze(&self, ctx: &AgentContext) -> Result<Signal, AgentError> {
        if ctx.prices.is_empty() {
            return Err(AgentError::DataUnavailable {
                ticker: ctx.ticker.clone(),
                what: "price history".to_string(),
            });
        }
        Ok(Signal::new(Direction::Bullish, 80.0, Rationale::default()))
    }
}

struct Broken;

#[async_trait]
impl SignalAgent for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn analyze(&self, ctx: &AgentContext) -> Result<Signal, AgentError> {
        Err(AgentError::SourceFailed {
            ticker: ctx.ticker.clone(),
            reason: "upstream timeout".to_string(),
        })
    }
}

struct Panicky;

#[async_trait]
impl SignalAgent for Panicky {
    fn name(&self) -> &'static str {
        "panicky"
    }

    async fn analyze(&self, _ctx: &AgentContext) -> Result<Signal, AgentError> {
        panic!("division by zero in agent")
    }
}

struct AlwaysBuy;

impl PolicyModel for AlwaysBuy {
    fn predict(&self, _observation: &Observation) -> Result<PolicyOutput, ModelError> {
        Ok(PolicyOutput::Discrete(TradeAction::Buy))
    }
    fn name(&self) -> &str {
        "ppo"
    }
    fn kind(&self) -> ModelKind {
        ModelKind::Discrete
    }
}

/// Rejects every order for the listed tickers and fills the rest.
struct RejectingBroker {
    inner: Arc<PaperBroker>,
    rejected: Vec<&'static str>,
}

#[async_trait]
impl ExecutionSink for RejectingBroker {
    async fn submit_order(
        &self,
        order: &OrderRequest,
    ) -> std::result::Result<OrderConfirmation, ExecutionError> {
        if self.rejected.contains(&order.ticker.as_str()) {
            return Err(ExecutionError::Rejected {
                ticker: order.ticker.clone(),
                reason: "halted".to_string(),
            });
        }
        self.inner.submit_order(order).await
    }
}

struct Harness {
    orchestrator: CycleOrchestrator,
    broker: Arc<PaperBroker>,
    repository: InMemoryDecisionRepository,
}

fn harness(tickers: &[&str], dry_run: bool, max_cycles: Option<u64>) -> Harness {
    harness_with(tickers, dry_run, max_cycles, dec!(100000), true, Vec::new())
}

fn harness_with(
    tickers: &[&str],
    dry_run: bool,
    max_cycles: Option<u64>,
    cash: Decimal,
    with_risk_manager: bool,
    rejected: Vec<&'static str>,
) -> Harness {
    let market: Arc<dyn MarketDataSource> = Arc::new(FlatMarket);
    let broker = Arc::new(PaperBroker::new(cash, Arc::clone(&market)));
    let execution: Arc<dyn ExecutionSink> = if rejected.is_empty() {
        broker.clone()
    } else {
        Arc::new(RejectingBroker {
            inner: broker.clone(),
            rejected,
        })
    };
    let repository = InMemoryDecisionRepository::new();

    let agents: Vec<Arc<dyn SignalAgent>> = vec![
        Arc::new(Bullish("technicals")),
        Arc::new(Bullish("fundamentals")),
        Arc::new(Bullish("sentiment")),
        Arc::new(Broken),
        Arc::new(Panicky),
    ];
    let risk = with_risk_manager.then(|| RiskManagerAgent::new(RiskLimits::default()));
    let panel = AgentPanel::new(agents, risk);
    let policies = Arc::new(PolicyPanel::from_models(vec![Arc::new(AlwaysBuy)]));

    let settings = CycleSettings {
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        lookback_days: 365,
        max_concurrent_tickers: 2,
        confidence_threshold: 60.0,
        dry_run,
        interval: Duration::from_millis(10),
        max_cycles,
        error_backoff_max: Duration::from_millis(50),
        reports_enabled: true,
        report_every_cycles: 1,
    };
    let deps = CycleDependencies {
        market_data: market,
        portfolio: broker.clone(),
        execution,
        repository: Arc::new(repository.clone()),
    };
    let orchestrator = CycleOrchestrator::new(
        settings,
        deps,
        panel,
        policies,
        DecisionFusionEngine::new(FusionConfig::default()),
        Metrics::new().expect("metrics registry"),
    );

    Harness {
        orchestrator,
        broker,
        repository,
    }
}

#[tokio::test]
async fn test_dry_run_cycle_records_without_trading() {
    let h = harness(&["AAPL", "GAP"], true, Some(1));
    let summary = h.orchestrator.run_cycle().await.expect("cycle runs");

    assert_eq!(summary.cycle, 1);
    assert_eq!(summary.tickers_analyzed, 2);
    assert_eq!(summary.decisions.len(), 2);
    assert_eq!(summary.decisions[0].ticker, "AAPL");
    assert_eq!(summary.decisions[1].ticker, "GAP");

    // 3 bullish agents + high headroom vs 2 failed agents; RL BUY at 95
    let aapl = &summary.decisions[0];
    assert_eq!(aapl.signal, TradeAction::Buy);
    assert_eq!(aapl.alignment, Alignment::Full);
    assert_eq!(aapl.quantity, 88);

    let gap = &summary.decisions[1];
    assert_eq!(gap.signal, TradeAction::Hold);
    assert_eq!(gap.quantity, 0);

    assert_eq!(summary.executions.len(), 1);
    assert_eq!(summary.executions[0].status, ExecutionStatus::DryRun);
    assert_eq!(summary.executions[0].quantity, 88);
    assert_eq!(summary.trades_executed, 0);

    // Both failing agents are reported for both tickers
    assert_eq!(summary.errors.iter().filter(|e| e.contains("broken")).count(), 2);
    assert_eq!(summary.errors.iter().filter(|e| e.contains("panicky")).count(), 2);

    assert_eq!(h.repository.decision_count().await, 2);
    assert_eq!(h.repository.execution_count().await, 1);

    let portfolio = h.broker.snapshot().await.expect("snapshot");
    assert_eq!(portfolio.cash, dec!(100000));
    assert_eq!(portfolio.open_positions(), 0);
}

#[tokio::test]
async fn test_live_cycle_fills_through_the_paper_broker() {
    let h = harness(&["AAPL"], false, Some(1));
    let summary = h.orchestrator.run_cycle().await.expect("cycle runs");

    assert_eq!(summary.trades_executed, 1);
    let execution = &summary.executions[0];
    assert_eq!(execution.status, ExecutionStatus::Filled);
    assert!(execution.order_id.is_some());

    let portfolio = h.broker.snapshot().await.expect("snapshot");
    assert_eq!(portfolio.shares_held("AAPL"), Decimal::from(88));
    assert_eq!(portfolio.cash, dec!(100000) - dec!(50) * Decimal::from(88));

    let recent = h.repository.read_recent(10).await.expect("read decisions");
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].decision.ticker, "AAPL");
    let executions = h.repository.read_recent_executions(10).await.expect("read executions");
    assert_eq!(executions[0].decision_id, recent[0].id);
}

#[tokio::test]
async fn test_rejected_order_does_not_consume_cash_for_later_tickers() {
    // Without a risk manager: 3 bullish at 80 and 2 failed at 0 average 48,
    // combined with RL BUY 95 that is 71.5, so 71 shares of each at 50.
    // 6000 cash covers one order of 3550 but not two.
    let h = harness_with(&["AAA", "BBB"], false, Some(1), dec!(6000), false, vec!["AAA"]);
    let summary = h.orchestrator.run_cycle().await.expect("cycle runs");

    assert_eq!(summary.decisions[0].quantity, 71);
    assert_eq!(summary.decisions[1].quantity, 71);

    assert_eq!(summary.executions.len(), 2);
    assert_eq!(summary.executions[0].ticker, "AAA");
    assert_eq!(summary.executions[0].status, ExecutionStatus::Rejected);
    assert_eq!(summary.executions[1].ticker, "BBB");
    assert_eq!(summary.executions[1].status, ExecutionStatus::Filled);
    assert_eq!(summary.executions[1].quantity, 71);
    assert_eq!(summary.trades_executed, 1);
    assert!(summary.errors.iter().any(|e| e.contains("AAA: execution failed")));

    let portfolio = h.broker.snapshot().await.expect("snapshot");
    assert_eq!(portfolio.shares_held("AAA"), Decimal::ZERO);
    assert_eq!(portfolio.shares_held("BBB"), Decimal::from(71));
}

#[tokio::test]
async fn test_run_stops_at_max_cycles() {
    let h = harness(&["AAPL", "GAP"], true, Some(3));
    let (shutdown, _rx) = ShutdownService::new();

    let totals = h.orchestrator.run(shutdown.subscribe()).await;

    assert_eq!(totals.cycles_completed, 3);
    assert_eq!(totals.cycles_failed, 0);
    assert_eq!(totals.decisions, 6);
    assert_eq!(totals.trades_executed, 0);
    assert_eq!(h.repository.decision_count().await, 6);
}

#[tokio::test]
async fn test_shutdown_before_start_runs_no_cycle() {
    let h = harness(&["AAPL"], true, None);
    let (shutdown, _rx) = ShutdownService::new();
    shutdown.request("test");

    let totals = h.orchestrator.run(shutdown.subscribe()).await;

    assert_eq!(totals.cycles_completed, 0);
    assert_eq!(h.orchestrator.cycles_started(), 0);
    assert_eq!(h.repository.decision_count().await, 0);
}
