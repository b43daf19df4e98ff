//! End-to-end fusion scenarios over the agent panel and the fusion engine.

use fusiontrade::application::agents::{
    AgentContext, AgentPanel, FundamentalsAgent, RiskManagerAgent, SentimentAgent, SignalAgent,
    TechnicalsAgent, ValuationAgent,
};
use fusiontrade::application::fusion::DecisionFusionEngine;
use fusiontrade::domain::config::{FusionConfig, RiskLimits};
use fusiontrade::domain::decision::Alignment;
use fusiontrade::domain::ml::policy::RlAggregate;
use fusiontrade::domain::risk::{HeadroomLevel, RiskCapacity};
use fusiontrade::domain::signal::{Confidence, Direction, Rationale, Signal, TradeAction};
use fusiontrade::domain::trading::portfolio::PortfolioSnapshot;
use fusiontrade::domain::trading::types::DateRange;
use fusiontrade::infrastructure::simulation::{SimulatedFundamentals, SimulatedInsiderTrades};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;

fn bullish_agents(count: usize) -> BTreeMap<String, Signal> {
    (0..count)
        .map(|i| {
            (
                format!("agent_{}", i),
                Signal::new(Direction::Bullish, 80.0, Rationale::default()),
            )
        })
        .collect()
}

fn capacity(level: HeadroomLevel) -> RiskCapacity {
    RiskCapacity {
        level,
        confidence: level.confidence(),
        headroom_fraction: 0.2,
        max_position_value: dec!(20000),
        max_shares: Some(1000),
        current_price: Some(20.0),
        rationale: Rationale::default(),
    }
}

fn portfolio() -> PortfolioSnapshot {
    PortfolioSnapshot::new(dec!(100000))
}

#[test]
fn scenario_a_full_bullish_alignment_with_high_headroom() {
    // Three bullish agents plus the risk manager reporting high headroom
    // (bullish, 80): four bullish votes at 80.
    let engine = DecisionFusionEngine::new(FusionConfig::default());
    let rl = RlAggregate::with_action(TradeAction::Buy, 90.0);
    let risk = capacity(HeadroomLevel::High);
    let decision = engine.fuse("AAPL", &bullish_agents(3), Some(&risk), &rl, &portfolio());

    assert_eq!(decision.agent_consensus, Direction::Bullish);
    assert_eq!(decision.agent_signal_counts.bullish, 4);
    assert_eq!(decision.alignment, Alignment::Full);
    assert_eq!(decision.confidence.value(), 85.0);
    // floor(100 * 0.85) = 85, then x1.2 for high headroom
    assert_eq!(decision.quantity, 102);
    assert_eq!(decision.risk_level, Some(HeadroomLevel::High));
    assert!(decision.rationale.contains("Risk adjustment: high headroom (x1.20)"));
}

#[test]
fn scenario_a_low_headroom_halves_the_order() {
    // bullish 80 x3 + low headroom (bearish, 70): avg 77.5, combined 83.75
    let engine = DecisionFusionEngine::new(FusionConfig::default());
    let rl = RlAggregate::with_action(TradeAction::Buy, 90.0);
    let risk = capacity(HeadroomLevel::Low);
    let decision = engine.fuse("AAPL", &bullish_agents(3), Some(&risk), &rl, &portfolio());

    assert_eq!(decision.alignment, Alignment::Full);
    assert_eq!(decision.confidence.value(), 83.75);
    // floor(83.75) = 83, floor(83 * 0.5) = 41
    assert_eq!(decision.quantity, 41);
}

#[test]
fn scenario_a_moderate_headroom_leaves_quantity_unchanged() {
    // bullish 80 x3 + moderate headroom (neutral, 60): avg 75, combined 82.5
    let engine = DecisionFusionEngine::new(FusionConfig::default());
    let rl = RlAggregate::with_action(TradeAction::Buy, 90.0);
    let risk = capacity(HeadroomLevel::Moderate);
    let decision = engine.fuse("AAPL", &bullish_agents(3), Some(&risk), &rl, &portfolio());

    assert_eq!(decision.confidence.value(), 82.5);
    assert_eq!(decision.quantity, 82);
    assert!(decision.rationale.contains("Risk adjustment: none (moderate headroom)"));
}

#[test]
fn scenario_b_all_neutral_and_rl_hold() {
    let engine = DecisionFusionEngine::new(FusionConfig::default());
    let agents: BTreeMap<String, Signal> = ["technicals", "fundamentals", "valuation", "sentiment"]
        .iter()
        .map(|n| (n.to_string(), Signal::new(Direction::Neutral, 30.0, Rationale::default())))
        .collect();
    let rl = RlAggregate::with_action(TradeAction::Hold, 50.0);
    let risk = capacity(HeadroomLevel::Moderate);
    let decision = engine.fuse("AAPL", &agents, Some(&risk), &rl, &portfolio());

    assert_eq!(decision.signal, TradeAction::Hold);
    assert_eq!(decision.confidence, Confidence::new(50.0));
    assert_eq!(decision.quantity, 0);
    assert_eq!(decision.alignment, Alignment::None);
}

#[test]
fn scenario_c_bullish_agents_against_rl_sell_buy_partially() {
    let engine = DecisionFusionEngine::new(FusionConfig::default());
    let mut agents = bullish_agents(3);
    agents.insert(
        "agent_bear".to_string(),
        Signal::new(Direction::Bearish, 80.0, Rationale::default()),
    );
    let rl = RlAggregate::with_action(TradeAction::Sell, 90.0);
    let decision = engine.fuse("AAPL", &agents, None, &rl, &portfolio());

    assert_eq!(decision.agent_consensus, Direction::Bullish);
    assert_eq!(decision.signal, TradeAction::Buy);
    assert_eq!(decision.alignment, Alignment::Partial);
    // (80 + 90) / 2 * 0.8 = 68, floor(100 * 0.68 * 0.7) = 47
    assert_eq!(decision.confidence.value(), 68.0);
    assert_eq!(decision.quantity, 47);
    assert!(decision.rationale.contains("RL ensemble suggests SELL"));
}

#[tokio::test]
async fn scenario_d_empty_price_history_still_decides() {
    let fundamentals = Arc::new(SimulatedFundamentals::new(11));
    let agents: Vec<Arc<dyn SignalAgent>> = vec![
        Arc::new(TechnicalsAgent::new()),
        Arc::new(FundamentalsAgent::new(fundamentals.clone())),
        Arc::new(ValuationAgent::new(fundamentals)),
        Arc::new(SentimentAgent::new(Arc::new(SimulatedInsiderTrades::new(11)))),
    ];
    let panel = AgentPanel::new(agents, Some(RiskManagerAgent::new(RiskLimits::default())));

    let end = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
    let ctx = Arc::new(AgentContext {
        ticker: "TSLA".to_string(),
        range: DateRange::ending(end, 365),
        portfolio: Arc::new(portfolio()),
        prices: Arc::from(Vec::new()),
    });
    let report = panel.evaluate(ctx).await;

    let technicals = &report.signals["technicals"];
    assert_eq!(technicals.direction, Direction::Neutral);
    assert_eq!(technicals.confidence, Confidence::ZERO);
    let risk = report.risk.clone().expect("risk manager configured");
    assert_eq!(risk.level, HeadroomLevel::Unknown);
    assert_eq!(risk.max_position_value, Decimal::ZERO);
    // Missing prices is a data gap, not an agent failure
    assert!(report.failures.iter().all(|f| f.agent != "technicals"));

    let engine = DecisionFusionEngine::new(FusionConfig::default());
    let decision = engine.fuse(
        "TSLA",
        &report.signals,
        report.risk.as_ref(),
        &RlAggregate::unavailable(),
        &portfolio(),
    );
    assert_eq!(decision.ticker, "TSLA");
    assert_ne!(decision.alignment, Alignment::Degraded);
    assert_eq!(decision.agent_signal_counts.total(), 5);
}
