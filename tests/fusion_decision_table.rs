//! Every agent consensus x RL action combination pinned to one outcome.
//!
//! Branches are checked in order: full BUY, full SELL, then any bullish
//! side wins a partial BUY before any bearish side gets a partial SELL.

use fusiontrade::application::fusion::DecisionFusionEngine;
use fusiontrade::domain::config::FusionConfig;
use fusiontrade::domain::decision::Alignment;
use fusiontrade::domain::ml::policy::RlAggregate;
use fusiontrade::domain::signal::{Direction, Rationale, Signal, TradeAction};
use fusiontrade::domain::trading::portfolio::PortfolioSnapshot;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

fn agents(direction: Direction) -> BTreeMap<String, Signal> {
    ["technicals", "fundamentals", "valuation", "sentiment"]
        .iter()
        .map(|name| {
            (
                name.to_string(),
                Signal::new(direction, 80.0, Rationale::default()),
            )
        })
        .collect()
}

struct Case {
    consensus: Direction,
    rl: TradeAction,
    signal: TradeAction,
    alignment: Alignment,
    confidence: f64,
    quantity: u64,
}

const fn case(
    consensus: Direction,
    rl: TradeAction,
    signal: TradeAction,
    alignment: Alignment,
    confidence: f64,
    quantity: u64,
) -> Case {
    Case {
        consensus,
        rl,
        signal,
        alignment,
        confidence,
        quantity,
    }
}

// Agents at 80 and RL at 90 give a combined confidence of 85.
// Full: min(95, 85) = 85, quantity floor(100 * 0.85) = 85.
// Partial: 85 * 0.8 = 68, quantity floor(100 * 0.68 * 0.7) = 47.
const TABLE: [Case; 9] = [
    case(Direction::Bullish, TradeAction::Buy, TradeAction::Buy, Alignment::Full, 85.0, 85),
    case(Direction::Bullish, TradeAction::Sell, TradeAction::Buy, Alignment::Partial, 68.0, 47),
    case(Direction::Bullish, TradeAction::Hold, TradeAction::Buy, Alignment::Partial, 68.0, 47),
    case(Direction::Bearish, TradeAction::Buy, TradeAction::Buy, Alignment::Partial, 68.0, 47),
    case(Direction::Bearish, TradeAction::Sell, TradeAction::Sell, Alignment::Full, 85.0, 85),
    case(Direction::Bearish, TradeAction::Hold, TradeAction::Sell, Alignment::Partial, 68.0, 47),
    case(Direction::Neutral, TradeAction::Buy, TradeAction::Buy, Alignment::Partial, 68.0, 47),
    case(Direction::Neutral, TradeAction::Sell, TradeAction::Sell, Alignment::Partial, 68.0, 47),
    case(Direction::Neutral, TradeAction::Hold, TradeAction::Hold, Alignment::None, 50.0, 0),
];

#[test]
fn test_decision_table_is_exhaustive_and_pinned() {
    let engine = DecisionFusionEngine::new(FusionConfig::default());
    let portfolio = PortfolioSnapshot::new(dec!(100000));

    for c in TABLE.iter() {
        let rl = RlAggregate::with_action(c.rl, 90.0);
        let decision = engine.fuse("AAPL", &agents(c.consensus), None, &rl, &portfolio);
        let label = format!("{} x {}", c.consensus, c.rl);

        assert_eq!(decision.agent_consensus, c.consensus, "{}", label);
        assert_eq!(decision.signal, c.signal, "{}", label);
        assert_eq!(decision.alignment, c.alignment, "{}", label);
        assert_eq!(decision.confidence.value(), c.confidence, "{}", label);
        assert_eq!(decision.quantity, c.quantity, "{}", label);
        assert!(
            decision
                .rationale
                .contains(&format!("RL ensemble suggests {}", c.rl)),
            "{}: {}",
            label,
            decision.rationale
        );
    }
}

#[test]
fn test_hold_is_never_actionable() {
    let engine = DecisionFusionEngine::new(FusionConfig::default());
    let rl = RlAggregate::with_action(TradeAction::Hold, 90.0);
    let decision = engine.fuse(
        "AAPL",
        &agents(Direction::Neutral),
        None,
        &rl,
        &PortfolioSnapshot::new(dec!(100000)),
    );
    assert!(!decision.is_actionable(0.0));
}

#[test]
fn test_partial_confidence_stays_below_threshold_when_weak() {
    // (40 + 40) / 2 * 0.8 = 32, below the default gate of 60
    let mut weak = agents(Direction::Bullish);
    for signal in weak.values_mut() {
        *signal = Signal::new(Direction::Bullish, 40.0, Rationale::default());
    }
    let engine = DecisionFusionEngine::new(FusionConfig::default());
    let rl = RlAggregate::with_action(TradeAction::Hold, 40.0);
    let decision = engine.fuse(
        "AAPL",
        &weak,
        None,
        &rl,
        &PortfolioSnapshot::new(dec!(100000)),
    );
    assert_eq!(decision.signal, TradeAction::Buy);
    assert_eq!(decision.confidence.value(), 32.0);
    assert!(!decision.is_actionable(engine.config().confidence_threshold));
}

#[test]
fn test_quantity_truncates_unrounded_confidence() {
    // avg 79.9975 with RL 90 gives 84.99875: reported as 85, sized as 84
    let mut near = agents(Direction::Bullish);
    if let Some(signal) = near.get_mut("sentiment") {
        *signal = Signal::new(Direction::Bullish, 79.99, Rationale::default());
    }
    let engine = DecisionFusionEngine::new(FusionConfig::default());
    let rl = RlAggregate::with_action(TradeAction::Buy, 90.0);
    let decision = engine.fuse(
        "AAPL",
        &near,
        None,
        &rl,
        &PortfolioSnapshot::new(dec!(100000)),
    );
    assert_eq!(decision.alignment, Alignment::Full);
    assert_eq!(decision.confidence.value(), 85.0);
    assert_eq!(decision.quantity, 84);
}
