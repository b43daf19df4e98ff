//! Decision Fusion Engine
//!
//! Combines the agent panel's directional signals with the RL ensemble's
//! aggregate into one sized [`Decision`] per ticker.
//!
//! Steps, in order:
//! 1. tally agent directions (the risk manager's capacity is converted into
//!    a direction and counted alongside) and take the strict-majority consensus
//! 2. classify alignment between consensus and the RL action
//! 3. size the quantity (see [`SizingEngine`])
//! 4. compose a deterministic rationale
//!
//! `fuse` never fails: any internal error or panic degrades to a flat HOLD.

use super::assessment;
use super::sizing::SizingEngine;
use crate::domain::config::FusionConfig;
use crate::domain::decision::{Alignment, Decision, DecisionAssessment, SignalCounts};
use crate::domain::errors::FusionError;
use crate::domain::ml::policy::RlAggregate;
use crate::domain::risk::RiskCapacity;
use crate::domain::signal::{Confidence, Direction, Signal, TradeAction};
use crate::domain::trading::portfolio::PortfolioSnapshot;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

const FULL_ALIGNMENT_CAP: f64 = 95.0;
const PARTIAL_ALIGNMENT_CAP: f64 = 90.0;
const PARTIAL_ALIGNMENT_DISCOUNT: f64 = 0.8;
const HOLD_CONFIDENCE: f64 = 50.0;
/// Average agent confidence assumed when no agent produced a signal.
const DEFAULT_AGENT_CONFIDENCE: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct DecisionFusionEngine {
    config: FusionConfig,
}

impl DecisionFusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuses one ticker's inputs into a decision.
    ///
    /// Deterministic: identical inputs give an identical `Decision`.
    pub fn fuse(
        &self,
        ticker: &str,
        agent_signals: &BTreeMap<String, Signal>,
        risk: Option<&RiskCapacity>,
        rl: &RlAggregate,
        portfolio: &PortfolioSnapshot,
    ) -> Decision {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.try_fuse(ticker, agent_signals, risk, rl, portfolio)
        }));

        match outcome {
            Ok(Ok(decision)) => decision,
            Ok(Err(e)) => {
                warn!("DecisionFusionEngine: Fusion failed for {}: {}", ticker, e);
                Self::degraded(ticker, risk, rl, &e.to_string())
            }
            Err(_) => {
                warn!("DecisionFusionEngine: Fusion panicked for {}", ticker);
                Self::degraded(ticker, risk, rl, "internal panic")
            }
        }
    }

    pub fn try_fuse(
        &self,
        ticker: &str,
        agent_signals: &BTreeMap<String, Signal>,
        risk: Option<&RiskCapacity>,
        rl: &RlAggregate,
        portfolio: &PortfolioSnapshot,
    ) -> Result<Decision, FusionError> {
        self.config
            .validate()
            .map_err(|e| FusionError::InvalidConfig {
                reason: e.to_string(),
            })?;
        if !rl.weighted_score.is_finite() {
            return Err(FusionError::NonFiniteValue {
                field: "rl.weighted_score".to_string(),
                value: rl.weighted_score,
            });
        }

        let risk_signal = risk
            .filter(|_| self.config.count_risk_in_consensus)
            .map(RiskCapacity::as_consensus_signal);
        let counted: Vec<&Signal> = agent_signals.values().chain(risk_signal.as_ref()).collect();

        let counts = SignalCounts::tally(counted.iter().map(|s| s.direction));
        let consensus = counts.consensus();

        let avg_agent_confidence = if counted.is_empty() {
            DEFAULT_AGENT_CONFIDENCE
        } else {
            counted.iter().map(|s| s.confidence.value()).sum::<f64>() / counted.len() as f64
        };
        let combined = (avg_agent_confidence + rl.confidence.value()) / 2.0;

        let (signal, alignment, raw_confidence) = match (consensus, rl.action) {
            (Direction::Bullish, TradeAction::Buy) => (
                TradeAction::Buy,
                Alignment::Full,
                combined.min(FULL_ALIGNMENT_CAP),
            ),
            (Direction::Bearish, TradeAction::Sell) => (
                TradeAction::Sell,
                Alignment::Full,
                combined.min(FULL_ALIGNMENT_CAP),
            ),
            // Agent bullishness outranks an RL SELL here, and an RL BUY
            // outranks agent bearishness.
            (Direction::Bullish, _) | (_, TradeAction::Buy) => (
                TradeAction::Buy,
                Alignment::Partial,
                (combined * PARTIAL_ALIGNMENT_DISCOUNT).min(PARTIAL_ALIGNMENT_CAP),
            ),
            (Direction::Bearish, _) | (_, TradeAction::Sell) => (
                TradeAction::Sell,
                Alignment::Partial,
                (combined * PARTIAL_ALIGNMENT_DISCOUNT).min(PARTIAL_ALIGNMENT_CAP),
            ),
            (Direction::Neutral, TradeAction::Hold) => {
                (TradeAction::Hold, Alignment::None, HOLD_CONFIDENCE)
            }
        };

        if !raw_confidence.is_finite() {
            return Err(FusionError::NonFiniteValue {
                field: "confidence".to_string(),
                value: raw_confidence,
            });
        }
        // Size from the exact confidence; only the reported value is rounded
        let exact_confidence = Confidence::new(raw_confidence);
        let confidence = exact_confidence.rounded();

        let sized = SizingEngine::calculate_quantity(
            &self.config,
            ticker,
            signal,
            exact_confidence,
            alignment,
            risk,
        )?;

        let rationale = [
            consensus_description(consensus, &counts),
            format!("RL ensemble suggests {}", rl.action),
            alignment.description().to_string(),
            sized.risk_note,
        ]
        .join(" | ");

        let decision = Decision {
            ticker: ticker.to_string(),
            signal,
            confidence,
            quantity: sized.quantity,
            agent_consensus: consensus,
            agent_signal_counts: counts,
            alignment,
            rl_decision: rl.clone(),
            risk_level: risk.map(|r| r.level),
            assessment: assessment::assess(counted.iter().copied(), portfolio),
            rationale,
        };

        debug!(
            "DecisionFusionEngine: {} consensus={} rl={} -> {} {} @ {}",
            ticker, consensus, rl.action, decision.signal, decision.quantity, decision.confidence
        );

        Ok(decision)
    }

    /// `{HOLD, 0, 0}` carrying the failure in its rationale.
    fn degraded(
        ticker: &str,
        risk: Option<&RiskCapacity>,
        rl: &RlAggregate,
        reason: &str,
    ) -> Decision {
        Decision {
            ticker: ticker.to_string(),
            signal: TradeAction::Hold,
            confidence: Confidence::ZERO,
            quantity: 0,
            agent_consensus: Direction::Neutral,
            agent_signal_counts: SignalCounts::default(),
            alignment: Alignment::Degraded,
            rl_decision: rl.clone(),
            risk_level: risk.map(|r| r.level),
            assessment: DecisionAssessment::default(),
            rationale: format!(
                "Error in decision fusion: {} | {}",
                reason,
                Alignment::Degraded.description()
            ),
        }
    }
}

fn consensus_description(consensus: Direction, counts: &SignalCounts) -> String {
    match consensus {
        Direction::Bullish => format!(
            "Strong bullish consensus from agents ({} bullish signals)",
            counts.bullish
        ),
        Direction::Bearish => format!(
            "Strong bearish consensus from agents ({} bearish signals)",
            counts.bearish
        ),
        Direction::Neutral => format!(
            "Mixed signals from agents (bullish: {}, bearish: {}, neutral: {})",
            counts.bullish, counts.bearish, counts.neutral
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::Rationale;
    use rust_decimal_macros::dec;

    fn signals(directions: &[(Direction, f64)]) -> BTreeMap<String, Signal> {
        directions
            .iter()
            .enumerate()
            .map(|(i, (d, c))| (format!("agent_{}", i), Signal::new(*d, *c, Rationale::default())))
            .collect()
    }

    fn engine() -> DecisionFusionEngine {
        DecisionFusionEngine::new(FusionConfig::default())
    }

    fn portfolio() -> PortfolioSnapshot {
        PortfolioSnapshot::new(dec!(100000))
    }

    #[test]
    fn test_full_alignment_buy() {
        let agents = signals(&[(Direction::Bullish, 80.0); 4]);
        let rl = RlAggregate::with_action(TradeAction::Buy, 90.0);
        let decision = engine().fuse("AAPL", &agents, None, &rl, &portfolio());

        assert_eq!(decision.signal, TradeAction::Buy);
        assert_eq!(decision.alignment, Alignment::Full);
        assert_eq!(decision.confidence.value(), 85.0);
        assert_eq!(decision.quantity, 85);
        assert!(decision.rationale.starts_with(
            "Strong bullish consensus from agents (4 bullish signals) | RL ensemble suggests BUY"
        ));
    }

    #[test]
    fn test_partial_alignment_discounts_confidence() {
        // avg(60, 60) * 0.8 = 48, quantity floor(100 * 0.48 * 0.7) = 33
        let agents = signals(&[(Direction::Neutral, 60.0)]);
        let rl = RlAggregate::with_action(TradeAction::Sell, 60.0);
        let decision = engine().fuse("AAPL", &agents, None, &rl, &portfolio());

        assert_eq!(decision.signal, TradeAction::Sell);
        assert_eq!(decision.alignment, Alignment::Partial);
        assert_eq!(decision.confidence.value(), 48.0);
        assert_eq!(decision.quantity, 33);
    }

    #[test]
    fn test_empty_agents_falls_back_to_hold() {
        let rl = RlAggregate::unavailable();
        let decision = engine().fuse("AAPL", &BTreeMap::new(), None, &rl, &portfolio());

        assert_eq!(decision.signal, TradeAction::Hold);
        assert_eq!(decision.confidence.value(), 50.0);
        assert_eq!(decision.quantity, 0);
        assert_eq!(decision.agent_consensus, Direction::Neutral);
        assert!(decision.rationale.contains("bullish: 0, bearish: 0, neutral: 0"));
    }

    #[test]
    fn test_risk_capacity_is_counted_in_consensus() {
        let agents = signals(&[(Direction::Bullish, 80.0), (Direction::Neutral, 40.0)]);
        let risk = RiskCapacity {
            level: crate::domain::risk::HeadroomLevel::High,
            confidence: Confidence::new(80.0),
            headroom_fraction: 0.2,
            max_position_value: dec!(20000),
            max_shares: Some(133),
            current_price: Some(150.0),
            rationale: Rationale::default(),
        };
        let rl = RlAggregate::with_action(TradeAction::Hold, 50.0);
        let decision = engine().fuse("AAPL", &agents, Some(&risk), &rl, &portfolio());

        assert_eq!(decision.agent_signal_counts.bullish, 2);
        assert_eq!(decision.agent_consensus, Direction::Bullish);
        assert_eq!(decision.signal, TradeAction::Buy);
        assert_eq!(decision.assessment.confidence_stats.count, 3);
    }

    #[test]
    fn test_non_finite_rl_score_degrades() {
        let mut rl = RlAggregate::with_action(TradeAction::Buy, 90.0);
        rl.weighted_score = f64::NAN;
        let agents = signals(&[(Direction::Bullish, 80.0)]);
        let decision = engine().fuse("AAPL", &agents, None, &rl, &portfolio());

        assert_eq!(decision.signal, TradeAction::Hold);
        assert_eq!(decision.confidence, Confidence::ZERO);
        assert_eq!(decision.quantity, 0);
        assert_eq!(decision.alignment, Alignment::Degraded);
        assert!(decision.rationale.starts_with("Error in decision fusion"));
    }

    #[test]
    fn test_invalid_config_degrades() {
        let config = FusionConfig {
            max_quantity: 0,
            ..FusionConfig::default()
        };
        let agents = signals(&[(Direction::Bullish, 80.0)]);
        let rl = RlAggregate::with_action(TradeAction::Buy, 90.0);
        let decision =
            DecisionFusionEngine::new(config).fuse("AAPL", &agents, None, &rl, &portfolio());
        assert_eq!(decision.alignment, Alignment::Degraded);
        assert!(decision.rationale.contains("max_quantity"));
    }

    #[test]
    fn test_fuse_is_idempotent() {
        let agents = signals(&[
            (Direction::Bullish, 71.3),
            (Direction::Bearish, 44.0),
            (Direction::Bullish, 65.5),
        ]);
        let rl = RlAggregate::with_action(TradeAction::Sell, 40.0);
        let first = engine().fuse("MSFT", &agents, None, &rl, &portfolio());
        let second = engine().fuse("MSFT", &agents, None, &rl, &portfolio());
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
