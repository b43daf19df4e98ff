//! Fused decisions and their persisted records.

use crate::domain::ml::policy::RlAggregate;
use crate::domain::risk::HeadroomLevel;
use crate::domain::signal::{Confidence, Direction, TradeAction};
use crate::domain::trading::types::OrderSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Bullish / bearish / neutral tally over agent signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounts {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

impl SignalCounts {
    pub fn tally<I: IntoIterator<Item = Direction>>(directions: I) -> Self {
        let mut counts = Self::default();
        for direction in directions {
            match direction {
                Direction::Bullish => counts.bullish += 1,
                Direction::Bearish => counts.bearish += 1,
                Direction::Neutral => counts.neutral += 1,
            }
        }
        counts
    }

    /// Whichever bucket is strictly larger than both others; neutral otherwise.
    pub fn consensus(&self) -> Direction {
        if self.bullish > self.bearish && self.bullish > self.neutral {
            Direction::Bullish
        } else if self.bearish > self.bullish && self.bearish > self.neutral {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    pub fn total(&self) -> usize {
        self.bullish + self.bearish + self.neutral
    }

    /// Number of distinct directions present.
    pub fn distinct(&self) -> usize {
        [self.bullish, self.bearish, self.neutral]
            .iter()
            .filter(|c| **c > 0)
            .count()
    }
}

/// How agent consensus and the RL ensemble relate for one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Agents and RL point the same way.
    Full,
    /// Only one side is directional, or the two conflict.
    Partial,
    /// Neither side is directional.
    None,
    /// Fusion failed internally and fell back to a flat HOLD.
    Degraded,
}

impl Alignment {
    pub fn quantity_multiplier(self) -> f64 {
        match self {
            Alignment::Full => 1.0,
            Alignment::Partial => 0.7,
            Alignment::None | Alignment::Degraded => 0.0,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Alignment::Full => "Strong alignment between agents and RL - high confidence trade",
            Alignment::Partial => "Partial alignment - moderate confidence trade",
            Alignment::None => "No clear directional signal - holding position",
            Alignment::Degraded => "Decision degraded to HOLD after an internal error",
        }
    }
}

/// Final fused output for one ticker.
///
/// Carries no timestamps: identical inputs produce identical decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub ticker: String,
    pub signal: TradeAction,
    pub confidence: Confidence,
    pub quantity: u64,
    pub agent_consensus: Direction,
    pub agent_signal_counts: SignalCounts,
    pub alignment: Alignment,
    pub rl_decision: RlAggregate,
    pub risk_level: Option<HeadroomLevel>,
    pub assessment: DecisionAssessment,
    pub rationale: String,
}

impl Decision {
    pub fn is_actionable(&self, confidence_threshold: f64) -> bool {
        self.signal.is_directional()
            && self.confidence.value() > confidence_threshold
            && self.quantity > 0
    }
}

/// Summary statistics over the agent confidences behind a decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStats {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub std_dev: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// HIGH above two factors, MEDIUM with any, LOW otherwise.
    pub fn from_factor_count(count: usize) -> Self {
        match count {
            0 => RiskLevel::Low,
            1 | 2 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Portfolio and signal-quality risk attached to a decision for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionAssessment {
    pub confidence_stats: ConfidenceStats,
    pub risk_factors: Vec<String>,
    pub risk_level: RiskLevel,
}

/// A decision as stored by the history collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: Uuid,
    pub cycle: u64,
    pub decided_at: DateTime<Utc>,
    pub decision: Decision,
}

impl DecisionRecord {
    pub fn new(cycle: u64, decision: Decision) -> Self {
        Self {
            id: Uuid::new_v4(),
            cycle,
            decided_at: Utc::now(),
            decision,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Filled,
    Rejected,
    DryRun,
    /// Gated out after sizing against the ledger (no cash / no shares).
    Skipped,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Filled => "filled",
            ExecutionStatus::Rejected => "rejected",
            ExecutionStatus::DryRun => "dry_run",
            ExecutionStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = crate::domain::signal::UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filled" => Ok(ExecutionStatus::Filled),
            "rejected" => Ok(ExecutionStatus::Rejected),
            "dry_run" => Ok(ExecutionStatus::DryRun),
            "skipped" => Ok(ExecutionStatus::Skipped),
            _ => Err(crate::domain::signal::UnknownLabel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub decision_id: Uuid,
    pub ticker: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub status: ExecutionStatus,
    pub order_id: Option<String>,
    pub message: String,
    pub executed_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn new(
        decision_id: Uuid,
        ticker: impl Into<String>,
        side: OrderSide,
        quantity: u64,
        status: ExecutionStatus,
        order_id: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            decision_id,
            ticker: ticker.into(),
            side,
            quantity,
            status,
            order_id,
            message: message.into(),
            executed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consensus_requires_strict_majority() {
        use Direction::*;
        assert_eq!(SignalCounts::tally([Bullish, Bullish, Bearish]).consensus(), Bullish);
        assert_eq!(SignalCounts::tally([Bullish, Bearish]).consensus(), Neutral);
        assert_eq!(SignalCounts::tally([Bearish, Bearish, Neutral, Neutral]).consensus(), Neutral);
        assert_eq!(SignalCounts::tally([Bearish, Bearish, Neutral, Bullish]).consensus(), Bearish);
        assert_eq!(SignalCounts::tally([]).consensus(), Neutral);
    }

    #[test]
    fn test_distinct_directions() {
        use Direction::*;
        assert_eq!(SignalCounts::tally([Bullish, Bullish]).distinct(), 1);
        assert_eq!(SignalCounts::tally([Bullish, Bearish, Neutral]).distinct(), 3);
        assert_eq!(SignalCounts::default().distinct(), 0);
    }

    #[test]
    fn test_alignment_multipliers() {
        assert_eq!(Alignment::Full.quantity_multiplier(), 1.0);
        assert_eq!(Alignment::Partial.quantity_multiplier(), 0.7);
        assert_eq!(Alignment::None.quantity_multiplier(), 0.0);
        assert_eq!(Alignment::Degraded.quantity_multiplier(), 0.0);
    }

    #[test]
    fn test_risk_level_from_factor_count() {
        assert_eq!(RiskLevel::from_factor_count(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_factor_count(2), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_factor_count(3), RiskLevel::High);
    }

    #[test]
    fn test_execution_status_labels() {
        for status in [
            ExecutionStatus::Filled,
            ExecutionStatus::Rejected,
            ExecutionStatus::DryRun,
            ExecutionStatus::Skipped,
        ] {
            assert_eq!(status.as_str().parse::<ExecutionStatus>().unwrap(), status);
        }
    }
}
