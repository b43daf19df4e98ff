use crate::domain::signal::{ActionCounts, Confidence, TradeAction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Continuous outputs beyond this magnitude count as a directional vote.
pub const CONTINUOUS_ACTION_THRESHOLD: f64 = 0.5;

/// Raw output of one policy model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PolicyOutput {
    Discrete(TradeAction),
    Continuous(f64),
}

impl PolicyOutput {
    pub fn as_action(self) -> TradeAction {
        match self {
            PolicyOutput::Discrete(action) => action,
            PolicyOutput::Continuous(v) if v > CONTINUOUS_ACTION_THRESHOLD => TradeAction::Buy,
            PolicyOutput::Continuous(v) if v < -CONTINUOUS_ACTION_THRESHOLD => TradeAction::Sell,
            // NaN falls through here as well
            PolicyOutput::Continuous(_) => TradeAction::Hold,
        }
    }

    /// Certainty of a single vote in [0, 1]: 1 for a class label, the
    /// output magnitude for a continuous action.
    pub fn confidence(self) -> f64 {
        match self {
            PolicyOutput::Discrete(_) => 1.0,
            PolicyOutput::Continuous(v) if v.is_finite() => v.abs().min(1.0),
            PolicyOutput::Continuous(_) => 0.0,
        }
    }

    pub fn raw(self) -> f64 {
        match self {
            PolicyOutput::Discrete(action) => f64::from(action.vote()),
            PolicyOutput::Continuous(v) => v,
        }
    }
}

/// One model's vote within a single aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RlVote {
    pub model_name: String,
    pub action: TradeAction,
    pub confidence: f64,
    pub raw: f64,
}

impl RlVote {
    pub fn new(model_name: impl Into<String>, output: PolicyOutput) -> Self {
        Self {
            model_name: model_name.into(),
            action: output.as_action(),
            confidence: output.confidence(),
            raw: output.raw(),
        }
    }
}

/// Ensemble output consumed by the fusion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RlAggregate {
    pub action: TradeAction,
    pub confidence: Confidence,
    pub weighted_score: f64,
    /// Model name to vote on the +1/0/-1 scale.
    pub votes: BTreeMap<String, i8>,
    pub vote_counts: ActionCounts,
}

impl RlAggregate {
    /// `{HOLD, 0}` with an empty vote map: nothing was available to vote.
    pub fn unavailable() -> Self {
        Self {
            action: TradeAction::Hold,
            confidence: Confidence::ZERO,
            weighted_score: 0.0,
            votes: BTreeMap::new(),
            vote_counts: ActionCounts::default(),
        }
    }

    pub fn with_action(action: TradeAction, confidence: f64) -> Self {
        Self {
            action,
            confidence: Confidence::new(confidence),
            weighted_score: f64::from(action.vote()),
            votes: BTreeMap::new(),
            vote_counts: ActionCounts::default(),
        }
    }
}
