//! Weighted voting over the policy panel's outputs.

use crate::domain::errors::ModelError;
use crate::domain::ml::policy::{RlAggregate, RlVote};
use crate::domain::signal::{ActionCounts, Confidence, TradeAction};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Weighted scores beyond ±0.1 are directional.
pub const AGGREGATE_THRESHOLD: f64 = 0.1;
const MAX_DIRECTIONAL_CONFIDENCE: f64 = 95.0;
const HOLD_CONFIDENCE: f64 = 50.0;

#[derive(Debug, Clone, Default)]
pub struct RlAggregator;

impl RlAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Equal-weight vote over the models that produced an output.
    ///
    /// Every vote is weighted `1 / n_votes` on the +1/0/-1 scale. No votes
    /// at all yields `{HOLD, 0}` with an empty vote map.
    pub fn aggregate(&self, votes: &[RlVote]) -> RlAggregate {
        if votes.is_empty() {
            return RlAggregate::unavailable();
        }

        let weight = 1.0 / votes.len() as f64;
        let mut vote_map = BTreeMap::new();
        let mut counts = ActionCounts::default();
        let mut weighted_score = 0.0;

        for vote in votes {
            let numeric = vote.action.vote();
            weighted_score += f64::from(numeric) * weight;
            vote_map.insert(vote.model_name.clone(), numeric);
            counts.record(vote.action);
        }

        let action = if weighted_score > AGGREGATE_THRESHOLD {
            TradeAction::Buy
        } else if weighted_score < -AGGREGATE_THRESHOLD {
            TradeAction::Sell
        } else {
            TradeAction::Hold
        };
        let confidence = if action.is_directional() {
            (weighted_score.abs() * 100.0).min(MAX_DIRECTIONAL_CONFIDENCE)
        } else {
            HOLD_CONFIDENCE
        };

        debug!(
            "RlAggregator: score={:.3} votes=[{}] -> {} ({:.1})",
            weighted_score, counts, action, confidence
        );

        RlAggregate {
            action,
            confidence: Confidence::new(confidence),
            weighted_score,
            votes: vote_map,
            vote_counts: counts,
        }
    }

    /// Drops failed predictions (logged) and aggregates the rest.
    pub fn aggregate_results(&self, results: Vec<Result<RlVote, ModelError>>) -> RlAggregate {
        let votes: Vec<RlVote> = results
            .into_iter()
            .filter_map(|r| match r {
                Ok(vote) => Some(vote),
                Err(e) => {
                    warn!("Excluding policy from vote: {}", e);
                    None
                }
            })
            .collect();
        self.aggregate(&votes)
    }
}
