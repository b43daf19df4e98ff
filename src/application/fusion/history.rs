use crate::domain::decision::Decision;
use crate::domain::signal::ActionCounts;
use serde::Serialize;
use std::collections::VecDeque;

/// Window used by [`DecisionHistory::summary`].
pub const SUMMARY_WINDOW: usize = 10;

/// Rolling window of the last K decisions, kept for performance reporting.
///
/// Nothing in the decision path reads it back.
#[derive(Debug, Clone)]
pub struct DecisionHistory {
    capacity: usize,
    decisions: VecDeque<Decision>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub total_decisions: usize,
    pub recent_average_confidence: f64,
    pub recent_distribution: ActionCounts,
}

impl DecisionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            decisions: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, decision: Decision) {
        if self.decisions.len() == self.capacity {
            self.decisions.pop_front();
        }
        self.decisions.push_back(decision);
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().rev().take(limit)
    }

    pub fn summary(&self) -> HistorySummary {
        if self.decisions.is_empty() {
            return HistorySummary::default();
        }

        let recent: Vec<&Decision> = self.recent(SUMMARY_WINDOW).collect();
        let average = recent.iter().map(|d| d.confidence.value()).sum::<f64>() / recent.len() as f64;

        HistorySummary {
            total_decisions: self.decisions.len(),
            recent_average_confidence: (average * 100.0).round() / 100.0,
            recent_distribution: recent.iter().map(|d| d.signal).collect(),
        }
    }
}
