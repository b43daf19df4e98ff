//! In-Memory Repository Implementations
//!
//! Thread-safe, in-memory implementation of the decision history defined in
//! `domain::repositories`. Uses `Arc<RwLock>` for concurrent access.
//!
//! # Limitations
//!
//! - Data is lost on application restart
//! - Limited by available RAM
//!
//! For durable history use `SqliteDecisionRepository`.

use crate::domain::decision::{DecisionRecord, ExecutionRecord};
use crate::domain::repositories::DecisionRepository;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of DecisionRepository
/// Suitable for testing and single-instance deployments
#[derive(Clone)]
pub struct InMemoryDecisionRepository {
    decisions: Arc<RwLock<Vec<DecisionRecord>>>,
    executions: Arc<RwLock<Vec<ExecutionRecord>>>,
}

impl InMemoryDecisionRepository {
    pub fn new() -> Self {
        Self {
            decisions: Arc::new(RwLock::new(Vec::new())),
            executions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn decision_count(&self) -> usize {
        self.decisions.read().await.len()
    }

    pub async fn execution_count(&self) -> usize {
        self.executions.read().await.len()
    }
}

impl Default for InMemoryDecisionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecisionRepository for InMemoryDecisionRepository {
    async fn append_decision(&self, record: &DecisionRecord) -> Result<()> {
        self.decisions.write().await.push(record.clone());
        Ok(())
    }

    async fn append_execution_result(&self, record: &ExecutionRecord) -> Result<()> {
        self.executions.write().await.push(record.clone());
        Ok(())
    }

    async fn read_recent(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        let decisions = self.decisions.read().await;
        Ok(decisions.iter().rev().take(limit).cloned().collect())
    }

    async fn read_recent_executions(&self, limit: usize) -> Result<Vec<ExecutionRecord>> {
        let executions = self.executions.read().await;
        Ok(executions.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fusion::DecisionFusionEngine;
    use crate::domain::config::FusionConfig;
    use crate::domain::decision::ExecutionStatus;
    use crate::domain::ml::policy::RlAggregate;
    use crate::domain::signal::TradeAction;
    use crate::domain::trading::portfolio::PortfolioSnapshot;
    use crate::domain::trading::types::OrderSide;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn record(ticker: &str, cycle: u64) -> DecisionRecord {
        let engine = DecisionFusionEngine::new(FusionConfig::default());
        let decision = engine.fuse(
            ticker,
            &BTreeMap::new(),
            None,
            &RlAggregate::with_action(TradeAction::Buy, 70.0),
            &PortfolioSnapshot::new(dec!(100000)),
        );
        DecisionRecord::new(cycle, decision)
    }

    #[tokio::test]
    async fn test_read_recent_is_newest_first() {
        let repo = InMemoryDecisionRepository::new();
        for (i, ticker) in ["AAPL", "MSFT", "NVDA"].iter().enumerate() {
            repo.append_decision(&record(ticker, i as u64)).await.unwrap();
        }

        let recent = repo.read_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].decision.ticker, "NVDA");
        assert_eq!(recent[1].decision.ticker, "MSFT");
        assert_eq!(repo.decision_count().await, 3);
    }

    #[tokio::test]
    async fn test_execution_results_are_kept_separately() {
        let repo = InMemoryDecisionRepository::new();
        let decision = record("AAPL", 1);
        repo.append_decision(&decision).await.unwrap();
        repo.append_execution_result(&ExecutionRecord::new(
            decision.id,
            "AAPL",
            OrderSide::Buy,
            5,
            ExecutionStatus::DryRun,
            None,
            "dry run",
        ))
        .await
        .unwrap();

        let executions = repo.read_recent_executions(10).await.unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].decision_id, decision.id);
        assert_eq!(repo.execution_count().await, 1);
    }
}
