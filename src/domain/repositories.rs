//! Repository Pattern Abstractions
//!
//! This module defines the decision history store used for analytics and
//! performance reporting. Nothing in the decision logic reads from it.
//!
//! # Implementations
//!
//! - `InMemoryDecisionRepository`: thread-safe, in-memory storage using
//!   `Arc<RwLock>` for tests and ephemeral runs
//! - `SqliteDecisionRepository`: sqlite-backed storage via sqlx
//!
//! # Example
//!
//! ```rust,no_run
//! use fusiontrade::domain::repositories::DecisionRepository;
//! use fusiontrade::infrastructure::InMemoryDecisionRepository;
//!
//! # async {
//! let repo = InMemoryDecisionRepository::new();
//! let recent = repo.read_recent(10).await.unwrap();
//! assert!(recent.is_empty());
//! # };
//! ```

use crate::domain::decision::{DecisionRecord, ExecutionRecord};
use anyhow::Result;
use async_trait::async_trait;

/// Append-only history of decisions and execution outcomes
#[async_trait]
pub trait DecisionRepository: Send + Sync {
    /// Append one fused decision
    async fn append_decision(&self, record: &DecisionRecord) -> Result<()>;

    /// Append the outcome of forwarding a decision to execution
    async fn append_execution_result(&self, record: &ExecutionRecord) -> Result<()>;

    /// Most recent decisions, newest first
    async fn read_recent(&self, limit: usize) -> Result<Vec<DecisionRecord>>;

    /// Most recent execution results, newest first
    async fn read_recent_executions(&self, limit: usize) -> Result<Vec<ExecutionRecord>>;
}
