use crate::domain::decision::{DecisionRecord, ExecutionRecord, ExecutionStatus};
use crate::domain::repositories::DecisionRepository;
use crate::domain::trading::types::OrderSide;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Decision history in sqlite. The full decision is kept as JSON next to
/// the columns used for filtering.
pub struct SqliteDecisionRepository {
    pool: SqlitePool,
}

impl SqliteDecisionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DecisionRepository for SqliteDecisionRepository {
    async fn append_decision(&self, record: &DecisionRecord) -> Result<()> {
        let payload = serde_json::to_string(&record.decision).context("Failed to encode decision")?;
        sqlx::query(
            r#"
            INSERT INTO decisions (id, cycle, ticker, signal, confidence, quantity, decided_at, payload_json)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.cycle as i64)
        .bind(&record.decision.ticker)
        .bind(record.decision.signal.to_string())
        .bind(record.decision.confidence.value())
        .bind(record.decision.quantity as i64)
        .bind(record.decided_at.timestamp_millis())
        .bind(payload)
        .execute(&self.pool)
        .await
        .context("Failed to save decision")?;

        Ok(())
    }

    async fn append_execution_result(&self, record: &ExecutionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO executions (id, decision_id, ticker, side, quantity, status, order_id, message, executed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.decision_id.to_string())
        .bind(&record.ticker)
        .bind(record.side.as_str())
        .bind(record.quantity as i64)
        .bind(record.status.as_str())
        .bind(record.order_id.as_deref())
        .bind(&record.message)
        .bind(record.executed_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to save execution result")?;

        Ok(())
    }

    async fn read_recent(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        let rows = sqlx::query(
            "SELECT id, cycle, decided_at, payload_json FROM decisions ORDER BY decided_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: String = row.try_get("payload_json")?;
            records.push(DecisionRecord {
                id: parse_uuid(row.try_get("id")?)?,
                cycle: row.try_get::<i64, _>("cycle")? as u64,
                decided_at: from_millis(row.try_get("decided_at")?)?,
                decision: serde_json::from_str(&payload).context("Corrupt decision payload")?,
            });
        }
        Ok(records)
    }

    async fn read_recent_executions(&self, limit: usize) -> Result<Vec<ExecutionRecord>> {
        let rows = sqlx::query("SELECT * FROM executions ORDER BY executed_at DESC, rowid DESC LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let side: String = row.try_get("side")?;
            let side = match side.as_str() {
                "buy" => OrderSide::Buy,
                "sell" => OrderSide::Sell,
                other => return Err(anyhow!("Unknown order side in history: {}", other)),
            };
            let status: String = row.try_get("status")?;
            records.push(ExecutionRecord {
                id: parse_uuid(row.try_get("id")?)?,
                decision_id: parse_uuid(row.try_get("decision_id")?)?,
                ticker: row.try_get("ticker")?,
                side,
                quantity: row.try_get::<i64, _>("quantity")? as u64,
                status: status.parse::<ExecutionStatus>()?,
                order_id: row.try_get("order_id")?,
                message: row.try_get("message")?,
                executed_at: from_millis(row.try_get("executed_at")?)?,
            });
        }
        Ok(records)
    }
}

fn parse_uuid(raw: String) -> Result<Uuid> {
    Uuid::parse_str(&raw).with_context(|| format!("Invalid id in history: {}", raw))
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| anyhow!("Invalid timestamp: {}", millis))
}
