//! Collaborator ports
//!
//! Everything that touches the network, the disk or a broker lives behind one
//! of these traits. Timeouts and retries are the implementor's concern; the
//! decision path only sees `Ok` or `Err`.

use crate::domain::errors::ExecutionError;
use crate::domain::trading::portfolio::PortfolioSnapshot;
use crate::domain::trading::types::{
    Candle, DateRange, FinancialMetrics, InsiderTrade, LineItem, LineItemField, OrderConfirmation,
    OrderRequest,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Bars ordered oldest first. May be empty.
    async fn get_prices(&self, ticker: &str, range: &DateRange) -> Result<Vec<Candle>>;
}

#[async_trait]
pub trait FundamentalsSource: Send + Sync {
    async fn get_financial_metrics(
        &self,
        ticker: &str,
        end_date: NaiveDate,
    ) -> Result<Option<FinancialMetrics>>;

    /// Most recent period first.
    async fn search_line_items(
        &self,
        ticker: &str,
        fields: &[LineItemField],
        end_date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<LineItem>>;

    async fn get_market_cap(&self, ticker: &str, end_date: NaiveDate) -> Result<Option<f64>>;
}

#[async_trait]
pub trait InsiderTradeSource: Send + Sync {
    async fn get_insider_trades(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<InsiderTrade>>;
}

#[async_trait]
pub trait ExecutionSink: Send + Sync {
    async fn submit_order(&self, order: &OrderRequest)
    -> std::result::Result<OrderConfirmation, ExecutionError>;
}

#[async_trait]
pub trait PortfolioProvider: Send + Sync {
    async fn snapshot(&self) -> Result<PortfolioSnapshot>;
}
