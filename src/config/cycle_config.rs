//! Cycle scheduling configuration parsing from environment variables.
//!
//! This module handles loading the ticker list, the cycle interval and the
//! execution mode of the orchestrator.

use crate::domain::validation::symbols::normalize_symbols;
use anyhow::{Context, Result};
use std::env;

/// Cycle orchestration environment configuration
#[derive(Debug, Clone)]
pub struct CycleEnvConfig {
    pub tickers: Vec<String>,
    pub cycle_interval_secs: u64,
    pub lookback_days: i64,
    pub max_concurrent_tickers: usize,
    pub max_cycles: Option<u64>,
    pub dry_run: bool,
    pub error_backoff_max_secs: u64,
}

impl Default for CycleEnvConfig {
    fn default() -> Self {
        Self {
            tickers: vec!["AAPL".to_string(), "TSLA".to_string(), "GOOGL".to_string()],
            cycle_interval_secs: 60,
            lookback_days: 365,
            max_concurrent_tickers: 4,
            max_cycles: None,
            dry_run: false,
            error_backoff_max_secs: 600,
        }
    }
}

impl CycleEnvConfig {
    pub fn from_env() -> Result<Self> {
        let tickers_str = env::var("STOCK_LIST").unwrap_or_else(|_| "AAPL,TSLA,GOOGL".to_string());
        let tickers = normalize_symbols(tickers_str.split(','))
            .context("Failed to parse STOCK_LIST")?;

        let max_cycles = match env::var("MAX_CYCLES") {
            Ok(s) if !s.trim().is_empty() => Some(
                s.trim()
                    .parse::<u64>()
                    .context("Failed to parse MAX_CYCLES")?,
            ),
            _ => None,
        };

        Ok(Self {
            tickers,
            cycle_interval_secs: Self::parse_u64("CYCLE_INTERVAL_SECS", 60)?,
            lookback_days: Self::parse_i64("LOOKBACK_DAYS", 365)?,
            max_concurrent_tickers: Self::parse_usize("MAX_CONCURRENT_TICKERS", 4)?.max(1),
            max_cycles,
            dry_run: Self::parse_bool("DRY_RUN", false),
            error_backoff_max_secs: Self::parse_u64("ERROR_BACKOFF_MAX_SECS", 600)?,
        })
    }

    fn parse_u64(key: &str, default: u64) -> Result<u64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<u64>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_i64(key: &str, default: i64) -> Result<i64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<i64>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_bool(key: &str, default: bool) -> bool {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<bool>()
            .unwrap_or(default)
    }
}
