use super::ticker_rng;
use crate::domain::ports::{FundamentalsSource, InsiderTradeSource};
use crate::domain::trading::types::{FinancialMetrics, InsiderTrade, LineItem, LineItemField};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rand::Rng;

/// Synthetic but internally consistent company financials.
#[derive(Debug, Clone)]
pub struct SimulatedFundamentals {
    seed: u64,
}

impl SimulatedFundamentals {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Market cap in the 50B..500B range.
    fn market_cap(&self, ticker: &str) -> f64 {
        let mut rng = ticker_rng(self.seed.wrapping_add(1), ticker);
        rng.random_range(50e9..500e9)
    }
}

#[async_trait]
impl FundamentalsSource for SimulatedFundamentals {
    async fn get_financial_metrics(
        &self,
        ticker: &str,
        end_date: NaiveDate,
    ) -> Result<Option<FinancialMetrics>> {
        let mut rng = ticker_rng(self.seed, ticker);
        let eps = rng.random_range(1.0..12.0);
        Ok(Some(FinancialMetrics {
            ticker: ticker.to_string(),
            report_period: Some(end_date - Duration::days(45)),
            market_cap: Some(self.market_cap(ticker)),
            return_on_equity: Some(rng.random_range(-0.05..0.40)),
            net_margin: Some(rng.random_range(-0.05..0.35)),
            operating_margin: Some(rng.random_range(0.0..0.40)),
            revenue_growth: Some(rng.random_range(-0.10..0.30)),
            earnings_growth: Some(rng.random_range(-0.15..0.35)),
            book_value_growth: Some(rng.random_range(-0.05..0.25)),
            current_ratio: Some(rng.random_range(0.6..3.0)),
            debt_to_equity: Some(rng.random_range(0.1..2.0)),
            free_cash_flow_per_share: Some(eps * rng.random_range(0.4..1.4)),
            earnings_per_share: Some(eps),
            price_to_earnings_ratio: Some(rng.random_range(8.0..45.0)),
            price_to_book_ratio: Some(rng.random_range(0.8..12.0)),
            price_to_sales_ratio: Some(rng.random_range(0.5..10.0)),
        }))
    }

    async fn search_line_items(
        &self,
        ticker: &str,
        fields: &[LineItemField],
        end_date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<LineItem>> {
        let mut rng = ticker_rng(self.seed.wrapping_add(2), ticker);
        let scale = self.market_cap(ticker) / rng.random_range(15.0..40.0);

        Ok((0..limit)
            .map(|period| {
                let mut item = LineItem {
                    ticker: ticker.to_string(),
                    report_period: Some(end_date - Duration::days(365 * period as i64 + 45)),
                    ..LineItem::default()
                };
                let mut value = |lo: f64, hi: f64| scale * rng.random_range(lo..hi);
                for field in fields {
                    let v = match field {
                        LineItemField::NetIncome => value(0.8, 1.2),
                        LineItemField::FreeCashFlow => value(0.6, 1.3),
                        LineItemField::DepreciationAndAmortization => value(0.1, 0.3),
                        LineItemField::CapitalExpenditure => value(0.2, 0.5),
                        LineItemField::WorkingCapital => value(0.5, 1.5),
                    };
                    match field {
                        LineItemField::NetIncome => item.net_income = Some(v),
                        LineItemField::FreeCashFlow => item.free_cash_flow = Some(v),
                        LineItemField::DepreciationAndAmortization => {
                            item.depreciation_and_amortization = Some(v)
                        }
                        LineItemField::CapitalExpenditure => item.capital_expenditure = Some(v),
                        LineItemField::WorkingCapital => item.working_capital = Some(v),
                    }
                }
                item
            })
            .collect())
    }

    async fn get_market_cap(&self, ticker: &str, _end_date: NaiveDate) -> Result<Option<f64>> {
        Ok(Some(self.market_cap(ticker)))
    }
}

/// Synthetic insider filings: a ticker-dependent mix of buys and sells.
#[derive(Debug, Clone)]
pub struct SimulatedInsiderTrades {
    seed: u64,
}

impl SimulatedInsiderTrades {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

#[async_trait]
impl InsiderTradeSource for SimulatedInsiderTrades {
    async fn get_insider_trades(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<InsiderTrade>> {
        let mut rng = ticker_rng(self.seed.wrapping_add(3), ticker);
        let count = rng.random_range(0..40usize).min(limit);
        let buy_bias = rng.random_range(0.2..0.8);

        Ok((0..count)
            .map(|i| {
                let shares = rng.random_range(100.0..50_000.0_f64).round();
                let signed = if rng.random_bool(buy_bias) { shares } else { -shares };
                InsiderTrade {
                    ticker: ticker.to_string(),
                    filing_date: end_date - Duration::days(i as i64 * 3),
                    insider_name: Some(format!("Insider {}", i % 7 + 1)),
                    // Occasional filings without a share count
                    transaction_shares: (i % 11 != 10).then_some(signed),
                    transaction_value: Some(signed.abs() * rng.random_range(20.0..400.0)),
                }
            })
            .collect())
    }
}
