use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::ExecutionError;
use crate::domain::signal::TradeAction;

/// Daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Inclusive calendar date range used for every data request in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `lookback_days` calendar days ending at `end`. A lookback past
    /// the earliest representable date starts at [`NaiveDate::MIN`].
    pub fn ending(end: NaiveDate, lookback_days: i64) -> Self {
        let start = Duration::try_days(lookback_days)
            .and_then(|lookback| end.checked_sub_signed(lookback))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Latest reported financial ratios for a ticker. Missing values stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub ticker: String,
    pub report_period: Option<NaiveDate>,
    pub market_cap: Option<f64>,
    // Profitability
    pub return_on_equity: Option<f64>,
    pub net_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    // Growth
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub book_value_growth: Option<f64>,
    // Health
    pub current_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub free_cash_flow_per_share: Option<f64>,
    pub earnings_per_share: Option<f64>,
    // Price ratios
    pub price_to_earnings_ratio: Option<f64>,
    pub price_to_book_ratio: Option<f64>,
    pub price_to_sales_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemField {
    FreeCashFlow,
    NetIncome,
    DepreciationAndAmortization,
    CapitalExpenditure,
    WorkingCapital,
}

impl LineItemField {
    pub fn as_str(self) -> &'static str {
        match self {
            LineItemField::FreeCashFlow => "free_cash_flow",
            LineItemField::NetIncome => "net_income",
            LineItemField::DepreciationAndAmortization => "depreciation_and_amortization",
            LineItemField::CapitalExpenditure => "capital_expenditure",
            LineItemField::WorkingCapital => "working_capital",
        }
    }
}

/// One reporting period of statement line items, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub ticker: String,
    pub report_period: Option<NaiveDate>,
    pub free_cash_flow: Option<f64>,
    pub net_income: Option<f64>,
    pub depreciation_and_amortization: Option<f64>,
    pub capital_expenditure: Option<f64>,
    pub working_capital: Option<f64>,
}

impl LineItem {
    pub fn get(&self, field: LineItemField) -> Option<f64> {
        match field {
            LineItemField::FreeCashFlow => self.free_cash_flow,
            LineItemField::NetIncome => self.net_income,
            LineItemField::DepreciationAndAmortization => self.depreciation_and_amortization,
            LineItemField::CapitalExpenditure => self.capital_expenditure,
            LineItemField::WorkingCapital => self.working_capital,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderTrade {
    pub ticker: String,
    pub filing_date: NaiveDate,
    pub insider_name: Option<String>,
    /// Negative for disposals.
    pub transaction_shares: Option<f64>,
    pub transaction_value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<TradeAction> for OrderSide {
    type Error = ExecutionError;

    fn try_from(action: TradeAction) -> Result<Self, Self::Error> {
        match action {
            TradeAction::Buy => Ok(OrderSide::Buy),
            TradeAction::Sell => Ok(OrderSide::Sell),
            TradeAction::Hold => Err(ExecutionError::InvalidOrder {
                reason: "HOLD is not an order side".to_string(),
            }),
        }
    }
}

/// Market order handed to the execution sink. `quantity` is always > 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub ticker: String,
    pub side: OrderSide,
    pub quantity: u64,
}

impl OrderRequest {
    pub fn new(ticker: impl Into<String>, side: OrderSide, quantity: u64) -> Result<Self, ExecutionError> {
        if quantity == 0 {
            return Err(ExecutionError::InvalidOrder {
                reason: "quantity must be positive".to_string(),
            });
        }
        Ok(Self {
            ticker: ticker.into(),
            side,
            quantity,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub ticker: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub fill_price: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_ending() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let range = DateRange::ending(end, 30);
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(range.contains(end));
        assert!(!range.contains(end + Duration::days(1)));
    }

    #[test]
    fn test_huge_lookback_saturates() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(DateRange::ending(end, i64::MAX).start, NaiveDate::MIN);
        assert_eq!(DateRange::ending(end, 100_000_000).start, NaiveDate::MIN);
    }

    #[test]
    fn test_order_side_rejects_hold() {
        assert_eq!(OrderSide::try_from(TradeAction::Buy).unwrap(), OrderSide::Buy);
        assert!(OrderSide::try_from(TradeAction::Hold).is_err());
    }

    #[test]
    fn test_order_request_requires_positive_quantity() {
        assert!(OrderRequest::new("AAPL", OrderSide::Buy, 0).is_err());
        assert_eq!(OrderRequest::new("AAPL", OrderSide::Sell, 5).unwrap().quantity, 5);
    }
}
