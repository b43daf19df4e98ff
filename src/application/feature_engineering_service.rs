//! Observation features for the RL policy panel.
//!
//! `preprocess` turns an OHLCV history into a table with one row per bar and
//! the columns of [`FEATURE_NAMES`]; `latest_observation` takes the last row
//! as a sanitized fixed-length vector.

use crate::domain::errors::FeatureError;
use crate::domain::ml::feature_registry::{FEATURE_COUNT, FEATURE_NAMES, Observation};
use crate::domain::trading::types::Candle;
use chrono::Datelike;
use ta::Next;
use ta::indicators::{
    BollingerBands, MovingAverageConvergenceDivergence, RelativeStrengthIndex, SimpleMovingAverage,
};

const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BOLL_PERIOD: usize = 20;
const BOLL_MULTIPLIER: f64 = 2.0;
const OSCILLATOR_PERIOD: usize = 30;
const SMA_SHORT: usize = 30;
const SMA_LONG: usize = 60;

/// Row-per-bar feature table in [`FEATURE_NAMES`] column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<[f64; FEATURE_COUNT]>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[[f64; FEATURE_COUNT]] {
        &self.rows
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = FEATURE_NAMES.iter().position(|n| *n == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureEngineeringService;

impl FeatureEngineeringService {
    pub fn new() -> Self {
        Self
    }

    pub fn preprocess(&self, candles: &[Candle]) -> Result<FeatureTable, FeatureError> {
        if candles.is_empty() {
            return Err(FeatureError::EmptyHistory);
        }

        let mut macd = MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL)
            .map_err(|e| indicator_error("macd", e))?;
        let mut boll =
            BollingerBands::new(BOLL_PERIOD, BOLL_MULTIPLIER).map_err(|e| indicator_error("boll", e))?;
        let mut rsi =
            RelativeStrengthIndex::new(OSCILLATOR_PERIOD).map_err(|e| indicator_error("rsi_30", e))?;
        let mut sma_short =
            SimpleMovingAverage::new(SMA_SHORT).map_err(|e| indicator_error("close_30_sma", e))?;
        let mut sma_long =
            SimpleMovingAverage::new(SMA_LONG).map_err(|e| indicator_error("close_60_sma", e))?;

        let cci = commodity_channel_index(candles, OSCILLATOR_PERIOD);
        let dx = directional_movement_index(candles, OSCILLATOR_PERIOD);

        let rows = candles
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let macd_out = macd.next(c.close);
                let boll_out = boll.next(c.close);
                let raw = [
                    c.close,
                    c.high,
                    c.low,
                    c.open,
                    c.volume,
                    f64::from(c.date.weekday().num_days_from_monday()),
                    macd_out.macd,
                    boll_out.upper,
                    boll_out.lower,
                    rsi.next(c.close),
                    cci[i],
                    dx[i],
                    sma_short.next(c.close),
                    sma_long.next(c.close),
                ];
                raw.map(|v| if v.is_finite() { v } else { 0.0 })
            })
            .collect();

        Ok(FeatureTable { rows })
    }

    pub fn latest_observation(&self, table: &FeatureTable) -> Result<Observation, FeatureError> {
        table
            .rows
            .last()
            .map(|row| Observation::from_values(row))
            .ok_or(FeatureError::EmptyHistory)
    }

    /// `preprocess` followed by `latest_observation`.
    pub fn observe(&self, candles: &[Candle]) -> Result<Observation, FeatureError> {
        let table = self.preprocess(candles)?;
        self.latest_observation(&table)
    }
}

fn indicator_error(name: &str, e: ta::errors::TaError) -> FeatureError {
    FeatureError::Indicator {
        name: name.to_string(),
        reason: format!("{:?}", e),
    }
}

/// Trailing window ending at `i`, shortened at the start of the series.
fn window_start(i: usize, period: usize) -> usize {
    (i + 1).saturating_sub(period)
}

/// CCI over typical price with a 0.015 scaling constant.
fn commodity_channel_index(candles: &[Candle], period: usize) -> Vec<f64> {
    let typical: Vec<f64> = candles.iter().map(|c| (c.high + c.low + c.close) / 3.0).collect();
    (0..typical.len())
        .map(|i| {
            let window = &typical[window_start(i, period)..=i];
            let mean = window.iter().sum::<f64>() / window.len() as f64;
            let mean_dev = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / window.len() as f64;
            if mean_dev > 0.0 {
                (typical[i] - mean) / (0.015 * mean_dev)
            } else {
                0.0
            }
        })
        .collect()
}

/// Directional movement index (DX) from trailing sums of +DM, -DM and true range.
fn directional_movement_index(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    let mut true_range = vec![0.0; n];

    for i in 0..n {
        let c = &candles[i];
        if i == 0 {
            true_range[i] = c.high - c.low;
            continue;
        }
        let prev = &candles[i - 1];
        let up = c.high - prev.high;
        let down = prev.low - c.low;
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
        true_range[i] = (c.high - c.low)
            .max((c.high - prev.close).abs())
            .max((c.low - prev.close).abs());
    }

    (0..n)
        .map(|i| {
            let start = window_start(i, period);
            let tr: f64 = true_range[start..=i].iter().sum();
            if tr <= 0.0 {
                return 0.0;
            }
            let plus_di = 100.0 * plus_dm[start..=i].iter().sum::<f64>() / tr;
            let minus_di = 100.0 * minus_dm[start..=i].iter().sum::<f64>() / tr;
            let di_sum = plus_di + minus_di;
            if di_sum > 0.0 {
                100.0 * (plus_di - minus_di).abs() / di_sum
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn candles(count: usize) -> Vec<Candle> {
        // 2024-01-01 is a Monday
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..count)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1;
                Candle {
                    date: start + Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000_000.0 + i as f64 * 100.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_preprocess_produces_fixed_columns() {
        let service = FeatureEngineeringService::new();
        let table = service.preprocess(&candles(90)).unwrap();
        assert_eq!(table.len(), 90);
        assert!(table.rows().iter().all(|r| r.iter().all(|v| v.is_finite())));

        let day = table.column("day").unwrap();
        assert_eq!(day[0], 0.0);
        assert_eq!(day[6], 6.0);
    }

    #[test]
    fn test_latest_observation_matches_last_bar() {
        let service = FeatureEngineeringService::new();
        let bars = candles(70);
        let obs = service.observe(&bars).unwrap();
        let last = bars.last().unwrap();

        assert_eq!(obs.get("close"), Some(last.close));
        assert_eq!(obs.get("volume"), Some(last.volume));
        let boll_ub = obs.get("boll_ub").unwrap();
        let boll_lb = obs.get("boll_lb").unwrap();
        assert!(boll_ub > boll_lb);
        let rsi = obs.get("rsi_30").unwrap();
        assert!((0.0..=100.0).contains(&rsi));
    }

    #[test]
    fn test_empty_history_is_an_error() {
        let service = FeatureEngineeringService::new();
        assert!(matches!(service.preprocess(&[]), Err(FeatureError::EmptyHistory)));
        assert!(service.latest_observation(&FeatureTable::default()).is_err());
    }

    #[test]
    fn test_flat_series_has_zero_oscillators() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let flat: Vec<Candle> = (0..40)
            .map(|i| Candle {
                date: start + Duration::days(i),
                open: 10.0,
                high: 10.0,
                low: 10.0,
                close: 10.0,
                volume: 0.0,
            })
            .collect();
        let obs = FeatureEngineeringService::new().observe(&flat).unwrap();
        assert_eq!(obs.get("cci_30"), Some(0.0));
        assert_eq!(obs.get("dx_30"), Some(0.0));
        assert_eq!(obs.get("close_30_sma"), Some(10.0));
    }
}
