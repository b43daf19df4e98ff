//! The five technicals sub-strategies and their weighted combination.
//!
//! Each sub-strategy looks at the same OHLCV history and produces a
//! [`SubSignal`] with a 0..=1 confidence. A sub-strategy without enough
//! history is neutral at 0.5 so it still dampens the combined score.

use super::indicators::{
    adx_latest, atr_latest, bollinger_latest, ema_latest, rsi_latest, trailing_sum,
};
use crate::application::market_data::statistical_features::{
    calculate_excess_kurtosis, calculate_hurst_exponent, calculate_skewness, rolling_std,
    simple_returns, trailing_mean_std,
};
use crate::domain::signal::Direction;
use crate::domain::trading::types::Candle;
use std::collections::BTreeMap;
use std::fmt;

/// Combined scores beyond this magnitude are directional.
pub const COMBINED_SCORE_THRESHOLD: f64 = 0.2;
const NEUTRAL_CONFIDENCE: f64 = 0.5;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubStrategy {
    TrendFollowing,
    MeanReversion,
    Momentum,
    Volatility,
    StatisticalArbitrage,
}

impl SubStrategy {
    pub const ALL: [SubStrategy; 5] = [
        SubStrategy::TrendFollowing,
        SubStrategy::MeanReversion,
        SubStrategy::Momentum,
        SubStrategy::Volatility,
        SubStrategy::StatisticalArbitrage,
    ];

    pub fn weight(self) -> f64 {
        match self {
            SubStrategy::TrendFollowing => 0.25,
            SubStrategy::MeanReversion => 0.20,
            SubStrategy::Momentum => 0.25,
            SubStrategy::Volatility => 0.15,
            SubStrategy::StatisticalArbitrage => 0.15,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubStrategy::TrendFollowing => "trend_following",
            SubStrategy::MeanReversion => "mean_reversion",
            SubStrategy::Momentum => "momentum",
            SubStrategy::Volatility => "volatility",
            SubStrategy::StatisticalArbitrage => "statistical_arbitrage",
        }
    }

    pub fn evaluate(self, candles: &[Candle]) -> SubSignal {
        match self {
            SubStrategy::TrendFollowing => trend_following(candles),
            SubStrategy::MeanReversion => mean_reversion(candles),
            SubStrategy::Momentum => momentum(candles),
            SubStrategy::Volatility => volatility_regime(candles),
            SubStrategy::StatisticalArbitrage => statistical_arbitrage(candles),
        }
    }
}

impl fmt::Display for SubStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubSignal {
    pub direction: Direction,
    /// 0..=1
    pub confidence: f64,
    pub metrics: BTreeMap<String, f64>,
}

impl SubSignal {
    pub fn new(direction: Direction, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            direction,
            confidence,
            metrics: BTreeMap::new(),
        }
    }

    pub fn neutral() -> Self {
        Self::new(Direction::Neutral, NEUTRAL_CONFIDENCE)
    }

    fn with_metric(mut self, name: &str, value: f64) -> Self {
        if value.is_finite() {
            self.metrics.insert(name.to_string(), value);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedSignal {
    pub direction: Direction,
    /// Signed score in [-1, 1].
    pub score: f64,
}

impl CombinedSignal {
    /// `round(|score| * 100)`
    pub fn confidence_pct(&self) -> f64 {
        (self.score.abs() * 100.0).round()
    }
}

/// Confidence-weighted average of the sub-signal directions.
///
/// Every sub-strategy contributes `direction * weight * confidence` to the
/// numerator and `weight * confidence` to the denominator.
pub fn combine(signals: &[(SubStrategy, SubSignal)]) -> CombinedSignal {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for (strategy, signal) in signals {
        let weight = strategy.weight();
        weighted_sum += signal.direction.numeric() * weight * signal.confidence;
        total_weight += weight * signal.confidence;
    }

    let score = if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        0.0
    };

    CombinedSignal {
        direction: Direction::from_score(score, COMBINED_SCORE_THRESHOLD),
        score,
    }
}

fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// EMA 8/21/55 alignment, ADX(14) as strength.
pub fn trend_following(candles: &[Candle]) -> SubSignal {
    const MIN_BARS: usize = 55;
    if candles.len() < MIN_BARS {
        return SubSignal::neutral();
    }
    let closes = closes(candles);
    let (Some(ema_8), Some(ema_21), Some(ema_55), Some(adx)) = (
        ema_latest(&closes, 8),
        ema_latest(&closes, 21),
        ema_latest(&closes, 55),
        adx_latest(candles, 14),
    ) else {
        return SubSignal::neutral();
    };

    let short_trend = ema_8 > ema_21;
    let medium_trend = ema_21 > ema_55;
    let trend_strength = adx / 100.0;

    let signal = match (short_trend, medium_trend) {
        (true, true) => SubSignal::new(Direction::Bullish, trend_strength),
        (false, false) => SubSignal::new(Direction::Bearish, trend_strength),
        _ => SubSignal::neutral(),
    };
    signal
        .with_metric("adx", adx)
        .with_metric("trend_strength", trend_strength)
}

/// 50-bar z-score confirmed by the price position inside Bollinger(20, 2).
pub fn mean_reversion(candles: &[Candle]) -> SubSignal {
    let closes = closes(candles);
    let Some((mean, std)) = trailing_mean_std(&closes, 50) else {
        return SubSignal::neutral();
    };
    let Some(bands) = bollinger_latest(&closes, 20, 2.0) else {
        return SubSignal::neutral();
    };
    let price = closes[closes.len() - 1];
    if std <= 0.0 {
        return SubSignal::neutral();
    }
    let z_score = (price - mean) / std;
    let Some(price_vs_bb) = bands.position(price) else {
        return SubSignal::neutral().with_metric("z_score", z_score);
    };

    let confidence = (z_score.abs() / 4.0).min(1.0);
    let signal = if z_score < -2.0 && price_vs_bb < 0.2 {
        SubSignal::new(Direction::Bullish, confidence)
    } else if z_score > 2.0 && price_vs_bb > 0.8 {
        SubSignal::new(Direction::Bearish, confidence)
    } else {
        SubSignal::neutral()
    };

    let mut signal = signal
        .with_metric("z_score", z_score)
        .with_metric("price_vs_bb", price_vs_bb);
    if let Some(rsi) = rsi_latest(&closes, 14) {
        signal = signal.with_metric("rsi_14", rsi);
    }
    if let Some(rsi) = rsi_latest(&closes, 28) {
        signal = signal.with_metric("rsi_28", rsi);
    }
    signal
}

/// 1/3/6-month return momentum with volume confirmation.
pub fn momentum(candles: &[Candle]) -> SubSignal {
    let returns = simple_returns(&closes(candles));
    let (Some(mom_1m), Some(mom_3m), Some(mom_6m)) = (
        trailing_sum(&returns, 21),
        trailing_sum(&returns, 63),
        trailing_sum(&returns, 126),
    ) else {
        return SubSignal::neutral();
    };

    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    let Some(volume_sum) = trailing_sum(&volumes, 21) else {
        return SubSignal::neutral();
    };
    let volume_ma = volume_sum / 21.0;
    let volume_momentum = if volume_ma > 0.0 {
        volumes[volumes.len() - 1] / volume_ma
    } else {
        0.0
    };
    let volume_confirmation = volume_momentum > 1.0;

    let score = 0.4 * mom_1m + 0.3 * mom_3m + 0.3 * mom_6m;
    let confidence = (score.abs() * 5.0).min(1.0);
    let signal = if score > 0.05 && volume_confirmation {
        SubSignal::new(Direction::Bullish, confidence)
    } else if score < -0.05 && volume_confirmation {
        SubSignal::new(Direction::Bearish, confidence)
    } else {
        SubSignal::neutral()
    };

    signal
        .with_metric("momentum_1m", mom_1m)
        .with_metric("momentum_3m", mom_3m)
        .with_metric("momentum_6m", mom_6m)
        .with_metric("volume_momentum", volume_momentum)
}

/// Annualised 21-bar volatility compared with its own 63-bar history.
pub fn volatility_regime(candles: &[Candle]) -> SubSignal {
    let closes = closes(candles);
    let returns = simple_returns(&closes);
    let annualise = TRADING_DAYS_PER_YEAR.sqrt();
    let hist_vol: Vec<f64> = rolling_std(&returns, 21).iter().map(|v| v * annualise).collect();

    let Some((vol_ma, vol_std)) = trailing_mean_std(&hist_vol, 63) else {
        return SubSignal::neutral();
    };
    let current_vol = hist_vol[hist_vol.len() - 1];
    if vol_ma <= 0.0 || vol_std <= 0.0 {
        return SubSignal::neutral().with_metric("historical_volatility", current_vol);
    }

    let regime = current_vol / vol_ma;
    let vol_z = (current_vol - vol_ma) / vol_std;
    let confidence = (vol_z.abs() / 3.0).min(1.0);
    let signal = if regime < 0.8 && vol_z < -1.0 {
        SubSignal::new(Direction::Bullish, confidence)
    } else if regime > 1.2 && vol_z > 1.0 {
        SubSignal::new(Direction::Bearish, confidence)
    } else {
        SubSignal::neutral()
    };

    let mut signal = signal
        .with_metric("historical_volatility", current_vol)
        .with_metric("volatility_regime", regime)
        .with_metric("volatility_z_score", vol_z);
    if let Some(atr) = atr_latest(candles, 14) {
        let price = closes[closes.len() - 1];
        if price > 0.0 {
            signal = signal.with_metric("atr_ratio", atr / price);
        }
    }
    signal
}

/// Return-distribution shape gated by a mean-reverting Hurst exponent.
pub fn statistical_arbitrage(candles: &[Candle]) -> SubSignal {
    const WINDOW: usize = 63;
    let closes = closes(candles);
    let returns = simple_returns(&closes);
    if returns.len() < WINDOW {
        return SubSignal::neutral();
    }
    let recent = &returns[returns.len() - WINDOW..];
    let lags: Vec<usize> = (2..20).collect();

    // A series too flat to fit reads as a random walk.
    let hurst = calculate_hurst_exponent(&closes, &lags).unwrap_or(0.5);
    let skew = calculate_skewness(recent).unwrap_or(0.0);
    let kurtosis = calculate_excess_kurtosis(recent).unwrap_or(0.0);

    let confidence = (0.5 - hurst) * 2.0;
    let signal = if hurst < 0.4 && skew > 1.0 {
        SubSignal::new(Direction::Bullish, confidence)
    } else if hurst < 0.4 && skew < -1.0 {
        SubSignal::new(Direction::Bearish, confidence)
    } else {
        SubSignal::neutral()
    };

    signal
        .with_metric("hurst_exponent", hurst)
        .with_metric("skewness", skew)
        .with_metric("kurtosis", kurtosis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64], volume: impl Fn(usize) -> f64) -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                date: start + Duration::days(i as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: volume(i),
            })
            .collect()
    }

    fn with(direction: Direction, confidence: f64) -> SubSignal {
        SubSignal::new(direction, confidence)
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = SubStrategy::ALL.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_combine_weighted_by_confidence() {
        let signals = vec![
            (SubStrategy::TrendFollowing, with(Direction::Bullish, 0.8)),
            (SubStrategy::MeanReversion, with(Direction::Bearish, 0.6)),
            (SubStrategy::Momentum, SubSignal::neutral()),
            (SubStrategy::Volatility, SubSignal::neutral()),
            (SubStrategy::StatisticalArbitrage, SubSignal::neutral()),
        ];
        let combined = combine(&signals);
        assert!((combined.score - 0.08 / 0.595).abs() < 1e-9);
        assert_eq!(combined.direction, Direction::Neutral);
        assert_eq!(combined.confidence_pct(), 13.0);
    }

    #[test]
    fn test_zero_confidence_moves_score_toward_remaining_signals() {
        let mut signals = vec![
            (SubStrategy::TrendFollowing, with(Direction::Bullish, 0.8)),
            (SubStrategy::MeanReversion, with(Direction::Bearish, 0.6)),
            (SubStrategy::Momentum, SubSignal::neutral()),
            (SubStrategy::Volatility, SubSignal::neutral()),
            (SubStrategy::StatisticalArbitrage, SubSignal::neutral()),
        ];
        let before = combine(&signals).score;
        signals[1].1.confidence = 0.0;
        let after = combine(&signals).score;
        assert!(after > before);
        assert!((after - 0.2 / 0.475).abs() < 1e-9);
        assert_eq!(combine(&signals).direction, Direction::Bullish);
    }

    #[test]
    fn test_combine_all_zero_confidence_is_neutral() {
        let signals: Vec<_> = SubStrategy::ALL
            .iter()
            .map(|s| (*s, with(Direction::Bullish, 0.0)))
            .collect();
        let combined = combine(&signals);
        assert_eq!(combined.score, 0.0);
        assert_eq!(combined.direction, Direction::Neutral);
    }

    #[test]
    fn test_short_history_is_neutral_half_confidence() {
        let candles = series(&[100.0, 101.0, 102.0], |_| 1000.0);
        for strategy in SubStrategy::ALL {
            let signal = strategy.evaluate(&candles);
            assert_eq!(signal.direction, Direction::Neutral, "{}", strategy);
            assert_eq!(signal.confidence, 0.5, "{}", strategy);
        }
    }

    #[test]
    fn test_trend_following_uptrend() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let signal = trend_following(&series(&closes, |_| 1000.0));
        assert_eq!(signal.direction, Direction::Bullish);
        assert!(signal.metrics.contains_key("adx"));
    }

    #[test]
    fn test_momentum_needs_volume_confirmation() {
        let closes: Vec<f64> = (0..140).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        // Last bar volume above its 21-bar average
        let confirmed = momentum(&series(&closes, |i| if i == 139 { 5000.0 } else { 1000.0 }));
        assert_eq!(confirmed.direction, Direction::Bullish);
        assert_eq!(confirmed.confidence, 1.0);

        let flat_volume = momentum(&series(&closes, |_| 1000.0));
        assert_eq!(flat_volume.direction, Direction::Neutral);
    }

    #[test]
    fn test_mean_reversion_oversold() {
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 + (i % 2) as f64).collect();
        closes.push(80.0);
        let signal = mean_reversion(&series(&closes, |_| 1000.0));
        assert_eq!(signal.direction, Direction::Bullish);
        assert!(signal.metrics["z_score"] < -2.0);
    }
}
