//! Indicator helpers for the technicals sub-strategies.
//!
//! Streaming indicators from the `ta` crate are driven over the full series
//! and the latest value is returned. ADX has no `ta` counterpart and is
//! computed with Wilder's smoothing.

use crate::domain::trading::types::Candle;
use ta::indicators::{
    AverageTrueRange, BollingerBands, ExponentialMovingAverage, RelativeStrengthIndex,
};
use ta::{DataItem, Next};

/// Latest EMA value over `values`.
pub fn ema_latest(values: &[f64], period: usize) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut ema = ExponentialMovingAverage::new(period).ok()?;
    values.iter().map(|v| ema.next(*v)).last()
}

pub fn rsi_latest(values: &[f64], period: usize) -> Option<f64> {
    if values.len() <= period {
        return None;
    }
    let mut rsi = RelativeStrengthIndex::new(period).ok()?;
    values.iter().map(|v| rsi.next(*v)).last()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    /// Position of `price` inside the bands: 0 at the lower band, 1 at the upper.
    pub fn position(&self, price: f64) -> Option<f64> {
        let width = self.upper - self.lower;
        if width.abs() < f64::EPSILON {
            None
        } else {
            Some((price - self.lower) / width)
        }
    }
}

pub fn bollinger_latest(values: &[f64], period: usize, multiplier: f64) -> Option<Bands> {
    if values.len() < period {
        return None;
    }
    let mut bb = BollingerBands::new(period, multiplier).ok()?;
    let out = values.iter().map(|v| bb.next(*v)).last()?;
    Some(Bands {
        upper: out.upper,
        middle: out.average,
        lower: out.lower,
    })
}

pub fn atr_latest(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() <= period {
        return None;
    }
    let mut atr = AverageTrueRange::new(period).ok()?;
    let mut last = None;
    for c in candles {
        let item = DataItem::builder()
            .open(c.open)
            .high(c.high)
            .low(c.low)
            .close(c.close)
            .volume(c.volume)
            .build()
            .ok()?;
        last = Some(atr.next(&item));
    }
    last
}

/// Average Directional Index with Wilder's smoothing.
///
/// The first `period` bars seed the smoothed sums; DX values are then
/// smoothed the same way into ADX.
pub struct Adx {
    period: usize,
    prev: Option<(f64, f64, f64)>,
    tr_smooth: f64,
    plus_dm_smooth: f64,
    minus_dm_smooth: f64,
    adx: f64,
    count: usize,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            prev: None,
            tr_smooth: 0.0,
            plus_dm_smooth: 0.0,
            minus_dm_smooth: 0.0,
            adx: 0.0,
            count: 0,
        }
    }

    pub fn next(&mut self, high: f64, low: f64, close: f64) -> f64 {
        let Some((prev_high, prev_low, prev_close)) = self.prev.replace((high, low, close)) else {
            return 0.0;
        };

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        let up_move = high - prev_high;
        let down_move = prev_low - low;
        let plus_dm = if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 };
        let minus_dm = if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 };

        self.count += 1;
        let n = self.period as f64;
        if self.count <= self.period {
            self.tr_smooth += tr;
            self.plus_dm_smooth += plus_dm;
            self.minus_dm_smooth += minus_dm;
        } else {
            self.tr_smooth = self.tr_smooth - self.tr_smooth / n + tr;
            self.plus_dm_smooth = self.plus_dm_smooth - self.plus_dm_smooth / n + plus_dm;
            self.minus_dm_smooth = self.minus_dm_smooth - self.minus_dm_smooth / n + minus_dm;
        }

        if self.count < self.period || self.tr_smooth <= 0.0 {
            return self.adx;
        }

        let plus_di = 100.0 * self.plus_dm_smooth / self.tr_smooth;
        let minus_di = 100.0 * self.minus_dm_smooth / self.tr_smooth;
        let di_sum = plus_di + minus_di;
        let dx = if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        };

        self.adx = if self.count == self.period {
            dx
        } else {
            (self.adx * (n - 1.0) + dx) / n
        };
        self.adx
    }
}

pub fn adx_latest(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() <= period {
        return None;
    }
    let mut adx = Adx::new(period);
    candles.iter().map(|c| adx.next(c.high, c.low, c.close)).last()
}

/// Trailing sum of the last `window` values.
pub fn trailing_sum(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    Some(values[values.len() - window..].iter().sum())
}
