//! Statistical helpers for price-series analysis
//!
//! This module provides calculations for:
//! - Simple returns
//! - Hurst Exponent (trend persistence detection)
//! - Skewness and excess kurtosis (distribution shape)
//! - Rolling sample statistics

use statrs::statistics::{Data, Distribution};

/// Simple period-over-period returns. Non-positive previous prices yield 0.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Calculate the Hurst Exponent from the scaling of lagged differences
///
/// For each lag `L`, the dispersion of `p[t+L] - p[t]` grows like `L^H`:
/// - H = 0.5: Random walk (Brownian motion)
/// - H > 0.5: Trending/persistent behavior (trends continue)
/// - H < 0.5: Mean-reverting/anti-persistent (reversals likely)
///
/// # Arguments
/// * `prices` - Price series
/// * `lags` - Lag periods to analyze (e.g., 2..20)
///
/// # Returns
/// * `Some(f64)` - Hurst exponent clamped to [0, 1]
/// * `None` - If fewer than two lags produce a usable dispersion
pub fn calculate_hurst_exponent(prices: &[f64], lags: &[usize]) -> Option<f64> {
    let mut log_lags = Vec::with_capacity(lags.len());
    let mut log_tau = Vec::with_capacity(lags.len());

    for &lag in lags {
        if lag == 0 || lag + 1 >= prices.len() {
            continue;
        }
        let diffs: Vec<f64> = prices[lag..]
            .iter()
            .zip(prices.iter())
            .map(|(later, earlier)| later - earlier)
            .collect();

        let tau = population_std(&diffs)?;
        if tau > 1e-12 {
            log_lags.push((lag as f64).ln());
            log_tau.push(tau.ln());
        }
    }

    if log_lags.len() < 2 {
        return None;
    }

    let hurst = linear_regression_slope(&log_lags, &log_tau)?;
    Some(hurst.clamp(0.0, 1.0))
}

/// Simple linear regression to find slope
pub fn linear_regression_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.is_empty() {
        return None;
    }

    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y.iter()).map(|(xi, yi)| xi * yi).sum();
    let sum_x2: f64 = x.iter().map(|xi| xi * xi).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() < 1e-10 {
        return None;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    Some(slope)
}

fn population_std(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}

/// Calculate skewness of a distribution
///
/// - Skew = 0: Symmetric distribution
/// - Skew > 0: Right tail (positive outliers)
/// - Skew < 0: Left tail (negative outliers)
pub fn calculate_skewness(values: &[f64]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std_dev = population_std(values)?;
    if std_dev < 1e-10 {
        return None;
    }

    let skewness = values
        .iter()
        .map(|v| ((v - mean) / std_dev).powi(3))
        .sum::<f64>()
        / n;

    Some(skewness)
}

/// Excess kurtosis (normal distribution = 0)
pub fn calculate_excess_kurtosis(values: &[f64]) -> Option<f64> {
    if values.len() < 4 {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std_dev = population_std(values)?;
    if std_dev < 1e-10 {
        return None;
    }

    let kurtosis = values
        .iter()
        .map(|v| ((v - mean) / std_dev).powi(4))
        .sum::<f64>()
        / n;

    Some(kurtosis - 3.0)
}

/// Mean and sample standard deviation of the trailing `window` values.
pub fn trailing_mean_std(values: &[f64], window: usize) -> Option<(f64, f64)> {
    if window < 2 || values.len() < window {
        return None;
    }
    let data = Data::new(values[values.len() - window..].to_vec());
    let mean = data.mean()?;
    let std_dev = data.std_dev()?;
    Some((mean, std_dev))
}

/// Sample standard deviation over every full trailing window, oldest first.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    if window < 2 || values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .filter_map(|w| Data::new(w.to_vec()).std_dev())
        .collect()
}
