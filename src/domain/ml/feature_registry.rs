use serde::{Deserialize, Serialize};

/// Ordered list of observation features.
/// This order MUST match the order the policy models were trained with.
/// Any change here is a breaking change for every model file.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "close",
    "high",
    "low",
    "open",
    "volume",
    "day",
    "macd",
    "boll_ub",
    "boll_lb",
    "rsi_30",
    "cci_30",
    "dx_30",
    "close_30_sma",
    "close_60_sma",
];

pub const FEATURE_COUNT: usize = 14;

/// Fixed-length, sanitized observation fed to every policy model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation([f64; FEATURE_COUNT]);

impl Observation {
    /// Pads with zeros or truncates to [`FEATURE_COUNT`] and replaces NaN/inf with 0.
    pub fn from_values(values: &[f64]) -> Self {
        let mut out = [0.0; FEATURE_COUNT];
        for (slot, value) in out.iter_mut().zip(values.iter()) {
            *slot = if value.is_finite() { *value } else { 0.0 };
        }
        Self(out)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.0[idx])
    }
}
