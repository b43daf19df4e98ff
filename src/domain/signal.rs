//! Signal vocabularies
//!
//! Analytical agents speak in [`Direction`] (bullish / bearish / neutral) while
//! the RL ensemble and the final decision speak in [`TradeAction`]
//! (BUY / SELL / HOLD). The two are never compared directly: every crossing
//! between them goes through [`Direction::as_action`] or
//! [`TradeAction::as_direction`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown signal label: {0}")]
pub struct UnknownLabel(pub String);

/// Directional view of an analytical agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::Bullish, Direction::Bearish, Direction::Neutral];

    /// Explicit mapping into the action vocabulary.
    pub fn as_action(self) -> TradeAction {
        match self {
            Direction::Bullish => TradeAction::Buy,
            Direction::Bearish => TradeAction::Sell,
            Direction::Neutral => TradeAction::Hold,
        }
    }

    /// +1 / -1 / 0
    pub fn numeric(self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Bearish => -1.0,
            Direction::Neutral => 0.0,
        }
    }

    /// Maps a signed score back to a direction using a symmetric dead band.
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score > threshold {
            Direction::Bullish
        } else if score < -threshold {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Bullish => "bullish",
            Direction::Bearish => "bearish",
            Direction::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bullish" => Ok(Direction::Bullish),
            "bearish" => Ok(Direction::Bearish),
            "neutral" => Ok(Direction::Neutral),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// Action vocabulary used by the RL ensemble and final decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    pub const ALL: [TradeAction; 3] = [TradeAction::Buy, TradeAction::Sell, TradeAction::Hold];

    /// Explicit mapping into the agent vocabulary.
    pub fn as_direction(self) -> Direction {
        match self {
            TradeAction::Buy => Direction::Bullish,
            TradeAction::Sell => Direction::Bearish,
            TradeAction::Hold => Direction::Neutral,
        }
    }

    /// Common numeric vote scale: BUY +1, SELL -1, HOLD 0.
    pub fn vote(self) -> i8 {
        match self {
            TradeAction::Buy => 1,
            TradeAction::Sell => -1,
            TradeAction::Hold => 0,
        }
    }

    pub fn is_directional(self) -> bool {
        !matches!(self, TradeAction::Hold)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::Hold => "HOLD",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeAction {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            "HOLD" => Ok(TradeAction::Hold),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// BUY / SELL / HOLD tally, used for ensemble votes and decision
/// distributions alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
}

impl ActionCounts {
    pub fn record(&mut self, action: TradeAction) {
        match action {
            TradeAction::Buy => self.buy += 1,
            TradeAction::Sell => self.sell += 1,
            TradeAction::Hold => self.hold += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.buy + self.sell + self.hold
    }
}

impl FromIterator<TradeAction> for ActionCounts {
    fn from_iter<I: IntoIterator<Item = TradeAction>>(iter: I) -> Self {
        let mut counts = Self::default();
        for action in iter {
            counts.record(action);
        }
        counts
    }
}

impl fmt::Display for ActionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BUY={} SELL={} HOLD={}", self.buy, self.sell, self.hold)
    }
}

/// Confidence on a 0..=100 scale.
///
/// Construction clamps into range and maps NaN/inf to 0, so a `Confidence`
/// is always a defined, bounded number.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const MAX: f64 = 100.0;

    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, Self::MAX))
        } else {
            Self(0.0)
        }
    }

    /// From a 0..=1 fraction.
    pub fn from_fraction(fraction: f64) -> Self {
        Self::new(fraction * 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Rounded to two decimals.
    pub fn rounded(self) -> Self {
        Self((self.0 * 100.0).round() / 100.0)
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Structured explanation attached to a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rationale {
    Text(String),
    Metrics(BTreeMap<String, f64>),
    Details(BTreeMap<String, String>),
}

impl Rationale {
    pub fn text(s: impl Into<String>) -> Self {
        Rationale::Text(s.into())
    }
}

impl Default for Rationale {
    fn default() -> Self {
        Rationale::Text(String::new())
    }
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rationale::Text(s) => f.write_str(s),
            Rationale::Metrics(m) => {
                let parts: Vec<String> = m.iter().map(|(k, v)| format!("{}={:.4}", k, v)).collect();
                f.write_str(&parts.join(", "))
            }
            Rationale::Details(d) => {
                let parts: Vec<String> = d.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                f.write_str(&parts.join("; "))
            }
        }
    }
}

/// Output of one directional agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    pub confidence: Confidence,
    pub rationale: Rationale,
}

impl Signal {
    pub fn new(direction: Direction, confidence: impl Into<Confidence>, rationale: Rationale) -> Self {
        Self {
            direction,
            confidence: confidence.into(),
            rationale,
        }
    }

    /// `{neutral, 0}` substitute used whenever an agent cannot produce a view.
    pub fn neutral(reason: impl Into<String>) -> Self {
        Self {
            direction: Direction::Neutral,
            confidence: Confidence::ZERO,
            rationale: Rationale::Text(reason.into()),
        }
    }
}
