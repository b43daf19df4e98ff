use thiserror::Error;

/// Errors raised inside an analytical agent. They never leave the agent
/// panel: each one is converted into a `{neutral, 0}` signal.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("No {what} available for {ticker}")]
    DataUnavailable { ticker: String, what: String },

    #[error("Insufficient history for {ticker}: need {required} bars, got {available}")]
    InsufficientHistory {
        ticker: String,
        required: usize,
        available: usize,
    },

    #[error("Data source failed for {ticker}: {reason}")]
    SourceFailed { ticker: String, reason: String },

    #[error("Invalid input for {ticker}: {reason}")]
    InvalidInput { ticker: String, reason: String },
}

/// Errors from turning OHLCV history into observations.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Cannot extract features from an empty price history")]
    EmptyHistory,

    #[error("Indicator {name} failed: {reason}")]
    Indicator { name: String, reason: String },
}

/// Per-model loading and inference failures. Non-fatal to the ensemble.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model file not found for {name}: {path}")]
    NotFound { name: String, path: String },

    #[error("Failed to load model {name}: {reason}")]
    LoadFailed { name: String, reason: String },

    #[error("Prediction failed for model {name}: {reason}")]
    PredictionFailed { name: String, reason: String },

    #[error("Model {name} returned an unexpected output: {value}")]
    UnexpectedOutput { name: String, value: f64 },
}

/// Internal fusion failures. Caught at the engine boundary.
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("Non-finite value in {field}: {value}")]
    NonFiniteValue { field: String, value: f64 },

    #[error("Invalid fusion configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Errors reported by the execution collaborator.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Order rejected for {ticker}: {reason}")]
    Rejected { ticker: String, reason: String },

    #[error("Invalid order: {reason}")]
    InvalidOrder { reason: String },
}

/// Startup configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Ticker list is empty")]
    EmptyTickerList,

    #[error("Invalid symbol: {symbol:?}. Must be 1-5 uppercase letters")]
    InvalidSymbol { symbol: String },

    #[error("Invalid value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}
