use crate::domain::errors::ModelError;
use crate::domain::ml::feature_registry::Observation;
use crate::domain::ml::policy::PolicyOutput;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output family of a policy model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Scalar action in [-1, 1]
    Continuous,
    /// Class label: HOLD, BUY or SELL
    Discrete,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Continuous => f.write_str("continuous"),
            ModelKind::Discrete => f.write_str("discrete"),
        }
    }
}

/// Interface for pre-trained RL policies
pub trait PolicyModel: Send + Sync {
    /// Predict one action from the 14-feature observation
    fn predict(&self, observation: &Observation) -> Result<PolicyOutput, ModelError>;

    /// Get model name
    fn name(&self) -> &str;

    fn kind(&self) -> ModelKind;
}
