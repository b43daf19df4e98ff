use super::predictor::{ModelKind, PolicyModel};
use super::registry::{ModelLoader, ModelSpec};
use crate::domain::errors::ModelError;
use crate::domain::ml::feature_registry::Observation;
use crate::domain::ml::policy::PolicyOutput;
use crate::domain::signal::TradeAction;
use serde::de::DeserializeOwned;
use smartcore::ensemble::random_forest_classifier::RandomForestClassifier;
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

type Regressor = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type Classifier = RandomForestClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// Continuous policy backed by a smartcore random forest regressor.
pub struct SmartCoreRegressorPolicy {
    name: String,
    model: Regressor,
}

/// Discrete policy backed by a smartcore random forest classifier.
///
/// Class labels: 0 = HOLD, 1 = BUY, 2 = SELL.
pub struct SmartCoreClassifierPolicy {
    name: String,
    model: Classifier,
}

impl SmartCoreRegressorPolicy {
    pub fn new(name: impl Into<String>, model: Regressor) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }
}

impl SmartCoreClassifierPolicy {
    pub fn new(name: impl Into<String>, model: Classifier) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }
}

fn input_matrix(name: &str, observation: &Observation) -> Result<DenseMatrix<f64>, ModelError> {
    DenseMatrix::from_2d_vec(&vec![observation.to_vec()]).map_err(|e| {
        ModelError::PredictionFailed {
            name: name.to_string(),
            reason: format!("Matrix creation failed: {}", e),
        }
    })
}

fn prediction_failed(name: &str, reason: impl ToString) -> ModelError {
    ModelError::PredictionFailed {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

impl PolicyModel for SmartCoreRegressorPolicy {
    fn predict(&self, observation: &Observation) -> Result<PolicyOutput, ModelError> {
        let input = input_matrix(&self.name, observation)?;
        let predictions = self
            .model
            .predict(&input)
            .map_err(|e| prediction_failed(&self.name, e))?;
        let value = predictions
            .first()
            .copied()
            .ok_or_else(|| prediction_failed(&self.name, "No prediction returned"))?;
        if !value.is_finite() {
            return Err(ModelError::UnexpectedOutput {
                name: self.name.clone(),
                value,
            });
        }
        Ok(PolicyOutput::Continuous(value))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Continuous
    }
}

impl PolicyModel for SmartCoreClassifierPolicy {
    fn predict(&self, observation: &Observation) -> Result<PolicyOutput, ModelError> {
        let input = input_matrix(&self.name, observation)?;
        let predictions = self
            .model
            .predict(&input)
            .map_err(|e| prediction_failed(&self.name, e))?;
        let label = predictions
            .first()
            .copied()
            .ok_or_else(|| prediction_failed(&self.name, "No prediction returned"))?;
        let action = match label {
            0 => TradeAction::Hold,
            1 => TradeAction::Buy,
            2 => TradeAction::Sell,
            other => {
                return Err(ModelError::UnexpectedOutput {
                    name: self.name.clone(),
                    value: f64::from(other),
                });
            }
        };
        Ok(PolicyOutput::Discrete(action))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Discrete
    }
}

/// Loads serde_json-serialized smartcore forests from disk.
#[derive(Debug, Clone, Default)]
pub struct SmartCoreLoader;

impl SmartCoreLoader {
    fn read_model<M: DeserializeOwned>(spec: &ModelSpec) -> Result<M, ModelError> {
        let path: &Path = &spec.path;
        if !path.exists() {
            return Err(ModelError::NotFound {
                name: spec.name.clone(),
                path: path.display().to_string(),
            });
        }

        let load_failed = |reason: String| ModelError::LoadFailed {
            name: spec.name.clone(),
            reason,
        };

        let mut buffer = Vec::new();
        File::open(path)
            .and_then(|mut file| file.read_to_end(&mut buffer))
            .map_err(|e| load_failed(format!("Failed to read model file: {}", e)))?;

        serde_json::from_slice(&buffer)
            .map_err(|e| load_failed(format!("Failed to deserialize model: {}", e)))
    }
}

impl ModelLoader for SmartCoreLoader {
    fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn PolicyModel>, ModelError> {
        let model: Arc<dyn PolicyModel> = match spec.kind {
            ModelKind::Continuous => Arc::new(SmartCoreRegressorPolicy::new(
                spec.name.clone(),
                Self::read_model::<Regressor>(spec)?,
            )),
            ModelKind::Discrete => Arc::new(SmartCoreClassifierPolicy::new(
                spec.name.clone(),
                Self::read_model::<Classifier>(spec)?,
            )),
        };
        info!("Loaded {} policy {} from {:?}", spec.kind, spec.name, spec.path);
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_file_is_not_found() {
        let spec = ModelSpec {
            name: "sac".to_string(),
            kind: ModelKind::Continuous,
            path: PathBuf::from("/nonexistent/agent_sac.json"),
        };
        let result = SmartCoreLoader.load(&spec);
        assert!(matches!(result, Err(ModelError::NotFound { .. })));
    }

    #[test]
    fn test_corrupt_file_is_load_failure() {
        let dir = std::env::temp_dir().join(format!("fusiontrade-model-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("agent_ppo.json");
        std::fs::write(&path, b"{not json").unwrap();

        let spec = ModelSpec {
            name: "ppo".to_string(),
            kind: ModelKind::Discrete,
            path,
        };
        let result = SmartCoreLoader.load(&spec);
        assert!(matches!(result, Err(ModelError::LoadFailed { .. })));
        std::fs::remove_dir_all(&dir).ok();
    }
}
