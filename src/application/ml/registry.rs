//! Policy panel: a declarative list of models evaluated once at startup.
//!
//! Each [`ModelSpec`] is handed to a [`ModelLoader`] and the outcome is kept
//! as a [`LoadResult`]. After that the panel is plain data; an unavailable
//! model simply never votes.

use super::predictor::{ModelKind, PolicyModel};
use crate::domain::errors::ModelError;
use crate::domain::ml::feature_registry::Observation;
use crate::domain::ml::policy::RlVote;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub kind: ModelKind,
    pub path: PathBuf,
}

impl ModelSpec {
    /// `<dir>/agent_<name>.json`. The kind follows the algorithm family:
    /// ppo and a2c are discrete, everything else continuous.
    pub fn for_name(models_dir: &Path, name: &str) -> Self {
        let name = name.trim().to_lowercase();
        let kind = match name.as_str() {
            "ppo" | "a2c" => ModelKind::Discrete,
            _ => ModelKind::Continuous,
        };
        Self {
            path: models_dir.join(format!("agent_{}.json", name)),
            name,
            kind,
        }
    }
}

pub fn default_specs(models_dir: &Path, names: &[String]) -> Vec<ModelSpec> {
    names
        .iter()
        .filter(|n| !n.trim().is_empty())
        .map(|n| ModelSpec::for_name(models_dir, n))
        .collect()
}

pub trait ModelLoader: Send + Sync {
    fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn PolicyModel>, ModelError>;
}

impl<F> ModelLoader for F
where
    F: Fn(&ModelSpec) -> Result<Arc<dyn PolicyModel>, ModelError> + Send + Sync,
{
    fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn PolicyModel>, ModelError> {
        self(spec)
    }
}

#[derive(Clone)]
pub enum LoadResult {
    Loaded(Arc<dyn PolicyModel>),
    Unavailable { reason: String },
}

impl LoadResult {
    pub fn is_available(&self) -> bool {
        matches!(self, LoadResult::Loaded(_))
    }
}

impl std::fmt::Debug for LoadResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadResult::Loaded(model) => write!(f, "Loaded({}, {})", model.name(), model.kind()),
            LoadResult::Unavailable { reason } => write!(f, "Unavailable({})", reason),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolicyPanel {
    models: BTreeMap<String, LoadResult>,
}

impl PolicyPanel {
    /// Loads every spec. A failing spec is recorded as unavailable.
    pub fn load(specs: &[ModelSpec], loader: &dyn ModelLoader) -> Self {
        let models: BTreeMap<String, LoadResult> = specs
            .iter()
            .map(|spec| {
                let result = match catch_unwind(AssertUnwindSafe(|| loader.load(spec))) {
                    Ok(Ok(model)) => LoadResult::Loaded(model),
                    Ok(Err(e)) => {
                        warn!("Policy {} unavailable: {}", spec.name, e);
                        LoadResult::Unavailable {
                            reason: e.to_string(),
                        }
                    }
                    Err(_) => {
                        warn!("Policy {} loader panicked", spec.name);
                        LoadResult::Unavailable {
                            reason: "loader panicked".to_string(),
                        }
                    }
                };
                (spec.name.clone(), result)
            })
            .collect();

        let panel = Self { models };
        info!(
            "Policy panel: {}/{} models loaded",
            panel.available_count(),
            panel.total_count()
        );
        panel
    }

    pub fn from_models(models: Vec<Arc<dyn PolicyModel>>) -> Self {
        Self {
            models: models
                .into_iter()
                .map(|m| (m.name().to_string(), LoadResult::Loaded(m)))
                .collect(),
        }
    }

    pub fn available_count(&self) -> usize {
        self.models.values().filter(|r| r.is_available()).count()
    }

    pub fn total_count(&self) -> usize {
        self.models.len()
    }

    pub fn status(&self) -> &BTreeMap<String, LoadResult> {
        &self.models
    }

    /// Runs every available model in parallel.
    ///
    /// Returns one result per available model in name order. A panicking
    /// model yields a prediction error instead of unwinding.
    pub fn predict_all(&self, observation: &Observation) -> Vec<Result<RlVote, ModelError>> {
        let loaded: Vec<&Arc<dyn PolicyModel>> = self
            .models
            .values()
            .filter_map(|r| match r {
                LoadResult::Loaded(model) => Some(model),
                LoadResult::Unavailable { .. } => None,
            })
            .collect();

        loaded
            .par_iter()
            .map(|model| {
                match catch_unwind(AssertUnwindSafe(|| model.predict(observation))) {
                    Ok(Ok(output)) => Ok(RlVote::new(model.name(), output)),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(ModelError::PredictionFailed {
                        name: model.name().to_string(),
                        reason: "model panicked".to_string(),
                    }),
                }
            })
            .collect()
    }

    /// [`Self::predict_all`] on the blocking pool, keeping inference off the
    /// async workers.
    pub async fn predict(self: Arc<Self>, observation: Observation) -> Vec<Result<RlVote, ModelError>> {
        if self.available_count() == 0 {
            return Vec::new();
        }
        match tokio::task::spawn_blocking(move || self.predict_all(&observation)).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Policy inference task failed: {}", e);
                Vec::new()
            }
        }
    }
}
