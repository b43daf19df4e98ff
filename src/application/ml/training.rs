//! Offline training of the smartcore policies from simulated history.
//!
//! Labels come from the forward return over `horizon` bars: continuous
//! policies regress a clamped, scaled return (so `label_threshold` lands on
//! the ±0.5 vote boundary) and discrete policies classify it into
//! 0 = HOLD, 1 = BUY, 2 = SELL.

use super::predictor::ModelKind;
use super::registry::ModelSpec;
use crate::application::feature_engineering_service::FeatureEngineeringService;
use crate::domain::trading::types::Candle;
use anyhow::{Context, Result, anyhow};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fs::File;
use tracing::info;

/// Bars skipped at the start of each series while indicators warm up.
const WARMUP_BARS: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingParams {
    pub horizon: usize,
    pub label_threshold: f64,
    pub n_trees: u16,
    pub max_depth: u16,
    pub min_split: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            horizon: 5,
            label_threshold: 0.01,
            n_trees: 50,
            max_depth: 8,
            min_split: 5,
        }
    }
}

/// Feature rows with their forward returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub features: Vec<Vec<f64>>,
    pub forward_returns: Vec<f64>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Appends every labelled row of one ticker's history.
    pub fn extend_from_history(
        &mut self,
        features: &FeatureEngineeringService,
        candles: &[Candle],
        horizon: usize,
    ) -> Result<usize> {
        let horizon = horizon.max(1);
        if candles.len() <= WARMUP_BARS + horizon {
            return Ok(0);
        }
        let table = features.preprocess(candles)?;
        let mut added = 0;
        for (i, row) in table.rows().iter().enumerate().skip(WARMUP_BARS) {
            let Some(future) = candles.get(i + horizon) else {
                break;
            };
            let now = candles[i].close;
            if now <= 0.0 {
                continue;
            }
            self.features.push(row.to_vec());
            self.forward_returns.push(future.close / now - 1.0);
            added += 1;
        }
        Ok(added)
    }

    /// Regression targets in [-1, 1]; `threshold` maps to 0.5.
    pub fn continuous_targets(&self, threshold: f64) -> Vec<f64> {
        let scale = (threshold * 2.0).max(f64::EPSILON);
        self.forward_returns
            .iter()
            .map(|r| (r / scale).clamp(-1.0, 1.0))
            .collect()
    }

    pub fn class_labels(&self, threshold: f64) -> Vec<i32> {
        self.forward_returns
            .iter()
            .map(|r| {
                if *r > threshold {
                    1
                } else if *r < -threshold {
                    2
                } else {
                    0
                }
            })
            .collect()
    }
}

/// Fits the model described by `spec` and writes it as JSON to `spec.path`.
pub fn train_and_save(spec: &ModelSpec, data: &TrainingSet, params: &TrainingParams) -> Result<()> {
    if data.is_empty() {
        return Err(anyhow!("No training rows for {}", spec.name));
    }
    let x = DenseMatrix::from_2d_vec(&data.features)
        .map_err(|e| anyhow!("Matrix error: {}", e))?;

    if let Some(parent) = spec.path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let mut file =
        File::create(&spec.path).with_context(|| format!("Failed to create {:?}", spec.path))?;

    match spec.kind {
        ModelKind::Continuous => {
            let y = data.continuous_targets(params.label_threshold);
            let parameters = RandomForestRegressorParameters::default()
                .with_n_trees(usize::from(params.n_trees))
                .with_max_depth(params.max_depth)
                .with_min_samples_split(params.min_split);
            let model = RandomForestRegressor::fit(&x, &y, parameters)
                .map_err(|e| anyhow!("Training error for {}: {}", spec.name, e))?;
            serde_json::to_writer(&mut file, &model)?;
        }
        ModelKind::Discrete => {
            let y = data.class_labels(params.label_threshold);
            let parameters = RandomForestClassifierParameters::default()
                .with_n_trees(params.n_trees)
                .with_max_depth(params.max_depth)
                .with_min_samples_split(params.min_split);
            let model = RandomForestClassifier::fit(&x, &y, parameters)
                .map_err(|e| anyhow!("Training error for {}: {}", spec.name, e))?;
            serde_json::to_writer(&mut file, &model)?;
        }
    }

    info!(
        "Trained {} policy {} on {} rows -> {:?}",
        spec.kind,
        spec.name,
        data.len(),
        spec.path
    );
    Ok(())
}
