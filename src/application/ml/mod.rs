pub mod aggregator;
pub mod predictor;
pub mod registry;
pub mod smartcore_predictor;
pub mod training;

pub use aggregator::RlAggregator;
pub use predictor::{ModelKind, PolicyModel};
pub use registry::{LoadResult, ModelLoader, ModelSpec, PolicyPanel, default_specs};
pub use smartcore_predictor::SmartCoreLoader;
pub use training::{TrainingParams, TrainingSet, train_and_save};
