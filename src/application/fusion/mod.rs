pub mod assessment;
pub mod engine;
pub mod history;
pub mod sizing;

pub use engine::DecisionFusionEngine;
pub use history::{DecisionHistory, HistorySummary};
pub use sizing::{SizedQuantity, SizingEngine};
