// Market data processing modules
pub mod statistical_features;
