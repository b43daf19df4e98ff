// Analytical agents and the agent panel
pub mod agents;
pub mod bootstrap;

// Observation features for the RL policies
pub mod feature_engineering_service;

// Decision fusion, sizing and decision history
pub mod fusion;

// Market data processing
pub mod market_data;

// RL policy panel and ensemble aggregation
pub mod ml;

// Cycle orchestrator
pub mod system;
