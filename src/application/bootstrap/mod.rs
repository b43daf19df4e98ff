pub mod agents;
pub mod persistence;
pub mod services;
