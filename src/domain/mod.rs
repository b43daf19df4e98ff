// Signal vocabularies (agents vs. RL / final decisions)
pub mod signal;

// Fused decisions and their persisted records
pub mod decision;

// Feature vectors and RL vote types
pub mod ml;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Risk capacity (position headroom)
pub mod risk;

// Core trading domain
pub mod trading;

// Configuration value objects
pub mod config;

// Input validation
pub mod validation;

// Domain-specific error types
pub mod errors;
