// Validated configuration value objects
pub mod fusion_config;
pub mod risk_config;

pub use fusion_config::FusionConfig;
pub use risk_config::RiskLimits;
