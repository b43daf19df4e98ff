pub mod feature_registry;
pub mod policy;
