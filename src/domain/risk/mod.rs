// Risk management domain
pub mod capacity;

pub use capacity::{HeadroomLevel, RiskCapacity};
