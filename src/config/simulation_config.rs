//! Simulated collaborator configuration parsing from environment variables.
//!
//! The server runs against seeded, deterministic market data and a paper
//! execution sink; these knobs shape that simulation.

use std::env;

#[derive(Debug, Clone)]
pub struct SimulationEnvConfig {
    pub seed: u64,
    pub base_price: f64,
    pub daily_volatility: f64,
    /// Probability in [0, 1] that the paper sink rejects an order
    pub reject_rate: f64,
}

impl Default for SimulationEnvConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            base_price: 150.0,
            daily_volatility: 0.02,
            reject_rate: 0.0,
        }
    }
}

impl SimulationEnvConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let seed = env::var("SIMULATION_SEED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.seed);

        let base_price = env::var("SIMULATION_BASE_PRICE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.base_price);

        let daily_volatility = env::var("SIMULATION_DAILY_VOLATILITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.daily_volatility);

        let reject_rate = env::var("SIMULATION_REJECT_RATE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .map(|r| r.clamp(0.0, 1.0))
            .unwrap_or(defaults.reject_rate);

        Self {
            seed,
            base_price,
            daily_volatility,
            reject_rate,
        }
    }
}
