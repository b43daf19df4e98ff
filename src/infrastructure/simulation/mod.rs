//! Simulated collaborators
//!
//! Deterministic stand-ins for the market data, fundamentals, insider trade,
//! broker and portfolio services. The server binary runs against these; no
//! real data vendor or broker is wired in.

pub mod fundamentals;
pub mod market_data;
pub mod paper_broker;

pub use fundamentals::{SimulatedFundamentals, SimulatedInsiderTrades};
pub use market_data::SimulatedMarketData;
pub use paper_broker::PaperBroker;

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Rng seeded from the run seed and a ticker, so every ticker gets its own
/// reproducible stream.
pub(crate) fn ticker_rng(seed: u64, ticker: &str) -> StdRng {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in ticker.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    StdRng::seed_from_u64(seed ^ hash)
}
