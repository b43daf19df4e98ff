//! Trains the RL policy panel's smartcore models on simulated history and
//! writes them as `agent_<name>.json` under `MODELS_DIR`.
//!
//! # Usage
//! ```sh
//! cargo run --bin train_policies -- --years 8 --horizon 5
//! ```

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use fusiontrade::application::feature_engineering_service::FeatureEngineeringService;
use fusiontrade::application::ml::{TrainingParams, TrainingSet, default_specs, train_and_save};
use fusiontrade::config::Config;
use fusiontrade::domain::trading::types::DateRange;
use fusiontrade::infrastructure::simulation::SimulatedMarketData;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Years of simulated daily history per ticker
    #[arg(long, default_value_t = 8)]
    years: i64,

    /// Forward return horizon in bars
    #[arg(long, default_value_t = 5)]
    horizon: usize,

    /// Forward return that counts as a BUY/SELL label
    #[arg(long, default_value_t = 0.01)]
    threshold: f64,

    /// Number of trees in each random forest
    #[arg(long, default_value_t = 50)]
    n_trees: u16,

    /// Maximum depth of trees
    #[arg(long, default_value_t = 8)]
    max_depth: u16,

    /// Minimum samples required to split an internal node
    #[arg(long, default_value_t = 5)]
    min_split: usize,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let params = TrainingParams {
        horizon: args.horizon,
        label_threshold: args.threshold,
        n_trees: args.n_trees,
        max_depth: args.max_depth,
        min_split: args.min_split,
    };

    let range = DateRange::ending(Utc::now().date_naive(), args.years.max(1).saturating_mul(365));
    let features = FeatureEngineeringService::new();
    let specs = default_specs(&config.ensemble.models_dir, &config.ensemble.models);
    info!(
        "Training {} policies on {} tickers over {}",
        specs.len(),
        config.cycle.tickers.len(),
        range
    );

    let mut trained = 0;
    for (index, spec) in specs.iter().enumerate() {
        // Each policy sees a different simulated market
        let sim = &config.simulation;
        let market = SimulatedMarketData::new(
            sim.seed.wrapping_add(1000 + index as u64),
            sim.base_price,
            sim.daily_volatility,
        );

        let mut data = TrainingSet::default();
        for ticker in &config.cycle.tickers {
            let candles = market.generate(ticker, &range);
            data.extend_from_history(&features, &candles, params.horizon)?;
        }

        match train_and_save(spec, &data, &params) {
            Ok(()) => trained += 1,
            Err(e) => warn!("Skipping {}: {:#}", spec.name, e),
        }
    }

    info!("{}/{} policies trained", trained, specs.len());
    Ok(())
}
