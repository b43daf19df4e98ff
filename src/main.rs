//! Fusiontrade Server - headless decision fusion loop
//!
//! Runs the agent panel, the RL policy panel and the fusion engine over the
//! configured tickers on a fixed interval, against the simulated market and
//! paper broker. Metrics are pushed via structured JSON logs to stdout.
//!
//! # Usage
//! ```sh
//! STOCK_LIST=AAPL,MSFT cargo run -- --max-cycles 3 --dry-run
//! ```

use anyhow::Result;
use clap::Parser;
use fusiontrade::application::system::{Application, ShutdownService};
use fusiontrade::config::Config;
use fusiontrade::domain::validation::symbols::normalize_symbols;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Stop after this many cycles (overrides MAX_CYCLES)
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Record decisions without sending orders (overrides DRY_RUN)
    #[arg(long)]
    dry_run: bool,

    /// Comma-separated tickers (overrides STOCK_LIST)
    #[arg(long, value_delimiter = ',')]
    tickers: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Setup logging (stdout only)
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();
    info!("Fusiontrade Server {} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(tickers) = args.tickers {
        config.cycle.tickers = normalize_symbols(&tickers)?;
    }
    if args.once {
        config.cycle.max_cycles = Some(1);
    } else if args.max_cycles.is_some() {
        config.cycle.max_cycles = args.max_cycles;
    }
    if args.dry_run {
        config.cycle.dry_run = true;
    }
    config.validate()?;
    info!(
        "Configuration loaded: Tickers={:?}, Interval={}s, DryRun={}",
        config.cycle.tickers, config.cycle.cycle_interval_secs, config.cycle.dry_run
    );

    let app = Application::build(config).await?;
    let metrics = app.metrics.clone();

    let (shutdown, _rx) = ShutdownService::new();
    info!("Server running. Press Ctrl+C to shutdown.");
    app.run(shutdown).await?;

    info!("Final metrics:\n{}", metrics.render());
    Ok(())
}
