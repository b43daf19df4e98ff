use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub mod ledger;
pub mod orchestrator;
pub mod reporter;
pub mod shutdown_service;

pub use ledger::{ExecutionLedger, LedgerCheck};
pub use orchestrator::{CycleDependencies, CycleOrchestrator, CycleSettings, CycleSummary};
pub use reporter::{PerformanceReport, PerformanceReporter, RunTotals};
pub use shutdown_service::ShutdownService;

use crate::application::bootstrap::{
    agents::AgentsBootstrap,
    persistence::{PersistenceBootstrap, PersistenceHandle},
    services::{ServicesBootstrap, ServicesHandle},
};
use crate::application::fusion::DecisionFusionEngine;
use crate::config::Config;
use crate::infrastructure::observability::Metrics;

pub struct Application {
    pub config: Config,
    // Kept to hold the pool open for the lifetime of the run
    pub persistence: PersistenceHandle,
    pub services: ServicesHandle,
    pub orchestrator: Arc<CycleOrchestrator>,
    pub metrics: Metrics,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        info!(
            "Building Fusiontrade Application (tickers: {}, dry_run: {})...",
            config.cycle.tickers.join(","),
            config.cycle.dry_run
        );

        // 1. Initialize Metrics & Persistence
        let metrics = Metrics::new()?;
        let persistence = PersistenceBootstrap::init(&config).await?;

        // 2. Initialize Services (data sources, broker)
        let services = ServicesBootstrap::init(&config)?;

        // 3. Initialize Agents and RL policies
        let agents = AgentsBootstrap::init(&config, &services)?;

        let engine = DecisionFusionEngine::new(
            config
                .to_fusion_config()
                .context("Fusion engine configuration")?,
        );
        let deps = CycleDependencies {
            market_data: Arc::clone(&services.market_data),
            portfolio: Arc::clone(&services.portfolio),
            execution: Arc::clone(&services.execution),
            repository: Arc::clone(&persistence.decision_repository),
        };
        let orchestrator = Arc::new(CycleOrchestrator::new(
            CycleSettings::from_config(&config),
            deps,
            agents.panel,
            agents.policies,
            engine,
            metrics.clone(),
        ));

        Ok(Self {
            config,
            persistence,
            services,
            orchestrator,
            metrics,
        })
    }

    /// Runs the cycle loop until Ctrl+C, `shutdown.request` or max cycles.
    pub async fn run(self, shutdown: ShutdownService) -> Result<RunTotals> {
        info!("Starting cycle loop...");
        let signal_listener = shutdown.listen_for_ctrl_c();

        let totals = self.orchestrator.run(shutdown.subscribe()).await;

        signal_listener.abort();
        info!(
            "Cycle loop stopped after {} cycles ({} failed), {} trades executed",
            totals.cycles_completed, totals.cycles_failed, totals.trades_executed
        );
        Ok(totals)
    }
}
