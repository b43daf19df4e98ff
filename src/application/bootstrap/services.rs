use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::domain::ports::{
    ExecutionSink, FundamentalsSource, InsiderTradeSource, MarketDataSource, PortfolioProvider,
};
use crate::infrastructure::simulation::{
    PaperBroker, SimulatedFundamentals, SimulatedInsiderTrades, SimulatedMarketData,
};

/// Data sources and the execution side, as trait objects.
#[derive(Clone)]
pub struct ServicesHandle {
    pub market_data: Arc<dyn MarketDataSource>,
    pub fundamentals: Arc<dyn FundamentalsSource>,
    pub insider_trades: Arc<dyn InsiderTradeSource>,
    pub execution: Arc<dyn ExecutionSink>,
    pub portfolio: Arc<dyn PortfolioProvider>,
}

pub struct ServicesBootstrap;

impl ServicesBootstrap {
    /// Wires the simulated collaborators. The paper broker serves as both
    /// the execution sink and the portfolio provider.
    pub fn init(config: &Config) -> Result<ServicesHandle> {
        let sim = &config.simulation;
        info!(
            "Using simulated market (seed={}, base_price={}, volatility={}, reject_rate={})",
            sim.seed, sim.base_price, sim.daily_volatility, sim.reject_rate
        );

        let market_data: Arc<dyn MarketDataSource> = Arc::new(SimulatedMarketData::new(
            sim.seed,
            sim.base_price,
            sim.daily_volatility,
        ));
        let broker = Arc::new(
            PaperBroker::new(config.risk.initial_cash, Arc::clone(&market_data))
                .with_reject_rate(sim.reject_rate, sim.seed),
        );

        Ok(ServicesHandle {
            market_data,
            fundamentals: Arc::new(SimulatedFundamentals::new(sim.seed)),
            insider_trades: Arc::new(SimulatedInsiderTrades::new(sim.seed)),
            execution: broker.clone(),
            portfolio: broker,
        })
    }
}
