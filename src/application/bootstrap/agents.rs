use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::application::agents::{
    AgentPanel, FundamentalsAgent, RiskManagerAgent, SentimentAgent, SignalAgent,
    TechnicalsAgent, ValuationAgent,
};
use crate::application::bootstrap::services::ServicesHandle;
use crate::application::ml::{ModelLoader, PolicyPanel, SmartCoreLoader, default_specs};
use crate::config::Config;

pub struct AgentsHandle {
    pub panel: AgentPanel,
    pub policies: Arc<PolicyPanel>,
}

pub struct AgentsBootstrap;

impl AgentsBootstrap {
    /// Builds the analytical agent panel and loads the RL policies with the
    /// smartcore loader.
    pub fn init(config: &Config, services: &ServicesHandle) -> Result<AgentsHandle> {
        Self::init_with_loader(config, services, &SmartCoreLoader)
    }

    pub fn init_with_loader(
        config: &Config,
        services: &ServicesHandle,
        loader: &dyn ModelLoader,
    ) -> Result<AgentsHandle> {
        let agents: Vec<Arc<dyn SignalAgent>> = vec![
            Arc::new(TechnicalsAgent::new()),
            Arc::new(FundamentalsAgent::new(Arc::clone(&services.fundamentals))),
            Arc::new(ValuationAgent::new(Arc::clone(&services.fundamentals))),
            Arc::new(SentimentAgent::new(Arc::clone(&services.insider_trades))),
        ];
        let risk = RiskManagerAgent::new(config.to_risk_limits()?);
        info!(
            "Agent panel: {} analytical agents + risk manager",
            agents.len()
        );

        let specs = default_specs(&config.ensemble.models_dir, &config.ensemble.models);
        let policies = Arc::new(PolicyPanel::load(&specs, loader));

        Ok(AgentsHandle {
            panel: AgentPanel::new(agents, Some(risk)),
            policies,
        })
    }
}
