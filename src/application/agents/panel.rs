use super::{AgentContext, RiskManagerAgent, SignalAgent};
use crate::domain::errors::AgentError;
use crate::domain::risk::RiskCapacity;
use crate::domain::signal::Signal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// An agent that errored or panicked during one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentFailure {
    pub agent: String,
    pub reason: String,
}

/// Everything the agents produced for one ticker.
///
/// Every configured agent has an entry in `signals`; failed agents appear
/// as `{neutral, 0}` and are also listed in `failures`.
#[derive(Debug, Clone, Default)]
pub struct AgentReport {
    pub signals: BTreeMap<String, Signal>,
    pub risk: Option<RiskCapacity>,
    pub failures: Vec<AgentFailure>,
}

/// Runs the directional agents and the risk manager concurrently.
#[derive(Clone, Default)]
pub struct AgentPanel {
    agents: Vec<Arc<dyn SignalAgent>>,
    risk: Option<Arc<RiskManagerAgent>>,
}

impl AgentPanel {
    pub fn new(agents: Vec<Arc<dyn SignalAgent>>, risk: Option<RiskManagerAgent>) -> Self {
        Self {
            agents,
            risk: risk.map(Arc::new),
        }
    }

    pub fn agent_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.agents.iter().map(|a| a.name()).collect();
        if let Some(risk) = &self.risk {
            names.push(risk.name());
        }
        names
    }

    /// Evaluates every agent as its own task and waits for all of them.
    ///
    /// Errors and panics are contained per agent. Missing data is expected
    /// and only logged at debug; anything else is recorded as a failure.
    pub async fn evaluate(&self, ctx: Arc<AgentContext>) -> AgentReport {
        let handles: Vec<_> = self
            .agents
            .iter()
            .map(|agent| {
                let agent = Arc::clone(agent);
                let ctx = Arc::clone(&ctx);
                let name = agent.name();
                (name, tokio::spawn(async move { agent.analyze(&ctx).await }))
            })
            .collect();

        let risk_handle = self.risk.as_ref().map(|risk| {
            let risk = Arc::clone(risk);
            let ctx = Arc::clone(&ctx);
            (risk.name(), tokio::spawn(async move { risk.assess(&ctx) }))
        });

        let mut report = AgentReport::default();

        for (name, handle) in handles {
            let signal = match handle.await {
                Ok(Ok(signal)) => {
                    debug!(
                        "Agent {} for {}: {} ({})",
                        name, ctx.ticker, signal.direction, signal.confidence
                    );
                    signal
                }
                Ok(Err(e)) => {
                    report.record_error(name, &ctx.ticker, &e);
                    Signal::neutral(e.to_string())
                }
                Err(join_error) => {
                    report.record_panic(name, &ctx.ticker, &join_error);
                    Signal::neutral(format!("{} agent failed", name))
                }
            };
            report.signals.insert(name.to_string(), signal);
        }

        if let Some((name, handle)) = risk_handle {
            let capacity = match handle.await {
                Ok(Ok(capacity)) => capacity,
                Ok(Err(e)) => {
                    report.record_error(name, &ctx.ticker, &e);
                    RiskCapacity::unknown(e.to_string())
                }
                Err(join_error) => {
                    report.record_panic(name, &ctx.ticker, &join_error);
                    RiskCapacity::unknown(format!("{} agent failed", name))
                }
            };
            report.risk = Some(capacity);
        }

        report
    }
}

impl AgentReport {
    fn record_error(&mut self, agent: &str, ticker: &str, error: &AgentError) {
        if let AgentError::DataUnavailable { .. } = error {
            debug!("Agent {} has no data for {}: {}", agent, ticker, error);
            return;
        }
        warn!("Agent {} failed for {}: {}", agent, ticker, error);
        self.failures.push(AgentFailure {
            agent: agent.to_string(),
            reason: error.to_string(),
        });
    }

    fn record_panic(&mut self, agent: &str, ticker: &str, error: &tokio::task::JoinError) {
        warn!("Agent {} aborted for {}: {}", agent, ticker, error);
        self.failures.push(AgentFailure {
            agent: agent.to_string(),
            reason: format!("task aborted: {}", error),
        });
    }
}
