use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use socialsim_types::{Agent, AgentRepository, Error, Result};

/// Materializes the agent population for a run.
///
/// Contract: returns exactly `num_agents` agents with unique handles, or
/// `InsufficientAgents{requested, available}`.
pub trait AgentFactory: Send + Sync {
    fn create_agents(&self, num_agents: usize) -> Result<Vec<Agent>>;
}

fn take_agents(mut all: Vec<Agent>, num_agents: usize) -> Result<Vec<Agent>> {
    if all.len() < num_agents {
        return Err(Error::InsufficientAgents {
            requested: num_agents,
            available: all.len(),
        });
    }
    all.truncate(num_agents);
    Ok(all)
}

/// Factory backed by the durable agent roster
pub struct RosterAgentFactory {
    repo: Arc<dyn AgentRepository>,
}

impl RosterAgentFactory {
    pub fn new(repo: Arc<dyn AgentRepository>) -> Self {
        Self { repo }
    }
}

impl AgentFactory for RosterAgentFactory {
    fn create_agents(&self, num_agents: usize) -> Result<Vec<Agent>> {
        let agents = take_agents(self.repo.list_agents()?, num_agents)?;
        info!(
            requested = num_agents,
            created = agents.len(),
            "materialized agents from roster"
        );
        Ok(agents)
    }
}

/// Factory over a fixed agent list, for tests and embedders
pub struct StaticAgentFactory {
    agents: Vec<Agent>,
}

impl StaticAgentFactory {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self { agents }
    }
}

impl AgentFactory for StaticAgentFactory {
    fn create_agents(&self, num_agents: usize) -> Result<Vec<Agent>> {
        take_agents(self.agents.clone(), num_agents)
    }
}

/// Reject duplicate handles in a factory's output
pub(crate) fn validate_unique_handles(agents: &[Agent]) -> Result<()> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for agent in agents {
        if !seen.insert(agent.handle.as_str()) && !duplicates.contains(&agent.handle) {
            duplicates.push(agent.handle.clone());
        }
    }
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Duplicate agent handles found: {:?}. All agent handles must be unique.",
            duplicates
        )))
    }
}
