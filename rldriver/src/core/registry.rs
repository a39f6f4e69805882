use crate::core::agent::{AgentPars, AgentStatistics, RlDriver};
use std::collections::BTreeMap;

/// AgentRegistry owns the agents of a host, keyed by name.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, RlDriver>,
}

impl AgentRegistry {
    pub fn new() -> AgentRegistry {
        AgentRegistry::default()
    }

    /// get_or_create returns the agent with the name of `pars`, creating it if necessary.
    pub fn get_or_create(&mut self, pars: &AgentPars) -> &mut RlDriver {
        self.agents
            .entry(pars.name.to_owned())
            .or_insert_with(|| {
                log::info!("Creating agent {}", pars.name);
                RlDriver::new(pars)
            })
    }

    /// insert adds a (e.g. restored) agent and returns the agent it replaced.
    pub fn insert(&mut self, agent: RlDriver) -> Option<RlDriver> {
        self.agents.insert(agent.name.to_owned(), agent)
    }

    pub fn get(&self, name: &str) -> Option<&RlDriver> {
        self.agents.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RlDriver> {
        self.agents.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<RlDriver> {
        self.agents.remove(name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// statistics returns the statistics of all agents ordered by name.
    pub fn statistics(&self) -> Vec<AgentStatistics> {
        self.agents.values().map(|agent| agent.statistics()).collect()
    }
}
