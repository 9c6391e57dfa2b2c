use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry of projects.toml
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProjectEntry {
    /// Display name written into the report header
    pub name: String,
    /// Project href in the external API
    pub project: String,
    /// Commission agent (counterparty) href reporting for this project
    pub agent: String,
}

/// Project href -> agent href lookup handed to the fetcher.
#[derive(Debug, Clone, Default)]
pub struct ProjectAgentMap {
    agents: HashMap<String, String>,
}

impl ProjectAgentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, project: impl Into<String>, agent: impl Into<String>) {
        self.agents.insert(project.into(), agent.into());
    }

    pub fn agent_for(&self, project: &str) -> Option<&str> {
        self.agents.get(project).map(String::as_str)
    }
}

impl<'a> FromIterator<&'a ProjectEntry> for ProjectAgentMap {
    fn from_iter<I: IntoIterator<Item = &'a ProjectEntry>>(iter: I) -> Self {
        let mut map = ProjectAgentMap::new();
        for entry in iter {
            map.insert(entry.project.clone(), entry.agent.clone());
        }
        map
    }
}
