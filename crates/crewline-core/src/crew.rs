// ABOUTME: Declarative crew definitions: agent profiles plus a topic-templated workflow.
// ABOUTME: Loaded from YAML so persona sets stay data; the research crew ships embedded.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::workflow::WorkflowStep;

/// YAML source of the built-in research crew (researcher, analyst, writer).
pub const RESEARCH_CREW_YAML: &str = include_str!("../crews/research.yaml");

/// Placeholder substituted with the user's topic in workflow task templates.
pub const TOPIC_PLACEHOLDER: &str = "{topic}";

/// Errors that can occur while loading a crew definition.
#[derive(Debug, Error)]
pub enum CrewDefinitionError {
    #[error("failed to read crew file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid crew definition: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("crew defines agent '{0}' more than once")]
    DuplicateAgent(String),

    #[error("crew defines no agents")]
    NoAgents,
}

/// A named persona: who the agent is, what it is for, and which tools it may request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    #[serde(default)]
    pub tools: Vec<String>,
}

/// One workflow entry whose task text may contain `{topic}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StepTemplate {
    pub agent: String,
    pub task: String,
}

/// A crew: its agents and the ordered workflow they run for a topic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrewDefinition {
    pub name: String,
    #[serde(default)]
    pub default_topic: Option<String>,
    pub agents: Vec<AgentProfile>,
    #[serde(default)]
    pub workflow: Vec<StepTemplate>,
}

impl CrewDefinition {
    /// The embedded research crew.
    pub fn research() -> Result<Self, CrewDefinitionError> {
        Self::from_yaml(RESEARCH_CREW_YAML)
    }

    /// Parse and validate a definition from YAML text.
    pub fn from_yaml(source: &str) -> Result<Self, CrewDefinitionError> {
        let definition: CrewDefinition = serde_yaml::from_str(source)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Read a definition from a YAML file.
    pub fn load(path: &Path) -> Result<Self, CrewDefinitionError> {
        let source = std::fs::read_to_string(path).map_err(|source| CrewDefinitionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&source)
    }

    fn validate(&self) -> Result<(), CrewDefinitionError> {
        if self.agents.is_empty() {
            return Err(CrewDefinitionError::NoAgents);
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.name.as_str()) {
                return Err(CrewDefinitionError::DuplicateAgent(agent.name.clone()));
            }
        }

        // Unknown agents are allowed: the executor records a "not found" result for them.
        for step in &self.workflow {
            if !seen.contains(step.agent.as_str()) {
                tracing::warn!(
                    crew = %self.name,
                    agent = %step.agent,
                    "workflow step names an agent the crew does not define"
                );
            }
        }

        Ok(())
    }

    /// Instantiate the workflow for `topic`, substituting every `{topic}` placeholder.
    pub fn workflow_for(&self, topic: &str) -> Vec<WorkflowStep> {
        self.workflow
            .iter()
            .map(|step| WorkflowStep::new(&step.agent, step.task.replace(TOPIC_PLACEHOLDER, topic)))
            .collect()
    }
}
