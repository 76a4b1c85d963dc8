// ABOUTME: Core library for crewline, containing configuration and the shared data model.
// ABOUTME: Messages, history policy, workflow records and crew definitions live here, free of I/O clients.

pub mod config;
pub mod crew;
pub mod history;
pub mod message;
pub mod workflow;

pub use config::{AgentConfig, ConfigError, ReasoningLevel};
pub use crew::{AgentProfile, CrewDefinition, CrewDefinitionError};
pub use history::{CHAT_HISTORY_CAP, History, HistoryPolicy, ROLE_PROMPT_WINDOW};
pub use message::{Message, Role};
pub use workflow::{
    HandoffContext, StepResult, WorkflowRecord, WorkflowResults, WorkflowStep, preview, step_key,
};
