// ABOUTME: Agent configuration for the chat-completions endpoint and tool gateway.
// ABOUTME: Provides chat/crew presets, environment overrides, and validation of the final values.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default base URL of the local model runner's OpenAI-compatible API.
pub const DEFAULT_MODEL_URL: &str = "http://localhost:12434/engines/llama.cpp/v1";

/// Default base URL of the tool gateway.
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:3000";

const DEFAULT_TEMPERATURE: f32 = 0.7;
const MAX_TEMPERATURE: f32 = 2.0;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown reasoning level '{0}'; expected low, medium or high")]
    InvalidReasoningLevel(String),

    #[error("max tokens must be a positive integer, got {0}")]
    InvalidMaxTokens(String),

    #[error("temperature must be a number between 0 and 2, got {0}")]
    InvalidTemperature(String),

    #[error("request timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(String),

    #[error("{name} must not be empty")]
    EmptyValue { name: &'static str },
}

/// How much deliberation the model is asked for. Rendered into the system
/// prompt as `Reasoning: <level>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReasoningLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningLevel {
    pub fn label(&self) -> &'static str {
        match self {
            ReasoningLevel::Low => "low",
            ReasoningLevel::Medium => "medium",
            ReasoningLevel::High => "high",
        }
    }
}

impl fmt::Display for ReasoningLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReasoningLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ReasoningLevel::Low),
            "medium" => Ok(ReasoningLevel::Medium),
            "high" => Ok(ReasoningLevel::High),
            _ => Err(ConfigError::InvalidReasoningLevel(s.to_string())),
        }
    }
}

/// Immutable settings shared by every agent in one process.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub model_url: String,
    pub model_name: String,
    pub gateway_url: String,
    pub reasoning_level: ReasoningLevel,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl AgentConfig {
    /// Preset for the single conversational agent.
    pub fn chat_defaults() -> Self {
        Self {
            model_url: DEFAULT_MODEL_URL.to_string(),
            model_name: "ai/gpt-oss".to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            reasoning_level: ReasoningLevel::Medium,
            max_tokens: 1000,
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Preset for the multi-agent crew. Longer answers, longer timeout.
    pub fn crew_defaults() -> Self {
        Self {
            model_name: "ai/gpt-oss-20b".to_string(),
            max_tokens: 2000,
            request_timeout: Duration::from_secs(60),
            ..Self::chat_defaults()
        }
    }

    /// Load the chat preset with environment overrides applied.
    pub fn chat_from_env() -> Result<Self, ConfigError> {
        Self::chat_defaults().with_env_overrides()
    }

    /// Load the crew preset with environment overrides applied.
    pub fn crew_from_env() -> Result<Self, ConfigError> {
        Self::crew_defaults().with_env_overrides()
    }

    /// Apply environment variable overrides on top of `self`.
    ///
    /// Environment variables:
    /// - CREWLINE_MODEL_URL: base URL of the chat-completions API
    /// - CREWLINE_MODEL: model identifier
    /// - CREWLINE_GATEWAY_URL: base URL of the tool gateway
    /// - CREWLINE_REASONING: low, medium or high
    /// - CREWLINE_MAX_TOKENS: positive integer
    /// - CREWLINE_TEMPERATURE: float in [0, 2]
    /// - CREWLINE_TIMEOUT_SECS: per-request timeout in seconds
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(url) = env_value("CREWLINE_MODEL_URL") {
            self.model_url = url;
        }
        if let Some(model) = env_value("CREWLINE_MODEL") {
            self.model_name = model;
        }
        if let Some(url) = env_value("CREWLINE_GATEWAY_URL") {
            self.gateway_url = url;
        }
        if let Some(level) = env_value("CREWLINE_REASONING") {
            self.reasoning_level = level.parse()?;
        }
        if let Some(raw) = env_value("CREWLINE_MAX_TOKENS") {
            self.max_tokens = raw
                .parse()
                .map_err(|_| ConfigError::InvalidMaxTokens(raw.clone()))?;
        }
        if let Some(raw) = env_value("CREWLINE_TEMPERATURE") {
            self.temperature = raw
                .parse()
                .map_err(|_| ConfigError::InvalidTemperature(raw.clone()))?;
        }
        if let Some(raw) = env_value("CREWLINE_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
            self.request_timeout = Duration::from_secs(secs);
        }

        self.validate()?;
        Ok(self)
    }

    /// Check invariants that the presets satisfy but overrides may break.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model_url.trim().is_empty() {
            return Err(ConfigError::EmptyValue { name: "model URL" });
        }
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::EmptyValue { name: "model name" });
        }
        if self.gateway_url.trim().is_empty() {
            return Err(ConfigError::EmptyValue { name: "gateway URL" });
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens.to_string()));
        }
        if !self.temperature.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature.to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("0".to_string()));
        }
        Ok(())
    }

    /// Endpoint for chat completions, tolerant of a trailing slash on the base URL.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.model_url.trim_end_matches('/'))
    }

    /// Endpoint listing the models the runner currently serves.
    pub fn models_url(&self) -> String {
        format!("{}/models", self.model_url.trim_end_matches('/'))
    }

    pub fn tools_url(&self) -> String {
        format!("{}/tools", self.gateway_url.trim_end_matches('/'))
    }

    pub fn tool_call_url(&self) -> String {
        format!("{}/call", self.gateway_url.trim_end_matches('/'))
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::chat_defaults()
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
