// ABOUTME: Command-line interface definition for the crewline binary.
// ABOUTME: Global flags override the environment-derived AgentConfig; subcommands pick the mode.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crewline_core::{AgentConfig, ConfigError, ReasoningLevel};

/// Run a conversational agent or a multi-agent crew against a local model runner
#[derive(Parser, Debug)]
#[command(name = "crewline", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Interactive chat: `quit`, `reset`, `think <task>`, or any message
    Chat {
        /// Start chatting without checking that the model is available
        #[arg(long)]
        skip_check: bool,

        /// Replace the default assistant system prompt
        #[arg(long)]
        system_prompt: Option<String>,
    },

    /// Run a crew workflow on a topic
    Crew {
        /// Topic interpolated into the workflow tasks; prompted for when absent
        #[arg(long)]
        topic: Option<String>,

        /// YAML crew definition to use instead of the built-in research crew
        #[arg(long)]
        crew: Option<PathBuf>,

        /// Skip tool discovery and run without a tool gateway
        #[arg(long)]
        no_tools: bool,

        /// Print the step results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the model runner is up and serves the configured model
    Check {
        /// Check the crew preset's model instead of the chat preset's
        #[arg(long)]
        crew: bool,
    },
}

/// Flags that override individual configuration values.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    /// Base URL of the chat-completions API
    #[arg(long, global = true)]
    pub model_url: Option<String>,

    /// Model identifier
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Base URL of the tool gateway
    #[arg(long, global = true)]
    pub gateway_url: Option<String>,

    /// Reasoning level: low, medium or high
    #[arg(long, global = true)]
    pub reasoning: Option<ReasoningLevel>,

    /// Maximum tokens per completion
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0-2)
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Apply every flag that was given on top of `config` and re-validate.
    pub fn apply(&self, mut config: AgentConfig) -> Result<AgentConfig, ConfigError> {
        if let Some(url) = &self.model_url {
            config.model_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.model_name = model.clone();
        }
        if let Some(url) = &self.gateway_url {
            config.gateway_url = url.clone();
        }
        if let Some(level) = self.reasoning {
            config.reasoning_level = level;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = std::time::Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }
}
