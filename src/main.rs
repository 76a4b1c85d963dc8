// ABOUTME: Entry point for the crewline binary.
// ABOUTME: Loads .env, initializes tracing, parses the CLI, and runs chat, crew, or check mode.

mod cli;
mod console;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use crewline_agent::{ConversationalAgent, Crew, HttpCompletionClient, HttpToolGateway, NoToolGateway, ToolGateway};
use crewline_core::{AgentConfig, CrewDefinition};

use crate::cli::{Cli, Command, ConfigOverrides};

const DEFAULT_LOG_FILTER: &str = "crewline=info,crewline_agent=info,crewline_core=info";
const FALLBACK_TOPIC: &str = "AI agent development trends";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Chat {
            skip_check,
            system_prompt,
        } => run_chat(&cli.overrides, skip_check, system_prompt.as_deref()).await,
        Command::Crew {
            topic,
            crew,
            no_tools,
            json,
        } => {
            let definition = match crew {
                Some(path) => CrewDefinition::load(&path)?,
                None => CrewDefinition::research()?,
            };
            run_crew(&cli.overrides, definition, topic, no_tools, json).await
        }
        Command::Check { crew } => {
            let base = if crew {
                AgentConfig::crew_from_env()?
            } else {
                AgentConfig::chat_from_env()?
            };
            let config = cli.overrides.apply(base)?;
            let client = HttpCompletionClient::new(config)?;
            if console::report_model_status(&client).await {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

async fn run_chat(overrides: &ConfigOverrides, skip_check: bool, system_prompt: Option<&str>) -> anyhow::Result<ExitCode> {
    let config = overrides.apply(AgentConfig::chat_from_env()?)?;
    tracing::info!(model = %config.model_name, url = %config.model_url, "starting chat");

    let client = Arc::new(HttpCompletionClient::new(config.clone())?);

    if !skip_check && !console::report_model_status(&client).await {
        console::print_setup_instructions(&config);
        return Ok(ExitCode::FAILURE);
    }

    let agent = ConversationalAgent::new(client, config.reasoning_level);
    console::run_chat(agent, system_prompt).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run_crew(
    overrides: &ConfigOverrides,
    definition: CrewDefinition,
    topic: Option<String>,
    no_tools: bool,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let config = overrides.apply(AgentConfig::crew_from_env()?)?;

    let default_topic = definition.default_topic.clone().unwrap_or_else(|| FALLBACK_TOPIC.to_string());
    let topic = match topic {
        Some(topic) => topic,
        None => {
            let mut lines = console::stdin_lines();
            let prompt = format!("Enter a topic (default: {}): ", default_topic);
            console::prompt_line(&mut lines, &prompt)
                .await?
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .unwrap_or(default_topic)
        }
    };

    let workflow = definition.workflow_for(&topic);
    if workflow.is_empty() {
        anyhow::bail!("crew '{}' defines no workflow steps", definition.name);
    }

    let client = Arc::new(HttpCompletionClient::new(config.clone()).context("failed to create model client")?);
    let gateway: Arc<dyn ToolGateway> = if no_tools {
        Arc::new(NoToolGateway::default())
    } else {
        Arc::new(HttpToolGateway::connect(&config).await)
    };
    tracing::info!(
        crew = %definition.name,
        model = %config.model_name,
        tools = gateway.descriptors().len(),
        %topic,
        "running crew"
    );

    let mut crew = Crew::from_definition(&definition, client, gateway);
    let results = crew.execute_workflow(&workflow).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        console::print_results(&results);
    }

    Ok(ExitCode::SUCCESS)
}
