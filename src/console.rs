// ABOUTME: Terminal interaction for the crewline binary: the chat REPL, prompts, and result printing.
// ABOUTME: Reads stdin asynchronously so Ctrl-C can end a session cleanly at any point.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crewline_agent::{ConversationalAgent, HttpCompletionClient, ModelStatus};
use crewline_core::{AgentConfig, ReasoningLevel, WorkflowResults};

/// A line typed at the chat prompt, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand<'a> {
    Quit,
    Reset,
    Think(&'a str),
    Say(&'a str),
    Empty,
}

/// Interpret one line of chat input. Commands are case-insensitive.
pub fn parse_chat_command(line: &str) -> ChatCommand<'_> {
    let input = line.trim();
    if input.is_empty() {
        return ChatCommand::Empty;
    }
    if input.eq_ignore_ascii_case("quit") {
        return ChatCommand::Quit;
    }
    if input.eq_ignore_ascii_case("reset") {
        return ChatCommand::Reset;
    }
    if let Some(prefix) = input.get(..6)
        && prefix.eq_ignore_ascii_case("think ")
    {
        let task = input[6..].trim();
        if !task.is_empty() {
            return ChatCommand::Think(task);
        }
    }
    ChatCommand::Say(input)
}

pub type StdinLines = Lines<BufReader<Stdin>>;

pub fn stdin_lines() -> StdinLines {
    BufReader::new(tokio::io::stdin()).lines()
}

/// Print `prompt` and read one line. `None` on end of input or Ctrl-C.
pub async fn prompt_line(lines: &mut StdinLines, prompt: &str) -> anyhow::Result<Option<String>> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    tokio::select! {
        line = lines.next_line() => Ok(line?),
        _ = tokio::signal::ctrl_c() => Ok(None),
    }
}

/// Run the interactive chat loop until `quit`, end of input, or Ctrl-C.
pub async fn run_chat(mut agent: ConversationalAgent, system_prompt: Option<&str>) -> anyhow::Result<()> {
    let mut lines = stdin_lines();

    println!("Chat started. Type 'quit' to exit, 'reset' to clear history, 'think <task>' for deeper reasoning.");

    loop {
        let Some(line) = prompt_line(&mut lines, "\nYou: ").await? else {
            break;
        };

        let turn = match parse_chat_command(&line) {
            ChatCommand::Empty => continue,
            ChatCommand::Quit => break,
            ChatCommand::Reset => {
                agent.reset();
                println!("Conversation reset.");
                continue;
            }
            ChatCommand::Think(task) => {
                println!("\nThinking...");
                tokio::select! {
                    reply = agent.think(task, ReasoningLevel::High) => reply,
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            ChatCommand::Say(text) => {
                tokio::select! {
                    reply = agent.chat(text, system_prompt) => reply,
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        };

        match turn {
            Ok(reply) => println!("\nAssistant: {}", reply),
            Err(e) => println!("\nError: {}", e),
        }
    }

    println!("\nGoodbye!");
    Ok(())
}

/// Check the model runner and report what was found. Returns whether the
/// configured model is ready to use.
pub async fn report_model_status(client: &HttpCompletionClient) -> bool {
    let model = &client.config().model_name;
    match client.check_model().await {
        Ok(ModelStatus::Available) => {
            println!("Model runner is reachable at {}", client.config().model_url);
            println!("Model {} is available", model);
            true
        }
        Ok(ModelStatus::Missing { available, .. }) => {
            println!("Model runner is reachable at {}", client.config().model_url);
            println!("Model {} not found. Run: docker model pull {}", model, model);
            if !available.is_empty() {
                println!("Available models: {}", available.join(", "));
            }
            false
        }
        Err(e) => {
            println!("Error checking model runner: {}", e);
            println!("Make sure Docker Model Runner is enabled and the model is pulled");
            false
        }
    }
}

pub fn print_setup_instructions(config: &AgentConfig) {
    println!("\nSetup instructions:");
    println!("1. Enable Docker Model Runner in Docker Desktop");
    println!("2. Run: docker model pull {}", config.model_name);
    println!("3. Wait for the model to download (this may take a while)");
}

/// Print every step result in execution order.
pub fn print_results(results: &WorkflowResults) {
    println!("\n{}", "=".repeat(60));
    println!("WORKFLOW RESULTS");
    println!("{}", "=".repeat(60));

    for (key, step) in results.iter() {
        println!("\n{}:", key.to_uppercase());
        println!("Task: {}", step.task);
        println!("Result: {}", step.result);
        println!("Timestamp: {}", step.timestamp.to_rfc3339());
        println!("{}", "-".repeat(40));
    }
}
