// ABOUTME: Single conversational agent with a bounded rolling history.
// ABOUTME: Offers a normal chat turn and a "think" turn that asks for deeper reasoning.

use std::sync::Arc;

use crewline_core::{CHAT_HISTORY_CAP, History, Message, ReasoningLevel};

use crate::completion::{CompletionClient, CompletionError};

/// System prompt used when a chat turn supplies none.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// System prompt for `think` turns.
pub const EXPERT_SYSTEM_PROMPT: &str = "You are an expert problem solver. Break down complex tasks into steps, \
analyze each component carefully, and provide detailed reasoning for your approach.";

/// Chat agent whose history is trimmed to the last [`CHAT_HISTORY_CAP`] entries
/// after every successful exchange.
pub struct ConversationalAgent {
    client: Arc<dyn CompletionClient>,
    reasoning_level: ReasoningLevel,
    history: History,
}

impl ConversationalAgent {
    pub fn new(client: Arc<dyn CompletionClient>, reasoning_level: ReasoningLevel) -> Self {
        Self {
            client,
            reasoning_level,
            history: History::bounded(CHAT_HISTORY_CAP),
        }
    }

    pub fn reasoning_level(&self) -> ReasoningLevel {
        self.reasoning_level
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// One chat turn at the agent's configured reasoning level.
    ///
    /// On failure the error is returned and history is left untouched.
    pub async fn chat(&mut self, input: &str, system_prompt: Option<&str>) -> Result<String, CompletionError> {
        self.exchange(input, system_prompt, self.reasoning_level).await
    }

    /// A chat turn with the expert prompt at `level` (typically high).
    /// The agent's configured level is unaffected.
    pub async fn think(&mut self, task: &str, level: ReasoningLevel) -> Result<String, CompletionError> {
        self.exchange(task, Some(EXPERT_SYSTEM_PROMPT), level).await
    }

    /// Forget the conversation so far.
    pub fn reset(&mut self) {
        self.history.clear();
        tracing::debug!("conversation history cleared");
    }

    async fn exchange(
        &mut self,
        input: &str,
        system_prompt: Option<&str>,
        level: ReasoningLevel,
    ) -> Result<String, CompletionError> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(system_message(system_prompt, level)));
        messages.extend_from_slice(self.history.entries());
        messages.push(Message::user(input));

        let reply = self.client.complete(&messages).await?;

        self.history.record_exchange(input, reply.clone());
        Ok(reply)
    }
}

/// Render the system message with the reasoning level appended.
pub fn system_message(system_prompt: Option<&str>, level: ReasoningLevel) -> String {
    match system_prompt {
        Some(prompt) => format!("{}\nReasoning: {}", prompt, level),
        None => format!("{} Reasoning: {}", DEFAULT_SYSTEM_PROMPT, level),
    }
}
