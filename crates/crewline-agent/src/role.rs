// ABOUTME: RoleAgent pairs a persona profile with its own conversation history.
// ABOUTME: Generates the deterministic system prompt describing the persona and the tool-call contract.

use crewline_core::{AgentProfile, History, Message, ROLE_PROMPT_WINDOW};

use crate::protocol::TOOL_CALL_INSTRUCTIONS;

/// A crew member. History is unbounded for the lifetime of the process;
/// only the last [`ROLE_PROMPT_WINDOW`] entries are sent with each task.
#[derive(Debug, Clone)]
pub struct RoleAgent {
    pub profile: AgentProfile,
    pub history: History,
}

impl RoleAgent {
    pub fn new(profile: AgentProfile) -> Self {
        Self {
            profile,
            history: History::unbounded(),
        }
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Whether `tool` is on this agent's allow-list.
    pub fn allows_tool(&self, tool: &str) -> bool {
        self.profile.tools.iter().any(|t| t == tool)
    }

    /// Build the system prompt from the profile fields and the tool-call contract.
    pub fn system_prompt(&self) -> String {
        let tools_line = if self.profile.tools.is_empty() {
            "No tools available".to_string()
        } else {
            format!("Available tools: {}", self.profile.tools.join(", "))
        };

        format!(
            "You are a {}.\n\nGoal: {}\n\nBackstory: {}\n\n{}\n\n{}",
            self.profile.role, self.profile.goal, self.profile.backstory, tools_line, TOOL_CALL_INSTRUCTIONS
        )
    }

    /// Messages for one task: system prompt, the recent history window, then the task prompt.
    pub fn prompt_messages(&self, task_prompt: &str) -> Vec<Message> {
        let window = self.history.recent(ROLE_PROMPT_WINDOW);
        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(Message::system(self.system_prompt()));
        messages.extend_from_slice(window);
        messages.push(Message::user(task_prompt));
        messages
    }
}

/// Combine a task with the hand-off context from earlier agents.
pub fn task_prompt(task: &str, context: &str) -> String {
    if context.is_empty() {
        format!("Task: {}", task)
    } else {
        format!("Task: {}\n\nContext from previous agents: {}", task, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewline_core::Role;

    fn researcher() -> RoleAgent {
        RoleAgent::new(AgentProfile {
            name: "researcher".to_string(),
            role: "Senior Research Analyst".to_string(),
            goal: "Conduct thorough research".to_string(),
            backstory: "You are an experienced researcher.".to_string(),
            tools: vec!["web_search".to_string(), "wikipedia".to_string()],
        })
    }

    #[test]
    fn system_prompt_describes_persona_and_tools() {
        let prompt = researcher().system_prompt();

        assert!(prompt.starts_with("You are a Senior Research Analyst.\n\n"));
        assert!(prompt.contains("Goal: Conduct thorough research"));
        assert!(prompt.contains("Backstory: You are an experienced researcher."));
        assert!(prompt.contains("Available tools: web_search, wikipedia"));
        assert!(prompt.contains(r#""action": "use_tool""#));
        assert!(prompt.ends_with("Otherwise, respond normally to help achieve your goal."));
    }

    #[test]
    fn system_prompt_without_tools_says_so() {
        let mut agent = researcher();
        agent.profile.tools.clear();

        let prompt = agent.system_prompt();
        assert!(prompt.contains("No tools available"));
        assert!(!prompt.contains("Available tools:"));
    }

    #[test]
    fn system_prompt_is_deterministic() {
        assert_eq!(researcher().system_prompt(), researcher().system_prompt());
    }

    #[test]
    fn prompt_messages_window_recent_history() {
        let mut agent = researcher();
        for i in 0..5 {
            agent.history.record_exchange(format!("task {}", i), format!("result {}", i));
        }
        assert_eq!(agent.history.len(), 10);

        let messages = agent.prompt_messages("Task: next");

        // system + 6 history entries + task
        assert_eq!(messages.len(), 8);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "task 2");
        assert_eq!(messages[6].content, "result 4");
        assert_eq!(messages[7], Message::user("Task: next"));
        // Full history is retained even though only a window is sent
        assert_eq!(agent.history.len(), 10);
    }

    #[test]
    fn allow_list_lookup() {
        let agent = researcher();
        assert!(agent.allows_tool("wikipedia"));
        assert!(!agent.allows_tool("statistics"));
    }

    #[test]
    fn task_prompt_appends_context_only_when_present() {
        assert_eq!(task_prompt("Research X", ""), "Task: Research X");
        assert_eq!(
            task_prompt("Analyze X", "\nresearcher completed: Findings\n"),
            "Task: Analyze X\n\nContext from previous agents: \nresearcher completed: Findings\n"
        );
    }
}
