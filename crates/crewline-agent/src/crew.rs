// ABOUTME: Crew runs an ordered workflow of (agent, task) steps against named role agents.
// ABOUTME: Threads a free-text hand-off context between steps and resolves at most one tool call per task.

use std::sync::Arc;

use crewline_core::{
    AgentProfile, CrewDefinition, HandoffContext, Message, StepResult, WorkflowRecord,
    WorkflowResults, WorkflowStep, preview, step_key,
};

use crate::completion::{CompletionClient, complete_inline};
use crate::gateway::ToolGateway;
use crate::protocol::{ToolDirective, classify, tool_result_prompt};
use crate::role::{RoleAgent, task_prompt};

/// Characters of each step result shown in progress logs.
pub const RESULT_PREVIEW_CHARS: usize = 200;

/// A set of role agents sharing one completion client and one tool gateway.
///
/// Steps execute strictly in order and each agent's history is touched only
/// by the step that is running, so no locking is involved.
pub struct Crew {
    agents: Vec<RoleAgent>,
    client: Arc<dyn CompletionClient>,
    gateway: Arc<dyn ToolGateway>,
    runs: Vec<WorkflowRecord>,
}

impl Crew {
    /// Create an empty crew.
    pub fn new(client: Arc<dyn CompletionClient>, gateway: Arc<dyn ToolGateway>) -> Self {
        Self {
            agents: Vec::new(),
            client,
            gateway,
            runs: Vec::new(),
        }
    }

    /// Create a crew with every agent the definition lists.
    pub fn from_definition(
        definition: &CrewDefinition,
        client: Arc<dyn CompletionClient>,
        gateway: Arc<dyn ToolGateway>,
    ) -> Self {
        let mut crew = Self::new(client, gateway);
        for profile in &definition.agents {
            crew.add_agent(profile.clone());
        }
        crew
    }

    /// Add an agent, replacing any existing agent with the same name.
    pub fn add_agent(&mut self, profile: AgentProfile) {
        tracing::info!(agent = %profile.name, role = %profile.role, "added agent");
        let agent = RoleAgent::new(profile);
        match self.agents.iter_mut().find(|a| a.name() == agent.name()) {
            Some(slot) => *slot = agent,
            None => self.agents.push(agent),
        }
    }

    pub fn agent(&self, name: &str) -> Option<&RoleAgent> {
        self.agents.iter().find(|a| a.name() == name)
    }

    /// Agent names in the order they were added.
    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name()).collect()
    }

    /// Number of tools the gateway advertised at startup.
    pub fn tool_count(&self) -> usize {
        self.gateway.descriptors().len()
    }

    /// Every workflow this crew has run, oldest first.
    pub fn runs(&self) -> &[WorkflowRecord] {
        &self.runs
    }

    /// Run one task on the named agent and return its final text.
    ///
    /// A missing agent yields `Agent <name> not found`. Completion failures are
    /// embedded as `Error: ...` text. Either way the caller receives a string.
    pub async fn execute_agent_task(&mut self, agent_name: &str, task: &str, context: &str) -> String {
        let Some(index) = self.agents.iter().position(|a| a.name() == agent_name) else {
            tracing::warn!(agent = %agent_name, "workflow step names an unknown agent");
            return format!("Agent {} not found", agent_name);
        };

        let prompt = task_prompt(task, context);
        let result = {
            let agent = &self.agents[index];
            let messages = agent.prompt_messages(&prompt);
            let response = complete_inline(self.client.as_ref(), &messages).await;
            resolve_tool_call(self.client.as_ref(), self.gateway.as_ref(), agent, messages, response)
                .await
        };

        self.agents[index].history.record_exchange(prompt, result.clone());
        result
    }

    /// Run `workflow` in order and return one result per step, keyed
    /// `step_<index>_<agent>`. Never aborts early.
    pub async fn execute_workflow(&mut self, workflow: &[WorkflowStep]) -> WorkflowResults {
        let mut results = WorkflowResults::new();
        let mut context = HandoffContext::new();

        tracing::info!(steps = workflow.len(), "starting crew workflow");

        for (i, step) in workflow.iter().enumerate() {
            let index = i + 1;
            tracing::info!(step = index, agent = %step.agent, task = %step.task, "running workflow step");

            let result = self
                .execute_agent_task(&step.agent, &step.task, context.as_str())
                .await;

            tracing::info!(
                step = index,
                agent = %step.agent,
                result = %preview(&result, RESULT_PREVIEW_CHARS),
                "workflow step completed"
            );

            results.insert(step_key(index, &step.agent), StepResult::new(&step.task, &result));
            context.record(&step.agent, &result);
        }

        let record = WorkflowRecord::new(workflow.to_vec(), results.clone(), context);
        tracing::info!(run_id = %record.run_id, steps = results.len(), "crew workflow finished");
        self.runs.push(record);

        results
    }
}

/// Resolve a raw completion into the task's final text.
///
/// If `response` is a tool request, the gateway is invoked once and the model
/// is asked once more with the tool result appended to `messages`. The second
/// reply is final even if it asks for another tool.
pub async fn resolve_tool_call(
    client: &dyn CompletionClient,
    gateway: &dyn ToolGateway,
    agent: &RoleAgent,
    mut messages: Vec<Message>,
    response: String,
) -> String {
    let (tool, parameters) = match classify(&response) {
        ToolDirective::Final(text) => return text,
        ToolDirective::ToolRequest { tool, parameters } => (tool, parameters),
    };

    if !agent.allows_tool(&tool) {
        tracing::warn!(agent = %agent.name(), tool = %tool, "agent requested a tool outside its allow-list");
    }
    tracing::info!(agent = %agent.name(), tool = %tool, "executing tool call");

    let tool_result = gateway.invoke(&tool, &parameters).await;

    messages.push(Message::assistant(response));
    messages.push(Message::user(tool_result_prompt(&tool, &tool_result)));

    complete_inline(client, &messages).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionError;
    use crate::testing::{RecordingToolGateway, ScriptedCompletionClient};
    use crewline_core::Role;
    use serde_json::json;

    fn profile(name: &str, tools: &[&str]) -> AgentProfile {
        AgentProfile {
            name: name.to_string(),
            role: format!("{} role", name),
            goal: format!("{} goal", name),
            backstory: format!("{} backstory", name),
            tools: tools.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn crew_with(
        client: &Arc<ScriptedCompletionClient>,
        gateway: &Arc<RecordingToolGateway>,
        names: &[&str],
    ) -> Crew {
        let mut crew = Crew::new(client.clone(), gateway.clone());
        for name in names {
            crew.add_agent(profile(name, &["t"]));
        }
        crew
    }

    #[tokio::test]
    async fn two_step_workflow_threads_context() {
        let client = Arc::new(ScriptedCompletionClient::replies(&[
            "Findings about X",
            "Analysis of X",
        ]));
        let gateway = Arc::new(RecordingToolGateway::new(json!({})));
        let mut crew = crew_with(&client, &gateway, &["researcher", "analyst"]);

        let results = crew
            .execute_workflow(&[
                WorkflowStep::new("researcher", "Research X"),
                WorkflowStep::new("analyst", "Analyze X"),
            ])
            .await;

        let keys: Vec<&str> = results.keys().collect();
        assert_eq!(keys, ["step_1_researcher", "step_2_analyst"]);

        let first = results.get("step_1_researcher").unwrap();
        assert_eq!(first.task, "Research X");
        assert_eq!(first.result, "Findings about X");
        let second = results.get("step_2_analyst").unwrap();
        assert_eq!(second.task, "Analyze X");
        assert_eq!(second.result, "Analysis of X");

        // The analyst saw the researcher's output
        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        let analyst_task = &calls[1].last().unwrap().content;
        assert!(analyst_task.starts_with("Task: Analyze X\n\nContext from previous agents: "));
        assert!(analyst_task.contains("researcher completed: Findings about X"));
        // The first step carried no context
        assert_eq!(calls[0].last().unwrap().content, "Task: Research X");

        let run = &crew.runs()[0];
        let context = run.context.as_str();
        let a = context.find("researcher completed: Findings about X").unwrap();
        let b = context.find("analyst completed: Analysis of X").unwrap();
        assert!(a < b, "context must preserve step order");
        assert_eq!(run.workflow.len(), 2);
        assert_eq!(gateway.invocations().len(), 0);
    }

    #[tokio::test]
    async fn missing_agent_does_not_abort_workflow() {
        let client = Arc::new(ScriptedCompletionClient::replies(&["first", "third"]));
        let gateway = Arc::new(RecordingToolGateway::new(json!({})));
        let mut crew = crew_with(&client, &gateway, &["a", "c"]);

        let results = crew
            .execute_workflow(&[
                WorkflowStep::new("a", "one"),
                WorkflowStep::new("ghost", "two"),
                WorkflowStep::new("c", "three"),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results.get("step_2_ghost").unwrap().result, "Agent ghost not found");
        assert_eq!(results.get("step_3_c").unwrap().result, "third");
        // Only the two real agents reached the endpoint
        assert_eq!(client.calls().len(), 2);
        assert!(crew.runs()[0].context.as_str().contains("ghost completed: Agent ghost not found"));
    }

    #[tokio::test]
    async fn completion_errors_become_step_results() {
        let client = Arc::new(ScriptedCompletionClient::new(vec![
            Err(CompletionError::Timeout(60)),
            Ok("recovered".to_string()),
        ]));
        let gateway = Arc::new(RecordingToolGateway::new(json!({})));
        let mut crew = crew_with(&client, &gateway, &["a", "b"]);

        let results = crew
            .execute_workflow(&[WorkflowStep::new("a", "one"), WorkflowStep::new("b", "two")])
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results.get("step_1_a").unwrap().result, "Error: Request timed out after 60s");
        assert_eq!(results.get("step_2_b").unwrap().result, "recovered");
    }

    #[tokio::test]
    async fn tool_request_round_trips_once() {
        let client = Arc::new(ScriptedCompletionClient::replies(&[
            r#"{"action":"use_tool","tool":"t","parameters":{"x":1}}"#,
            r#"{"action":"use_tool","tool":"t","parameters":{"x":2}}"#,
        ]));
        let gateway = Arc::new(RecordingToolGateway::new(json!({"value": 42})));
        let mut crew = crew_with(&client, &gateway, &["a"]);

        let result = crew.execute_agent_task("a", "compute", "").await;

        // The second reply is returned verbatim, not resolved again
        assert_eq!(result, r#"{"action":"use_tool","tool":"t","parameters":{"x":2}}"#);

        let invocations = gateway.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].0, "t");
        assert_eq!(serde_json::Value::Object(invocations[0].1.clone()), json!({"x": 1}));

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        let continuation = &calls[1];
        assert_eq!(continuation.len(), calls[0].len() + 2);
        let request = &continuation[continuation.len() - 2];
        assert_eq!(request.role, Role::Assistant);
        assert_eq!(request.content, r#"{"action":"use_tool","tool":"t","parameters":{"x":1}}"#);
        let tool_turn = continuation.last().unwrap();
        assert_eq!(tool_turn.role, Role::User);
        assert!(tool_turn.content.contains(r#"Tool t returned: {"value":42}"#));
    }

    #[tokio::test]
    async fn gateway_error_is_embedded_in_continuation() {
        let client = Arc::new(ScriptedCompletionClient::replies(&[
            r#"{"action": "use_tool", "tool": "web_search", "parameters": {"q": "rust"}}"#,
            "Answer without the tool",
        ]));
        let gateway = Arc::new(RecordingToolGateway::new(json!({"error": "Tool call failed: offline"})));
        let mut crew = crew_with(&client, &gateway, &["a"]);

        let result = crew.execute_agent_task("a", "search", "").await;

        assert_eq!(result, "Answer without the tool");
        let calls = client.calls();
        assert!(calls[1].last().unwrap().content.contains("Tool call failed: offline"));
    }

    #[tokio::test]
    async fn history_records_prompt_and_final_result() {
        let client = Arc::new(ScriptedCompletionClient::replies(&["r1", "r2", "r3", "r4"]));
        let gateway = Arc::new(RecordingToolGateway::new(json!({})));
        let mut crew = crew_with(&client, &gateway, &["a"]);

        for i in 0..4 {
            crew.execute_agent_task("a", &format!("task {}", i), "").await;
        }

        let agent = crew.agent("a").unwrap();
        // Role agents keep their full history
        assert_eq!(agent.history.len(), 8);
        assert_eq!(agent.history.entries()[0], Message::user("Task: task 0"));
        assert_eq!(agent.history.entries()[7], Message::assistant("r4"));

        // The fourth request carried system + last 6 entries + task
        let last_call = client.calls().pop().unwrap();
        assert_eq!(last_call.len(), 8);
        assert_eq!(last_call[1].content, "Task: task 0");
    }

    #[tokio::test]
    async fn workflow_runs_accumulate() {
        let client = Arc::new(ScriptedCompletionClient::replies(&["x", "y"]));
        let gateway = Arc::new(RecordingToolGateway::new(json!({})));
        let mut crew = crew_with(&client, &gateway, &["a"]);

        crew.execute_workflow(&[WorkflowStep::new("a", "first")]).await;
        crew.execute_workflow(&[WorkflowStep::new("a", "second")]).await;

        assert_eq!(crew.runs().len(), 2);
        assert_eq!(crew.runs()[1].results.get("step_1_a").unwrap().result, "y");
        assert_ne!(crew.runs()[0].run_id, crew.runs()[1].run_id);
    }

    #[test]
    fn add_agent_replaces_same_name() {
        let client = Arc::new(ScriptedCompletionClient::replies(&[]));
        let gateway = Arc::new(RecordingToolGateway::new(json!({})));
        let mut crew = crew_with(&client, &gateway, &["a", "b"]);

        crew.add_agent(profile("a", &[]));

        assert_eq!(crew.agent_names(), ["a", "b"]);
        assert!(crew.agent("a").unwrap().profile.tools.is_empty());
    }

    #[test]
    fn from_definition_adds_every_agent() {
        let definition = CrewDefinition::research().unwrap();
        let client = Arc::new(ScriptedCompletionClient::replies(&[]));
        let gateway = Arc::new(RecordingToolGateway::new(json!({})));

        let crew = Crew::from_definition(&definition, client, gateway);

        assert_eq!(crew.agent_names(), ["researcher", "analyst", "writer"]);
        assert_eq!(crew.tool_count(), 0);
        assert!(crew.runs().is_empty());
    }
}
