// ABOUTME: End-to-end smoke test for the built-in research crew.
// ABOUTME: Runs the full three-step workflow against a scripted model and a recording tool gateway.

use std::sync::Arc;

use crewline_agent::Crew;
use crewline_agent::testing::{RecordingToolGateway, ScriptedCompletionClient};
use crewline_core::{CrewDefinition, Role};
use serde_json::json;

#[tokio::test]
async fn smoke_test_research_crew() {
    // 1. Load the embedded research crew and instantiate its workflow
    let definition = CrewDefinition::research().unwrap();
    let workflow = definition.workflow_for("vector databases");
    assert_eq!(workflow.len(), 3);
    assert!(
        workflow.iter().all(|step| step.task.contains("vector databases")),
        "every task should mention the topic"
    );

    // 2. Script the model: the researcher asks for a tool, then everyone answers
    let client = Arc::new(ScriptedCompletionClient::replies(&[
        r#"{"action": "use_tool", "tool": "wikipedia", "parameters": {"query": "vector databases"}}"#,
        "Findings: ANN indexes dominate.",
        "Analysis: HNSW leads adoption.",
        "Report: vector databases are mainstream.",
    ]));
    let gateway = Arc::new(
        RecordingToolGateway::new(json!({"summary": "A vector database stores embeddings."}))
            .with_tool("wikipedia", "Encyclopedia lookup"),
    );

    let mut crew = Crew::from_definition(&definition, client.clone(), gateway.clone());
    assert_eq!(crew.agent_names(), vec!["researcher", "analyst", "writer"]);
    assert_eq!(crew.tool_count(), 1);

    // 3. Run the workflow
    let results = crew.execute_workflow(&workflow).await;

    let keys: Vec<&str> = results.keys().collect();
    assert_eq!(keys, vec!["step_1_researcher", "step_2_analyst", "step_3_writer"]);
    assert_eq!(results.get("step_1_researcher").unwrap().result, "Findings: ANN indexes dominate.");
    assert_eq!(results.get("step_3_writer").unwrap().result, "Report: vector databases are mainstream.");

    // 4. The tool was called exactly once with the model's parameters
    let invocations = gateway.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].0, "wikipedia");
    assert_eq!(invocations[0].1.get("query"), Some(&json!("vector databases")));

    // 5. Later agents saw the earlier results as context
    let calls = client.calls();
    assert_eq!(calls.len(), 4, "one extra call for the tool round-trip");

    let writer_prompt = &calls[3].last().unwrap();
    assert_eq!(writer_prompt.role, Role::User);
    assert!(writer_prompt.content.contains("Context from previous agents:"));
    assert!(writer_prompt.content.contains("researcher completed: Findings: ANN indexes dominate."));
    assert!(writer_prompt.content.contains("analyst completed: Analysis: HNSW leads adoption."));

    // 6. The run was recorded
    assert_eq!(crew.runs().len(), 1);
    assert_eq!(crew.runs()[0].results, results);

    // 7. Results serialize as an ordered JSON object
    let value = serde_json::to_value(&results).unwrap();
    assert_eq!(value["step_2_analyst"]["result"], "Analysis: HNSW leads adoption.");
}

#[tokio::test]
async fn smoke_test_custom_crew_file_with_unknown_agent() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("review.yaml");
    std::fs::write(
        &path,
        r#"
name: review
agents:
  - name: reviewer
    role: Code Reviewer
    goal: Find defects
    backstory: Has read a lot of code
workflow:
  - agent: reviewer
    task: "Review the {topic} change"
  - agent: approver
    task: "Approve the {topic} change"
"#,
    )
    .unwrap();

    let definition = CrewDefinition::load(&path).unwrap();
    assert_eq!(definition.default_topic, None);

    let client = Arc::new(ScriptedCompletionClient::replies(&["Looks good."]));
    let gateway = Arc::new(RecordingToolGateway::new(json!({})));
    let mut crew = Crew::from_definition(&definition, client.clone(), gateway);

    let results = crew.execute_workflow(&definition.workflow_for("parser")).await;

    assert_eq!(results.len(), 2, "a missing agent must not abort the workflow");
    assert_eq!(results.get("step_1_reviewer").unwrap().task, "Review the parser change");
    assert_eq!(results.get("step_2_approver").unwrap().result, "Agent approver not found");
    assert_eq!(client.calls().len(), 1, "the missing agent never reaches the model");
}
