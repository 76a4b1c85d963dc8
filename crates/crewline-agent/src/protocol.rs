// ABOUTME: The textual tool-call convention agents use to request gateway tools.
// ABOUTME: classify() sniffs a raw completion for a JSON use_tool request; it is pure and never fails.

use serde_json::{Map, Value};

/// Instruction block appended to every role agent's system prompt.
pub const TOOL_CALL_INSTRUCTIONS: &str = "When using tools, respond with JSON in this format:\n\
{\"action\": \"use_tool\", \"tool\": \"tool_name\", \"parameters\": {\"param\": \"value\"}}\n\n\
Otherwise, respond normally to help achieve your goal.";

const USE_TOOL_ACTION: &str = "use_tool";

/// What a raw completion asks the executor to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolDirective {
    /// The text is the agent's answer.
    Final(String),
    /// The agent wants `tool` run with `parameters` before answering.
    ToolRequest {
        tool: String,
        parameters: Map<String, Value>,
    },
}

/// Cheap first stage: could this text be a tool request at all?
pub fn looks_like_tool_call(response: &str) -> bool {
    let trimmed = response.trim();
    trimmed.starts_with('{') && trimmed.contains("action")
}

/// Second stage: parse a candidate into a tool request.
///
/// Returns `None` for invalid JSON, any `action` other than `use_tool`, a
/// missing or non-string `tool`, or `parameters` that are neither absent,
/// null, nor an object.
pub fn parse_tool_request(candidate: &str) -> Option<(String, Map<String, Value>)> {
    let value: Value = serde_json::from_str(candidate.trim()).ok()?;

    if value.get("action").and_then(|a| a.as_str()) != Some(USE_TOOL_ACTION) {
        return None;
    }

    let tool = value.get("tool").and_then(|t| t.as_str())?.to_string();

    let parameters = match value.get("parameters") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return None,
    };

    Some((tool, parameters))
}

/// Classify a raw completion. Anything that is not a well-formed tool request
/// is final text, returned unchanged.
pub fn classify(response: &str) -> ToolDirective {
    if !looks_like_tool_call(response) {
        return ToolDirective::Final(response.to_string());
    }

    match parse_tool_request(response) {
        Some((tool, parameters)) => ToolDirective::ToolRequest { tool, parameters },
        None => ToolDirective::Final(response.to_string()),
    }
}

/// User message that hands a tool's result back to the agent for its final answer.
/// Error payloads from the gateway are embedded verbatim like any other result.
pub fn tool_result_prompt(tool: &str, result: &Value) -> String {
    format!(
        "Tool result: Tool {} returned: {}. Please provide your final response.",
        tool, result
    )
}
