// ABOUTME: Client for the external tool gateway: one-time tool discovery and named tool invocation.
// ABOUTME: Every failure degrades to an empty catalog or an {"error": ...} value; nothing here is fatal.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crewline_core::AgentConfig;

/// Returned by `describe` for tools the gateway did not advertise.
pub const NO_DESCRIPTION: &str = "No description available";

/// A tool advertised by the gateway. Read-only after discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

/// Executes named tools on behalf of agents.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// Run `tool` with `parameters`. Always yields a value; failures come back
    /// as `{"error": "<text>"}`.
    async fn invoke(&self, tool: &str, parameters: &Map<String, Value>) -> Value;

    /// Tools discovered at construction time, keyed by name.
    fn descriptors(&self) -> &HashMap<String, ToolDescriptor>;

    fn describe(&self, tool: &str) -> String {
        self.descriptors()
            .get(tool)
            .map(|d| d.description.clone())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string())
    }
}

/// Build the error-shaped value returned for any failed invocation.
pub fn tool_error(message: impl std::fmt::Display) -> Value {
    json!({ "error": format!("Tool call failed: {}", message) })
}

/// Parse a `GET /tools` body into descriptors.
///
/// Accepts a mapping of tool name to descriptor object, or a list of
/// `{name, description}` objects. Entries without a usable name are skipped.
pub fn parse_tool_catalog(body: &Value) -> HashMap<String, ToolDescriptor> {
    let describe = |value: &Value| {
        value
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or(NO_DESCRIPTION)
            .to_string()
    };

    match body {
        Value::Object(map) => map
            .iter()
            .map(|(name, descriptor)| {
                (
                    name.clone(),
                    ToolDescriptor {
                        name: name.clone(),
                        description: describe(descriptor),
                    },
                )
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let name = item.get("name").and_then(|n| n.as_str())?;
                Some((
                    name.to_string(),
                    ToolDescriptor {
                        name: name.to_string(),
                        description: describe(item),
                    },
                ))
            })
            .collect(),
        _ => HashMap::new(),
    }
}

/// reqwest-backed gateway client for `GET {gateway}/tools` and `POST {gateway}/call`.
pub struct HttpToolGateway {
    client: reqwest::Client,
    tools_url: String,
    call_url: String,
    tools: HashMap<String, ToolDescriptor>,
}

impl HttpToolGateway {
    /// Create the client and discover tools once. A gateway that cannot be
    /// reached leaves the catalog empty and the crew runs without tools.
    pub async fn connect(config: &AgentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to build gateway HTTP client, using defaults");
                reqwest::Client::new()
            });

        let mut gateway = Self {
            client,
            tools_url: config.tools_url(),
            call_url: config.tool_call_url(),
            tools: HashMap::new(),
        };
        gateway.tools = gateway.discover().await;
        gateway
    }

    async fn discover(&self) -> HashMap<String, ToolDescriptor> {
        let response = match self.client.get(&self.tools_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %self.tools_url, error = %e, "failed to connect to tool gateway");
                return HashMap::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "no tools available from gateway");
            return HashMap::new();
        }

        match response.json::<Value>().await {
            Ok(body) => {
                let tools = parse_tool_catalog(&body);
                tracing::info!(count = tools.len(), "discovered gateway tools");
                tools
            }
            Err(e) => {
                tracing::warn!(error = %e, "tool gateway returned an unreadable catalog");
                HashMap::new()
            }
        }
    }
}

#[async_trait]
impl ToolGateway for HttpToolGateway {
    async fn invoke(&self, tool: &str, parameters: &Map<String, Value>) -> Value {
        let payload = json!({
            "tool": tool,
            "parameters": parameters
        });

        let response = match self.client.post(&self.call_url).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => return tool_error(e),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return tool_error(e),
        };

        if !status.is_success() {
            return tool_error(format!("gateway returned {}: {}", status, body));
        }

        serde_json::from_str(&body).unwrap_or_else(|e| tool_error(format!("invalid JSON from gateway: {}", e)))
    }

    fn descriptors(&self) -> &HashMap<String, ToolDescriptor> {
        &self.tools
    }
}

/// A gateway with no tools whose every invocation reports an error.
/// Used when a crew runs without a gateway configured.
#[derive(Debug, Default)]
pub struct NoToolGateway {
    tools: HashMap<String, ToolDescriptor>,
}

#[async_trait]
impl ToolGateway for NoToolGateway {
    async fn invoke(&self, tool: &str, _parameters: &Map<String, Value>) -> Value {
        tool_error(format!("no tool gateway configured for '{}'", tool))
    }

    fn descriptors(&self) -> &HashMap<String, ToolDescriptor> {
        &self.tools
    }
}
