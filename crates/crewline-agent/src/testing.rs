// ABOUTME: Test utilities for crewline-agent: scripted and recording stubs plus tiny local HTTP servers.
// ABOUTME: Used in tests to drive agents, crews and the HTTP clients without a model runner or gateway.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crewline_core::Message;

use crate::completion::{CompletionClient, CompletionError};
use crate::gateway::{ToolDescriptor, ToolGateway};

/// A completion client that replays pre-configured outcomes in order and
/// records every message sequence it was sent.
///
/// Once the script is exhausted each call fails with an `InvalidResponse`.
#[derive(Debug, Default)]
pub struct ScriptedCompletionClient {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedCompletionClient {
    pub fn new(script: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor for a script of successful replies.
    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    /// Every message sequence received so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        self.script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| {
                Err(CompletionError::InvalidResponse(
                    "scripted client has no replies left".to_string(),
                ))
            })
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// A tool gateway that returns one fixed value and records every invocation.
#[derive(Debug)]
pub struct RecordingToolGateway {
    response: Value,
    tools: HashMap<String, ToolDescriptor>,
    invocations: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl RecordingToolGateway {
    pub fn new(response: Value) -> Self {
        Self {
            response,
            tools: HashMap::new(),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Advertise `name` in the gateway's catalog.
    pub fn with_tool(mut self, name: &str, description: &str) -> Self {
        self.tools.insert(
            name.to_string(),
            ToolDescriptor {
                name: name.to_string(),
                description: description.to_string(),
            },
        );
        self
    }

    /// Every `(tool, parameters)` pair invoked so far, oldest first.
    pub fn invocations(&self) -> Vec<(String, Map<String, Value>)> {
        self.invocations.lock().map(|i| i.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolGateway for RecordingToolGateway {
    async fn invoke(&self, tool: &str, parameters: &Map<String, Value>) -> Value {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push((tool.to_string(), parameters.clone()));
        }
        self.response.clone()
    }

    fn descriptors(&self) -> &HashMap<String, ToolDescriptor> {
        &self.tools
    }
}

/// A base URL nothing listens on; connections are refused.
pub const REFUSED_URL: &str = "http://127.0.0.1:1";

/// Start a local HTTP server that answers every request with `status` and
/// `body`, then closes the connection. Returns its base URL. The server lives
/// until the runtime shuts down.
pub async fn serve_canned(status: u16, body: &'static str) -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_request(&mut stream).await.is_err() {
                    return;
                }
                let reason = reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");
                let response = format!(
                    "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    Ok(base_url)
}

/// Start a local HTTP server that reads each request and never answers.
pub async fn serve_silent() -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = read_request(&mut stream).await;
                tokio::time::sleep(Duration::from_secs(3600)).await;
            });
        }
    });

    Ok(base_url)
}

/// Consume one request: the head up to the blank line plus `content-length` body bytes.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut received = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        received.extend_from_slice(&chunk[..n]);

        if let Some(head_end) = received.windows(4).position(|w| w == b"\r\n\r\n") {
            let body_len = content_length(&received[..head_end]);
            if received.len() >= head_end + 4 + body_len {
                return Ok(());
            }
        }
    }
}

fn content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::NO_DESCRIPTION;
    use serde_json::json;

    #[tokio::test]
    async fn scripted_client_replays_in_order() {
        let client = ScriptedCompletionClient::replies(&["one", "two"]);

        assert_eq!(client.complete(&[Message::user("a")]).await.unwrap(), "one");
        assert_eq!(client.complete(&[Message::user("b")]).await.unwrap(), "two");
        assert!(client.complete(&[Message::user("c")]).await.is_err());

        let calls = client.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2][0].content, "c");
    }

    #[tokio::test]
    async fn recording_gateway_records_and_describes() {
        let gateway = RecordingToolGateway::new(json!({"ok": true})).with_tool("wikipedia", "Encyclopedia lookup");

        let mut parameters = Map::new();
        parameters.insert("query".to_string(), json!("Rust"));
        let result = gateway.invoke("wikipedia", &parameters).await;

        assert_eq!(result, json!({"ok": true}));
        assert_eq!(gateway.invocations(), vec![("wikipedia".to_string(), parameters)]);
        assert_eq!(gateway.describe("wikipedia"), "Encyclopedia lookup");
        assert_eq!(gateway.describe("statistics"), NO_DESCRIPTION);
    }

    #[tokio::test]
    async fn canned_server_answers_every_request() {
        let base_url = serve_canned(418, r#"{"teapot": true}"#).await.unwrap();
        let client = reqwest::Client::new();

        for _ in 0..2 {
            let response = client
                .post(format!("{}/anything", base_url))
                .json(&json!({"a": 1}))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status().as_u16(), 418);
            assert_eq!(response.text().await.unwrap(), r#"{"teapot": true}"#);
        }
    }

    #[test]
    fn reads_content_length_case_insensitively() {
        assert_eq!(content_length(b"POST /call HTTP/1.1\r\nContent-Length: 42\r\nhost: x"), 42);
        assert_eq!(content_length(b"GET /tools HTTP/1.1\r\nhost: x"), 0);
    }
}
