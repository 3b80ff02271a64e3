//! Out-of-process transport speaking newline-delimited JSON-RPC 2.0
//!
//! The configured server is spawned as a child process. Requests go to its
//! stdin one JSON object per line; responses are read back from its stdout.
//! Anything it writes to stderr is forwarded to `tracing`.

use async_trait::async_trait;
use deskbridge_core::{
    BridgeError, ContentBlock, Connector, Envelope, Params, Result, SessionConfig, Transport,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const CLIENT_NAME: &str = "deskbridge";
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Variables the server reads its credentials from
pub const SERVER_ENV_CLIENT_ID: &str = "GOOGLE_OAUTH_CLIENT_ID";
pub const SERVER_ENV_CLIENT_SECRET: &str = "GOOGLE_OAUTH_CLIENT_SECRET";
pub const SERVER_ENV_USER_EMAIL: &str = "USER_GOOGLE_EMAIL";

/// Error object of a JSON-RPC response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// One line read from the server, classified
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Response to the request with this id
    Response {
        id: Option<u64>,
        outcome: std::result::Result<Value, RpcError>,
    },
    /// Server-initiated notification or request
    Notification { method: String },
    /// Not JSON-RPC at all (log lines and the like)
    Noise,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Classify a line of server output
pub fn parse_line(line: &str) -> Incoming {
    let Ok(message) = serde_json::from_str::<RawMessage>(line.trim()) else {
        return Incoming::Noise;
    };

    if let Some(method) = message.method {
        return Incoming::Notification { method };
    }

    let id = message.id.as_ref().and_then(Value::as_u64);
    match (message.result, message.error) {
        (_, Some(error)) => Incoming::Response {
            id,
            outcome: Err(error),
        },
        (Some(result), None) => Incoming::Response {
            id,
            outcome: Ok(result),
        },
        (None, None) => Incoming::Noise,
    }
}

/// Serialize a request as one protocol line
pub fn request_line(id: u64, method: &str, params: Value) -> Result<String> {
    let mut line = serde_json::to_string(&json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    }))?;
    line.push('\n');
    Ok(line)
}

/// Serialize a notification as one protocol line
pub fn notification_line(method: &str) -> Result<String> {
    let mut line = serde_json::to_string(&json!({
        "jsonrpc": "2.0",
        "method": method,
    }))?;
    line.push('\n');
    Ok(line)
}

#[derive(Deserialize)]
struct ToolResult {
    #[serde(default)]
    content: Vec<ToolContent>,
    #[serde(default, rename = "isError")]
    is_error: bool,
    #[serde(default, rename = "structuredContent")]
    structured_content: Option<Value>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ToolContent {
    Text { text: String },
    #[serde(other)]
    Unsupported,
}

/// Map the outcome of a `tools/call` request to an envelope
///
/// Protocol-level errors become error envelopes, so the session reports them
/// as remote failures of the operation.
pub fn tool_envelope(outcome: std::result::Result<Value, RpcError>) -> Result<Envelope> {
    let result = match outcome {
        Ok(result) => result,
        Err(error) => return Ok(Envelope::error(error.message)),
    };

    let result: ToolResult = serde_json::from_value(result)
        .map_err(|e| BridgeError::Protocol(format!("malformed tool result: {}", e)))?;

    let mut content: Vec<ContentBlock> = result
        .content
        .into_iter()
        .filter_map(|block| match block {
            ToolContent::Text { text } => Some(ContentBlock::Text { text }),
            ToolContent::Unsupported => None,
        })
        .collect();

    if content.is_empty() {
        if let Some(value) = result.structured_content {
            content.push(ContentBlock::Json { value });
        }
    }

    Ok(Envelope {
        is_error: result.is_error,
        content,
    })
}

/// Spawns the configured server command for each new session
#[derive(Debug, Clone, Default)]
pub struct ProcessConnector;

impl ProcessConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for ProcessConnector {
    async fn connect(&self, config: &SessionConfig) -> Result<Box<dyn Transport>> {
        let credentials = config.validate()?;

        let mut cmd = Command::new(&config.server_command);
        cmd.args(&config.server_args)
            .env(SERVER_ENV_CLIENT_ID, &credentials.client_id)
            .env(SERVER_ENV_CLIENT_SECRET, &credentials.client_secret)
            .env(SERVER_ENV_USER_EMAIL, &credentials.user_email)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            "Spawning server: {} {}",
            config.server_command,
            config.server_args.join(" ")
        );

        let mut child = cmd.spawn().map_err(|e| {
            BridgeError::Connection(format!("Failed to start {}: {}", config.server_command, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Connection("server stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Connection("server stdout unavailable".to_string()))?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "deskbridge::server", "{}", line);
                }
            })
        });

        Ok(Box::new(ProcessTransport {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            stderr_task,
        }))
    }
}

/// A running server child process
pub struct ProcessTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    stderr_task: Option<JoinHandle<()>>,
}

impl ProcessTransport {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| BridgeError::Connection("server stdin already closed".to_string()))?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| BridgeError::Connection(format!("write to server failed: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| BridgeError::Connection(format!("write to server failed: {}", e)))
    }

    /// Send a request and wait for the response carrying its id
    async fn request(
        &mut self,
        method: &str,
        params: Value,
    ) -> Result<std::result::Result<Value, RpcError>> {
        let id = self.next_id;
        self.next_id += 1;

        let line = request_line(id, method, params)?;
        self.write_line(&line).await?;

        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(|e| BridgeError::Connection(format!("read from server failed: {}", e)))?
                .ok_or_else(|| BridgeError::Connection("server closed its output".to_string()))?;

            match parse_line(&line) {
                Incoming::Response {
                    id: Some(response_id),
                    outcome,
                } if response_id == id => return Ok(outcome),
                Incoming::Response { id: other, .. } => {
                    tracing::debug!("Skipping response to request {:?} while waiting for {}", other, id);
                }
                Incoming::Notification { method } => {
                    tracing::debug!("Server notification: {}", method);
                }
                Incoming::Noise => {
                    if !line.trim().is_empty() {
                        tracing::debug!("Skipping server output: {}", line);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Transport for ProcessTransport {
    async fn handshake(&mut self) -> Result<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            },
        });

        let result = self.request("initialize", params).await?.map_err(|e| {
            BridgeError::Protocol(format!("initialize rejected ({}): {}", e.code, e.message))
        })?;

        if let Some(server) = result.get("serverInfo") {
            tracing::info!(
                "Connected to {} {}",
                server.get("name").and_then(serde_json::Value::as_str).unwrap_or("server"),
                server.get("version").and_then(serde_json::Value::as_str).unwrap_or("")
            );
        }

        let line = notification_line("notifications/initialized")?;
        self.write_line(&line).await
    }

    async fn call(&mut self, operation: &str, params: Params) -> Result<Envelope> {
        let outcome = self
            .request(
                "tools/call",
                json!({
                    "name": operation,
                    "arguments": params,
                }),
            )
            .await?;
        tool_envelope(outcome)
    }

    async fn close(&mut self) -> Result<()> {
        // Closing stdin asks the server to exit on its own
        drop(self.stdin.take());

        match tokio::time::timeout(CLOSE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => tracing::debug!("Server exited with {}", status),
            Ok(Err(e)) => tracing::warn!("Waiting for server failed: {}", e),
            Err(_) => {
                tracing::warn!("Server did not exit within {:?}, killing it", CLOSE_GRACE);
                self.child
                    .kill()
                    .await
                    .map_err(|e| BridgeError::Connection(format!("kill failed: {}", e)))?;
            }
        }

        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        Ok(())
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let line = r#"{"jsonrpc":"2.0","id":3,"result":{"content":[]}}"#;
        assert_eq!(
            parse_line(line),
            Incoming::Response {
                id: Some(3),
                outcome: Ok(json!({"content": []})),
            }
        );
    }

    #[test]
    fn test_parse_error_response() {
        let line = r#"{"jsonrpc":"2.0","id":4,"error":{"code":-32601,"message":"Method not found"}}"#;
        match parse_line(line) {
            Incoming::Response {
                id: Some(4),
                outcome: Err(error),
            } => {
                assert_eq!(error.code, -32601);
                assert_eq!(error.message, "Method not found");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_notification_and_noise() {
        assert_eq!(
            parse_line(r#"{"jsonrpc":"2.0","method":"notifications/message","params":{"level":"info"}}"#),
            Incoming::Notification {
                method: "notifications/message".to_string()
            }
        );
        assert_eq!(parse_line("Starting server on stdio"), Incoming::Noise);
        assert_eq!(parse_line(""), Incoming::Noise);
        assert_eq!(parse_line(r#"{"jsonrpc":"2.0"}"#), Incoming::Noise);
    }

    #[test]
    fn test_request_line() {
        let line = request_line(7, "tools/call", json!({"name": "list_calendars", "arguments": {}})).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let parsed: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed["jsonrpc"], "2.0");
        assert_eq!(parsed["id"], 7);
        assert_eq!(parsed["method"], "tools/call");
        assert_eq!(parsed["params"]["name"], "list_calendars");
    }

    #[test]
    fn test_notification_line_has_no_id() {
        let line = notification_line("notifications/initialized").unwrap();
        let parsed: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert!(parsed.get("id").is_none());
        assert_eq!(parsed["method"], "notifications/initialized");
    }

    #[test]
    fn test_tool_envelope_text() {
        let envelope = tool_envelope(Ok(json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "data": "...", "mimeType": "image/png"},
                {"type": "text", "text": "second"}
            ],
            "isError": false
        })))
        .unwrap();

        assert!(!envelope.is_error);
        assert_eq!(envelope.joined_text(), "first\nsecond");
    }

    #[test]
    fn test_tool_envelope_error_flag() {
        let envelope = tool_envelope(Ok(json!({
            "content": [{"type": "text", "text": "Spreadsheet not found"}],
            "isError": true
        })))
        .unwrap();
        assert!(envelope.is_error);
        assert_eq!(envelope.joined_text(), "Spreadsheet not found");
    }

    #[test]
    fn test_tool_envelope_structured_fallback() {
        let envelope = tool_envelope(Ok(json!({
            "content": [],
            "structuredContent": {"rows": 3}
        })))
        .unwrap();
        assert_eq!(
            envelope.content,
            vec![ContentBlock::Json {
                value: json!({"rows": 3})
            }]
        );
    }

    #[test]
    fn test_tool_envelope_rpc_error() {
        let envelope = tool_envelope(Err(RpcError {
            code: -32602,
            message: "Unknown tool: nope".to_string(),
            data: None,
        }))
        .unwrap();
        assert!(envelope.is_error);
        assert_eq!(envelope.joined_text(), "Unknown tool: nope");
    }

    #[test]
    fn test_tool_envelope_malformed() {
        let err = tool_envelope(Ok(json!({"content": "not a list"}))).unwrap_err();
        assert!(matches!(err, BridgeError::Protocol(_)));
    }
}
