//! MCP (Model Context Protocol) handling module
//!
//! Implements the JSON-RPC 2.0 protocol for MCP communication over stdio.
//! Per-call failures are carried inside the tool result with an explicit
//! error flag; JSON-RPC level errors are reserved for protocol problems
//! (unparseable frames, unknown methods, malformed params).

use crate::registry::Dispatcher;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader as AsyncBufReader};
use tracing::{debug, error, info};

/// MCP JSON-RPC 2.0 request structure
#[derive(Debug, Deserialize)]
pub struct McpRequest {
    /// JSON-RPC version field - required on the wire but not accessed in code
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

/// MCP JSON-RPC 2.0 response structure
#[derive(Debug, Serialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

/// MCP Error structure
#[derive(Debug, Serialize)]
pub struct McpError {
    pub code: String,
    pub message: String,
}

/// MCP Tool call arguments
#[derive(Debug, Deserialize)]
pub struct ToolCallArgs {
    pub name: String,
    pub arguments: Option<Value>,
}

/// MCP Content item
#[derive(Debug, Serialize)]
pub struct ContentItem {
    pub r#type: String,
    pub text: String,
}

/// MCP Tool result
///
/// The `isError` flag is how the host distinguishes a failed call from a
/// successful-but-empty one; both share the same envelope shape.
#[derive(Debug, Serialize)]
pub struct ToolResult {
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl McpResponse {
    /// Create a successful response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: &str, message: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(McpError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

impl ToolResult {
    /// Create a text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem {
                r#type: "text".to_string(),
                text: content.into(),
            }],
            is_error: false,
        }
    }

    /// Create an error-flagged result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem {
                r#type: "text".to_string(),
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// Parse MCP request from JSON string
pub fn parse_request(json: &str) -> Result<McpRequest> {
    let request: McpRequest = serde_json::from_str(json)?;
    Ok(request)
}

/// Serialize MCP response to JSON string
pub fn serialize_response(response: &McpResponse) -> Result<String> {
    Ok(serde_json::to_string(response)?)
}

/// Handle stdio MCP communication
pub async fn handle_stdio(dispatcher: Dispatcher) -> Result<()> {
    info!("Starting skywrite MCP server on stdio");

    let stdin = tokio::io::stdin();
    let mut reader = AsyncBufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = reader.next_line().await? {
        debug!("Received request: {}", line);

        let response = match parse_request(&line) {
            Ok(request) => handle_request(request, &dispatcher).await,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                McpResponse::error(None, "parse_error", &format!("Invalid JSON: {}", e))
            }
        };

        let response_json = serialize_response(&response)?;
        debug!("Sending response: {}", response_json);

        stdout.write_all(response_json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}

/// Handle a single MCP request
async fn handle_request(request: McpRequest, dispatcher: &Dispatcher) -> McpResponse {
    match request.method.as_str() {
        "initialize" => handle_initialize(request, dispatcher),
        "tools/call" => handle_tool_call(request, dispatcher).await,
        "tools/list" => handle_tools_list(request, dispatcher),
        _ => McpResponse::error(
            request.id,
            "method_not_found",
            &format!("Method '{}' not found", request.method),
        ),
    }
}

/// Handle tools/call method
async fn handle_tool_call(request: McpRequest, dispatcher: &Dispatcher) -> McpResponse {
    let args: ToolCallArgs = match serde_json::from_value(request.params.unwrap_or_default()) {
        Ok(args) => args,
        Err(e) => {
            return McpResponse::error(
                request.id,
                "invalid_params",
                &format!("Invalid parameters: {}", e),
            )
        }
    };

    let result = dispatcher.dispatch(&args.name, args.arguments).await;
    match serde_json::to_value(&result) {
        Ok(value) => McpResponse::success(request.id, value),
        Err(e) => McpResponse::error(
            request.id,
            "internal_error",
            &format!("Failed to serialize tool result: {}", e),
        ),
    }
}

/// Handle tools/list method
fn handle_tools_list(request: McpRequest, dispatcher: &Dispatcher) -> McpResponse {
    let tools = dispatcher.registry().descriptors_json();
    McpResponse::success(request.id, serde_json::json!({ "tools": tools }))
}

/// Handle initialize method
fn handle_initialize(request: McpRequest, dispatcher: &Dispatcher) -> McpResponse {
    let tools = dispatcher.registry().descriptors_json();
    let result = serde_json::json!({
        "serverInfo": {
            "name": "skywrite",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {
            "tools": { "list": true, "call": true }
        },
        "tools": tools
    });
    McpResponse::success(request.id, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsky::{BskyAdapter, Session};
    use crate::http::client_with_timeout;
    use crate::registry;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn test_dispatcher() -> Dispatcher {
        let adapter = BskyAdapter::new(
            client_with_timeout(Duration::from_secs(5)),
            Session {
                access_jwt: "token".to_string(),
                refresh_jwt: "refresh".to_string(),
                handle: "me.bsky.social".to_string(),
                did: "did:plc:me".to_string(),
                service: "https://bsky.social".to_string(),
            },
        );
        Dispatcher::new(registry::build_registry(), Arc::new(adapter))
    }

    #[tokio::test]
    async fn test_initialize_response_contains_fields() {
        let req = McpRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(1)),
            method: "initialize".into(),
            params: None,
        };
        let resp = handle_request(req, &test_dispatcher()).await;
        assert!(resp.error.is_none());
        let result = resp.result.expect("result present");
        assert_eq!(
            result
                .get("serverInfo")
                .and_then(|v| v.get("name"))
                .and_then(|v| v.as_str()),
            Some("skywrite")
        );
        assert_eq!(
            result
                .get("capabilities")
                .and_then(|v| v.get("tools"))
                .and_then(|v| v.get("call"))
                .and_then(|v| v.as_bool()),
            Some(true)
        );
        assert!(result.get("tools").and_then(|v| v.as_array()).is_some());
    }

    #[tokio::test]
    async fn test_tools_list_contains_posting_tools() {
        let req = McpRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(2)),
            method: "tools/list".into(),
            params: None,
        };
        let resp = handle_request(req, &test_dispatcher()).await;
        assert!(resp.error.is_none());
        let result = resp.result.expect("result present");
        let tools = result
            .get("tools")
            .and_then(|v| v.as_array())
            .expect("tools array");
        let names: Vec<&str> = tools
            .iter()
            .filter_map(|t| t.get("name").and_then(|n| n.as_str()))
            .collect();
        assert!(names.contains(&"create_post"));
        assert!(names.contains(&"get_timeline"));
        assert!(names.contains(&"search_posts"));
        assert!(names.contains(&"create_list"));
    }

    #[tokio::test]
    async fn test_unknown_method_is_protocol_error() {
        let req = McpRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(3)),
            method: "resources/list".into(),
            params: None,
        };
        let resp = handle_request(req, &test_dispatcher()).await;
        assert!(resp.result.is_none());
        assert_eq!(resp.error.unwrap().code, "method_not_found");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_flagged_result() {
        // Unknown tool is a per-call error, not a protocol error: the
        // response is a success envelope carrying an error-flagged result
        let req = McpRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(4)),
            method: "tools/call".into(),
            params: Some(json!({ "name": "nonexistent_tool", "arguments": {} })),
        };
        let resp = handle_request(req, &test_dispatcher()).await;
        assert!(resp.error.is_none());
        let result = resp.result.expect("result present");
        assert_eq!(result.get("isError").and_then(|v| v.as_bool()), Some(true));
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("nonexistent_tool"));
    }

    #[test]
    fn test_tool_result_success_omits_error_flag() {
        let value = serde_json::to_value(ToolResult::text("ok")).unwrap();
        assert!(value.get("isError").is_none());
        assert_eq!(value["content"][0]["type"], "text");
    }

    #[test]
    fn test_tool_result_error_sets_flag() {
        let value = serde_json::to_value(ToolResult::error("boom")).unwrap();
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["text"], "boom");
    }
}
