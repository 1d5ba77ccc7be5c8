//! MCP Server implementation
//!
//! Turns JSON-RPC messages into capability invocations. The server is
//! transport-agnostic: the SSE and stdio transports both hand it raw
//! message text and forward whatever it returns.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::capabilities::{CapabilityContext, CapabilityKind, CapabilityRegistry, OperationRequest};
use crate::protocol::{
    GetPromptParams, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListChangedCapability, PROTOCOL_VERSION, ReadResourceParams, ResourcesCapability,
    ServerCapabilities, ServerInfo, ToolCallParams,
};
use crate::resources::{TEMPLATES, resolve_uri};
use crate::tools::ToolResult;
use crate::{Error, Result};

/// Server name reported during initialization.
pub const SERVER_NAME: &str = "forge-mcp";

/// MCP server over a fixed capability registry
///
/// Cheap to clone; every connection handler holds its own copy.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use forge_mcp::{CapabilityContext, CapabilityRegistry, McpServer};
///
/// let server = McpServer::new(Arc::new(CapabilityRegistry::standard()), context);
/// let response = server.handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#, None).await?;
/// ```
#[derive(Clone)]
pub struct McpServer {
    registry: Arc<CapabilityRegistry>,
    context: CapabilityContext,
}

impl McpServer {
    pub fn new(registry: Arc<CapabilityRegistry>, context: CapabilityContext) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Handle a message and always produce something to send back.
    ///
    /// Returns `None` for notifications. Messages that are not valid
    /// JSON-RPC get a parse-error response with a null id.
    pub async fn respond(&self, message: &str, session_id: Option<&str>) -> Option<String> {
        match self.handle_message(message, session_id).await {
            Ok(response) if response.is_empty() => None,
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!(session = session_id.unwrap_or("-"), error = %e, "Rejected message");
                serde_json::to_string(&JsonRpcResponse::failure(None, &e)).ok()
            }
        }
    }

    /// Handle a single MCP message
    ///
    /// Parses the JSON-RPC request and dispatches to the appropriate handler.
    ///
    /// # Returns
    ///
    /// The JSON-RPC response as a string, or empty string for notifications.
    pub async fn handle_message(&self, message: &str, session_id: Option<&str>) -> Result<String> {
        let request: JsonRpcRequest = serde_json::from_str(message)?;

        if request.is_notification() {
            tracing::debug!(method = %request.method, "Received notification");
            return Ok(String::new());
        }

        tracing::debug!(method = %request.method, session = session_id.unwrap_or("-"), "Received request");

        let id = request.id;
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params)?,
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params, session_id).await?,
            "resources/list" => JsonRpcResponse::success(id, json!({ "resources": [] })),
            "resources/templates/list" => {
                JsonRpcResponse::success(id, json!({ "resourceTemplates": TEMPLATES }))
            }
            "resources/read" => {
                self.handle_resources_read(id, request.params, session_id)
                    .await?
            }
            "prompts/list" => self.handle_prompts_list(id),
            "prompts/get" => self.handle_prompts_get(id, request.params, session_id).await?,
            _ => JsonRpcResponse::error(
                id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        };

        serde_json::to_string(&response).map_err(Error::from)
    }

    /// Handle the initialize request
    ///
    /// Returns server capabilities and info.
    fn handle_initialize(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        if let Ok(params) = serde_json::from_value::<InitializeParams>(params) {
            tracing::info!(
                client = %params.client_info.name,
                client_version = %params.client_info.version,
                protocol = %params.protocol_version,
                "Client initializing"
            );
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ListChangedCapability {
                    list_changed: Some(false),
                }),
                resources: Some(ResourcesCapability {
                    subscribe: Some(false),
                    list_changed: Some(false),
                }),
                prompts: Some(ListChangedCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        Ok(JsonRpcResponse::success(id, serde_json::to_value(result)?))
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<Value> = self
            .registry
            .list(CapabilityKind::Tool)
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.schema.to_json_schema()
                })
            })
            .collect();

        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    /// Handle tools/call request
    ///
    /// Tool failures become results flagged `isError`, not protocol errors.
    async fn handle_tools_call(
        &self,
        id: Option<Value>,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<JsonRpcResponse> {
        let params: ToolCallParams = match parse_params(params) {
            Ok(p) => p,
            Err(response) => return Ok(response.with_id(id)),
        };

        let request = OperationRequest::new(CapabilityKind::Tool, params.name, params.arguments)
            .with_session(session_id);

        let tool_result = match self.registry.invoke(&self.context, request).await {
            Ok(content) => ToolResult::from_content(content),
            Err(e) => ToolResult::error(e.to_string()),
        };

        Ok(JsonRpcResponse::success(id, serde_json::to_value(tool_result)?))
    }

    /// Handle resources/read request
    async fn handle_resources_read(
        &self,
        id: Option<Value>,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<JsonRpcResponse> {
        let params: ReadResourceParams = match parse_params(params) {
            Ok(p) => p,
            Err(response) => return Ok(response.with_id(id)),
        };

        let (capability, arguments) = match resolve_uri(&params.uri) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(uri = %params.uri, error = %e, "Unknown resource");
                return Ok(JsonRpcResponse::failure(id, &e));
            }
        };

        let request = OperationRequest::new(CapabilityKind::Resource, capability, arguments)
            .with_session(session_id);

        match self.registry.invoke(&self.context, request).await {
            Ok(content) => {
                let contents: Vec<Value> = content
                    .into_iter()
                    .map(|c| {
                        json!({
                            "uri": params.uri,
                            "mimeType": c.kind.mime_type(),
                            "text": c.text
                        })
                    })
                    .collect();
                Ok(JsonRpcResponse::success(id, json!({ "contents": contents })))
            }
            Err(e) => Ok(JsonRpcResponse::failure(id, &e)),
        }
    }

    fn handle_prompts_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let prompts: Vec<Value> = self
            .registry
            .list(CapabilityKind::Prompt)
            .map(|p| {
                json!({
                    "name": p.name,
                    "description": p.description,
                    "arguments": p.schema.to_prompt_arguments()
                })
            })
            .collect();

        JsonRpcResponse::success(id, json!({ "prompts": prompts }))
    }

    /// Handle prompts/get request
    ///
    /// Expands the template into a single user-role message.
    async fn handle_prompts_get(
        &self,
        id: Option<Value>,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<JsonRpcResponse> {
        let params: GetPromptParams = match parse_params(params) {
            Ok(p) => p,
            Err(response) => return Ok(response.with_id(id)),
        };

        let description = self
            .registry
            .find(CapabilityKind::Prompt, &params.name)
            .map(|p| p.description);

        let request = OperationRequest::new(CapabilityKind::Prompt, params.name, params.arguments)
            .with_session(session_id);

        match self.registry.invoke(&self.context, request).await {
            Ok(content) => {
                let messages: Vec<Value> = content
                    .into_iter()
                    .map(|c| {
                        json!({
                            "role": "user",
                            "content": { "type": "text", "text": c.text }
                        })
                    })
                    .collect();
                Ok(JsonRpcResponse::success(
                    id,
                    json!({ "description": description, "messages": messages }),
                ))
            }
            Err(e) => Ok(JsonRpcResponse::failure(id, &e)),
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> std::result::Result<T, JsonRpcResponse> {
    serde_json::from_value(params)
        .map_err(|e| JsonRpcResponse::error(None, -32602, format!("Invalid params: {e}")))
}

impl JsonRpcResponse {
    fn with_id(mut self, id: Option<Value>) -> Self {
        self.id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_test_utils::{RecordingShell, StubHost};

    fn server_with(host: StubHost) -> McpServer {
        let context = CapabilityContext::new(Arc::new(host), Arc::new(RecordingShell::new()));
        McpServer::new(Arc::new(CapabilityRegistry::standard()), context)
    }

    fn server() -> McpServer {
        server_with(StubHost::new().with_repo("o", "r").with_commits(12))
    }

    async fn call(server: &McpServer, request: &str) -> Value {
        let response = server.handle_message(request, None).await.unwrap();
        serde_json::from_str(&response).unwrap()
    }

    #[tokio::test]
    async fn test_handle_initialize() {
        let request = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"1.0"}}}"#;

        let parsed = call(&server(), request).await;
        assert_eq!(parsed["jsonrpc"], "2.0");
        assert_eq!(parsed["id"], 1);
        assert_eq!(parsed["result"]["serverInfo"]["name"], "forge-mcp");
        assert_eq!(parsed["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert!(parsed["result"]["capabilities"]["prompts"].is_object());
    }

    #[tokio::test]
    async fn test_initialize_tolerates_missing_params() {
        let parsed = call(&server(), r#"{"jsonrpc":"2.0","id":10,"method":"initialize","params":{}}"#).await;
        assert_eq!(parsed["id"], 10);
        assert!(parsed.get("result").is_some());
        assert!(parsed.get("error").is_none());
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server();
        for request in [
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","method":"initialized"}"#,
        ] {
            let response = server.handle_message(request, None).await.unwrap();
            assert!(response.is_empty());
            assert!(server.respond(request, None).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_ping() {
        let parsed = call(&server(), r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#).await;
        assert_eq!(parsed["id"], "p");
        assert_eq!(parsed["result"], json!({}));
    }

    #[tokio::test]
    async fn test_handle_tools_list() {
        let parsed = call(&server(), r#"{"jsonrpc":"2.0","id":2,"method":"tools/list","params":{}}"#).await;
        let names: Vec<&str> = parsed["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "generate-commit-message",
                "merge-pull-request",
                "create-pull-request",
                "commit-changes"
            ]
        );
        assert_eq!(
            parsed["result"]["tools"][3]["inputSchema"]["required"],
            json!(["repoPath", "message"])
        );
    }

    #[tokio::test]
    async fn test_handle_resource_templates_list() {
        let parsed = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":3,"method":"resources/templates/list"}"#,
        )
        .await;
        let templates = parsed["result"]["resourceTemplates"].as_array().unwrap();
        assert_eq!(templates.len(), 4);
        assert_eq!(templates[0]["uriTemplate"], "github://{owner}/{repo}/commits");
    }

    #[tokio::test]
    async fn test_resources_list_is_empty() {
        let parsed = call(&server(), r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#).await;
        assert_eq!(parsed["result"]["resources"], json!([]));
    }

    #[tokio::test]
    async fn test_read_commits_returns_at_most_ten() {
        let parsed = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":4,"method":"resources/read","params":{"uri":"github://o/r/commits"}}"#,
        )
        .await;

        let content = &parsed["result"]["contents"][0];
        assert_eq!(content["uri"], "github://o/r/commits");
        assert_eq!(content["mimeType"], "application/json");

        let commits: Vec<Value> = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
        assert_eq!(commits.len(), 10);
        assert_eq!(commits[0]["message"], "commit 12");
        assert_eq!(commits[9]["message"], "commit 3");
    }

    #[tokio::test]
    async fn test_read_commits_unknown_repo_is_not_found() {
        let parsed = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":5,"method":"resources/read","params":{"uri":"github://ghost/none/commits"}}"#,
        )
        .await;

        assert_eq!(parsed["error"]["code"], -32002);
        assert_eq!(parsed["error"]["data"]["kind"], "NotFoundError");
        assert_eq!(parsed["error"]["message"], "repository ghost/none not found");
    }

    #[tokio::test]
    async fn test_read_unknown_resource() {
        let parsed = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":7,"method":"resources/read","params":{"uri":"repo://unknown"}}"#,
        )
        .await;
        assert_eq!(parsed["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_read_pulls_sorted_by_update() {
        let server = server_with(
            StubHost::new()
                .with_repo("o", "r")
                .with_pull(1, "old", 5)
                .with_pull(2, "new", 50)
                .with_pull(3, "mid", 20),
        );
        let parsed = call(
            &server,
            r#"{"jsonrpc":"2.0","id":8,"method":"resources/read","params":{"uri":"github://o/r/pulls"}}"#,
        )
        .await;

        let text = parsed["result"]["contents"][0]["text"].as_str().unwrap();
        let pulls: Vec<Value> = serde_json::from_str(text).unwrap();
        let numbers: Vec<u64> = pulls.iter().map(|p| p["number"].as_u64().unwrap()).collect();
        assert_eq!(numbers, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_handle_tools_call_unknown_tool() {
        let parsed = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"unknown_tool","arguments":{}}}"#,
        )
        .await;
        assert_eq!(parsed["result"]["isError"], true);
        assert!(
            parsed["result"]["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("unknown tool")
        );
    }

    #[tokio::test]
    async fn test_tools_call_validation_failure_is_tool_error() {
        let parsed = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"merge-pull-request","arguments":{"owner":"o","repo":"r"}}}"#,
        )
        .await;
        assert_eq!(parsed["result"]["isError"], true);
        assert!(
            parsed["result"]["content"][0]["text"]
                .as_str()
                .unwrap()
                .contains("pullNumber")
        );
    }

    #[tokio::test]
    async fn test_tools_call_with_bad_params_is_invalid_params() {
        let parsed = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"arguments":{}}}"#,
        )
        .await;
        assert_eq!(parsed["id"], 9);
        assert_eq!(parsed["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_prompts_list_and_get() {
        let server = server();
        let listed = call(&server, r#"{"jsonrpc":"2.0","id":1,"method":"prompts/list"}"#).await;
        assert_eq!(listed["result"]["prompts"][0]["name"], "commit-message");
        assert_eq!(listed["result"]["prompts"][0]["arguments"][0]["name"], "changes");

        let got = call(
            &server,
            r#"{"jsonrpc":"2.0","id":2,"method":"prompts/get","params":{"name":"commit-message","arguments":{"changes":"foo"}}}"#,
        )
        .await;
        let messages = got["result"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert!(messages[0]["content"]["text"].as_str().unwrap().contains("foo"));
    }

    #[tokio::test]
    async fn test_prompts_get_missing_changes_is_invalid_params() {
        let got = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":2,"method":"prompts/get","params":{"name":"commit-message"}}"#,
        )
        .await;
        assert_eq!(got["error"]["code"], -32602);
        assert_eq!(got["error"]["data"]["kind"], "ValidationError");
    }

    #[tokio::test]
    async fn test_handle_unknown_method() {
        let parsed = call(&server(), r#"{"jsonrpc":"2.0","id":4,"method":"unknown/method","params":{}}"#).await;
        assert_eq!(parsed["error"]["code"], -32601);
        assert!(
            parsed["error"]["message"]
                .as_str()
                .unwrap()
                .contains("Method not found")
        );
    }

    #[tokio::test]
    async fn test_handle_invalid_json() {
        let server = server();
        let result = server.handle_message(r#"{"invalid json"#, None).await;
        assert!(matches!(result, Err(Error::Json(_))));

        let response: Value =
            serde_json::from_str(&server.respond(r#"{"invalid json"#, None).await.unwrap()).unwrap();
        assert_eq!(response["error"]["code"], -32700);
        assert!(response.get("id").is_none());
    }
}
