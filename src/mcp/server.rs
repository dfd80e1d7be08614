//! Line-delimited JSON-RPC server loop over stdin/stdout.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::tools::ToolRegistry;

use super::protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, ToolContent, ToolDefinition, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR,
};

/// Tool-only MCP server.  One request is handled at a time in arrival
/// order; per-request failures are answered, never propagated.
pub struct McpServer {
    registry: ToolRegistry,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Serve requests until stdin closes.
    pub async fn run(&self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(&line).await {
                let json = serde_json::to_string(&response)?;
                stdout.write_all(json.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle one request line.  Returns `None` for notifications.
    async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "unparseable request");
                return Some(JsonRpcResponse::failure(None, PARSE_ERROR, e.to_string()));
            }
        };

        debug!(method = %request.method, "request received");

        let Some(id) = request.id.clone() else {
            // Notifications (e.g. notifications/initialized) get no reply.
            return None;
        };
        let id = Some(id);

        match request.method.as_str() {
            "initialize" => Some(JsonRpcResponse::success(id, InitializeResult::new())),
            "ping" => Some(JsonRpcResponse::success(id, serde_json::json!({}))),
            "tools/list" => {
                let tools = self
                    .registry
                    .list()
                    .into_iter()
                    .map(|t| ToolDefinition {
                        name: t.name().to_string(),
                        description: t.description().to_string(),
                        input_schema: t.parameters_schema(),
                    })
                    .collect();
                Some(JsonRpcResponse::success(id, ListToolsResult { tools }))
            }
            "tools/call" => {
                let params: CallToolParams = match request
                    .params
                    .ok_or("missing params")
                    .and_then(|p| serde_json::from_value(p).map_err(|_| "invalid params"))
                {
                    Ok(p) => p,
                    Err(msg) => return Some(JsonRpcResponse::failure(id, INVALID_PARAMS, msg)),
                };

                let Some(tool) = self.registry.get(&params.name) else {
                    return Some(JsonRpcResponse::failure(
                        id,
                        INVALID_PARAMS,
                        format!("Unknown tool: {}", params.name),
                    ));
                };

                let arguments = params.arguments.unwrap_or(serde_json::json!({}));
                let output = tool.execute(arguments).await;

                let result = CallToolResult {
                    content: vec![ToolContent::Text {
                        text: output.output,
                    }],
                    is_error: !output.success,
                };
                Some(JsonRpcResponse::success(id, result))
            }
            other => Some(JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolOutput};
    use async_trait::async_trait;

    struct FakeTool;

    #[async_trait]
    impl Tool for FakeTool {
        fn name(&self) -> &str {
            "fake"
        }
        fn description(&self) -> &str {
            "a fake tool"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, params: serde_json::Value) -> ToolOutput {
            if params.get("fail").is_some() {
                ToolOutput::error("分析图片时出错: fake failure")
            } else {
                ToolOutput::ok("fake result")
            }
        }
    }

    fn server() -> McpServer {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FakeTool));
        McpServer::new(registry)
    }

    async fn roundtrip(line: &str) -> serde_json::Value {
        let resp = server().handle_line(line).await.expect("expected a response");
        serde_json::to_value(&resp).unwrap()
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let v = roundtrip(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).await;
        assert_eq!(v["result"]["serverInfo"]["name"], "kimi-vision");
        assert_eq!(v["id"], 1);
    }

    #[tokio::test]
    async fn initialized_notification_gets_no_reply() {
        let resp = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn tools_list_includes_registered_tool() {
        let v = roundtrip(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
        assert_eq!(v["result"]["tools"][0]["name"], "fake");
        assert!(v["result"]["tools"][0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn tools_call_success() {
        let v = roundtrip(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"fake","arguments":{}}}"#,
        )
        .await;
        assert_eq!(v["result"]["content"][0]["type"], "text");
        assert_eq!(v["result"]["content"][0]["text"], "fake result");
        assert!(v["result"].get("isError").is_none());
    }

    #[tokio::test]
    async fn tool_failure_is_a_result_not_a_protocol_error() {
        let v = roundtrip(
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"fake","arguments":{"fail":true}}}"#,
        )
        .await;
        assert!(v.get("error").is_none());
        assert_eq!(v["result"]["isError"], true);
        assert!(v["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("分析图片时出错"));
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let v = roundtrip(
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"nope"}}"#,
        )
        .await;
        assert_eq!(v["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let v = roundtrip(r#"{"jsonrpc":"2.0","id":6,"method":"resources/list"}"#).await;
        assert_eq!(v["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn garbage_line_is_parse_error() {
        let v = roundtrip("this is not json").await;
        assert_eq!(v["error"]["code"], PARSE_ERROR);
        assert!(v["id"].is_null());
    }
}
