//! MCP Server implementation
//!
//! Stateless JSON-RPC handling for the `make_vapi_call` tool. The same
//! handler backs both the HTTP (`/mcp`) and stdio transports.

use super::types::*;
use crate::{AssistantSelector, CallDispatcher, CallRequest, CallResult, VapiMcpError};
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

pub const TOOL_NAME: &str = "make_vapi_call";

/// MCP Server for vapi-mcp
#[derive(Clone)]
pub struct McpServer {
    dispatcher: CallDispatcher,
}

impl McpServer {
    pub fn new(dispatcher: CallDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Tool definition advertised in `tools/list`
    pub fn tool_definition() -> Tool {
        let assistants: Vec<&str> = AssistantSelector::ALL.iter().map(|a| a.as_str()).collect();

        Tool {
            name: TOOL_NAME.to_string(),
            description: "Make an outbound phone call using Vapi API to a specified destination \
                          number. One of the configured voice assistants places the call."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "destination_phone_number": {
                        "type": "string",
                        "description": "The phone number to call, in international format with a leading '+' and country code (e.g., \"+15551234567\")"
                    },
                    "customer_name": {
                        "type": "string",
                        "description": "Optional name of the customer for context"
                    },
                    "assistant": {
                        "type": "string",
                        "description": "Which assistant places the call",
                        "enum": assistants,
                        "default": AssistantSelector::default().as_str()
                    }
                },
                "required": ["destination_phone_number"]
            }),
        }
    }

    /// Run the MCP server over stdio
    pub async fn run_stdio(&self) -> Result<(), VapiMcpError> {
        info!("MCP server starting on stdio");
        self.serve_lines(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await?;
        info!("MCP server shutting down");
        Ok(())
    }

    /// Serve newline-delimited JSON-RPC until `reader` reaches EOF.
    ///
    /// Blank lines are skipped; notifications produce no output line.
    pub async fn serve_lines<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), VapiMcpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                // EOF
                break;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!(request = %line, "Received MCP request");

            if let Some(response) = self.handle_message(line).await {
                let response_str = serde_json::to_string(&response)?;
                debug!(response = %response_str, "Sending MCP response");
                writer.write_all(response_str.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle a single JSON-RPC message. Returns `None` for notifications.
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let value: serde_json::Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "Failed to parse JSON-RPC message");
                return Some(JsonRpcResponse::error(
                    JsonRpcId::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    JsonRpcId::Null,
                    INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ));
            }
        };

        self.handle_request(request).await
    }

    /// Route a parsed request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = match request.id.clone() {
            Some(id) => id,
            None => {
                // Notification, no response
                match request.method.as_str() {
                    "notifications/initialized" | "initialized" => info!("MCP client initialized"),
                    method => debug!(method = %method, "Ignoring notification"),
                }
                return None;
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(&request),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(&request).await,
            "ping" => Ok(json!({})),
            method => {
                warn!(method = %method, "Unknown MCP method");
                Err((METHOD_NOT_FOUND, format!("Method not found: {}", method)))
            }
        };

        match result {
            Ok(value) => Some(JsonRpcResponse::success(id, value)),
            Err((code, message)) => Some(JsonRpcResponse::error(id, code, message)),
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, request: &JsonRpcRequest) -> Result<serde_json::Value, (i32, String)> {
        let params: InitializeParams = request
            .params
            .clone()
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        let protocol_version = params
            .protocol_version
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(&v.as_str()))
            .unwrap_or_else(|| LATEST_PROTOCOL_VERSION.to_string());

        if let Some(client) = &params.client_info {
            info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                protocol_version = %protocol_version,
                "MCP client connected"
            );
        }

        let result = InitializeResult {
            protocol_version,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: "vapi-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Use make_vapi_call to place an outbound phone call through Vapi.\n\
                 - destination_phone_number must be in international format, e.g. +15551234567\n\
                 - assistant selects the voice assistant: \"andy\" (default) or \"mam\"\n\n\
                 Results always include a boolean `success`. Failures carry error_type, \
                 error_code and a suggestion for fixing the problem."
                    .to_string(),
            ),
        };

        serde_json::to_value(result).map_err(|e| (INTERNAL_ERROR, e.to_string()))
    }

    /// Handle tools/list request
    fn handle_tools_list(&self) -> Result<serde_json::Value, (i32, String)> {
        let result = ToolsListResult {
            tools: vec![Self::tool_definition()],
        };
        serde_json::to_value(result).map_err(|e| (INTERNAL_ERROR, e.to_string()))
    }

    /// Handle tools/call request
    async fn handle_tools_call(
        &self,
        request: &JsonRpcRequest,
    ) -> Result<serde_json::Value, (i32, String)> {
        let params: ToolCallParams = request
            .params
            .as_ref()
            .and_then(|p| serde_json::from_value(p.clone()).ok())
            .ok_or_else(|| (INVALID_PARAMS, "Missing or invalid params".to_string()))?;

        if params.name != TOOL_NAME {
            return Err((INVALID_PARAMS, format!("Unknown tool: {}", params.name)));
        }

        let call_request = Self::parse_call_args(params.arguments)?;
        let result = self.dispatcher.make_call(call_request).await;

        serde_json::to_value(Self::tool_result(&result)?).map_err(|e| (INTERNAL_ERROR, e.to_string()))
    }

    /// Validate tool arguments and build the call request
    fn parse_call_args(arguments: serde_json::Value) -> Result<CallRequest, (i32, String)> {
        let args: MakeCallArgs = serde_json::from_value(arguments).map_err(|e| {
            (
                INVALID_PARAMS,
                format!("Invalid arguments: {}. destination_phone_number is required.", e),
            )
        })?;

        let number = args.destination_phone_number.trim();
        if number.is_empty() {
            return Err((
                INVALID_PARAMS,
                "destination_phone_number must not be empty".to_string(),
            ));
        }

        Ok(CallRequest::new(number)
            .with_customer_name(args.customer_name)
            .with_assistant(AssistantSelector::parse_or_default(args.assistant.as_deref())))
    }

    /// Wrap a call result as MCP tool output.
    ///
    /// Failures are ordinary tool output: the structured result carries
    /// `success: false`, so `isError` stays unset.
    fn tool_result(result: &CallResult) -> Result<ToolCallResult, (i32, String)> {
        let structured = serde_json::to_value(result).map_err(|e| (INTERNAL_ERROR, e.to_string()))?;
        let text = serde_json::to_string_pretty(&structured).map_err(|e| (INTERNAL_ERROR, e.to_string()))?;

        Ok(ToolCallResult {
            content: vec![ToolContent::Text { text }],
            structured_content: Some(structured),
            is_error: None,
        })
    }
}
