// MCP server: JSON-RPC dispatch over the tool registry

use crate::discovery::Discovery;
use crate::framing::{Frame, MessageCodec};
use crate::protocol::*;
use crate::tools::{self, CustomTool, RegistryError, ToolRegistry};
use anyhow::Result;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

/// Longest accepted stdio message, in bytes
const MAX_LINE_LENGTH: usize = 8 * 1024 * 1024;

pub struct McpServer {
    discovery: Discovery,
    custom_tools: Vec<Arc<dyn CustomTool>>,
    registry: RwLock<Arc<ToolRegistry>>,
    server_info: ServerInfo,
    protocol_version: String,
    initialized: AtomicBool,
}

impl McpServer {
    /// Discover resources and build the tool registry.
    ///
    /// Fails if two actions map to the same tool name.
    pub fn new(discovery: Discovery) -> Result<Self, RegistryError> {
        let registry = ToolRegistry::build(discovery.discover())?;
        Ok(Self {
            discovery,
            custom_tools: Vec::new(),
            registry: RwLock::new(Arc::new(registry)),
            server_info: ServerInfo::default(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            initialized: AtomicBool::new(false),
        })
    }

    /// Publish hand-written tools next to the discovered ones.
    ///
    /// Fails if a custom tool name is already taken.
    pub fn with_custom_tools(mut self, custom_tools: Vec<Arc<dyn CustomTool>>) -> Result<Self, RegistryError> {
        self.custom_tools = custom_tools;
        let registry = self.build_registry()?;
        self.store(Arc::new(registry));
        Ok(self)
    }

    pub fn with_server_info(mut self, server_info: ServerInfo) -> Self {
        self.server_info = server_info;
        self
    }

    pub fn with_protocol_version(mut self, protocol_version: impl Into<String>) -> Self {
        self.protocol_version = protocol_version.into();
        self
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// Snapshot of the current registry
    pub fn registry(&self) -> Arc<ToolRegistry> {
        match self.registry.read() {
            Ok(registry) => registry.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whether a client has completed `initialize`
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Re-run discovery and swap in a fresh registry.
    ///
    /// On failure the current registry stays in place.
    pub fn rediscover(&self) -> Result<usize, RegistryError> {
        let registry = Arc::new(self.build_registry()?);
        let count = registry.len();
        self.store(registry);
        tracing::info!("Rediscovered resources: {} tools available", count);
        Ok(count)
    }

    fn build_registry(&self) -> Result<ToolRegistry, RegistryError> {
        ToolRegistry::build_with(self.discovery.discover(), self.custom_tools.clone())
    }

    fn store(&self, registry: Arc<ToolRegistry>) {
        match self.registry.write() {
            Ok(mut current) => *current = registry,
            Err(poisoned) => *poisoned.into_inner() = registry,
        }
    }

    /// Handle one raw JSON-RPC message.
    ///
    /// Returns `None` for notifications.
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        self.handle_bytes(message.as_bytes()).await
    }

    /// Like [`McpServer::handle_message`], for input that may not be UTF-8
    pub async fn handle_bytes(&self, message: &[u8]) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_slice(message) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to parse message: {}", e);
                return Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()));
            }
        };

        if !value.is_object() {
            return Some(JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::invalid_request("request must be a JSON object"),
            ));
        }

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(e.to_string()),
                ))
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!(
                    "unsupported jsonrpc version '{}'",
                    request.jsonrpc
                )),
            ));
        }

        self.handle_request(request).await
    }

    /// Dispatch a parsed request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        tracing::debug!("Handling {}", request.method);

        let result = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(request.params).await,
            method => Err(JsonRpcError::method_not_found(method)),
        };

        let Some(id) = request.id else {
            if let Err(error) = result {
                tracing::debug!("Notification {} failed: {}", request.method, error.message);
            }
            return None;
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = match params {
            Some(params) => serde_json::from_value(params)
                .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)))?,
            None => InitializeParams::default(),
        };

        if let Some(client) = &params.client_info {
            tracing::info!(
                "Client connected: {} {}",
                client.name,
                client.version.as_deref().unwrap_or("")
            );
        }
        if let Some(requested) = &params.protocol_version {
            if requested != &self.protocol_version {
                tracing::debug!(
                    "Client requested protocol {}, answering with {}",
                    requested,
                    self.protocol_version
                );
            }
        }

        self.initialized.store(true, Ordering::SeqCst);

        let result = InitializeResult {
            protocol_version: self.protocol_version.clone(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.server_info.clone(),
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        let result = ListToolsResult {
            tools: self.registry().list(),
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = serde_json::from_value(
            params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?,
        )
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))?;

        let arguments = match params.arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(arguments)) => arguments,
            Some(_) => return Err(JsonRpcError::invalid_params("arguments must be an object")),
        };

        let registry = self.registry();
        let tool = registry
            .lookup(&params.name)
            .ok_or_else(|| JsonRpcError::tool_not_found(&params.name))?;

        tracing::info!("Calling tool {}", params.name);

        let text = tools::invoke(tool, arguments)
            .await
            .map_err(|failure| failure.to_rpc_error())?;

        let result = CallToolResult {
            content: vec![ToolContent::text(text)],
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    /// Serve newline-delimited JSON-RPC on stdin/stdout
    pub async fn start(&self) -> Result<()> {
        tracing::info!(
            "MCP server listening on stdio ({} tools)",
            self.registry().len()
        );
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC until `reader` is exhausted
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut frames = FramedRead::new(reader, MessageCodec::new(MAX_LINE_LENGTH));
        let mut sink = FramedWrite::new(writer, LinesCodec::new());

        while let Some(frame) = frames.next().await {
            let response = match frame? {
                Frame::Message(line) if line.iter().all(u8::is_ascii_whitespace) => continue,
                Frame::Message(line) => self.handle_bytes(&line).await,
                Frame::Oversized => {
                    tracing::warn!("Dropped message longer than {} bytes", MAX_LINE_LENGTH);
                    Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()))
                }
            };

            if let Some(response) = response {
                sink.send(serde_json::to_string(&response)?).await?;
            }
        }

        tracing::info!("Input closed, MCP server stopping");
        Ok(())
    }
}
