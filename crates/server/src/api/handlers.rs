use super::ApiResult;
use crate::config::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Handle one JSON-RPC message posted to the MCP endpoint
///
/// Protocol errors travel in the JSON-RPC body, so the status is 200 unless
/// the message was a notification.
pub async fn mcp_message(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match state.mcp.handle_bytes(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Describe the MCP endpoint
pub async fn mcp_info(State(state): State<Arc<AppState>>) -> Json<McpInfoResponse> {
    let info = state.mcp.server_info();
    Json(McpInfoResponse {
        name: info.name.clone(),
        version: info.version.clone(),
        description: "Exposes discovered resources as MCP tools".to_string(),
        protocol_version: state.mcp.protocol_version().to_string(),
        capabilities: vec!["tools".to_string()],
        tools: state.mcp.registry().len(),
        endpoints: McpEndpoints {
            mcp: "/mcp".to_string(),
            health: "/api/health".to_string(),
            rediscover: "/api/rediscover".to_string(),
        },
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpInfoResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: Vec<String>,
    pub tools: usize,
    pub endpoints: McpEndpoints,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpEndpoints {
    pub mcp: String,
    pub health: String,
    pub rediscover: String,
}

/// Re-run discovery and replace the tool registry
pub async fn rediscover(State(state): State<Arc<AppState>>) -> ApiResult<Json<RediscoverResponse>> {
    let tools = state.mcp.rediscover()?;

    tracing::info!("Registry rebuilt with {} tools", tools);

    Ok(Json(RediscoverResponse {
        tools,
        message: "Registry rebuilt".to_string(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RediscoverResponse {
    pub tools: usize,
    pub message: String,
}
