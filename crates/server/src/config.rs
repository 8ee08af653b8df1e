use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use toolbridge_core::{users, MemoryResource, ResourceCatalog};
use toolbridge_mcp::protocol::{ServerInfo, PROTOCOL_VERSION};
use toolbridge_mcp::{Discovery, McpServer};

use crate::tools;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Identity announced during the handshake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
}

fn default_name() -> String {
    "toolbridge".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_protocol_version() -> String {
    PROTOCOL_VERSION.to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            protocol_version: default_protocol_version(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Namespaces to publish; empty publishes every namespace
    #[serde(default)]
    pub exposed_namespaces: Vec<String>,
}

impl ServerConfig {
    pub fn load(config_path: &Path) -> Result<Self> {
        // Load config file if it exists, otherwise use defaults
        if !config_path.exists() {
            tracing::info!("Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read configuration file")?;
        toml::from_str(&content).context("Failed to parse configuration file")
    }

    /// Resource catalog served by this process
    pub fn catalog(&self, users: Arc<MemoryResource>) -> ResourceCatalog {
        ResourceCatalog::new().with_handler(users)
    }

    pub fn discovery(&self, catalog: ResourceCatalog) -> Discovery {
        Discovery::new(catalog).with_namespaces(self.discovery.exposed_namespaces.clone())
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub mcp: Arc<McpServer>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let users =
            Arc::new(users::seeded_user_resource().context("Failed to seed users resource")?);
        let discovery = config.discovery(config.catalog(users.clone()));

        let mcp = McpServer::new(discovery)
            .context("Failed to build tool registry")?
            .with_custom_tools(tools::builtin(users))
            .context("Failed to register custom tools")?
            .with_server_info(ServerInfo {
                name: config.server.name.clone(),
                version: config.server.version.clone(),
            })
            .with_protocol_version(config.server.protocol_version.clone());

        Ok(Self { mcp: Arc::new(mcp) })
    }
}
