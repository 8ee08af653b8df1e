// Standalone MCP server binary (stdio transport)

use anyhow::Result;
use std::sync::Arc;
use toolbridge_core::{users, ResourceCatalog};
use toolbridge_mcp::{Discovery, McpServer};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::info!("Toolbridge MCP server starting...");

    let catalog = ResourceCatalog::new().with_handler(Arc::new(users::seeded_user_resource()?));

    let mut discovery = Discovery::new(catalog);
    if let Ok(namespaces) = std::env::var("TOOLBRIDGE_NAMESPACES") {
        discovery = discovery.with_namespaces(
            namespaces
                .split(',')
                .map(str::trim)
                .filter(|namespace| !namespace.is_empty())
                .map(String::from)
                .collect::<Vec<_>>(),
        );
    }

    let server = McpServer::new(discovery)?;
    server.start().await?;

    Ok(())
}
