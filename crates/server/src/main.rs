use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod api;
mod config;
mod scan;
mod tools;

use config::{AppState, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "toolbridge")]
#[command(about = "Expose application resources as MCP tools", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "toolbridge.toml", env = "TOOLBRIDGE_CONFIG")]
    config: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Print discovered resources and tools, then exit
    #[arg(long)]
    scan: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toolbridge=info,tower_http=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let args = Args::parse();

    // Load configuration
    let config = ServerConfig::load(&args.config)?;

    if args.scan {
        let state = AppState::new(&config)?;
        println!("{}", scan::report(&state.mcp.registry()));
        return Ok(());
    }

    tracing::info!("Starting Toolbridge MCP server");

    // Start API server
    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!("Starting API server on {}", addr);

    api::serve(&addr, config).await?;

    Ok(())
}
