// MCP (Model Context Protocol) bridge: exposes discovered resources as tools
// to agent clients over JSON-RPC

pub mod discovery;
pub mod error;
pub mod framing;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod tools;

pub use discovery::Discovery;
pub use error::{ToolFailure, Violation};
pub use server::McpServer;
pub use tools::{CustomTool, RegistryError, ToolRegistry};
