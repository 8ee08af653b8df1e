// Hand-written tools registered next to the discovered ones

use crate::error::ToolFailure;
use crate::schema::ToolDescriptor;
use serde_json::{Map, Value};

/// A tool that is not backed by a resource action.
///
/// Arguments are checked against `descriptor().input_schema` before `call`
/// runs, and the name goes through the same collision check as generated
/// tools.
#[async_trait::async_trait]
pub trait CustomTool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool and render its result as text
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, ToolFailure>;
}
