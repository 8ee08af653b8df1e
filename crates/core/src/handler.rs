// Resource handler trait and the catalog handlers are registered in

use crate::error::{ExecutionError, MetadataError};
use crate::types::{ActionRequest, ResourceMetadata};
use serde_json::Value;
use std::sync::Arc;

/// A backing resource exposed through the bridge
#[async_trait::async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Describe the resource: identity, capabilities and fields
    fn metadata(&self) -> Result<ResourceMetadata, MetadataError>;

    /// Run one action against the resource
    async fn execute(&self, request: ActionRequest) -> Result<Value, ExecutionError>;
}

/// Set of registered resource handlers
#[derive(Clone, Default)]
pub struct ResourceCatalog {
    handlers: Vec<Arc<dyn ResourceHandler>>,
}

impl ResourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler
    pub fn register(&mut self, handler: Arc<dyn ResourceHandler>) {
        self.handlers.push(handler);
    }

    pub fn with_handler(mut self, handler: Arc<dyn ResourceHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Registered handlers in registration order
    pub fn handlers(&self) -> &[Arc<dyn ResourceHandler>] {
        &self.handlers
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for ResourceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCatalog")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
