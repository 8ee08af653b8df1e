// Tool registry: every discovered action published under a unique name

use super::custom::CustomTool;
use crate::discovery::{ActionDescriptor, ResourceDescriptor};
use crate::schema::{self, ToolDescriptor};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("tool name '{name}' is produced by both {first} and {second}")]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },
}

/// What a tool runs when called
#[derive(Clone)]
pub enum ToolTarget {
    /// An action of a discovered resource
    Action {
        resource: Arc<ResourceDescriptor>,
        action: ActionDescriptor,
    },
    Custom(Arc<dyn CustomTool>),
}

impl std::fmt::Debug for ToolTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolTarget::Action { resource, action } => f
                .debug_struct("Action")
                .field("resource", &format!("{}.{}", resource.namespace, resource.name))
                .field("verb", &action.verb)
                .finish(),
            ToolTarget::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// A published tool and what it runs
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub target: ToolTarget,
}

impl RegisteredTool {
    /// The backing resource, unless this is a custom tool
    pub fn resource(&self) -> Option<&ResourceDescriptor> {
        match &self.target {
            ToolTarget::Action { resource, .. } => Some(resource),
            ToolTarget::Custom(_) => None,
        }
    }

    pub fn action(&self) -> Option<&ActionDescriptor> {
        match &self.target {
            ToolTarget::Action { action, .. } => Some(action),
            ToolTarget::Custom(_) => None,
        }
    }

    pub fn requires_identifier(&self) -> bool {
        self.action().is_some_and(|action| action.requires_identifier)
    }

    fn origin(&self) -> String {
        match &self.target {
            ToolTarget::Action { resource, action } => {
                format!("{}.{}:{}", resource.namespace, resource.name, action.verb)
            }
            ToolTarget::Custom(_) => format!("custom tool {}", self.descriptor.name),
        }
    }
}

/// Immutable map from tool name to tool, ordered by name
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a tool for every action of every resource.
    ///
    /// Two actions mapping to the same tool name is a configuration error.
    pub fn build(resources: Vec<ResourceDescriptor>) -> Result<Self, RegistryError> {
        Self::build_with(resources, Vec::new())
    }

    /// Like [`ToolRegistry::build`], also publishing hand-written tools.
    ///
    /// Custom tool names share one namespace with generated names.
    pub fn build_with(
        resources: Vec<ResourceDescriptor>,
        custom: Vec<Arc<dyn CustomTool>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        for resource in resources {
            let resource = Arc::new(resource);
            for action in &resource.actions {
                registry.insert(RegisteredTool {
                    descriptor: schema::generate(&resource, action),
                    target: ToolTarget::Action {
                        resource: resource.clone(),
                        action: action.clone(),
                    },
                })?;
            }
        }

        for tool in custom {
            registry.insert(RegisteredTool {
                descriptor: tool.descriptor(),
                target: ToolTarget::Custom(tool),
            })?;
        }

        tracing::info!("Registered {} tools", registry.len());
        Ok(registry)
    }

    fn insert(&mut self, tool: RegisteredTool) -> Result<(), RegistryError> {
        if let Some(existing) = self.tools.get(&tool.descriptor.name) {
            return Err(RegistryError::NameCollision {
                name: tool.descriptor.name.clone(),
                first: existing.origin(),
                second: tool.origin(),
            });
        }
        self.tools.insert(tool.descriptor.name.clone(), tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn lookup(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// All tool descriptors, sorted by name
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| tool.descriptor.clone())
            .collect()
    }

    /// Registered tools, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.values()
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Discovery;
    use crate::error::ToolFailure;
    use crate::schema::InputSchema;
    use serde_json::{Map, Value};
    use toolbridge_core::{users, MemoryResource, ResourceCatalog, Verb};

    struct Named(&'static str);

    #[async_trait::async_trait]
    impl CustomTool for Named {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                name: self.0.to_string(),
                description: "Test tool".to_string(),
                input_schema: InputSchema::default(),
            }
        }

        async fn call(&self, _arguments: Map<String, Value>) -> Result<String, ToolFailure> {
            Ok(self.0.to_string())
        }
    }

    fn registry(catalog: ResourceCatalog) -> Result<ToolRegistry, RegistryError> {
        ToolRegistry::build(Discovery::new(catalog).discover())
    }

    #[test]
    fn test_one_tool_per_action() {
        let catalog = ResourceCatalog::new()
            .with_handler(Arc::new(users::user_resource()))
            .with_handler(Arc::new(MemoryResource::new("notes", "note")));
        let registry = registry(catalog).unwrap();

        // users: 5 standard + 3 custom, notes: 5 standard
        assert_eq!(registry.len(), 13);
        for tool in registry.list() {
            let registered = registry.lookup(&tool.name).unwrap();
            let resource = registered.resource().unwrap();
            let action = registered.action().unwrap();
            assert!(tool.name.starts_with(&format!("{}_", action.verb)));
            assert!(tool.name.ends_with(&format!("_{}_{}", resource.namespace, resource.name)));
        }
    }

    #[test]
    fn test_list_is_sorted_by_name() {
        let catalog = ResourceCatalog::new().with_handler(Arc::new(users::user_resource()));
        let registry = registry(catalog).unwrap();
        let names: Vec<_> = registry.list().into_iter().map(|tool| tool.name).collect();

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.first().map(String::as_str), Some("activate_users_user"));
    }

    #[test]
    fn test_lookup_resolves_target() {
        let catalog = ResourceCatalog::new().with_handler(Arc::new(users::user_resource()));
        let registry = registry(catalog).unwrap();

        let tool = registry.lookup("update_users_user").unwrap();
        assert_eq!(tool.action().unwrap().verb, Verb::Update);
        assert_eq!(tool.resource().unwrap().name, "user");
        assert!(tool.requires_identifier());
        assert!(registry.lookup("update_users_ghost").is_none());
        assert!(!registry.contains("delete_users_user"));
    }

    #[test]
    fn test_name_collision_is_fatal() {
        // "a_b" + "c" and "a" + "b_c" flatten to the same tool names
        let catalog = ResourceCatalog::new()
            .with_handler(Arc::new(MemoryResource::new("a_b", "c")))
            .with_handler(Arc::new(MemoryResource::new("a", "b_c")));
        let err = registry(catalog).unwrap_err();
        match err {
            RegistryError::NameCollision { name, .. } => assert_eq!(name, "list_a_b_c"),
        }
    }

    #[test]
    fn test_case_only_difference_collides() {
        let catalog = ResourceCatalog::new()
            .with_handler(Arc::new(MemoryResource::new("shop", "Order")))
            .with_handler(Arc::new(MemoryResource::new("shop", "order")));
        assert!(registry(catalog).is_err());
    }

    #[test]
    fn test_custom_tools_are_published() {
        let resources =
            Discovery::new(ResourceCatalog::new().with_handler(Arc::new(users::user_resource())))
                .discover();
        let registry =
            ToolRegistry::build_with(resources, vec![Arc::new(Named("system_health"))]).unwrap();

        assert_eq!(registry.len(), 9);
        let tool = registry.lookup("system_health").unwrap();
        assert!(tool.resource().is_none());
        assert!(!tool.requires_identifier());
        assert!(matches!(tool.target, ToolTarget::Custom(_)));
    }

    #[test]
    fn test_custom_tool_cannot_shadow_generated_tool() {
        let resources =
            Discovery::new(ResourceCatalog::new().with_handler(Arc::new(users::user_resource())))
                .discover();
        let err = ToolRegistry::build_with(resources, vec![Arc::new(Named("list_users_user"))])
            .unwrap_err();
        match err {
            RegistryError::NameCollision { name, first, second } => {
                assert_eq!(name, "list_users_user");
                assert_eq!(first, "users.user:list");
                assert_eq!(second, "custom tool list_users_user");
            }
        }
    }
}
