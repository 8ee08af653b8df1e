// Discovery: walk the resource catalog and normalize handler metadata

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use toolbridge_core::{
    Capability, FieldKind, FieldSpec, MetadataError, ResourceCatalog, ResourceHandler,
    ResourceMetadata, Verb,
};

/// Schema-level type of a field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Enum,
    Nested(Vec<FieldDescriptor>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
}

impl FieldConstraints {
    pub fn is_empty(&self) -> bool {
        self.max_length.is_none() && self.format.is_none() && self.allowed_values.is_none()
    }
}

/// Normalized description of one writable field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<FieldConstraints>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One action of a resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDescriptor {
    pub verb: Verb,
    pub requires_identifier: bool,
    /// Fields accepted as payload, in declaration order
    pub fields: Vec<FieldDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A discovered resource and the handler that executes its actions
#[derive(Clone, Serialize)]
pub struct ResourceDescriptor {
    pub namespace: String,
    pub name: String,
    pub actions: Vec<ActionDescriptor>,
    #[serde(skip)]
    handler: Arc<dyn ResourceHandler>,
}

impl ResourceDescriptor {
    pub fn handler(&self) -> &Arc<dyn ResourceHandler> {
        &self.handler
    }

    pub fn action(&self, verb: &Verb) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|action| &action.verb == verb)
    }
}

impl std::fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("actions", &self.actions)
            .finish()
    }
}

impl PartialEq for ResourceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.name == other.name && self.actions == other.actions
    }
}

/// Walks a catalog and produces sorted resource descriptors
#[derive(Debug, Clone)]
pub struct Discovery {
    catalog: ResourceCatalog,
    namespaces: Option<HashSet<String>>,
}

impl Discovery {
    pub fn new(catalog: ResourceCatalog) -> Self {
        Self {
            catalog,
            namespaces: None,
        }
    }

    /// Only expose resources in these namespaces; empty means all
    pub fn with_namespaces<S: Into<String>>(mut self, namespaces: impl IntoIterator<Item = S>) -> Self {
        let namespaces: HashSet<String> = namespaces.into_iter().map(Into::into).collect();
        self.namespaces = if namespaces.is_empty() { None } else { Some(namespaces) };
        self
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// Describe every readable handler, sorted by namespace then name.
    ///
    /// Handlers whose metadata cannot be read or is malformed are skipped
    /// with a warning.
    pub fn discover(&self) -> Vec<ResourceDescriptor> {
        let mut resources = Vec::new();

        for handler in self.catalog.handlers() {
            let described = handler
                .metadata()
                .and_then(|metadata| describe(metadata, handler.clone()));

            match described {
                Ok(resource) => {
                    if let Some(namespaces) = &self.namespaces {
                        if !namespaces.contains(&resource.namespace) {
                            tracing::debug!(
                                "Skipping {}.{}: namespace not exposed",
                                resource.namespace,
                                resource.name
                            );
                            continue;
                        }
                    }
                    resources.push(resource);
                }
                Err(e) => {
                    tracing::warn!("Skipping resource with unreadable metadata: {}", e);
                }
            }
        }

        resources.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));

        tracing::debug!("Discovered {} resource(s)", resources.len());
        resources
    }
}

fn describe(
    metadata: ResourceMetadata,
    handler: Arc<dyn ResourceHandler>,
) -> Result<ResourceDescriptor, MetadataError> {
    check_identifier("namespace", &metadata.namespace)?;
    check_identifier("resource name", &metadata.name)?;

    let label = format!("{}.{}", metadata.namespace, metadata.name);
    let fields = normalize_fields(&metadata.fields, &label)?;

    let declared: BTreeSet<Verb> = metadata
        .capabilities
        .iter()
        .filter(|capability| !matches!(capability, Capability::Custom(_)))
        .map(Capability::verb)
        .collect();

    let mut actions: Vec<ActionDescriptor> = Verb::STANDARD
        .iter()
        .filter(|verb| declared.contains(*verb))
        .map(|verb| standard_action(verb.clone(), &fields))
        .collect();

    let mut custom: Vec<ActionDescriptor> = Vec::new();
    for capability in &metadata.capabilities {
        let Capability::Custom(action) = capability else {
            continue;
        };
        check_identifier("custom action name", &action.name)?;
        if Verb::is_standard_name(&action.name) {
            return Err(MetadataError::Malformed(format!(
                "{}: custom action '{}' shadows a standard action",
                label, action.name
            )));
        }
        if custom.iter().any(|existing| existing.verb.as_str() == action.name) {
            return Err(MetadataError::Malformed(format!(
                "{}: custom action '{}' declared twice",
                label, action.name
            )));
        }
        custom.push(ActionDescriptor {
            verb: Verb::Custom(action.name.clone()),
            requires_identifier: action.detail,
            fields: normalize_fields(&action.fields, &format!("{}.{}", label, action.name))?,
            description: action.description.clone(),
        });
    }
    custom.sort_by(|a, b| a.verb.as_str().cmp(b.verb.as_str()));
    actions.extend(custom);

    Ok(ResourceDescriptor {
        namespace: metadata.namespace,
        name: metadata.name,
        actions,
        handler,
    })
}

fn standard_action(verb: Verb, fields: &[FieldDescriptor]) -> ActionDescriptor {
    let (requires_identifier, fields) = match verb {
        Verb::List => (false, Vec::new()),
        Verb::Create => (false, fields.to_vec()),
        Verb::Update => (true, fields.to_vec()),
        _ => (true, Vec::new()),
    };
    ActionDescriptor {
        verb,
        requires_identifier,
        fields,
        description: None,
    }
}

fn check_identifier(what: &str, value: &str) -> Result<(), MetadataError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !value.starts_with('_');
    if valid {
        Ok(())
    } else {
        Err(MetadataError::Malformed(format!("invalid {} '{}'", what, value)))
    }
}

/// Normalize declared fields into writable field descriptors
fn normalize_fields(specs: &[FieldSpec], label: &str) -> Result<Vec<FieldDescriptor>, MetadataError> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();

    for spec in specs {
        if spec.name.is_empty() {
            return Err(MetadataError::Malformed(format!("{}: empty field name", label)));
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(MetadataError::Malformed(format!(
                "{}: duplicate field '{}'",
                label, spec.name
            )));
        }
        if spec.read_only {
            continue;
        }

        let mut constraints = FieldConstraints::default();
        let field_type = match &spec.kind {
            FieldKind::Text { max_length } => {
                constraints.max_length = *max_length;
                FieldType::String
            }
            FieldKind::Email { max_length } => {
                constraints.max_length = *max_length;
                constraints.format = Some("email".to_string());
                FieldType::String
            }
            FieldKind::Date => {
                constraints.format = Some("date".to_string());
                FieldType::String
            }
            FieldKind::DateTime => {
                constraints.format = Some("date-time".to_string());
                FieldType::String
            }
            FieldKind::Integer | FieldKind::Float => FieldType::Number,
            FieldKind::Boolean => FieldType::Boolean,
            FieldKind::Choice { choices } => {
                if choices.is_empty() {
                    return Err(MetadataError::Malformed(format!(
                        "{}: choice field '{}' has no choices",
                        label, spec.name
                    )));
                }
                constraints.allowed_values = Some(choices.clone());
                FieldType::Enum
            }
            FieldKind::Nested { fields } => {
                FieldType::Nested(normalize_fields(fields, &format!("{}.{}", label, spec.name))?)
            }
        };

        fields.push(FieldDescriptor {
            name: spec.name.clone(),
            field_type,
            required: spec.required,
            constraints: if constraints.is_empty() { None } else { Some(constraints) },
            description: spec.help_text.clone(),
        });
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use toolbridge_core::{ActionRequest, CustomAction, ExecutionError, MemoryResource};

    /// Handler whose metadata is fixed, or broken
    struct StaticHandler(Result<ResourceMetadata, String>);

    #[async_trait::async_trait]
    impl ResourceHandler for StaticHandler {
        fn metadata(&self) -> Result<ResourceMetadata, MetadataError> {
            self.0.clone().map_err(MetadataError::Unavailable)
        }

        async fn execute(&self, _request: ActionRequest) -> Result<Value, ExecutionError> {
            Ok(Value::Null)
        }
    }

    fn metadata(namespace: &str, name: &str, capabilities: Vec<Capability>) -> ResourceMetadata {
        ResourceMetadata {
            namespace: namespace.to_string(),
            name: name.to_string(),
            capabilities,
            fields: vec![
                FieldSpec::email("email", Some(254)).required(),
                FieldSpec::new("id", FieldKind::Integer).read_only(),
            ],
        }
    }

    fn catalog(metadata: Vec<Result<ResourceMetadata, String>>) -> ResourceCatalog {
        let mut catalog = ResourceCatalog::new();
        for entry in metadata {
            catalog.register(Arc::new(StaticHandler(entry)));
        }
        catalog
    }

    #[test]
    fn test_sorted_by_namespace_then_name() {
        let discovery = Discovery::new(catalog(vec![
            Ok(metadata("shop", "order", Capability::crud())),
            Ok(metadata("accounts", "user", Capability::crud())),
            Ok(metadata("accounts", "group", Capability::crud())),
        ]));

        let names: Vec<_> = discovery
            .discover()
            .iter()
            .map(|r| format!("{}.{}", r.namespace, r.name))
            .collect();
        assert_eq!(names, vec!["accounts.group", "accounts.user", "shop.order"]);
    }

    #[test]
    fn test_discovery_is_repeatable() {
        let discovery = Discovery::new(catalog(vec![
            Ok(metadata("b", "thing", Capability::crud())),
            Ok(metadata("a", "thing", vec![Capability::List])),
        ]));
        assert_eq!(discovery.discover(), discovery.discover());
    }

    #[test]
    fn test_missing_capabilities_are_omitted() {
        let discovery = Discovery::new(catalog(vec![Ok(metadata(
            "shop",
            "order",
            vec![Capability::Retrieve, Capability::List],
        ))]));
        let resources = discovery.discover();
        let verbs: Vec<_> = resources[0].actions.iter().map(|a| a.verb.clone()).collect();
        assert_eq!(verbs, vec![Verb::List, Verb::Retrieve]);
    }

    #[test]
    fn test_broken_resources_are_skipped() {
        let discovery = Discovery::new(catalog(vec![
            Err("database down".to_string()),
            Ok(metadata("", "nameless", Capability::crud())),
            Ok(metadata("shop", "order", vec![Capability::Custom(CustomAction::detail("update"))])),
            Ok(metadata("shop", "cart", Capability::crud())),
        ]));
        let resources = discovery.discover();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name, "cart");
    }

    #[test]
    fn test_duplicate_fields_are_malformed() {
        let mut broken = metadata("shop", "order", Capability::crud());
        broken.fields.push(FieldSpec::text("email", None));
        let discovery = Discovery::new(catalog(vec![Ok(broken)]));
        assert!(discovery.discover().is_empty());
    }

    #[test]
    fn test_field_normalization() {
        let discovery = Discovery::new(catalog(vec![Ok(metadata("shop", "order", Capability::crud()))]));
        let resources = discovery.discover();
        let create = resources[0].action(&Verb::Create).unwrap();

        // read-only `id` is not writable
        assert_eq!(create.fields.len(), 1);
        let email = &create.fields[0];
        assert_eq!(email.field_type, FieldType::String);
        assert!(email.required);
        let constraints = email.constraints.as_ref().unwrap();
        assert_eq!(constraints.format.as_deref(), Some("email"));
        assert_eq!(constraints.max_length, Some(254));

        assert!(resources[0].action(&Verb::Retrieve).unwrap().requires_identifier);
        assert!(resources[0].action(&Verb::Retrieve).unwrap().fields.is_empty());
        assert!(!resources[0].action(&Verb::List).unwrap().requires_identifier);
    }

    #[test]
    fn test_custom_actions_follow_standard_ones() {
        let users = toolbridge_core::users::user_resource();
        let discovery = Discovery::new(ResourceCatalog::new().with_handler(Arc::new(users)));
        let resources = discovery.discover();
        let verbs: Vec<_> = resources[0].actions.iter().map(|a| a.verb.as_str().to_string()).collect();
        assert_eq!(
            verbs,
            vec!["list", "create", "retrieve", "update", "destroy", "activate", "active", "deactivate"]
        );
        assert!(resources[0].action(&Verb::Custom("activate".to_string())).unwrap().requires_identifier);
        assert!(!resources[0].action(&Verb::Custom("active".to_string())).unwrap().requires_identifier);
    }

    #[test]
    fn test_namespace_filter() {
        let discovery = Discovery::new(catalog(vec![
            Ok(metadata("shop", "order", Capability::crud())),
            Ok(metadata("users", "user", Capability::crud())),
        ]))
        .with_namespaces(["users"]);
        let resources = discovery.discover();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].namespace, "users");

        let unfiltered = Discovery::new(discovery.catalog().clone()).with_namespaces(Vec::<String>::new());
        assert_eq!(unfiltered.discover().len(), 2);
    }

    #[test]
    fn test_memory_resource_without_destroy() {
        let notes = MemoryResource::new("notes", "note")
            .with_standard_actions([Verb::List, Verb::Create, Verb::Retrieve]);
        let discovery = Discovery::new(ResourceCatalog::new().with_handler(Arc::new(notes)));
        assert_eq!(discovery.discover()[0].actions.len(), 3);
    }
}
