// Tool descriptors and input schemas derived from resource actions

use crate::discovery::{ActionDescriptor, FieldConstraints, FieldDescriptor, FieldType, ResourceDescriptor};
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use toolbridge_core::Verb;

/// Externally visible description of one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
}

/// One argument of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaProperty {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub constraints: FieldConstraints,
    pub description: String,
}

impl SchemaProperty {
    /// Optional property with no constraints, for hand-written tools
    pub fn new(name: impl Into<String>, field_type: FieldType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            constraints: FieldConstraints::default(),
            description: description.into(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Restrict an enum property to `values`
    pub fn with_allowed_values<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.constraints.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    fn from_field(field: &FieldDescriptor, required: bool) -> Self {
        Self {
            name: field.name.clone(),
            field_type: field.field_type.clone(),
            required,
            constraints: field.constraints.clone().unwrap_or_default(),
            description: field_description(field),
        }
    }

    fn to_json(&self) -> Value {
        property_json(&self.field_type, &self.constraints, &self.description)
    }
}

/// Closed object schema; property order is the order fields were declared
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    pub properties: Vec<SchemaProperty>,
}

impl InputSchema {
    pub fn property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.iter().find(|property| property.name == name)
    }

    /// Index of a property in declaration order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|property| property.name == name)
    }

    pub fn required(&self) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|property| property.required)
            .map(|property| property.name.as_str())
            .collect()
    }

    /// Render as a JSON Schema object
    pub fn to_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|property| (property.name.clone(), property.to_json()))
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": self.required(),
            "additionalProperties": false,
        })
    }
}

impl Serialize for InputSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Derive the tool for one action of a resource
pub fn generate(resource: &ResourceDescriptor, action: &ActionDescriptor) -> ToolDescriptor {
    ToolDescriptor {
        name: tool_name(&action.verb, &resource.namespace, &resource.name),
        description: tool_description(resource, action),
        input_schema: input_schema(resource, action),
    }
}

/// `<verb>_<namespace>_<resource>`, lowercase
pub fn tool_name(verb: &Verb, namespace: &str, resource: &str) -> String {
    format!("{}_{}_{}", verb.as_str(), namespace, resource).to_lowercase()
}

fn tool_description(resource: &ResourceDescriptor, action: &ActionDescriptor) -> String {
    let verb = capitalize(&action.verb.as_str().replace('_', " "));
    let base = format!("{} {} in {}", verb, resource.name, resource.namespace);
    match &action.description {
        Some(description) => format!("{}: {}", base, description),
        None => base,
    }
}

fn input_schema(resource: &ResourceDescriptor, action: &ActionDescriptor) -> InputSchema {
    let mut properties = Vec::new();

    if action.requires_identifier {
        properties.push(SchemaProperty {
            name: "id".to_string(),
            field_type: FieldType::String,
            required: true,
            constraints: FieldConstraints::default(),
            description: format!(
                "ID of the {} to {}",
                resource.name,
                action.verb.as_str().replace('_', " ")
            ),
        });
    }

    // Update never mandates anything beyond the identifier, and bodies of
    // identifier-scoped custom actions are optional.
    let fields_optional = match &action.verb {
        Verb::Update => true,
        Verb::Custom(_) => action.requires_identifier,
        _ => false,
    };
    let carries_fields = matches!(action.verb, Verb::Create | Verb::Update | Verb::Custom(_));

    if carries_fields {
        properties.extend(
            action
                .fields
                .iter()
                .filter(|field| !(action.requires_identifier && field.name == "id"))
                .map(|field| SchemaProperty::from_field(field, field.required && !fields_optional)),
        );
    }

    InputSchema { properties }
}

fn property_json(field_type: &FieldType, constraints: &FieldConstraints, description: &str) -> Value {
    let mut schema = Map::new();

    match field_type {
        FieldType::String | FieldType::Enum => {
            schema.insert("type".to_string(), json!("string"));
        }
        FieldType::Number => {
            schema.insert("type".to_string(), json!("number"));
        }
        FieldType::Boolean => {
            schema.insert("type".to_string(), json!("boolean"));
        }
        FieldType::Nested(fields) => {
            let properties: Map<String, Value> = fields
                .iter()
                .map(|field| {
                    (
                        field.name.clone(),
                        property_json(
                            &field.field_type,
                            &field.constraints.clone().unwrap_or_default(),
                            &field_description(field),
                        ),
                    )
                })
                .collect();
            let required: Vec<&str> = fields
                .iter()
                .filter(|field| field.required)
                .map(|field| field.name.as_str())
                .collect();
            schema.insert("type".to_string(), json!("object"));
            schema.insert("properties".to_string(), Value::Object(properties));
            schema.insert("required".to_string(), json!(required));
            schema.insert("additionalProperties".to_string(), json!(false));
        }
    }

    if let Some(max_length) = constraints.max_length {
        schema.insert("maxLength".to_string(), json!(max_length));
    }
    if let Some(format) = &constraints.format {
        schema.insert("format".to_string(), json!(format));
    }
    if let Some(allowed) = &constraints.allowed_values {
        schema.insert("enum".to_string(), json!(allowed));
    }
    schema.insert("description".to_string(), json!(description));

    Value::Object(schema)
}

fn field_description(field: &FieldDescriptor) -> String {
    field
        .description
        .clone()
        .unwrap_or_else(|| format!("The {} value", field.name.replace('_', " ")))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Discovery;
    use std::sync::Arc;
    use toolbridge_core::{users, FieldKind, FieldSpec, MemoryResource, ResourceCatalog};

    fn users_resource() -> ResourceDescriptor {
        let catalog = ResourceCatalog::new().with_handler(Arc::new(users::user_resource()));
        Discovery::new(catalog).discover().remove(0)
    }

    fn tool_for(resource: &ResourceDescriptor, verb: Verb) -> ToolDescriptor {
        generate(resource, resource.action(&verb).unwrap())
    }

    #[test]
    fn test_tool_names_and_descriptions() {
        let resource = users_resource();
        let list = tool_for(&resource, Verb::List);
        assert_eq!(list.name, "list_users_user");
        assert_eq!(list.description, "List user in users");

        let activate = tool_for(&resource, Verb::Custom("activate".to_string()));
        assert_eq!(activate.name, "activate_users_user");
        assert_eq!(activate.description, "Activate user in users: Activate a user");
    }

    #[test]
    fn test_names_are_lowercase() {
        assert_eq!(tool_name(&Verb::Retrieve, "Shop", "OrderLine"), "retrieve_shop_orderline");
    }

    #[test]
    fn test_list_schema_is_empty_and_closed() {
        let schema = tool_for(&users_resource(), Verb::List).input_schema.to_json();
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {},
                "required": [],
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn test_create_requires_exactly_the_required_fields() {
        let tool = tool_for(&users_resource(), Verb::Create);
        assert_eq!(tool.input_schema.required(), vec!["username", "email", "password"]);
        assert!(tool.input_schema.property("id").is_none());
        assert!(tool.input_schema.property("created_at").is_none());
        assert!(tool.input_schema.property("bio").is_some());

        let json = tool.input_schema.to_json();
        assert_eq!(json["properties"]["email"]["format"], json!("email"));
        assert_eq!(json["properties"]["username"]["maxLength"], json!(150));
        assert_eq!(json["properties"]["birth_date"]["format"], json!("date"));
        assert_eq!(json["properties"]["is_active"]["type"], json!("boolean"));
        assert_eq!(json["additionalProperties"], json!(false));
    }

    #[test]
    fn test_update_only_requires_id() {
        let tool = tool_for(&users_resource(), Verb::Update);
        assert_eq!(tool.input_schema.required(), vec!["id"]);
        assert_eq!(tool.input_schema.properties[0].name, "id");
        assert!(tool.input_schema.property("username").is_some());
    }

    #[test]
    fn test_identifier_actions_take_only_id() {
        let resource = users_resource();
        for verb in [Verb::Retrieve, Verb::Destroy, Verb::Custom("deactivate".to_string())] {
            let json = tool_for(&resource, verb).input_schema.to_json();
            assert_eq!(json["required"], json!(["id"]));
            assert_eq!(json["properties"]["id"]["type"], json!("string"));
            assert_eq!(json["properties"].as_object().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_enum_and_nested_constraints() {
        let shipments = MemoryResource::new("shop", "shipment")
            .with_field(FieldSpec::choice("carrier", ["ups", "dhl"]).required())
            .with_field(FieldSpec::new(
                "address",
                FieldKind::Nested {
                    fields: vec![FieldSpec::text("city", Some(64)).required()],
                },
            ));
        let catalog = ResourceCatalog::new().with_handler(Arc::new(shipments));
        let resource = Discovery::new(catalog).discover().remove(0);
        let json = tool_for(&resource, Verb::Create).input_schema.to_json();

        assert_eq!(json["properties"]["carrier"]["enum"], json!(["ups", "dhl"]));
        assert_eq!(json["properties"]["carrier"]["type"], json!("string"));
        assert_eq!(json["properties"]["address"]["type"], json!("object"));
        assert_eq!(json["properties"]["address"]["required"], json!(["city"]));
        assert_eq!(
            json["properties"]["address"]["properties"]["city"]["maxLength"],
            json!(64)
        );
    }

    #[test]
    fn test_descriptor_serializes_input_schema_key() {
        let tool = tool_for(&users_resource(), Verb::Retrieve);
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["name"], json!("retrieve_users_user"));
        assert_eq!(value["inputSchema"]["required"], json!(["id"]));
    }

    #[test]
    fn test_hand_built_schema() {
        let schema = InputSchema {
            properties: vec![
                SchemaProperty::new("period", FieldType::Enum, "Reporting period")
                    .with_allowed_values(["day", "week"]),
                SchemaProperty::new("verbose", FieldType::Boolean, "Include details").required(),
            ],
        };
        assert_eq!(
            schema.to_json(),
            json!({
                "type": "object",
                "properties": {
                    "period": {
                        "type": "string",
                        "enum": ["day", "week"],
                        "description": "Reporting period"
                    },
                    "verbose": {"type": "boolean", "description": "Include details"}
                },
                "required": ["verbose"],
                "additionalProperties": false
            })
        );
    }
}
