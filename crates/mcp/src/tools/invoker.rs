// Argument validation and execution of a registered tool

use super::registry::{RegisteredTool, ToolTarget};
use super::render;
use crate::discovery::{ActionDescriptor, FieldConstraints, FieldDescriptor, FieldType, ResourceDescriptor};
use crate::error::{ToolFailure, Violation};
use crate::schema::InputSchema;
use serde_json::{Map, Value};
use toolbridge_core::ActionRequest;

/// Validate `arguments`, run the tool and render the result.
///
/// Nothing reaches the handler unless the arguments satisfy the tool's
/// input schema.
pub async fn invoke(tool: &RegisteredTool, arguments: Map<String, Value>) -> Result<String, ToolFailure> {
    let name = tool.descriptor.name.as_str();

    let violations = validate_arguments(
        &tool.descriptor.input_schema,
        tool.requires_identifier(),
        &arguments,
    );
    if !violations.is_empty() {
        tracing::debug!("Rejected arguments for {}: {:?}", name, violations);
        return Err(ToolFailure::InvalidArguments {
            tool: name.to_string(),
            violations,
        });
    }

    match &tool.target {
        ToolTarget::Action { resource, action } => {
            run_action(tool, resource, action, arguments).await
        }
        ToolTarget::Custom(custom) => {
            tracing::debug!("Executing custom tool {}", name);
            custom.call(arguments).await
        }
    }
}

async fn run_action(
    tool: &RegisteredTool,
    resource: &ResourceDescriptor,
    action: &ActionDescriptor,
    arguments: Map<String, Value>,
) -> Result<String, ToolFailure> {
    let name = tool.descriptor.name.as_str();

    let mut payload = arguments;
    let mut request = ActionRequest::new(action.verb.clone());
    if action.requires_identifier {
        request.id = payload.remove("id").as_ref().and_then(identifier);
    }
    request.payload = payload;

    tracing::debug!("Executing {} (id: {:?})", name, request.id);

    let id = request.id.clone();
    let result = resource
        .handler()
        .execute(request)
        .await
        .map_err(|error| ToolFailure::from_execution(name, &tool.descriptor.input_schema, error))?;

    Ok(render::render(resource, &action.verb, id.as_deref(), &result))
}

/// Check `arguments` against `schema`.
///
/// Violations are reported in property order, followed by unexpected keys
/// sorted by name.
pub fn validate_arguments(
    schema: &InputSchema,
    requires_identifier: bool,
    arguments: &Map<String, Value>,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for property in &schema.properties {
        match arguments.get(&property.name) {
            None if property.required => violations.push(Violation::Missing(property.name.clone())),
            None => {}
            Some(value) if requires_identifier && property.name == "id" => {
                if identifier(value).is_none() {
                    violations.push(Violation::WrongType {
                        field: property.name.clone(),
                        expected: "a non-empty string or an integer",
                    });
                }
            }
            Some(value) => check_value(
                &property.name,
                &property.field_type,
                &property.constraints,
                value,
                &mut violations,
            ),
        }
    }

    let mut unknown: Vec<&String> = arguments
        .keys()
        .filter(|key| schema.property(key).is_none())
        .collect();
    unknown.sort();
    violations.extend(unknown.into_iter().map(|key| Violation::Unknown(key.clone())));

    violations
}

/// Identifiers arrive as strings; integers are accepted and converted.
fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(number) if number.is_i64() || number.is_u64() => Some(number.to_string()),
        _ => None,
    }
}

fn check_value(
    path: &str,
    field_type: &FieldType,
    constraints: &FieldConstraints,
    value: &Value,
    violations: &mut Vec<Violation>,
) {
    let wrong_type = |expected| Violation::WrongType {
        field: path.to_string(),
        expected,
    };

    match field_type {
        FieldType::String => match value.as_str() {
            Some(text) => {
                if let Some(max) = constraints.max_length {
                    if text.chars().count() > max {
                        violations.push(Violation::TooLong {
                            field: path.to_string(),
                            max,
                        });
                    }
                }
            }
            None => violations.push(wrong_type("a string")),
        },
        FieldType::Enum => {
            let allowed = constraints.allowed_values.clone().unwrap_or_default();
            match value.as_str() {
                Some(choice) if allowed.iter().any(|a| a == choice) => {}
                Some(_) => violations.push(Violation::NotAllowed {
                    field: path.to_string(),
                    allowed,
                }),
                None => violations.push(wrong_type("a string")),
            }
        }
        FieldType::Number => {
            if !value.is_number() {
                violations.push(wrong_type("a number"));
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                violations.push(wrong_type("a boolean"));
            }
        }
        FieldType::Nested(fields) => match value.as_object() {
            Some(object) => check_object(path, fields, object, violations),
            None => violations.push(wrong_type("an object")),
        },
    }
}

fn check_object(
    path: &str,
    fields: &[FieldDescriptor],
    object: &Map<String, Value>,
    violations: &mut Vec<Violation>,
) {
    for field in fields {
        let field_path = format!("{}.{}", path, field.name);
        match object.get(&field.name) {
            None if field.required => violations.push(Violation::Missing(field_path)),
            None => {}
            Some(value) => check_value(
                &field_path,
                &field.field_type,
                &field.constraints.clone().unwrap_or_default(),
                value,
                violations,
            ),
        }
    }

    let mut unknown: Vec<&String> = object
        .keys()
        .filter(|key| !fields.iter().any(|field| &field.name == *key))
        .collect();
    unknown.sort();
    violations.extend(
        unknown
            .into_iter()
            .map(|key| Violation::Unknown(format!("{}.{}", path, key))),
    );
}
