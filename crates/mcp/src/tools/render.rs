// Text rendering of action results

use crate::discovery::ResourceDescriptor;
use serde_json::{Map, Value};
use toolbridge_core::Verb;

/// Render the result of `verb` as text for the caller.
///
/// Output depends only on the inputs: records are listed in the order the
/// handler returned them and fields are sorted by name.
pub fn render(resource: &ResourceDescriptor, verb: &Verb, id: Option<&str>, result: &Value) -> String {
    match verb {
        Verb::List => render_collection(resource, result),
        Verb::Create => render_record("Created", resource, id, result),
        Verb::Retrieve => render_record("Retrieved", resource, id, result),
        Verb::Update => render_record("Updated", resource, id, result),
        Verb::Destroy => format!(
            "Deleted {} {}.",
            resource.name,
            record_id(result, id)
        ),
        Verb::Custom(name) => {
            let header = format!("Action '{}' on {} completed.", name, resource.name);
            match result {
                Value::Null => header,
                Value::Array(_) => format!("{}\n{}", header, render_collection(resource, result)),
                Value::Object(record) => format!(
                    "{}\n{} {}:\n{}",
                    header,
                    resource.name,
                    record_id(result, id),
                    field_lines(record)
                ),
                other => format!("{}\n{}", header, format_value(other)),
            }
        }
    }
}

fn render_collection(resource: &ResourceDescriptor, result: &Value) -> String {
    let records: &[Value] = match result {
        Value::Array(records) => records.as_slice(),
        Value::Null => &[],
        other => std::slice::from_ref(other),
    };

    if records.is_empty() {
        return format!(
            "No {} records found in {}.",
            resource.name, resource.namespace
        );
    }

    let mut lines = vec![format!(
        "Found {} {}(s) in {}:",
        records.len(),
        resource.name,
        resource.namespace
    )];
    for record in records {
        lines.push(match record {
            Value::Object(fields) => format!("- {}", summary_line(fields)),
            other => format!("- {}", format_value(other)),
        });
    }
    lines.join("\n")
}

fn render_record(action: &str, resource: &ResourceDescriptor, id: Option<&str>, result: &Value) -> String {
    match result {
        Value::Object(record) => format!(
            "{} {} {}:\n{}",
            action,
            resource.name,
            record_id(result, id),
            field_lines(record)
        ),
        other => format!(
            "{} {} {}: {}",
            action,
            resource.name,
            record_id(result, id),
            format_value(other)
        ),
    }
}

/// `id=1, email=a@b.c, username=alice`
fn summary_line(record: &Map<String, Value>) -> String {
    let mut parts = Vec::new();
    if let Some(id) = record.get("id") {
        parts.push(format!("id={}", format_value(id)));
    }
    for (key, value) in sorted_fields(record) {
        parts.push(format!("{}={}", key, format_value(value)));
    }
    parts.join(", ")
}

fn field_lines(record: &Map<String, Value>) -> String {
    sorted_fields(record)
        .into_iter()
        .map(|(key, value)| format!("  {}: {}", key, format_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn sorted_fields(record: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut fields: Vec<_> = record.iter().filter(|(key, _)| key.as_str() != "id").collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));
    fields
}

fn record_id(result: &Value, fallback: Option<&str>) -> String {
    match result.get("id") {
        Some(id) => format_value(id),
        None => fallback.unwrap_or("?").to_string(),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
