// Demo `users` resource: the user account model with its custom actions

use crate::memory::MemoryResource;
use crate::types::{CustomAction, FieldKind, FieldSpec, Record};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

pub const NAMESPACE: &str = "users";
pub const RESOURCE: &str = "user";

/// Build the user resource with no records
pub fn user_resource() -> MemoryResource {
    MemoryResource::new(NAMESPACE, RESOURCE)
        .with_field(
            FieldSpec::text("username", Some(150))
                .required()
                .unique()
                .with_help_text("Unique username"),
        )
        .with_field(
            FieldSpec::email("email", Some(254))
                .required()
                .with_help_text("User's email address"),
        )
        .with_field(FieldSpec::text("first_name", Some(150)))
        .with_field(FieldSpec::text("last_name", Some(150)))
        .with_field(FieldSpec::text("bio", Some(500)))
        .with_field(FieldSpec::new("birth_date", FieldKind::Date).with_help_text("Birth date (YYYY-MM-DD)"))
        .with_field(
            FieldSpec::text("password", Some(128))
                .required()
                .write_only(),
        )
        .with_field(FieldSpec::new("is_active", FieldKind::Boolean).with_default(json!(true)))
        .with_field(FieldSpec::new("created_at", FieldKind::DateTime).read_only())
        .with_field(FieldSpec::new("updated_at", FieldKind::DateTime).read_only())
        .with_computed_field(
            FieldSpec::text("full_name", None).with_help_text("First and last name"),
            full_name,
        )
        .with_stored_form("password", hash_password)
        .with_list_fields([
            "username",
            "email",
            "first_name",
            "last_name",
            "full_name",
            "created_at",
            "is_active",
        ])
        .with_timestamps()
        .with_collection_action(
            CustomAction::collection("active").with_description("Get only active users"),
            |record| record.get("is_active") == Some(&Value::Bool(true)),
        )
        .with_detail_action(
            CustomAction::detail("activate").with_description("Activate a user"),
            |record, _| set_active(record, true),
        )
        .with_detail_action(
            CustomAction::detail("deactivate").with_description("Deactivate a user"),
            |record, _| set_active(record, false),
        )
}

fn full_name(record: &Record) -> Value {
    let part = |key: &str| record.get(key).and_then(Value::as_str).unwrap_or("");
    json!(format!("{} {}", part("first_name"), part("last_name")).trim().to_string())
}

/// Stored form of a password: an unsalted SHA-256 digest, never the plaintext.
/// Not a password KDF; the demo store has no login path.
pub fn hash_password(password: &Value) -> Value {
    let digest = Sha256::digest(password.as_str().unwrap_or_default().as_bytes());
    json!(format!("sha256${}", hex::encode(digest)))
}

fn set_active(record: &mut Record, active: bool) -> Result<(), crate::error::ExecutionError> {
    record.insert("is_active".to_string(), Value::Bool(active));
    Ok(())
}

/// Build the user resource with a few sample accounts
pub fn seeded_user_resource() -> Result<MemoryResource, crate::error::ExecutionError> {
    let resource = user_resource();
    for (username, first, last) in [
        ("alice", "Alice", "Liddell"),
        ("bob", "Bob", "Marley"),
        ("carol", "Carol", "Danvers"),
    ] {
        let mut payload = Record::new();
        payload.insert("username".to_string(), json!(username));
        payload.insert("email".to_string(), json!(format!("{}@example.com", username)));
        payload.insert("first_name".to_string(), json!(first));
        payload.insert("last_name".to_string(), json!(last));
        payload.insert("password".to_string(), json!(format!("{}-secret", username)));
        resource.seed(payload)?;
    }
    tracing::info!("Seeded {} sample users", resource.len());
    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ResourceHandler;
    use crate::types::{ActionRequest, Capability, Verb};

    #[test]
    fn test_user_metadata() {
        let metadata = user_resource().metadata().unwrap();
        assert_eq!(metadata.namespace, "users");
        assert_eq!(metadata.name, "user");
        // five standard actions plus active/activate/deactivate
        assert_eq!(metadata.capabilities.len(), 8);
        assert!(metadata.capabilities.contains(&Capability::Update));

        let required: Vec<_> = metadata
            .fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name.as_str())
            .collect();
        assert_eq!(required, vec!["username", "email", "password"]);
    }

    #[tokio::test]
    async fn test_seeded_users_hide_password() {
        let users = seeded_user_resource().unwrap();
        let carol = users
            .execute(ActionRequest::new(Verb::Retrieve).with_id("3"))
            .await
            .unwrap();
        assert_eq!(carol["username"], json!("carol"));
        assert_eq!(carol["is_active"], json!(true));
        assert!(carol.get("password").is_none());
        assert!(carol.get("created_at").is_some());
    }

    #[tokio::test]
    async fn test_full_name_and_list_view() {
        let users = seeded_user_resource().unwrap();
        let carol = users
            .execute(ActionRequest::new(Verb::Retrieve).with_id("3"))
            .await
            .unwrap();
        assert_eq!(carol["full_name"], json!("Carol Danvers"));
        assert!(carol.get("updated_at").is_some());

        let listed = users.execute(ActionRequest::new(Verb::List)).await.unwrap();
        let alice = &listed[0];
        assert_eq!(alice["full_name"], json!("Alice Liddell"));
        assert!(alice.get("updated_at").is_none());
        assert!(alice.get("created_at").is_some());
        assert!(alice.get("password").is_none());

        let metadata = users.metadata().unwrap();
        let full_name = metadata.fields.iter().find(|f| f.name == "full_name").unwrap();
        assert!(full_name.read_only);
    }

    #[test]
    fn test_password_digest() {
        let hashed = hash_password(&json!("alice-secret"));
        let hashed = hashed.as_str().unwrap();
        assert!(hashed.starts_with("sha256$"));
        assert_eq!(hashed.len(), "sha256$".len() + 64);
        assert!(!hashed.contains("alice-secret"));
        assert_eq!(json!(hashed), hash_password(&json!("alice-secret")));
    }

    #[tokio::test]
    async fn test_deactivate_then_list_active() {
        let users = seeded_user_resource().unwrap();
        users
            .execute(ActionRequest::new(Verb::Custom("deactivate".to_string())).with_id("1"))
            .await
            .unwrap();

        let active = users
            .execute(ActionRequest::new(Verb::Custom("active".to_string())))
            .await
            .unwrap();
        let names: Vec<_> = active
            .as_array()
            .unwrap()
            .iter()
            .map(|user| user["username"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["bob", "carol"]);
    }
}
