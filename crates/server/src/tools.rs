// Hand-written tools served next to the discovered ones

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use toolbridge_core::{ActionRequest, MemoryResource, ResourceHandler, Verb};
use toolbridge_mcp::discovery::FieldType;
use toolbridge_mcp::schema::{InputSchema, SchemaProperty, ToolDescriptor};
use toolbridge_mcp::{CustomTool, ToolFailure};

const PERIODS: [&str; 4] = ["day", "week", "month", "year"];

/// Built-in tools for a catalog backed by `users`
pub fn builtin(users: Arc<MemoryResource>) -> Vec<Arc<dyn CustomTool>> {
    vec![
        Arc::new(SystemHealthTool {
            users: users.clone(),
        }),
        Arc::new(UserStatisticsTool { users }),
    ]
}

/// `system_health`: report whether the service and its store respond
pub struct SystemHealthTool {
    users: Arc<MemoryResource>,
}

#[async_trait::async_trait]
impl CustomTool for SystemHealthTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "system_health".to_string(),
            description: "Check system health status".to_string(),
            input_schema: InputSchema {
                properties: vec![SchemaProperty::new(
                    "include_database",
                    FieldType::Boolean,
                    "Also check the user store (default true)",
                )],
            },
        }
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<String, ToolFailure> {
        let include_database = arguments
            .get("include_database")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        if !include_database {
            return Ok("System is healthy".to_string());
        }

        list_users(&self.users, "system_health").await?;
        Ok("System is healthy (Database connection verified)".to_string())
    }
}

/// `user_statistics`: user counts for a reporting period
pub struct UserStatisticsTool {
    users: Arc<MemoryResource>,
}

#[async_trait::async_trait]
impl CustomTool for UserStatisticsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "user_statistics".to_string(),
            description: "Get user statistics".to_string(),
            input_schema: InputSchema {
                properties: vec![SchemaProperty::new(
                    "period",
                    FieldType::Enum,
                    "Reporting period (default month)",
                )
                .with_allowed_values(PERIODS)],
            },
        }
    }

    async fn call(&self, arguments: Map<String, Value>) -> Result<String, ToolFailure> {
        let period = arguments
            .get("period")
            .and_then(Value::as_str)
            .unwrap_or("month");
        let since = Utc::now() - period_length(period);

        let users = list_users(&self.users, "user_statistics").await?;
        let active = users
            .iter()
            .filter(|user| user.get("is_active") == Some(&Value::Bool(true)))
            .count();
        let joined = users
            .iter()
            .filter_map(|user| user.get("created_at").and_then(Value::as_str))
            .filter_map(|created| DateTime::parse_from_rfc3339(created).ok())
            .filter(|created| *created >= since)
            .count();

        Ok(format!(
            "User statistics for {}: Total users: {}, active: {}, joined this {}: {}",
            period,
            users.len(),
            active,
            period,
            joined
        ))
    }
}

fn period_length(period: &str) -> Duration {
    match period {
        "day" => Duration::days(1),
        "week" => Duration::weeks(1),
        "year" => Duration::days(365),
        _ => Duration::days(30),
    }
}

async fn list_users(users: &MemoryResource, tool: &str) -> Result<Vec<Value>, ToolFailure> {
    let listed = users
        .execute(ActionRequest::new(Verb::List))
        .await
        .map_err(|error| ToolFailure::from_execution(tool, &InputSchema::default(), error))?;
    match listed {
        Value::Array(records) => Ok(records),
        other => Err(ToolFailure::Internal {
            tool: tool.to_string(),
            detail: format!("expected a list of users, got {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolbridge_core::users;

    fn users() -> Arc<MemoryResource> {
        Arc::new(users::seeded_user_resource().unwrap())
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_system_health() {
        let tool = SystemHealthTool { users: users() };
        assert_eq!(
            tool.call(Map::new()).await.unwrap(),
            "System is healthy (Database connection verified)"
        );
        assert_eq!(
            tool.call(args(json!({"include_database": false}))).await.unwrap(),
            "System is healthy"
        );
    }

    #[tokio::test]
    async fn test_user_statistics() {
        let users = users();
        let mut deactivate = ActionRequest::new(Verb::Custom("deactivate".to_string()));
        deactivate.id = Some("2".to_string());
        users.execute(deactivate).await.unwrap();

        let tool = UserStatisticsTool { users };
        assert_eq!(
            tool.call(Map::new()).await.unwrap(),
            "User statistics for month: Total users: 3, active: 2, joined this month: 3"
        );
        let weekly = tool.call(args(json!({"period": "week"}))).await.unwrap();
        assert!(weekly.starts_with("User statistics for week: Total users: 3"));
    }

    #[test]
    fn test_period_schema() {
        let tool = UserStatisticsTool { users: users() };
        let schema = tool.descriptor().input_schema.to_json();
        assert_eq!(
            schema["properties"]["period"]["enum"],
            json!(["day", "week", "month", "year"])
        );
        assert_eq!(schema["required"], json!([]));
    }
}
