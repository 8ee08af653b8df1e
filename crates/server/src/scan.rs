// `--scan`: report what discovery found without serving

use std::collections::BTreeMap;
use toolbridge_mcp::ToolRegistry;

/// Human-readable summary of every discovered resource and its tools
pub fn report(registry: &ToolRegistry) -> String {
    let mut resources: BTreeMap<(&str, &str), Vec<(&str, &str)>> = BTreeMap::new();
    let mut custom = Vec::new();
    for tool in registry.iter() {
        let entry = (tool.descriptor.name.as_str(), tool.descriptor.description.as_str());
        match tool.resource() {
            Some(resource) => resources
                .entry((resource.namespace.as_str(), resource.name.as_str()))
                .or_default()
                .push(entry),
            None => custom.push(entry),
        }
    }

    let mut lines = vec![format!("Discovered {} resource(s):", resources.len())];
    for ((namespace, name), tools) in &resources {
        lines.push(format!("  {}.{}", namespace, name));
        for (tool, description) in tools {
            lines.push(format!("    {} - {}", tool, description));
        }
    }
    if !custom.is_empty() {
        lines.push(format!("Custom tools ({}):", custom.len()));
        for (tool, description) in custom {
            lines.push(format!("    {} - {}", tool, description));
        }
    }
    lines.push(format!("Total tools: {}", registry.len()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppState, ServerConfig};

    #[test]
    fn test_report_lists_every_tool() {
        let state = AppState::new(&ServerConfig::default()).unwrap();
        let report = report(&state.mcp.registry());

        assert!(report.starts_with("Discovered 1 resource(s):\n  users.user\n"));
        assert!(report.contains("    retrieve_users_user - Retrieve user in users"));
        assert!(report.contains("    active_users_user - Active user in users: Get only active users"));
        assert!(report.contains(
            "Custom tools (2):\n    system_health - Check system health status\n    user_statistics - Get user statistics\n"
        ));
        assert!(report.ends_with("Total tools: 10"));
    }

    #[test]
    fn test_report_empty_registry() {
        let report = report(&ToolRegistry::new());
        assert_eq!(report, "Discovered 0 resource(s):\nTotal tools: 0");
    }
}
