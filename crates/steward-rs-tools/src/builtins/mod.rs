//! Built-in tools bundled with Steward.

mod clock;
mod memory;
mod utils;
mod weather;

use crate::ToolRegistry;
use log::info;
use std::sync::Arc;

pub use clock::GetCurrentTimeTool;
pub use memory::{GetUserMemoryTool, SearchMemoryTool, UpdateUserMemoryTool};
pub use weather::GetWeatherTool;

/// Register all built-in tools with the provided registry.
pub fn register_builtin_tools(registry: &ToolRegistry) {
    registry.register(Arc::new(GetCurrentTimeTool));
    registry.register(Arc::new(GetWeatherTool));
    registry.register(Arc::new(GetUserMemoryTool));
    registry.register(Arc::new(UpdateUserMemoryTool));
    registry.register(Arc::new(SearchMemoryTool));
    info!("registered built-in tools (count={})", registry.len());
}

/// Build a registry pre-populated with built-in tools.
pub fn builtin_tool_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    register_builtin_tools(&registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::builtin_tool_registry;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_registry_exposes_all_tools() {
        let registry = builtin_tool_registry();
        assert_eq!(
            registry.list(),
            vec![
                "get_current_time",
                "get_user_memory",
                "get_weather",
                "search_memory",
                "update_user_memory",
            ]
        );
        let update = registry.get("update_user_memory").expect("tool");
        assert!(!update.supports_parallel());
        let search = registry.get("search_memory").expect("tool");
        assert!(search.supports_parallel());
        for spec in registry.specs() {
            assert_eq!(spec.parameters["type"], "object", "schema for {}", spec.name);
        }
    }
}
