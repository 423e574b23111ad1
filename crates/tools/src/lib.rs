//! Built-in tool implementations for agentflow.
//!
//! Tools are plain [`Tool`](agentflow_core::Tool) implementations; callers
//! register the ones they want into an agent. [`default_registry`] bundles
//! everything shipped here.

pub mod calculator;

use std::sync::Arc;

use agentflow_core::tool::ToolRegistry;

pub use calculator::CalculatorTool;

/// Create a registry holding every built-in tool.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.insert(Arc::new(CalculatorTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_calculator() {
        let registry = default_registry();
        assert_eq!(registry.names(), vec!["calculator"]);
    }
}
