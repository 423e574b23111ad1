//! Agent configuration types.

use serde::{Deserialize, Serialize};

/// Caller-supplied context passed alongside a task.
pub type TaskContext = serde_json::Map<String, serde_json::Value>;

/// Number of history messages carried into a new task.
pub const HISTORY_WINDOW: usize = 10;

/// Identity and behaviour of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent name, also its key inside orchestrators
    #[serde(default = "default_name")]
    pub name: String,

    /// Role label shown in the system prompt
    #[serde(default = "default_role")]
    pub role: String,

    /// Extra instructions appended to the generated system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Carry conversation history across runs
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    /// Model calls allowed per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default)]
    pub reasoning: ReasoningStyle,
}

fn default_name() -> String {
    "Assistant".into()
}
fn default_role() -> String {
    "General Assistant".into()
}
fn default_true() -> bool {
    true
}
fn default_max_iterations() -> usize {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            role: default_role(),
            instructions: None,
            memory_enabled: true,
            max_iterations: default_max_iterations(),
            reasoning: ReasoningStyle::default(),
        }
    }
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            ..Self::default()
        }
    }
}

/// Which JSON vocabulary the system prompt teaches the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStyle {
    /// `thought` / `action` / `action_input` / `final_answer`
    #[default]
    Structured,
    /// Legacy `tool` / `parameters`, plain text for answers
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.name, "Assistant");
        assert!(config.memory_enabled);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.reasoning, ReasoningStyle::Structured);
    }

    #[test]
    fn config_deserializes_with_partial_fields() {
        let config: AgentConfig = serde_json::from_str(r#"{"name":"Calc","reasoning":"plain"}"#).unwrap();
        assert_eq!(config.name, "Calc");
        assert_eq!(config.role, "General Assistant");
        assert_eq!(config.reasoning, ReasoningStyle::Plain);
    }
}
