//! Append-only execution log kept by each agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    LlmResponse,
    ToolCall,
    ToolResult,
    ToolError,
    Error,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::LlmResponse => "llm_response",
            LogKind::ToolCall => "tool_call",
            LogKind::ToolResult => "tool_result",
            LogKind::ToolError => "tool_error",
            LogKind::Error => "error",
        }
    }
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged step of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: LogKind,
    pub payload: Value,
}

impl ExecutionLogEntry {
    pub fn new(kind: LogKind, payload: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            payload,
        }
    }
}
