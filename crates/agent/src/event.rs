//! Agent-level streaming events.
//!
//! `AgentEvent` is what the incremental mode emits at each step of the
//! reasoning loop. Serialized form is `{"type": "...", ...}` with the type
//! names below:
//! - `iteration`      model call number N is starting
//! - `thought_start`  streamed model text begins
//! - `thought_chunk`  partial text from the model
//! - `thought_end`    streamed model text is complete
//! - `thought`        the `thought` field of a structured response
//! - `tool_call`      a tool is being invoked
//! - `tool_result`    the tool's result
//! - `final_answer`, `response`, `error`, `max_iterations`  terminal events

use agentflow_core::tool::{ToolArguments, ToolResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Iteration { iteration: usize, max_iterations: usize },

    ThoughtStart,

    ThoughtChunk { content: String },

    ThoughtEnd,

    Thought { content: String },

    ToolCall { tool: String, arguments: ToolArguments },

    ToolResult { tool: String, result: ToolResult },

    /// The model gave a structured final answer.
    FinalAnswer { content: String },

    /// The model answered in plain text.
    Response { content: String },

    /// The model call failed; the run is over.
    Error { content: String },

    /// The iteration cap was hit.
    MaxIterations { content: String },
}

impl AgentEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Iteration { .. } => "iteration",
            Self::ThoughtStart => "thought_start",
            Self::ThoughtChunk { .. } => "thought_chunk",
            Self::ThoughtEnd => "thought_end",
            Self::Thought { .. } => "thought",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::FinalAnswer { .. } => "final_answer",
            Self::Response { .. } => "response",
            Self::Error { .. } => "error",
            Self::MaxIterations { .. } => "max_iterations",
        }
    }

    /// Whether this event ends the run.
    pub fn is_terminal(&self) -> bool {
        self.terminal_content().is_some()
    }

    /// Text carried by a terminal event.
    pub fn terminal_content(&self) -> Option<&str> {
        match self {
            Self::FinalAnswer { content }
            | Self::Response { content }
            | Self::Error { content }
            | Self::MaxIterations { content } => Some(content),
            _ => None,
        }
    }
}
