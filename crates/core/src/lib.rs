//! # agentflow Core
//!
//! Domain types, traits, and error definitions for the agentflow agent
//! framework. Every other crate depends inward on this one.
//!
//! - [`Provider`] is the seam to language-model endpoints.
//! - [`Tool`] and [`ToolRegistry`] are the seam to agent capabilities.
//! - [`AgentConfig`] describes one agent's identity and behaviour.

pub mod agent;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, HISTORY_WINDOW, ReasoningStyle, TaskContext};
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{Message, Role};
pub use provider::{ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
pub use tool::{
    ParamSpec, ParamType, ParameterSchema, Tool, ToolArguments, ToolDescriptor, ToolInvocation, ToolRegistry,
    ToolResult,
};
