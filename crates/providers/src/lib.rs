//! Completion client and LLM wire dialects for agentflow.
//!
//! Both dialects implement the `agentflow_core::Provider` trait;
//! [`CompletionClient`] wraps whichever one the configuration selects and
//! adds retries, usage counters and the streaming handle.

pub mod anthropic;
pub mod client;
mod http;
pub mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use client::{
    ClientStats, Completion, CompletionClient, CompletionStream, GenerationParams, RetryPolicy, build_provider,
};
pub use openai_compat::OpenAiCompatProvider;
