//! Shared test helpers for agent tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use agentflow_core::error::{ProviderError, ToolError};
use agentflow_core::message::Message;
use agentflow_core::provider::{ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
use agentflow_core::tool::{ParamType, ParameterSchema, Tool, ToolArguments, ToolResult};
use agentflow_providers::{CompletionClient, RetryPolicy};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A mock provider that replays scripted responses and records every
/// request it receives.
///
/// Once the script runs out the `fallback` response is repeated; without a
/// fallback, extra calls panic.
pub struct SequentialMockProvider {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback: Option<String>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(responses: &[&str]) -> Self {
        Self::new(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    /// Return the same text on every call.
    pub fn repeating(text: &str) -> Self {
        Self {
            fallback: Some(text.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Messages sent on call number `index` (0-based).
    pub fn messages_of(&self, index: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[index].messages.clone()
    }

    fn next(&self, request: ProviderRequest) -> Result<String, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        match self.responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => match &self.fallback {
                Some(text) => Ok(text.clone()),
                None => panic!("SequentialMockProvider: no response scripted for call #{call}"),
            },
        }
    }
}

fn usage() -> Usage {
    Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let content = self.next(request)?;
        Ok(ProviderResponse {
            content,
            usage: Some(usage()),
            model: "mock-model".into(),
            raw: serde_json::Value::Null,
        })
    }

    /// Streams the scripted text in small pieces.
    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let content = self.next(request)?;
        let chars: Vec<char> = content.chars().collect();
        let (tx, rx) = mpsc::channel(chars.len() / 4 + 2);
        for piece in chars.chunks(4) {
            let _ = tx
                .send(Ok(StreamChunk {
                    content: Some(piece.iter().collect()),
                    ..StreamChunk::default()
                }))
                .await;
        }
        let _ = tx
            .send(Ok(StreamChunk {
                content: None,
                done: true,
                usage: Some(usage()),
            }))
            .await;
        Ok(rx)
    }
}

/// Client over `provider` that never retries.
pub fn mock_client(provider: Arc<SequentialMockProvider>) -> Arc<CompletionClient> {
    Arc::new(CompletionClient::new(provider, "mock-model").with_retry(RetryPolicy::none()))
}

/// A tool that panics on every call.
pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "explode"
    }

    fn description(&self) -> &str {
        "Always panics"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
    }

    async fn execute(&self, _arguments: ToolArguments) -> Result<ToolResult, ToolError> {
        panic!("kaboom");
    }
}

/// A tool that always returns an error.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "fail"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new().optional("reason", ParamType::String, "Why")
    }

    async fn execute(&self, _arguments: ToolArguments) -> Result<ToolResult, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "fail".into(),
            reason: "disk on fire".into(),
        })
    }
}
