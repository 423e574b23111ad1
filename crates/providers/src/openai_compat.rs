//! OpenAI-style wire dialect.
//!
//! Works with OpenAI, Ollama, vLLM, OpenRouter and any endpoint exposing
//! `/chat/completions`. The system prompt travels as a `system` role
//! message inside the single `messages` array.
//!
//! Supports:
//! - Chat completions (non-streaming)
//! - Streaming SSE terminated by `data: [DONE]`

use std::time::Duration;

use agentflow_core::error::ProviderError;
use agentflow_core::message::Message;
use agentflow_core::provider::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: http::build_client(Duration::from_secs(60)),
        }
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http::build_client(timeout);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    fn build_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": stream,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        body
    }

    fn parse_response(raw: serde_json::Value) -> Result<ProviderResponse, ProviderError> {
        let api_response: ApiResponse = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            model: api_response.model,
            raw,
        })
    }

    /// Interpret one SSE `data:` payload.
    fn parse_stream_data(data: &str) -> Option<StreamChunk> {
        if data == "[DONE]" {
            return Some(StreamChunk {
                done: true,
                ..StreamChunk::default()
            });
        }

        let parsed = match serde_json::from_str::<StreamResponse>(data) {
            Ok(parsed) => parsed,
            Err(e) => {
                trace!(data = %data, error = %e, "Ignoring unparseable SSE chunk");
                return None;
            }
        };

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|c| !c.is_empty());
        let usage = parsed.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        if content.is_none() && usage.is_none() {
            return None;
        }
        Some(StreamChunk {
            content,
            done: false,
            usage,
        })
    }

    fn post(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        self.client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError> {
        let body = Self::build_body(&request, false);
        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = http::send(&self.name, self.post(&body)).await?;
        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to decode response body: {e}")))?;

        Self::parse_response(raw)
    }

    async fn stream(&self, request: ProviderRequest) -> std::result::Result<ChunkReceiver, ProviderError> {
        let body = Self::build_body(&request, true);
        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = http::send(&self.name, self.post(&body).header("Accept", "text/event-stream")).await?;
        Ok(http::spawn_sse_pump(self.name.clone(), response, |data| {
            Self::parse_stream_data(data).map(Ok)
        }))
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest {
            model: "gpt-4".into(),
            messages,
            temperature: 0.7,
            max_tokens: None,
            stream: false,
        }
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new("custom", "http://proxy.local/v1/", "k");
        assert_eq!(provider.endpoint(), "http://proxy.local/v1/chat/completions");
    }

    #[test]
    fn system_prompt_stays_in_message_array() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let body = OpenAiCompatProvider::build_body(&request(messages), false);
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[1]["role"], "user");
        assert_eq!(body["stream"], false);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("system").is_none());
        assert!(body.get("stop").is_none());
    }

    #[test]
    fn streaming_body_requests_usage() {
        let mut req = request(vec![Message::user("hi")]);
        req.max_tokens = Some(256);
        let body = OpenAiCompatProvider::build_body(&req, true);
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["stream_options"]["include_usage"], true);
    }

    #[test]
    fn parse_complete_response_keeps_raw_body() {
        let raw = serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4-0613",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "4"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11}
        });
        let response = OpenAiCompatProvider::parse_response(raw.clone()).unwrap();
        assert_eq!(response.content, "4");
        assert_eq!(response.model, "gpt-4-0613");
        assert_eq!(response.usage.unwrap().total_tokens, 11);
        assert_eq!(response.raw, raw);
    }

    #[test]
    fn parse_response_without_choices_is_invalid() {
        let err = OpenAiCompatProvider::parse_response(serde_json::json!({"model": "x", "choices": []})).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
        assert!(!err.is_transient());
    }

    // --- SSE parsing tests ---

    #[test]
    fn parse_stream_content_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        let chunk = OpenAiCompatProvider::parse_stream_data(data).unwrap();
        assert_eq!(chunk.content.as_deref(), Some("Hello"));
        assert!(!chunk.done);
    }

    #[test]
    fn parse_stream_skips_empty_deltas_and_garbage() {
        assert!(OpenAiCompatProvider::parse_stream_data(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).is_none());
        assert!(OpenAiCompatProvider::parse_stream_data(r#"{"choices":[{"delta":{"content":""}}]}"#).is_none());
        assert!(OpenAiCompatProvider::parse_stream_data("not json").is_none());
    }

    #[test]
    fn parse_stream_usage() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        let chunk = OpenAiCompatProvider::parse_stream_data(data).unwrap();
        assert!(chunk.content.is_none());
        assert_eq!(chunk.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn parse_stream_done_marker() {
        let chunk = OpenAiCompatProvider::parse_stream_data("[DONE]").unwrap();
        assert!(chunk.done);
        assert!(chunk.content.is_none());
    }
}
