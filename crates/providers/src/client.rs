//! Completion client: the single entry point agents use to talk to a model.
//!
//! Wraps one [`Provider`] with:
//! - bounded retries with exponential backoff for transient failures
//! - cumulative request and token counters, bumped only on success
//! - a pull-based [`CompletionStream`] for incremental output

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use agentflow_config::{ApiDialect, LlmConfig};
use agentflow_core::error::ProviderError;
use agentflow_core::message::Message;
use agentflow_core::provider::{ChunkReceiver, DEFAULT_TEMPERATURE, Provider, ProviderRequest, Usage};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::{self, OpenAiCompatProvider};

/// How often and how patiently to retry transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failure; doubled after each subsequent one
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before retrying after failed attempt number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Sampling parameters for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }
}

/// A successful non-streaming completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    /// The endpoint's decoded response body
    pub raw: serde_json::Value,
    pub usage: Option<Usage>,
    pub model: String,
}

/// Snapshot of a client's cumulative counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientStats {
    pub request_count: u64,
    pub total_tokens: u64,
    pub model: String,
    pub provider: String,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    tokens: AtomicU64,
}

impl Counters {
    fn record(&self, usage: Option<&Usage>) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if let Some(usage) = usage {
            self.tokens.fetch_add(u64::from(usage.total_tokens), Ordering::Relaxed);
        }
    }
}

/// Model client with retries and usage accounting.
///
/// Cheap to share: wrap in an `Arc` and hand the same client to every agent
/// that should count against the same totals.
pub struct CompletionClient {
    provider: Arc<dyn Provider>,
    model: String,
    retry: RetryPolicy,
    counters: Arc<Counters>,
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            retry: RetryPolicy::default(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the dialect provider and retry policy described by `config`.
    pub fn from_config(config: &LlmConfig) -> Self {
        let retry = RetryPolicy::new(config.max_retries, Duration::from_millis(config.retry_backoff_ms));
        Self::new(build_provider(config), config.model.clone()).with_retry(retry)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn request(&self, messages: &[Message], params: &GenerationParams, stream: bool) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream,
        }
    }

    /// Send `messages` and wait for the whole response.
    pub async fn complete(&self, messages: &[Message], params: &GenerationParams) -> Result<Completion, ProviderError> {
        let request = self.request(messages, params, false);
        let response = self
            .with_retries("complete", || self.provider.complete(request.clone()))
            .await?;

        self.counters.record(response.usage.as_ref());
        debug!(
            provider = %self.provider.name(),
            model = %response.model,
            tokens = response.usage.map(|u| u.total_tokens).unwrap_or(0),
            "Completion received"
        );

        Ok(Completion {
            content: response.content,
            raw: response.raw,
            usage: response.usage,
            model: response.model,
        })
    }

    /// Open a streaming completion. Retries cover opening the stream only;
    /// an error after the first chunk ends the stream.
    pub async fn stream(&self, messages: &[Message], params: &GenerationParams) -> Result<CompletionStream, ProviderError> {
        let request = self.request(messages, params, true);
        let rx = self
            .with_retries("stream", || self.provider.stream(request.clone()))
            .await?;

        Ok(CompletionStream {
            rx,
            counters: Arc::clone(&self.counters),
            usage: None,
            finished: false,
        })
    }

    async fn with_retries<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                    let delay = match &e {
                        ProviderError::RateLimited { retry_after_secs } => {
                            self.retry.delay_for(attempt).max(Duration::from_secs(*retry_after_secs))
                        }
                        _ => self.retry.delay_for(attempt),
                    };
                    warn!(
                        provider = %self.provider.name(),
                        operation,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient model failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        provider = %self.provider.name(),
                        operation,
                        attempts = attempt + 1,
                        error = %e,
                        "Model call failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            request_count: self.counters.requests.load(Ordering::Relaxed),
            total_tokens: self.counters.tokens.load(Ordering::Relaxed),
            model: self.model.clone(),
            provider: self.provider.name().to_string(),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.requests.store(0, Ordering::Relaxed);
        self.counters.tokens.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Build the provider for the configured wire dialect.
pub fn build_provider(config: &LlmConfig) -> Arc<dyn Provider> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let api_key = config.api_key.clone().unwrap_or_default();

    match config.dialect {
        ApiDialect::OpenAi => {
            let base_url = config.api_url.as_deref().unwrap_or(openai_compat::DEFAULT_BASE_URL);
            Arc::new(OpenAiCompatProvider::new("openai", base_url, api_key).with_timeout(timeout))
        }
        ApiDialect::Claude => {
            let mut provider = AnthropicProvider::new(api_key).with_timeout(timeout);
            if let Some(url) = &config.api_url {
                provider = provider.with_base_url(url.as_str());
            }
            Arc::new(provider)
        }
    }
}

/// A lazy, finite, single-pass sequence of text chunks.
///
/// Ends after the transport's end-of-stream marker or the first error.
pub struct CompletionStream {
    rx: ChunkReceiver,
    counters: Arc<Counters>,
    usage: Option<Usage>,
    finished: bool,
}

impl CompletionStream {
    /// Next non-empty text chunk, `None` once the stream has ended.
    pub async fn next_chunk(&mut self) -> Option<Result<String, ProviderError>> {
        if self.finished {
            return None;
        }

        while let Some(item) = self.rx.recv().await {
            match item {
                Ok(chunk) => {
                    if chunk.usage.is_some() {
                        self.usage = chunk.usage;
                    }
                    let text = chunk.content.filter(|c| !c.is_empty());
                    if chunk.done {
                        self.finished = true;
                        self.counters.record(self.usage.as_ref());
                        return text.map(Ok);
                    }
                    if let Some(text) = text {
                        return Some(Ok(text));
                    }
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }

        self.finished = true;
        Some(Err(ProviderError::StreamInterrupted(
            "stream closed before the end-of-stream marker".into(),
        )))
    }

    /// Drain the stream into one string.
    pub async fn collect_text(mut self) -> Result<String, ProviderError> {
        let mut text = String::new();
        while let Some(chunk) = self.next_chunk().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }

    /// Usage reported so far, if the endpoint sent any.
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }
}
