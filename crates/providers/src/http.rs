//! HTTP plumbing shared by the wire dialects: client construction, status
//! mapping, and the SSE line pump that feeds a chunk channel.

use std::time::Duration;

use agentflow_core::error::ProviderError;
use agentflow_core::provider::{ChunkReceiver, StreamChunk};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Build a `reqwest` client with a per-request timeout.
pub(crate) fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Send `request` and map non-success statuses onto [`ProviderError`].
pub(crate) async fn send(provider: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status().as_u16();

    match status {
        200..=299 => Ok(response),
        429 => {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(5);
            Err(ProviderError::RateLimited { retry_after_secs })
        }
        401 | 403 => Err(ProviderError::AuthenticationFailed(format!(
            "{provider} rejected the API key (status {status})"
        ))),
        404 => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::ModelNotFound(body))
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            warn!(provider, status, body = %body, "Provider returned error");
            Err(ProviderError::ApiError {
                status_code: status,
                message: body,
            })
        }
    }
}

/// Splits a byte stream into SSE lines.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));
    }

    /// Next complete line without its terminator.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        let end = self.buffer.find('\n')?;
        let line = self.buffer[..end].trim_end_matches('\r').to_string();
        self.buffer.drain(..=end);
        Some(line)
    }
}

/// Payload of an SSE `data:` line, if `line` is one.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

/// Spawn a task that reads `response` as SSE and feeds every `data:`
/// payload through `on_data`. The stream ends after the first chunk with
/// `done` set or the first error. A transport that closes before the
/// end-of-stream marker yields `StreamInterrupted`.
pub(crate) fn spawn_sse_pump<F>(provider: String, response: reqwest::Response, on_data: F) -> ChunkReceiver
where
    F: FnMut(&str) -> Option<Result<StreamChunk, ProviderError>> + Send + 'static,
{
    spawn_line_pump(provider, response.bytes_stream(), on_data)
}

fn spawn_line_pump<S, B, E, F>(provider: String, mut bytes_stream: S, mut on_data: F) -> ChunkReceiver
where
    S: Stream<Item = Result<B, E>> + Unpin + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: FnMut(&str) -> Option<Result<StreamChunk, ProviderError>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(64);

    tokio::spawn(async move {
        let mut lines = LineBuffer::default();

        while let Some(next) = bytes_stream.next().await {
            let bytes = match next {
                Ok(b) => b,
                Err(e) => {
                    let _ = tx.send(Err(ProviderError::StreamInterrupted(e.to_string()))).await;
                    return;
                }
            };
            lines.push(bytes.as_ref());

            while let Some(line) = lines.next_line() {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let Some(data) = sse_data(&line) else {
                    trace!(provider = %provider, line = %line, "Skipping non-data SSE line");
                    continue;
                };
                let Some(item) = on_data(data) else {
                    continue;
                };
                let last = item.as_ref().map_or(true, |chunk| chunk.done);
                if tx.send(item).await.is_err() {
                    return; // receiver dropped
                }
                if last {
                    return;
                }
            }
        }

        warn!(provider = %provider, "Stream closed before the end-of-stream marker");
        let _ = tx
            .send(Err(ProviderError::StreamInterrupted(format!(
                "{provider} closed the stream before the end-of-stream marker"
            ))))
            .await;
    });

    rx
}
