//! Completion service client
//!
//! One trait for "send a conversation, get blocks back", the relay-backed
//! implementation, and a logging wrapper.

mod error;
mod relay;
mod types;

pub use error::TransportError;
pub use relay::RelayClient;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Stateless completion client. Each call is exactly one network round-trip;
/// implementations must not retry.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, TransportError>;
}

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for Arc<T> {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, TransportError> {
        (**self).complete(request).await
    }
}

/// Logging wrapper for completion clients
pub struct LoggingClient<C> {
    inner: C,
}

impl<C: CompletionClient> LoggingClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: CompletionClient> CompletionClient for LoggingClient<C> {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                let blocks: Vec<&str> = response.content.iter().map(ContentBlock::kind).collect();
                tracing::info!(
                    model = %request.model,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    tools = request.tools.len(),
                    stop_reason = response.stop_reason.as_str(),
                    blocks = ?blocks,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Completion request finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %request.model,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = e.kind.as_str(),
                    retryable = e.kind.is_retryable(),
                    "Completion request failed"
                );
            }
        }

        result
    }
}
