//! LLM provider abstraction
//!
//! Chat-completion calls for real generation. Keys travel with each call so
//! one service instance serves every run.

mod error;
mod openai;
mod types;

pub use error::LlmError;
pub use openai::OpenAIService;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Configuration for the completion endpoint
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of an `OpenAI`-compatible API (without `/v1/...`)
    pub base_url: Option<String>,
    /// LLM gateway URL; takes precedence over `base_url`
    pub gateway: Option<String>,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            gateway: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let timeout = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map_or(Duration::from_secs(60), Duration::from_secs);

        Self {
            base_url: std::env::var("OPENAI_BASE_URL").ok().filter(|s| !s.is_empty()),
            gateway: std::env::var("LLM_GATEWAY").ok().filter(|s| !s.is_empty()),
            timeout,
        }
    }

    /// Full chat-completions URL
    pub fn endpoint(&self) -> String {
        match (&self.gateway, &self.base_url) {
            (Some(gw), _) => format!("{}/openai/v1/chat/completions", gw.trim_end_matches('/')),
            (None, Some(base)) => format!("{}/v1/chat/completions", base.trim_end_matches('/')),
            (None, None) => DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request with the caller's key
    async fn complete(&self, request: &LlmRequest, api_key: &str) -> Result<LlmResponse, LlmError>;
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest, api_key: &str) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request, api_key).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %request.model,
                    duration_ms = %duration.as_millis(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %request.model,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "LLM request failed"
                );
            }
        }

        result
    }
}
