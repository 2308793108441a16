//! LLM Provider Trait
//!
//! Defines the model-invocation interface the orchestrator depends on.

use async_trait::async_trait;

use super::types::{LlmError, LlmResult, SchemaHint};

/// Trait that all LLM providers must implement.
///
/// Provides a unified interface for:
/// - Single prompt completions against a named deployment (invoke)
/// - Pre-flight validation (health_check)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Send one prompt to a deployment and return the response text.
    ///
    /// # Arguments
    /// * `deployment_id` - Deployment chosen by the router
    /// * `prompt` - Fully assembled prompt
    /// * `schema_hint` - Expected JSON shape of the response, if any
    async fn invoke(
        &self,
        deployment_id: &str,
        prompt: &str,
        schema_hint: Option<&SchemaHint>,
    ) -> LlmResult<String>;

    /// Check that the provider is usable before any spend.
    ///
    /// Default: always healthy.
    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        408 => LlmError::Timeout {
            message: format!("{}: request timeout", provider),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 | 413 if body.contains("context_length_exceeded") => {
            LlmError::ContextLengthExceeded {
                message: body.to_string(),
                max_tokens: None,
            }
        }
        400 if body.contains("content_filter") || body.contains("content_policy") => {
            LlmError::ContentFiltered {
                message: body.to_string(),
            }
        }
        400 | 422 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        503 => LlmError::ProviderUnavailable {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
