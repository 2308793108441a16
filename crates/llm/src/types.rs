//! LLM Types
//!
//! Provider configuration, the error taxonomy shared by every provider, and the
//! schema hint passed alongside prompts that expect structured output.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configuration for an LLM provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Deployment id -> model name. Unmapped deployments use their id as the model name.
    #[serde(default)]
    pub deployments: HashMap<String, String>,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Client-level request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Proxy URL (`http://`, `https://` or `socks5://`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            deployments: HashMap::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: None,
            proxy_url: None,
        }
    }
}

impl ProviderConfig {
    /// Model name for a deployment id.
    pub fn model_for<'a>(&'a self, deployment_id: &'a str) -> &'a str {
        self.deployments
            .get(deployment_id)
            .map(String::as_str)
            .unwrap_or(deployment_id)
    }
}

/// JSON schema the response is expected to follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaHint {
    /// Schema name (`[a-zA-Z0-9_-]`, as required by `response_format`)
    pub name: String,
    pub schema: serde_json::Value,
}

impl SchemaHint {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Derive the hint from a type's `JsonSchema` implementation.
    pub fn for_type<T: JsonSchema>(name: impl Into<String>) -> Self {
        Self::new(name, schemars::schema_for!(T).to_value())
    }
}

/// Whether a model failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelErrorKind {
    Transient,
    Fatal,
}

impl std::fmt::Display for ModelErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelErrorKind::Transient => write!(f, "transient"),
            ModelErrorKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Serializable record of a model failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelError {
    pub kind: ModelErrorKind,
    pub message: String,
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} model error: {}", self.kind, self.message)
    }
}

impl From<&LlmError> for ModelError {
    fn from(err: &LlmError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Error types for LLM operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed (invalid API key)
    AuthenticationFailed { message: String },
    /// Rate limit exceeded
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },
    /// Model or deployment not found
    ModelNotFound { model: String },
    /// Invalid request (bad parameters)
    InvalidRequest { message: String },
    /// Response withheld by the provider's content policy
    ContentFiltered { message: String },
    /// Server error from the provider
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Network/connection error
    NetworkError { message: String },
    /// The call did not finish in time
    Timeout { message: String },
    /// Response parsing error
    ParseError { message: String },
    /// Provider temporarily not available
    ProviderUnavailable { message: String },
    /// Context length exceeded
    ContextLengthExceeded {
        message: String,
        max_tokens: Option<u32>,
    },
    /// Other error
    Other { message: String },
}

impl LlmError {
    /// Transient errors are retried; everything else fails the call at once.
    pub fn kind(&self) -> ModelErrorKind {
        match self {
            LlmError::RateLimited { .. }
            | LlmError::ServerError { .. }
            | LlmError::NetworkError { .. }
            | LlmError::Timeout { .. }
            | LlmError::ParseError { .. }
            | LlmError::ProviderUnavailable { .. } => ModelErrorKind::Transient,
            LlmError::AuthenticationFailed { .. }
            | LlmError::ModelNotFound { .. }
            | LlmError::InvalidRequest { .. }
            | LlmError::ContentFiltered { .. }
            | LlmError::ContextLengthExceeded { .. }
            | LlmError::Other { .. } => ModelErrorKind::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ModelErrorKind::Transient
    }

    /// The collaborator itself is misconfigured (bad key, unknown model).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LlmError::AuthenticationFailed { .. } | LlmError::ModelNotFound { .. }
        )
    }

    /// Server-provided retry delay, in seconds.
    pub fn retry_after(&self) -> Option<u32> {
        match self {
            LlmError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        LlmError::Timeout {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        LlmError::ParseError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message, .. } => {
                write!(f, "Rate limited: {}", message)
            }
            LlmError::ModelNotFound { model } => {
                write!(f, "Model not found: {}", model)
            }
            LlmError::InvalidRequest { message } => {
                write!(f, "Invalid request: {}", message)
            }
            LlmError::ContentFiltered { message } => {
                write!(f, "Content filtered: {}", message)
            }
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            LlmError::Timeout { message } => {
                write!(f, "Timed out: {}", message)
            }
            LlmError::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            LlmError::ProviderUnavailable { message } => {
                write!(f, "Provider unavailable: {}", message)
            }
            LlmError::ContextLengthExceeded { message, .. } => {
                write!(f, "Context length exceeded: {}", message)
            }
            LlmError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
