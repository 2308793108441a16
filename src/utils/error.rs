//! Error Handling
//!
//! Unified error types for the analyzer.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use recap_core::CoreError;
use recap_llm::{LlmError, ModelError};

use crate::models::CancelledAnalysis;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad input shape, raised before any model call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invocation collaborator unreachable or misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transcript exceeds every deployment's usable context
    #[error("Context too large: estimated {estimated_tokens} tokens, largest deployment limit is {largest_limit}")]
    ContextTooLarge {
        estimated_tokens: u64,
        largest_limit: u64,
    },

    /// The final consolidation phase failed; no artifact is produced
    #[error("Consolidation phase '{phase_id}' failed: {error}")]
    ConsolidationFailed { phase_id: String, error: ModelError },

    /// Caller cancelled the request
    #[error("Analysis cancelled after {} completed phase(s)", .0.completed_phases())]
    Cancelled(Box<CancelledAnalysis>),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn cancelled(partial: CancelledAnalysis) -> Self {
        Self::Cancelled(Box::new(partial))
    }

    /// Errors raised before any model spend.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::Configuration(_) | AppError::ContextTooLarge { .. }
        )
    }
}

/// Transcript and template problems are all request validation failures.
impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Collaborator failures outside a phase (catalog, health check).
impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Convert AppError to a string suitable for CLI and API responses
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_llm::ModelErrorKind;

    #[test]
    fn test_error_display() {
        let err = AppError::validation("transcript has no segments");
        assert_eq!(err.to_string(), "Validation error: transcript has no segments");
    }

    #[test]
    fn test_error_conversion() {
        let err = AppError::configuration("no deployments");
        let msg: String = err.into();
        assert!(msg.contains("Configuration error"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_context_too_large_display() {
        let err = AppError::ContextTooLarge {
            estimated_tokens: 500_000,
            largest_limit: 400_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("500000"));
        assert!(msg.contains("400000"));
        assert!(err.is_preflight());
    }

    #[test]
    fn test_core_validation_maps_to_validation() {
        let err: AppError = CoreError::template("template has no sections").into();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("no sections")));
    }

    #[test]
    fn test_llm_error_maps_to_configuration() {
        let err: AppError = recap_llm::missing_api_key_error("openai").into();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_consolidation_failed_display() {
        let err = AppError::ConsolidationFailed {
            phase_id: "consolidation".into(),
            error: ModelError {
                kind: ModelErrorKind::Fatal,
                message: "Invalid request: too long".into(),
            },
        };
        assert!(err.to_string().contains("consolidation"));
        assert!(!err.is_preflight());
    }

    #[test]
    fn test_cancelled_display() {
        let err = AppError::cancelled(CancelledAnalysis::new("t", "tpl"));
        assert_eq!(err.to_string(), "Analysis cancelled after 0 completed phase(s)");
    }
}
