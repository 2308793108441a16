//! Core Error Types
//!
//! Input-shape errors raised by the transcript and template models. Everything
//! here is detected before any model call, so the analyzer maps all of it to a
//! validation failure.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Empty, unordered, or badly timed segments
    #[error("Invalid transcript: {0}")]
    Transcript(String),

    /// A template that cannot drive an analysis
    #[error("Invalid template: {0}")]
    Template(String),

    /// Any other request field
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn transcript(msg: impl Into<String>) -> Self {
        Self::Transcript(msg.into())
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// The message without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            CoreError::Transcript(msg) | CoreError::Template(msg) | CoreError::Validation(msg) => {
                msg
            }
        }
    }
}
