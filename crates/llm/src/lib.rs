//! Recap LLM
//!
//! The model-invocation side of the analyzer:
//! - `LlmProvider`, the prompt-in / text-out interface the orchestrator calls
//! - `LlmError`, classified as transient, fatal, or configuration
//! - `DeploymentCatalog`, the list of deployments and their context windows
//! - `OpenAIProvider`, an OpenAI-compatible HTTP implementation
//!
//! Also includes the HTTP client factory.

pub mod catalog;
pub mod http_client;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export main types
pub use catalog::{DeploymentCatalog, DeploymentProfile, StaticDeploymentCatalog};
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::{missing_api_key_error, parse_http_error, LlmProvider};
pub use types::*;
