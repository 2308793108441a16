//! Recap Core
//!
//! Domain foundation for the Recap transcript analyzer: error types, the token
//! estimator, the transcript and template models, and progress event types.
//! This crate has no dependency on model providers or the orchestrator.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `tokens` - Token estimation (`estimate_tokens`)
//! - `transcript` - Segments, timestamp rendering and windowing (`TimestampedTranscript`)
//! - `template` - Template sections and requested outputs (`AnalysisTemplate`)
//! - `progress` - Progress events (`AnalysisProgress`, `ProgressEventKind`)
//!
//! ## Design Principles
//!
//! 1. **Only serde/thiserror** - keeps build times minimal
//! 2. **Pure data and pure functions** - everything here is testable without a runtime
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod progress;
pub mod template;
pub mod tokens;
pub mod transcript;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Token Estimation ───────────────────────────────────────────────────
pub use tokens::{estimate_tokens, estimate_tokens_all};

// ── Transcript ─────────────────────────────────────────────────────────
pub use transcript::{
    format_timestamp, parse_timestamp, TimestampedTranscript, Transcript, TranscriptSegment,
};

// ── Template ───────────────────────────────────────────────────────────
pub use template::{AnalysisTemplate, OutputFormat, OutputKind, TemplateSection};

// ── Progress ───────────────────────────────────────────────────────────
pub use progress::{AnalysisProgress, ProgressEventKind};
