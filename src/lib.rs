//! Recap Analyzer
//!
//! Multi-strategy transcript analysis orchestrator. Takes a timestamped
//! transcript and an analysis template and produces a cross-linked report
//! (sections, agenda items, decisions, action items, quotes) through one,
//! three, or a cascade of model calls.
//!
//! It includes:
//! - Data models for requests, phases and the final `Analysis`
//! - Services: strategy selection, deployment routing, context assembly,
//!   phase execution, relationship linking, self-evaluation, orchestration
//! - File-backed configuration storage
//! - Error types and path utilities

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

// ── Models ─────────────────────────────────────────────────────────────
pub use models::{
    Analysis, AnalysisMetadata, AnalysisRequest, AnalysisResults, AnalysisStrategy,
    AnalyzerConfig, CancelledAnalysis, EvaluationStatus, ExecutionStrategy, PhaseState,
};

// ── Services ───────────────────────────────────────────────────────────
pub use services::{AnalysisOrchestrator, ProgressReporter};

// ── Storage & Errors ───────────────────────────────────────────────────
pub use storage::ConfigStore;
pub use utils::error::{AppError, AppResult};

// ── Workspace crates ───────────────────────────────────────────────────
pub use recap_core::{AnalysisProgress, AnalysisTemplate, ProgressEventKind, Transcript};
pub use recap_llm::{DeploymentCatalog, LlmProvider, OpenAIProvider, StaticDeploymentCatalog};
