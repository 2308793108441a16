//! Progress Event Types
//!
//! Events emitted while an analysis runs. Shared between the orchestrator,
//! which produces them, and any front end consuming the progress stream.

use serde::{Deserialize, Serialize};

/// What a progress event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventKind {
    PhaseStarted,
    PhaseCompleted,
    PhaseFailed,
    Evaluating,
    Finished,
    Cancelled,
}

/// `(completedUnits, totalUnits, message)` plus the phase it concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisProgress {
    pub completed_units: u32,
    pub total_units: u32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    pub kind: ProgressEventKind,
}

impl AnalysisProgress {
    pub fn new(
        kind: ProgressEventKind,
        completed_units: u32,
        total_units: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            completed_units,
            total_units,
            message: message.into(),
            phase_id: None,
            kind,
        }
    }

    pub fn with_phase(mut self, phase_id: impl Into<String>) -> Self {
        self.phase_id = Some(phase_id.into());
        self
    }

    /// Completion as a fraction in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total_units == 0 {
            return 0.0;
        }
        (self.completed_units as f64 / self.total_units as f64).clamp(0.0, 1.0)
    }
}
