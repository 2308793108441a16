//! Phase Models
//!
//! Per-phase execution state and the attempt log kept for every model call.

use serde::{Deserialize, Serialize};

use recap_llm::{ModelError, ModelErrorKind};

/// What a phase produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// Everything in one call (basic)
    Complete,
    /// Section content only (hybrid)
    Sections,
    /// Agenda items, decisions, action items and quotes (hybrid)
    Entities,
    /// One transcript window, all sections and entities (advanced)
    Cascade,
    /// Merge of all partial outputs
    Consolidation,
    /// Optional quality review after consolidation
    Evaluation,
}

impl PhaseKind {
    /// Phases that read the transcript.
    pub fn is_extraction(&self) -> bool {
        matches!(
            self,
            PhaseKind::Complete | PhaseKind::Sections | PhaseKind::Entities | PhaseKind::Cascade
        )
    }
}

/// Phase lifecycle.
///
/// `pending -> in_flight -> succeeded | failed_retryable | failed_fatal`;
/// `failed_retryable` goes back to `in_flight` for the next attempt or ends in
/// `failed_fatal` once attempts run out. Any non-terminal state may become
/// `cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Pending,
    InFlight,
    Succeeded,
    FailedRetryable,
    FailedFatal,
    Cancelled,
}

impl PhaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PhaseState::Succeeded | PhaseState::FailedFatal | PhaseState::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: PhaseState) -> bool {
        use PhaseState::*;
        match (self, next) {
            (Pending, InFlight) => true,
            (InFlight, Succeeded) | (InFlight, FailedRetryable) | (InFlight, FailedFatal) => true,
            (FailedRetryable, InFlight) | (FailedRetryable, FailedFatal) => true,
            (current, Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for PhaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PhaseState::Pending => "pending",
            PhaseState::InFlight => "in_flight",
            PhaseState::Succeeded => "succeeded",
            PhaseState::FailedRetryable => "failed_retryable",
            PhaseState::FailedFatal => "failed_fatal",
            PhaseState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

/// Record of a single model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAttempt {
    /// 1-based attempt number
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ModelErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
    pub started_at: String,
}

impl CallAttempt {
    pub fn success(attempt: u32, duration_ms: u64, started_at: impl Into<String>) -> Self {
        Self {
            attempt,
            outcome: AttemptOutcome::Succeeded,
            error_kind: None,
            message: None,
            duration_ms,
            started_at: started_at.into(),
        }
    }

    pub fn failure(
        attempt: u32,
        outcome: AttemptOutcome,
        error: &ModelError,
        duration_ms: u64,
        started_at: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            outcome,
            error_kind: Some(error.kind),
            message: Some(error.message.clone()),
            duration_ms,
            started_at: started_at.into(),
        }
    }

    pub fn cancelled(attempt: u32, duration_ms: u64, started_at: impl Into<String>) -> Self {
        Self {
            attempt,
            outcome: AttemptOutcome::Cancelled,
            error_kind: None,
            message: None,
            duration_ms,
            started_at: started_at.into(),
        }
    }
}

/// Execution record of one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseRecord {
    pub id: String,
    pub title: String,
    pub kind: PhaseKind,
    pub state: PhaseState,
    #[serde(default)]
    pub attempts: Vec<CallAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ModelError>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl PhaseRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: PhaseKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            state: PhaseState::Pending,
            attempts: Vec::new(),
            error: None,
            duration_ms: 0,
        }
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: PhaseState) -> Result<(), String> {
        if !self.state.can_transition_to(next) {
            return Err(format!(
                "phase '{}' cannot move from {} to {}",
                self.id, self.state, next
            ));
        }
        self.state = next;
        Ok(())
    }

    pub fn record_attempt(&mut self, attempt: CallAttempt) {
        self.duration_ms += attempt.duration_ms;
        self.attempts.push(attempt);
    }

    /// Number of model calls actually issued for this phase.
    pub fn calls(&self) -> u32 {
        self.attempts.len() as u32
    }
}
