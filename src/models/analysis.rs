//! Analysis Models
//!
//! The final artifact handed to the caller and the pieces it is built from.
//! All types serialize to camelCase JSON.

use serde::{Deserialize, Serialize};

use recap_core::OutputFormat;

use super::output::CompletedPhaseOutput;
use super::phase::PhaseRecord;
use super::strategy::ExecutionStrategy;

// ============================================================================
// Deployment
// ============================================================================

/// Deployment chosen for a request. `estimated_tokens <= token_limit` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentChoice {
    pub deployment_id: String,
    pub token_limit: u64,
    pub estimated_tokens: u64,
    /// `estimated / limit * 100`
    pub utilization_percentage: f64,
    pub is_extended_context: bool,
}

// ============================================================================
// Results
// ============================================================================

/// A timestamp quoted by the model, resolved against the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// As quoted, e.g. `12:05`
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_index: Option<u32>,
    /// Whether the time falls inside a known segment
    pub verified: bool,
}

impl Citation {
    pub fn unverified(timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            seconds: None,
            segment_index: None,
            verified: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResult {
    pub id: String,
    pub name: String,
    pub output_format: OutputFormat,
    pub content: String,
    #[serde(default)]
    pub evidence: Vec<Citation>,
    /// No phase produced content for this section
    #[serde(default)]
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agenda_item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
}

/// Merged, cross-linked report content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub sections: Vec<SectionResult>,
    #[serde(default)]
    pub agenda_items: Vec<AgendaItem>,
    #[serde(default)]
    pub decisions: Vec<Decision>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub quotes: Vec<Quote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationship_warnings: Vec<String>,
}

// ============================================================================
// Evaluation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    NotRequested,
    Completed,
    Revised,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub status: EvaluationStatus,
    /// Clamped to `[0, 1]`
    pub quality_score: f64,
    #[serde(default)]
    pub issues: Vec<String>,
    pub revised: bool,
}

impl EvaluationReport {
    pub fn new(quality_score: f64, issues: Vec<String>, revised: bool) -> Self {
        let quality_score = if quality_score.is_finite() {
            quality_score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            status: if revised {
                EvaluationStatus::Revised
            } else {
                EvaluationStatus::Completed
            },
            quality_score,
            issues,
            revised,
        }
    }
}

// ============================================================================
// Metadata & Artifact
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub was_auto_selected: bool,
    pub estimated_tokens: u64,
    pub deployment: DeploymentChoice,
    pub total_phases: u32,
    /// Every model invocation, retries and evaluation included
    pub model_calls: u32,
    pub phases: Vec<PhaseRecord>,
    #[serde(default)]
    pub failed_phases: Vec<String>,
    pub evaluation_status: EvaluationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_error: Option<String>,
    /// Some phase failed and was replaced by a placeholder
    pub is_partial: bool,
    pub started_at: String,
    pub completed_at: String,
    pub duration_ms: u64,
}

/// The final artifact of one analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: String,
    pub transcript_id: String,
    pub template_id: String,
    pub analysis_strategy: ExecutionStrategy,
    /// Pre-evaluation results, only when the evaluation revised them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_results: Option<AnalysisResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationReport>,
    pub results: AnalysisResults,
    pub metadata: AnalysisMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Completed,
    Cancelled,
}

/// What a cancelled request had finished before it stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledAnalysis {
    pub status: AnalysisStatus,
    pub transcript_id: String,
    pub template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_strategy: Option<ExecutionStrategy>,
    pub phases: Vec<PhaseRecord>,
    pub completed_outputs: Vec<CompletedPhaseOutput>,
    /// Consolidated results, if consolidation finished before cancellation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<AnalysisResults>,
}

impl CancelledAnalysis {
    pub fn new(transcript_id: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            status: AnalysisStatus::Cancelled,
            transcript_id: transcript_id.into(),
            template_id: template_id.into(),
            analysis_strategy: None,
            phases: Vec::new(),
            completed_outputs: Vec::new(),
            results: None,
        }
    }

    pub fn completed_phases(&self) -> usize {
        self.completed_outputs.len()
    }
}
