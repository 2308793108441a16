//! Request Model
//!
//! The request boundary contract. `validate` runs before any model call.

use serde::{Deserialize, Serialize};

use recap_core::{AnalysisTemplate, CoreError, Transcript};

use super::strategy::AnalysisStrategy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub transcript_id: String,
    pub template_id: String,
    pub transcript: Transcript,
    pub template: AnalysisTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<AnalysisStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_evaluation: Option<bool>,
    /// Free text from uploaded documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplemental_material: Option<String>,
}

impl AnalysisRequest {
    pub fn new(
        transcript_id: impl Into<String>,
        template_id: impl Into<String>,
        transcript: Transcript,
        template: AnalysisTemplate,
    ) -> Self {
        Self {
            transcript_id: transcript_id.into(),
            template_id: template_id.into(),
            transcript,
            template,
            strategy: None,
            run_evaluation: None,
            supplemental_material: None,
        }
    }

    pub fn with_strategy(mut self, strategy: AnalysisStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_evaluation(mut self, run: bool) -> Self {
        self.run_evaluation = Some(run);
        self
    }

    pub fn with_supplemental_material(mut self, material: impl Into<String>) -> Self {
        self.supplemental_material = Some(material.into());
        self
    }

    /// Supplemental material, if any non-blank text was supplied.
    pub fn supplemental(&self) -> Option<&str> {
        self.supplemental_material
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.transcript_id.trim().is_empty() {
            return Err(CoreError::validation("transcriptId is required"));
        }
        if self.template_id.trim().is_empty() {
            return Err(CoreError::validation("templateId is required"));
        }
        self.transcript.validate()?;
        self.template.validate()?;
        Ok(())
    }
}
