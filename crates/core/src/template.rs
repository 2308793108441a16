//! Analysis Template
//!
//! A template is an ordered, non-empty list of sections plus the set of
//! top-level outputs the report should carry.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// How a section's content should be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    BulletPoints,
    Paragraph,
    Table,
}

impl OutputFormat {
    /// Writing instruction for prompts.
    pub fn instruction(&self) -> &'static str {
        match self {
            OutputFormat::BulletPoints => "a list of concise bullet points",
            OutputFormat::Paragraph => "one or two prose paragraphs",
            OutputFormat::Table => "a markdown table with a header row",
        }
    }
}

/// Optional top-level outputs a template may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Summary,
    ActionItems,
    Decisions,
    Quotes,
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::Summary => "summary",
            OutputKind::ActionItems => "action_items",
            OutputKind::Decisions => "decisions",
            OutputKind::Quotes => "quotes",
        }
    }

    pub fn all() -> &'static [OutputKind] {
        &[
            OutputKind::Summary,
            OutputKind::ActionItems,
            OutputKind::Decisions,
            OutputKind::Quotes,
        ]
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of analysis work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSection {
    pub id: String,
    pub name: String,
    /// Instruction for the model
    pub prompt: String,
    #[serde(default)]
    pub extract_evidence: bool,
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Sections plus requested outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisTemplate {
    #[serde(default)]
    pub sections: Vec<TemplateSection>,
    #[serde(default)]
    pub outputs: Vec<OutputKind>,
}

impl AnalysisTemplate {
    /// Reject templates that cannot drive an analysis.
    pub fn validate(&self) -> CoreResult<()> {
        if self.sections.is_empty() {
            return Err(CoreError::template("template has no sections"));
        }

        let mut seen = HashSet::new();
        for (position, section) in self.sections.iter().enumerate() {
            if section.id.trim().is_empty() {
                return Err(CoreError::template(format!(
                    "template section #{} is missing an id",
                    position + 1
                )));
            }
            if section.name.trim().is_empty() {
                return Err(CoreError::template(format!(
                    "template section '{}' is missing a name",
                    section.id
                )));
            }
            if section.prompt.trim().is_empty() {
                return Err(CoreError::template(format!(
                    "template section '{}' is missing a prompt",
                    section.id
                )));
            }
            if !seen.insert(section.id.as_str()) {
                return Err(CoreError::template(format!(
                    "duplicate template section id '{}'",
                    section.id
                )));
            }
        }

        Ok(())
    }

    pub fn requests(&self, kind: OutputKind) -> bool {
        self.outputs.contains(&kind)
    }

    /// Requested outputs, deduplicated, in canonical order.
    pub fn requested_outputs(&self) -> Vec<OutputKind> {
        OutputKind::all()
            .iter()
            .copied()
            .filter(|kind| self.requests(*kind))
            .collect()
    }

    pub fn section(&self, id: &str) -> Option<&TemplateSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn section_ids(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.id.clone()).collect()
    }
}
