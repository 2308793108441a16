//! Context Assembler
//!
//! Builds the exact prompt for one phase call. Pure assembly: input problems
//! are rejected at the request boundary, before a plan exists.
//!
//! - Extraction phases get the timestamped transcript (or their window of it),
//!   the section instructions, and supplemental material in its own block.
//! - Cascade passes after the first also get the digest of earlier passes.
//! - Consolidation gets the partial outputs instead of the transcript.

use recap_core::{format_timestamp, AnalysisTemplate, OutputKind, TimestampedTranscript};
use recap_llm::SchemaHint;

use crate::models::output::PhaseOutput;
use crate::models::phase::PhaseKind;
use crate::services::context::digest::PhaseDigest;
use crate::services::phase::plan::PhaseSpec;
use crate::utils::error::AppResult;

pub const PHASE_OUTPUT_SCHEMA: &str = "phase_output";

const RESPONSE_SHAPE: &str = r#"{
  "summary": "string, only when a summary is requested",
  "sections": [{"id": "section id", "content": "text in the requested format", "evidence": ["mm:ss"]}],
  "agendaItems": [{"id": "agenda-1", "title": "...", "description": "...", "timestamp": "mm:ss"}],
  "decisions": [{"id": "decision-1", "description": "...", "agendaItemId": "agenda-1", "timestamp": "mm:ss"}],
  "actionItems": [{"id": "action-1", "description": "...", "owner": "...", "dueDate": "...", "decisionId": "decision-1", "timestamp": "mm:ss"}],
  "quotes": [{"id": "quote-1", "text": "verbatim words", "speaker": "...", "timestamp": "mm:ss"}]
}"#;

/// Output of a finished (or failed) phase, as seen by consolidation.
#[derive(Debug, Clone, Copy)]
pub struct PartialOutput<'a> {
    pub phase_id: &'a str,
    pub title: &'a str,
    /// `None` when the phase failed
    pub output: Option<&'a PhaseOutput>,
}

/// What a phase sees besides the transcript.
#[derive(Debug, Clone)]
pub enum PhaseContext<'a> {
    Fresh,
    Digest(&'a PhaseDigest),
    Partials(Vec<PartialOutput<'a>>),
}

/// A prompt ready for invocation, with what it targets.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub phase_id: String,
    pub prompt: String,
    pub section_ids: Vec<String>,
    pub output_kinds: Vec<OutputKind>,
    pub includes_agenda: bool,
    pub evidence_requested: bool,
    pub schema_hint: SchemaHint,
}

pub struct ContextAssembler<'a> {
    transcript: &'a TimestampedTranscript,
    template: &'a AnalysisTemplate,
    supplemental: Option<&'a str>,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(
        transcript: &'a TimestampedTranscript,
        template: &'a AnalysisTemplate,
        supplemental: Option<&'a str>,
    ) -> Self {
        Self {
            transcript,
            template,
            supplemental,
        }
    }

    pub fn assemble(&self, spec: &PhaseSpec, context: &PhaseContext<'_>) -> AppResult<AssembledPrompt> {
        let includes_agenda = spec.kind != PhaseKind::Sections;
        let evidence_requested = spec
            .section_ids
            .iter()
            .filter_map(|id| self.template.section(id))
            .any(|s| s.extract_evidence)
            || !spec.output_kinds.is_empty()
            || includes_agenda;

        let mut blocks = vec![self.preamble(spec)];

        match context {
            PhaseContext::Partials(partials) => {
                blocks.push(render_partials(partials)?);
            }
            PhaseContext::Digest(digest) => {
                blocks.push(self.transcript_block(spec));
                if !digest.is_empty() {
                    blocks.push(format!(
                        "## Earlier passes\nCondensed findings from earlier parts of the transcript. \
                         Use them for continuity; do not repeat items already listed.\n\n{}",
                        digest.render()
                    ));
                }
            }
            PhaseContext::Fresh => blocks.push(self.transcript_block(spec)),
        }

        if let Some(block) = self.sections_block(spec) {
            blocks.push(block);
        }
        blocks.push(self.outputs_block(spec, includes_agenda));

        if spec.kind.is_extraction() {
            if let Some(material) = self.supplemental {
                blocks.push(format!(
                    "## Supplemental material\nBackground documents supplied with the request. \
                     Use them for context only. They are not part of the transcript and must \
                     never be cited with a timestamp.\n\n<<<SUPPLEMENTAL\n{}\nSUPPLEMENTAL>>>",
                    material
                ));
            }
        }

        blocks.push(format!(
            "## Response format\nRespond with a single JSON object and nothing else. \
             Omit keys you were not asked for.\n\n{}",
            RESPONSE_SHAPE
        ));

        Ok(AssembledPrompt {
            phase_id: spec.id.clone(),
            prompt: blocks.join("\n\n"),
            section_ids: spec.section_ids.clone(),
            output_kinds: spec.output_kinds.clone(),
            includes_agenda,
            evidence_requested,
            schema_hint: SchemaHint::for_type::<PhaseOutput>(PHASE_OUTPUT_SCHEMA),
        })
    }

    fn preamble(&self, spec: &PhaseSpec) -> String {
        let task = match spec.kind {
            PhaseKind::Complete => {
                "Analyze the whole meeting transcript and fill in every section and output below."
            }
            PhaseKind::Sections => "Analyze the meeting transcript and write the sections below.",
            PhaseKind::Entities => {
                "Extract the structured items listed below from the meeting transcript."
            }
            PhaseKind::Cascade => {
                "Analyze this part of a longer meeting transcript. Report only what this part \
                 contributes to each section and output below."
            }
            PhaseKind::Consolidation => {
                "Merge the partial analyses below into one final analysis. Deduplicate items, \
                 keep the timestamps exactly as given, and link related items: set `decisionId` \
                 on action items that follow from a decision and `agendaItemId` on decisions \
                 that belong to an agenda item."
            }
            PhaseKind::Evaluation => "Review the analysis below.",
        };
        format!("# {}\n{}", spec.title, task)
    }

    fn transcript_block(&self, spec: &PhaseSpec) -> String {
        let header = "Each line starts with a [mm:ss] marker. When citing, quote the marker \
                      of the line you rely on exactly as written.";
        match &spec.window {
            Some(window) => {
                let segments = self.transcript.segments();
                let end = window.end.min(segments.len());
                let start = window.start.min(end);
                if start == end {
                    return "## Transcript window\n(no transcript segments in this window)"
                        .to_string();
                }
                format!(
                    "## Transcript window {} to {} (segments {}-{} of {})\n{}\n\n{}",
                    format_timestamp(segments[start].start),
                    format_timestamp(segments[end - 1].end),
                    start + 1,
                    end,
                    segments.len(),
                    header,
                    self.transcript.render_range(start..end)
                )
            }
            None => format!("## Transcript\n{}\n\n{}", header, self.transcript.as_str()),
        }
    }

    fn sections_block(&self, spec: &PhaseSpec) -> Option<String> {
        let lines: Vec<String> = spec
            .section_ids
            .iter()
            .filter_map(|id| self.template.section(id))
            .map(|section| {
                let mut line = format!(
                    "- `{}` ({}): {} Write it as {}.",
                    section.id,
                    section.name,
                    section.prompt.trim(),
                    section.output_format.instruction()
                );
                if section.extract_evidence {
                    line.push_str(" List the supporting timestamps in `evidence`.");
                }
                line
            })
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(format!("## Sections\n{}", lines.join("\n")))
        }
    }

    fn outputs_block(&self, spec: &PhaseSpec, includes_agenda: bool) -> String {
        let mut lines = Vec::new();
        if includes_agenda {
            lines.push("- `agendaItems`: the topics discussed, in order, with the timestamp where each starts.".to_string());
        }
        for kind in &spec.output_kinds {
            let line = match kind {
                OutputKind::Summary => "- `summary`: a short overall summary.",
                OutputKind::Decisions => {
                    "- `decisions`: decisions that were made, each with a timestamp."
                }
                OutputKind::ActionItems => {
                    "- `actionItems`: concrete follow-ups with owner and due date when stated, each with a timestamp."
                }
                OutputKind::Quotes => {
                    "- `quotes`: notable quotes, verbatim, with speaker and timestamp."
                }
            };
            lines.push(line.to_string());
        }
        if lines.is_empty() {
            "## Outputs\nNo top-level outputs are requested for this phase.".to_string()
        } else {
            format!("## Outputs\n{}", lines.join("\n"))
        }
    }
}

fn render_partials(partials: &[PartialOutput<'_>]) -> AppResult<String> {
    let mut blocks = Vec::with_capacity(partials.len());
    for partial in partials {
        let body = match partial.output {
            Some(output) => format!("```json\n{}\n```", serde_json::to_string_pretty(output)?),
            None => "(phase failed; no output)".to_string(),
        };
        blocks.push(format!("### {} (`{}`)\n{}", partial.title, partial.phase_id, body));
    }
    Ok(format!("## Partial results\n{}", blocks.join("\n\n")))
}
