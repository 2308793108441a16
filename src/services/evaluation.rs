//! Self-Evaluation Pass
//!
//! One extra model call that scores the merged results and may return a
//! revision. The reviewer sees the draft and the template, not the transcript.
//! Failure here never fails the analysis: the draft stands and the error is
//! recorded in metadata. Bad credentials or an unknown model still abort.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use recap_core::AnalysisTemplate;
use recap_llm::{LlmProvider, SchemaHint};

use crate::models::analysis::{AnalysisResults, EvaluationReport};
use crate::models::output::PhaseOutput;
use crate::models::phase::{PhaseKind, PhaseRecord};
use crate::services::linker::RelationshipLinker;
use crate::services::merge::{assemble_results, results_to_output};
use crate::services::phase::parsing::parse_json_response;
use crate::services::phase::retry::{CallOutcome, RetryPolicy};
use crate::utils::error::{AppError, AppResult};

pub const EVALUATION_PHASE_ID: &str = "evaluation";

/// What the reviewer answers with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationResponse {
    /// 0 (unusable) to 1 (complete and accurate)
    #[serde(alias = "quality_score", alias = "score")]
    pub quality_score: f64,
    pub issues: Vec<String>,
    /// Corrected analysis; omitted when no change is needed
    #[serde(alias = "revised_results", alias = "revision")]
    pub revised_results: Option<PhaseOutput>,
}

#[derive(Debug)]
pub enum EvaluationOutcome {
    Completed {
        report: EvaluationReport,
        /// Final results when the reviewer changed something
        revision: Option<AnalysisResults>,
        record: PhaseRecord,
    },
    Failed {
        error: String,
        record: PhaseRecord,
    },
    Cancelled {
        record: PhaseRecord,
    },
}

impl EvaluationOutcome {
    pub fn record(&self) -> &PhaseRecord {
        match self {
            EvaluationOutcome::Completed { record, .. }
            | EvaluationOutcome::Failed { record, .. }
            | EvaluationOutcome::Cancelled { record } => record,
        }
    }
}

pub struct SelfEvaluator {
    provider: Arc<dyn LlmProvider>,
    deployment_id: String,
    policy: RetryPolicy,
}

impl SelfEvaluator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        deployment_id: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            deployment_id: deployment_id.into(),
            policy,
        }
    }

    pub async fn evaluate(
        &self,
        draft: &AnalysisResults,
        template: &AnalysisTemplate,
        linker: &RelationshipLinker<'_>,
        cancel: &CancellationToken,
    ) -> AppResult<EvaluationOutcome> {
        let prompt = build_prompt(draft, template)?;
        let hint = SchemaHint::for_type::<EvaluationResponse>("evaluation_response");
        let mut record = PhaseRecord::new(EVALUATION_PHASE_ID, "Quality review", PhaseKind::Evaluation);

        let outcome = self
            .policy
            .run(&mut record, cancel, || {
                let provider = self.provider.clone();
                let deployment_id = self.deployment_id.clone();
                let prompt = prompt.clone();
                let hint = hint.clone();
                async move {
                    let text = provider.invoke(&deployment_id, &prompt, Some(&hint)).await?;
                    parse_json_response::<EvaluationResponse>(EVALUATION_PHASE_ID, &text)
                }
            })
            .await;

        let response = match outcome {
            CallOutcome::Succeeded(response) => response,
            CallOutcome::Failed(error) if error.is_configuration() => {
                warn!("Self-evaluation hit a configuration error, aborting: {}", error);
                return Err(AppError::configuration(error.to_string()));
            }
            CallOutcome::Failed(error) => {
                warn!("Self-evaluation failed, keeping the draft: {}", error);
                return Ok(EvaluationOutcome::Failed {
                    error: error.to_string(),
                    record,
                });
            }
            CallOutcome::Cancelled => return Ok(EvaluationOutcome::Cancelled { record }),
        };

        let revision = response.revised_results.as_ref().and_then(|raw| {
            let mut revised = assemble_results(raw, template);
            linker.link(&mut revised);
            (revised != *draft).then_some(revised)
        });

        let report = EvaluationReport::new(
            response.quality_score,
            response.issues,
            revision.is_some(),
        );
        info!(
            "Self-evaluation scored {:.2} with {} issue(s){}",
            report.quality_score,
            report.issues.len(),
            if report.revised { ", revision applied" } else { "" }
        );

        Ok(EvaluationOutcome::Completed {
            report,
            revision,
            record,
        })
    }
}

fn build_prompt(draft: &AnalysisResults, template: &AnalysisTemplate) -> AppResult<String> {
    let sections = template
        .sections
        .iter()
        .map(|s| {
            format!(
                "- `{}` ({}): {} Format: {}.",
                s.id,
                s.name,
                s.prompt.trim(),
                s.output_format.instruction()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let outputs = template
        .requested_outputs()
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let draft_json = serde_json::to_string_pretty(&results_to_output(draft))?;

    Ok(format!(
        "# Quality review\n\
         Review this meeting analysis against its template. Check that every section \
         answers its instruction in the requested format, that items are not duplicated, \
         and that action items and decisions reference the right parent.\n\n\
         ## Template sections\n{}\n\n\
         ## Requested outputs\n{}\n\n\
         ## Analysis\n```json\n{}\n```\n\n\
         ## Response format\n\
         Respond with a single JSON object: {{\"qualityScore\": 0.0-1.0, \"issues\": [\"...\"], \
         \"revisedResults\": <same shape as the analysis>}}. Include `revisedResults` only if \
         you changed something; keep ids and timestamps you did not change.",
        sections,
        if outputs.is_empty() { "(none)".to_string() } else { outputs },
        draft_json
    ))
}
