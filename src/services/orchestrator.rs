//! Analysis Orchestrator
//!
//! One request/response cycle: validate, route, select a strategy, plan,
//! execute, assemble, link, optionally self-evaluate, and build the artifact.
//! Validation, configuration and context-size problems are raised before any
//! model call.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use recap_core::{estimate_tokens_all, AnalysisTemplate, TimestampedTranscript};
use recap_llm::{DeploymentCatalog, LlmProvider, ModelError, ModelErrorKind};

use crate::models::analysis::{
    Analysis, AnalysisMetadata, AnalysisResults, AnalysisStatus, CancelledAnalysis,
    EvaluationReport, EvaluationStatus,
};
use crate::models::output::PhaseOutput;
use crate::models::phase::PhaseRecord;
use crate::models::request::AnalysisRequest;
use crate::models::settings::AnalyzerConfig;
use crate::models::strategy::ExecutionStrategy;
use crate::services::context::ContextAssembler;
use crate::services::deployment::DeploymentRouter;
use crate::services::evaluation::{EvaluationOutcome, SelfEvaluator};
use crate::services::linker::RelationshipLinker;
use crate::services::merge::assemble_results;
use crate::services::phase::{ExecutionOutcome, PhaseExecutor, PhasePlan, RetryPolicy};
use crate::services::progress::ProgressReporter;
use crate::services::strategy::StrategySelector;
use crate::utils::error::{AppError, AppResult};

pub struct AnalysisOrchestrator {
    provider: Arc<dyn LlmProvider>,
    catalog: Arc<dyn DeploymentCatalog>,
    config: AnalyzerConfig,
}

/// Result of the optional review step.
struct Review {
    draft_results: Option<AnalysisResults>,
    report: Option<EvaluationReport>,
    status: EvaluationStatus,
    error: Option<String>,
}

impl AnalysisOrchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        catalog: Arc<dyn DeploymentCatalog>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            provider,
            catalog,
            config,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Run one analysis.
    ///
    /// Progress goes to `progress`; firing `cancel` stops in-flight calls and
    /// returns `AppError::Cancelled` with whatever had completed.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> AppResult<Analysis> {
        let started = Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();

        // ── Pre-flight ─────────────────────────────────────────────────
        request.validate()?;
        self.config.validate().map_err(AppError::configuration)?;

        let profiles = self.catalog.list_deployments().await.map_err(|e| {
            AppError::configuration(format!("deployment catalog unavailable: {}", e))
        })?;
        let router = DeploymentRouter::new(profiles, self.config.context_safety_margin)?;

        if self.config.preflight_health_check {
            self.provider.health_check().await.map_err(|e| {
                AppError::configuration(format!(
                    "{} provider failed its health check: {}",
                    self.provider.name(),
                    e
                ))
            })?;
        }

        let template = &request.template;
        let supplemental = request.supplemental();
        let transcript = TimestampedTranscript::build(&request.transcript.segments);
        let transcript_tokens = transcript.estimated_tokens() as u64;
        let context_tokens = transcript_tokens
            + estimate_tokens_all(template.sections.iter().map(|s| s.prompt.as_str())) as u64
            + estimate_tokens_all(supplemental) as u64;

        let deployment = router.select(context_tokens)?;
        let decision = StrategySelector::new(self.config.strategy_thresholds.clone())
            .select(transcript_tokens, request.strategy);
        let strategy = decision.strategy;

        let plan = PhasePlan::build(
            strategy,
            template,
            &transcript,
            self.config.advanced_cascade_passes,
            self.config.cascade_digest,
        );
        info!(
            "Analysis of '{}' with template '{}': {} strategy, {} phases on '{}' ({})",
            request.transcript_id,
            request.template_id,
            strategy,
            plan.len(),
            deployment.deployment_id,
            decision.reasoning
        );
        progress.start(plan.len() as u32).await;

        // ── Phases ─────────────────────────────────────────────────────
        let policy = RetryPolicy::from_config(&self.config);
        let executor = PhaseExecutor::new(
            self.provider.clone(),
            deployment.deployment_id.clone(),
            policy.clone(),
            self.config.max_concurrency,
            self.config.max_digest_chars,
        );
        let assembler = ContextAssembler::new(&transcript, template, supplemental);
        let outcome = executor.execute(&plan, &assembler, progress, cancel).await?;

        let linker = RelationshipLinker::new(&transcript, self.config.link_min_keyword_overlap);
        let final_phase = plan
            .final_phase()
            .ok_or_else(|| AppError::internal("plan has no final phase"))?;
        let consolidated = outcome
            .outputs
            .get(&final_phase.id)
            .map(|output| self.finalize(output, template, &linker));

        if outcome.cancelled {
            progress.cancelled().await;
            return Err(self.cancelled(request, strategy, &outcome, Vec::new(), consolidated));
        }

        let Some(mut results) = consolidated else {
            let error = outcome
                .record(&final_phase.id)
                .and_then(|r| r.error.clone())
                .unwrap_or_else(|| ModelError {
                    kind: ModelErrorKind::Fatal,
                    message: "final phase produced no output".to_string(),
                });
            error!(
                "Final phase '{}' failed, no analysis produced: {}",
                final_phase.id, error
            );
            return Err(AppError::ConsolidationFailed {
                phase_id: final_phase.id.clone(),
                error,
            });
        };

        // ── Self-evaluation ────────────────────────────────────────────
        let mut extra_records: Vec<PhaseRecord> = Vec::new();
        let run_evaluation = request
            .run_evaluation
            .unwrap_or(self.config.run_evaluation_by_default);
        let review = if run_evaluation {
            progress.evaluating().await;
            let evaluator =
                SelfEvaluator::new(self.provider.clone(), deployment.deployment_id.clone(), policy);
            match evaluator.evaluate(&results, template, &linker, cancel).await? {
                EvaluationOutcome::Completed {
                    report,
                    revision,
                    record,
                } => {
                    extra_records.push(record);
                    let status = report.status;
                    let draft_results =
                        revision.map(|revised| std::mem::replace(&mut results, revised));
                    Review {
                        draft_results,
                        report: Some(report),
                        status,
                        error: None,
                    }
                }
                EvaluationOutcome::Failed { error, record } => {
                    extra_records.push(record);
                    Review {
                        draft_results: None,
                        report: None,
                        status: EvaluationStatus::Failed,
                        error: Some(error),
                    }
                }
                EvaluationOutcome::Cancelled { record } => {
                    progress.cancelled().await;
                    return Err(self.cancelled(
                        request,
                        strategy,
                        &outcome,
                        vec![record],
                        Some(results),
                    ));
                }
            }
        } else {
            Review {
                draft_results: None,
                report: None,
                status: EvaluationStatus::NotRequested,
                error: None,
            }
        };

        // ── Artifact ───────────────────────────────────────────────────
        let failed_phases = outcome.failed_phases();
        let is_partial = !failed_phases.is_empty();
        if is_partial {
            warn!(
                "Analysis is partial, failed phases: {}",
                failed_phases.join(", ")
            );
        }
        let model_calls =
            outcome.model_calls() + extra_records.iter().map(PhaseRecord::calls).sum::<u32>();
        let mut phases = outcome.records;
        phases.extend(extra_records);

        progress
            .finished(if is_partial {
                "Analysis finished with partial results"
            } else {
                "Analysis finished"
            })
            .await;

        let analysis = Analysis {
            id: uuid::Uuid::new_v4().to_string(),
            transcript_id: request.transcript_id.clone(),
            template_id: request.template_id.clone(),
            analysis_strategy: strategy,
            draft_results: review.draft_results,
            evaluation: review.report,
            results,
            metadata: AnalysisMetadata {
                was_auto_selected: decision.was_auto_selected,
                estimated_tokens: context_tokens,
                deployment,
                total_phases: plan.len() as u32,
                model_calls,
                phases,
                failed_phases,
                evaluation_status: review.status,
                evaluation_error: review.error,
                is_partial,
                started_at,
                completed_at: chrono::Utc::now().to_rfc3339(),
                duration_ms: started.elapsed().as_millis() as u64,
            },
        };
        info!(
            "Analysis {} complete: {} model calls in {}ms",
            analysis.id, analysis.metadata.model_calls, analysis.metadata.duration_ms
        );
        Ok(analysis)
    }

    fn finalize(
        &self,
        output: &PhaseOutput,
        template: &AnalysisTemplate,
        linker: &RelationshipLinker<'_>,
    ) -> AnalysisResults {
        let mut results = assemble_results(output, template);
        linker.link(&mut results);
        results
    }

    fn cancelled(
        &self,
        request: &AnalysisRequest,
        strategy: ExecutionStrategy,
        outcome: &ExecutionOutcome,
        extra_records: Vec<PhaseRecord>,
        results: Option<AnalysisResults>,
    ) -> AppError {
        let mut phases = outcome.records.clone();
        phases.extend(extra_records);
        info!(
            "Analysis of '{}' cancelled with {} completed phase(s)",
            request.transcript_id,
            outcome.outputs.len()
        );
        AppError::cancelled(CancelledAnalysis {
            status: AnalysisStatus::Cancelled,
            transcript_id: request.transcript_id.clone(),
            template_id: request.template_id.clone(),
            analysis_strategy: Some(strategy),
            phases,
            completed_outputs: outcome.completed_outputs(),
            results,
        })
    }
}
