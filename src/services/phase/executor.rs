//! Phase Executor
//!
//! Runs a `PhasePlan` batch by batch. Phases inside a batch are independent
//! and run concurrently, bounded by a semaphore; batches are separated by a
//! join barrier. Prompts are assembled on the driving task once a phase's
//! dependencies are known, so spawned calls never share mutable state: each
//! one owns its `PhaseRecord` and hands it back when done.
//!
//! A non-final phase that fails is recorded and contributes a placeholder
//! downstream. An authentication or unknown-model error aborts the whole run.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use recap_llm::{LlmError, LlmProvider};

use crate::models::output::{CompletedPhaseOutput, PhaseOutput};
use crate::models::phase::{PhaseKind, PhaseRecord, PhaseState};
use crate::services::context::{
    AssembledPrompt, ContextAssembler, PartialOutput, PhaseContext, PhaseDigest,
};
use crate::services::phase::parsing::parse_phase_output;
use crate::services::phase::plan::{PhasePlan, PhaseSpec};
use crate::services::phase::retry::{CallOutcome, RetryPolicy};
use crate::services::progress::{PhaseEnd, ProgressReporter};
use crate::utils::error::{AppError, AppResult};

/// Everything the executor learned about a plan.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// One record per phase, in plan order
    pub records: Vec<PhaseRecord>,
    /// Parsed output of every succeeded phase
    pub outputs: HashMap<String, PhaseOutput>,
    pub cancelled: bool,
}

impl ExecutionOutcome {
    pub fn model_calls(&self) -> u32 {
        self.records.iter().map(PhaseRecord::calls).sum()
    }

    pub fn failed_phases(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.state == PhaseState::FailedFatal)
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn record(&self, phase_id: &str) -> Option<&PhaseRecord> {
        self.records.iter().find(|r| r.id == phase_id)
    }

    /// Succeeded outputs in plan order.
    pub fn completed_outputs(&self) -> Vec<CompletedPhaseOutput> {
        self.records
            .iter()
            .filter_map(|r| {
                self.outputs.get(&r.id).map(|output| CompletedPhaseOutput {
                    phase_id: r.id.clone(),
                    output: output.clone(),
                })
            })
            .collect()
    }
}

pub struct PhaseExecutor {
    provider: Arc<dyn LlmProvider>,
    deployment_id: String,
    policy: RetryPolicy,
    max_concurrency: usize,
    max_digest_chars: usize,
}

impl PhaseExecutor {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        deployment_id: impl Into<String>,
        policy: RetryPolicy,
        max_concurrency: usize,
        max_digest_chars: usize,
    ) -> Self {
        Self {
            provider,
            deployment_id: deployment_id.into(),
            policy,
            max_concurrency: max_concurrency.max(1),
            max_digest_chars,
        }
    }

    pub async fn execute(
        &self,
        plan: &PhasePlan,
        assembler: &ContextAssembler<'_>,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> AppResult<ExecutionOutcome> {
        let batches = plan.batches()?;
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut records: HashMap<String, PhaseRecord> = plan
            .phases
            .iter()
            .map(|p| (p.id.clone(), PhaseRecord::new(&p.id, &p.title, p.kind)))
            .collect();
        let mut outputs: HashMap<String, PhaseOutput> = HashMap::new();

        info!(
            "Executing {} plan: {} phases in {} batches (max concurrency {})",
            plan.strategy,
            plan.len(),
            batches.len(),
            self.max_concurrency
        );

        for (batch_index, batch) in batches.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }

            // Cancelled on a configuration error so siblings stop early.
            let batch_token = cancel.child_token();
            let mut pending = FuturesUnordered::new();

            for phase_id in batch {
                let spec = plan.phase(phase_id).ok_or_else(|| {
                    AppError::internal(format!("phase '{}' missing from plan", phase_id))
                })?;
                let digest = self.digest_for(spec, plan, &outputs);
                let context = match (spec.kind, &digest) {
                    (PhaseKind::Consolidation, _) => {
                        PhaseContext::Partials(partials_for(spec, plan, &outputs))
                    }
                    (_, Some(digest)) => PhaseContext::Digest(digest),
                    _ => PhaseContext::Fresh,
                };
                let prompt = assembler.assemble(spec, &context)?;
                let record = records.remove(phase_id).ok_or_else(|| {
                    AppError::internal(format!("phase '{}' scheduled twice", phase_id))
                })?;

                pending.push(tokio::spawn(run_phase(
                    PhaseCall {
                        provider: self.provider.clone(),
                        deployment_id: self.deployment_id.clone(),
                        policy: self.policy.clone(),
                        prompt: Arc::new(prompt),
                        title: spec.title.clone(),
                        is_final: spec.is_final,
                    },
                    record,
                    semaphore.clone(),
                    progress.clone(),
                    batch_token.clone(),
                )));
            }

            let mut configuration_error: Option<LlmError> = None;
            while let Some(joined) = pending.next().await {
                let (record, outcome) = joined
                    .map_err(|e| AppError::internal(format!("phase task failed to join: {}", e)))?;
                match outcome {
                    CallOutcome::Succeeded(output) => {
                        info!(
                            "Phase '{}' succeeded after {} call(s): {} entities, {} sections",
                            record.id,
                            record.calls(),
                            output.entity_count(),
                            output.sections.len()
                        );
                        outputs.insert(record.id.clone(), output);
                    }
                    CallOutcome::Failed(error) if error.is_configuration() => {
                        warn!(
                            "Phase '{}' hit a configuration error, aborting: {}",
                            record.id, error
                        );
                        batch_token.cancel();
                        configuration_error.get_or_insert(error);
                    }
                    CallOutcome::Failed(error) => {
                        warn!(
                            "Phase '{}' failed, substituting a placeholder: {}",
                            record.id, error
                        );
                    }
                    CallOutcome::Cancelled => {}
                }
                records.insert(record.id.clone(), record);
            }

            if let Some(error) = configuration_error {
                return Err(AppError::configuration(error.to_string()));
            }
            info!("Batch {}/{} joined", batch_index + 1, batches.len());
        }

        let cancelled = cancel.is_cancelled();
        if cancelled {
            for record in records.values_mut() {
                if !record.state.is_terminal() {
                    if let Err(e) = record.transition(PhaseState::Cancelled) {
                        warn!("{}", e);
                    }
                }
            }
            info!("Execution cancelled with {} phase(s) completed", outputs.len());
        }

        let ordered = plan
            .phases
            .iter()
            .filter_map(|p| records.remove(&p.id))
            .collect();
        Ok(ExecutionOutcome {
            records: ordered,
            outputs,
            cancelled,
        })
    }

    fn digest_for(
        &self,
        spec: &PhaseSpec,
        plan: &PhasePlan,
        outputs: &HashMap<String, PhaseOutput>,
    ) -> Option<PhaseDigest> {
        if spec.digest_from.is_empty() {
            return None;
        }
        Some(
            spec.digest_from
                .iter()
                .fold(PhaseDigest::new(self.max_digest_chars), |digest, id| {
                    let title = plan.phase(id).map_or(id.as_str(), |p| p.title.as_str());
                    digest.absorb(title, outputs.get(id))
                }),
        )
    }
}

fn partials_for<'a>(
    spec: &'a PhaseSpec,
    plan: &'a PhasePlan,
    outputs: &'a HashMap<String, PhaseOutput>,
) -> Vec<PartialOutput<'a>> {
    spec.depends_on
        .iter()
        .map(|id| PartialOutput {
            phase_id: id.as_str(),
            title: plan.phase(id).map_or(id.as_str(), |p| p.title.as_str()),
            output: outputs.get(id),
        })
        .collect()
}

struct PhaseCall {
    provider: Arc<dyn LlmProvider>,
    deployment_id: String,
    policy: RetryPolicy,
    prompt: Arc<AssembledPrompt>,
    title: String,
    /// Nothing merges over a failed final phase
    is_final: bool,
}

async fn run_phase(
    call: PhaseCall,
    mut record: PhaseRecord,
    semaphore: Arc<Semaphore>,
    progress: ProgressReporter,
    cancel: CancellationToken,
) -> (PhaseRecord, CallOutcome<PhaseOutput>) {
    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = semaphore.acquire_owned() => permit.ok(),
    };
    let Some(_permit) = permit else {
        if let Err(e) = record.transition(PhaseState::Cancelled) {
            warn!("{}", e);
        }
        return (record, CallOutcome::Cancelled);
    };

    progress.phase_started(&record.id, &call.title).await;

    let phase_id = record.id.clone();
    let outcome = call
        .policy
        .run(&mut record, &cancel, || {
            let provider = call.provider.clone();
            let prompt = call.prompt.clone();
            let deployment_id = call.deployment_id.clone();
            let phase_id = phase_id.clone();
            async move {
                let text = provider
                    .invoke(&deployment_id, &prompt.prompt, Some(&prompt.schema_hint))
                    .await?;
                parse_phase_output(&phase_id, &text)
            }
        })
        .await;

    let end = match &outcome {
        CallOutcome::Succeeded(_) => Some(PhaseEnd::Completed),
        CallOutcome::Failed(_) if call.is_final => Some(PhaseEnd::Failed),
        CallOutcome::Failed(_) => Some(PhaseEnd::Substituted),
        CallOutcome::Cancelled => None,
    };
    if let Some(end) = end {
        progress.phase_finished(&record.id, &call.title, end).await;
    }
    (record, outcome)
}
