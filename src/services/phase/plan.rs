//! Phase Plan
//!
//! The task graph of one analysis: nodes are phases, edges are dependencies.
//! Call counts are fixed by the strategy (1, 3, or passes + 1), never by
//! transcript content.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use serde::{Deserialize, Serialize};

use recap_core::{AnalysisTemplate, OutputKind, TimestampedTranscript};

use crate::models::phase::PhaseKind;
use crate::models::strategy::ExecutionStrategy;
use crate::utils::error::{AppError, AppResult};

/// One node of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSpec {
    pub id: String,
    pub title: String,
    pub kind: PhaseKind,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Template sections this phase writes
    #[serde(default)]
    pub section_ids: Vec<String>,
    /// Requested top-level outputs this phase extracts
    #[serde(default)]
    pub output_kinds: Vec<OutputKind>,
    /// The consolidating phase; its failure fails the request
    #[serde(default)]
    pub is_final: bool,
    /// Segment range for cascade passes. `None` means the whole transcript.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<Range<usize>>,
    /// Earlier phases folded into this phase's digest
    #[serde(default)]
    pub digest_from: Vec<String>,
}

impl PhaseSpec {
    fn new(id: impl Into<String>, title: impl Into<String>, kind: PhaseKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            depends_on: Vec::new(),
            section_ids: Vec::new(),
            output_kinds: Vec::new(),
            is_final: false,
            window: None,
            digest_from: Vec::new(),
        }
    }

    fn depends_on(mut self, ids: &[&str]) -> Self {
        self.depends_on = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    fn sections(mut self, ids: Vec<String>) -> Self {
        self.section_ids = ids;
        self
    }

    fn outputs(mut self, kinds: Vec<OutputKind>) -> Self {
        self.output_kinds = kinds;
        self
    }

    fn final_phase(mut self) -> Self {
        self.is_final = true;
        self
    }
}

/// Ordered phases of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhasePlan {
    pub strategy: ExecutionStrategy,
    pub phases: Vec<PhaseSpec>,
}

impl PhasePlan {
    /// Build the plan for `strategy`.
    ///
    /// `cascade_passes` only matters for advanced. With `cascade_digest` each
    /// pass depends on the one before it and folds all earlier passes into its
    /// context; without it the passes are independent and run concurrently.
    ///
    /// Advanced passes split the transcript, not the template: each pass reads
    /// one window and answers every section. A long recording then never has
    /// to fit one prompt, and the call count depends only on the strategy and
    /// `cascade_passes`, not on how many sections the template has.
    pub fn build(
        strategy: ExecutionStrategy,
        template: &AnalysisTemplate,
        transcript: &TimestampedTranscript,
        cascade_passes: u32,
        cascade_digest: bool,
    ) -> Self {
        let sections = template.section_ids();
        let requested = template.requested_outputs();

        let phases = match strategy {
            ExecutionStrategy::Basic => vec![PhaseSpec::new(
                "complete",
                "Complete analysis",
                PhaseKind::Complete,
            )
            .sections(sections)
            .outputs(requested)
            .final_phase()],

            ExecutionStrategy::Hybrid => {
                let summary: Vec<OutputKind> = requested
                    .iter()
                    .copied()
                    .filter(|k| *k == OutputKind::Summary)
                    .collect();
                let entities: Vec<OutputKind> = requested
                    .iter()
                    .copied()
                    .filter(|k| *k != OutputKind::Summary)
                    .collect();
                vec![
                    PhaseSpec::new("sections", "Section extraction", PhaseKind::Sections)
                        .sections(sections.clone())
                        .outputs(summary),
                    PhaseSpec::new("entities", "Entity extraction", PhaseKind::Entities)
                        .outputs(entities),
                    PhaseSpec::new("consolidation", "Consolidation", PhaseKind::Consolidation)
                        .depends_on(&["sections", "entities"])
                        .sections(sections)
                        .outputs(requested)
                        .final_phase(),
                ]
            }

            ExecutionStrategy::Advanced => {
                let windows = transcript.windows(cascade_passes as usize);
                let mut phases = Vec::with_capacity(windows.len() + 1);
                let mut pass_ids: Vec<String> = Vec::with_capacity(windows.len());
                let total = windows.len();

                for (k, window) in windows.into_iter().enumerate() {
                    let id = format!("pass_{}", k + 1);
                    let mut spec = PhaseSpec::new(
                        id.clone(),
                        format!("Cascade pass {}/{}", k + 1, total),
                        PhaseKind::Cascade,
                    )
                    .sections(sections.clone())
                    .outputs(requested.clone());
                    spec.window = Some(window);
                    if cascade_digest {
                        if let Some(previous) = pass_ids.last() {
                            spec.depends_on = vec![previous.clone()];
                        }
                        spec.digest_from = pass_ids.clone();
                    }
                    pass_ids.push(id);
                    phases.push(spec);
                }

                let mut consolidation =
                    PhaseSpec::new("consolidation", "Consolidation", PhaseKind::Consolidation)
                        .sections(sections)
                        .outputs(requested)
                        .final_phase();
                consolidation.depends_on = pass_ids;
                phases.push(consolidation);
                phases
            }
        };

        Self { strategy, phases }
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn phase(&self, id: &str) -> Option<&PhaseSpec> {
        self.phases.iter().find(|p| p.id == id)
    }

    pub fn final_phase(&self) -> Option<&PhaseSpec> {
        self.phases.iter().find(|p| p.is_final)
    }

    /// Topological layers (Kahn's algorithm). Phases in one layer have no
    /// mutual dependencies. Layer members keep plan order.
    pub fn batches(&self) -> AppResult<Vec<Vec<String>>> {
        let ids: HashSet<&str> = self.phases.iter().map(|p| p.id.as_str()).collect();

        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for phase in &self.phases {
            in_degree.entry(phase.id.as_str()).or_insert(0);
            for dep in &phase.depends_on {
                if !ids.contains(dep.as_str()) {
                    return Err(AppError::internal(format!(
                        "phase '{}' depends on unknown phase '{}'",
                        phase.id, dep
                    )));
                }
                *in_degree.entry(phase.id.as_str()).or_insert(0) += 1;
                dependents
                    .entry(dep.as_str())
                    .or_default()
                    .push(phase.id.as_str());
            }
        }

        let mut remaining: Vec<&str> = self.phases.iter().map(|p| p.id.as_str()).collect();
        let mut batches = Vec::new();
        while !remaining.is_empty() {
            let ready: Vec<&str> = remaining
                .iter()
                .copied()
                .filter(|id| in_degree.get(id).copied().unwrap_or(0) == 0)
                .collect();
            if ready.is_empty() {
                return Err(AppError::internal(format!(
                    "circular dependency among phases: {}",
                    remaining.join(", ")
                )));
            }
            for id in &ready {
                if let Some(children) = dependents.get(id) {
                    for child in children {
                        if let Some(degree) = in_degree.get_mut(child) {
                            *degree = degree.saturating_sub(1);
                        }
                    }
                }
            }
            remaining.retain(|id| !ready.contains(id));
            batches.push(ready.into_iter().map(String::from).collect());
        }

        Ok(batches)
    }
}
