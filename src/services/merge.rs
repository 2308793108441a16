//! Result Assembly
//!
//! Turns the consolidated `PhaseOutput` into `AnalysisResults`: stable ids,
//! every template section present in template order, unrequested outputs
//! dropped. Cross-references and citations are resolved afterwards by the
//! relationship linker.

use std::collections::HashSet;

use tracing::debug;

use recap_core::{AnalysisTemplate, OutputKind};

use crate::models::analysis::{
    ActionItem, AgendaItem, AnalysisResults, Citation, Decision, Quote, SectionResult,
};
use crate::models::output::{
    PhaseOutput, RawActionItem, RawAgendaItem, RawDecision, RawQuote, RawSection,
};

pub fn assemble_results(output: &PhaseOutput, template: &AnalysisTemplate) -> AnalysisResults {
    let sections = template
        .sections
        .iter()
        .map(|section| {
            let raw = output
                .sections
                .iter()
                .find(|s| s.id == section.id && !s.content.trim().is_empty());
            match raw {
                Some(raw) => SectionResult {
                    id: section.id.clone(),
                    name: section.name.clone(),
                    output_format: section.output_format,
                    content: raw.content.trim().to_string(),
                    evidence: if section.extract_evidence {
                        raw.evidence.iter().map(Citation::unverified).collect()
                    } else {
                        Vec::new()
                    },
                    placeholder: false,
                },
                None => {
                    debug!("Section '{}' missing from output, using placeholder", section.id);
                    SectionResult {
                        id: section.id.clone(),
                        name: section.name.clone(),
                        output_format: section.output_format,
                        content: String::new(),
                        evidence: Vec::new(),
                        placeholder: true,
                    }
                }
            }
        })
        .collect();

    let summary = if template.requests(OutputKind::Summary) {
        output
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    } else {
        None
    };

    let mut warnings = Vec::new();

    let agenda: Vec<&RawAgendaItem> = output
        .agenda_items
        .iter()
        .filter(|a| !a.title.trim().is_empty())
        .collect();
    let agenda_ids = allocate_ids("agenda", agenda.iter().map(|a| a.id.as_deref()));
    let agenda_items = agenda
        .iter()
        .zip(&agenda_ids.ids)
        .map(|(a, id)| AgendaItem {
            id: id.clone(),
            title: a.title.trim().to_string(),
            description: non_blank(a.description.as_deref()),
            citation: a.timestamp.as_deref().map(Citation::unverified),
        })
        .collect();

    let (decisions, decision_ids) = if template.requests(OutputKind::Decisions) {
        let raw: Vec<&RawDecision> = output
            .decisions
            .iter()
            .filter(|d| !d.description.trim().is_empty())
            .collect();
        let ids = allocate_ids("decision", raw.iter().map(|d| d.id.as_deref()));
        let decisions: Vec<Decision> = raw
            .iter()
            .zip(&ids.ids)
            .map(|(d, id)| Decision {
                id: id.clone(),
                description: d.description.trim().to_string(),
                agenda_item_id: agenda_ids.reference(
                    d.agenda_item_id.as_deref(),
                    &format!("Decision '{}'", id),
                    &mut warnings,
                ),
                citation: d.timestamp.as_deref().map(Citation::unverified),
            })
            .collect();
        (decisions, ids)
    } else {
        (Vec::new(), AllocatedIds::default())
    };

    let action_items = if template.requests(OutputKind::ActionItems) {
        let raw: Vec<&RawActionItem> = output
            .action_items
            .iter()
            .filter(|a| !a.description.trim().is_empty())
            .collect();
        let ids = allocate_ids("action", raw.iter().map(|a| a.id.as_deref()));
        raw.iter()
            .zip(ids.ids)
            .map(|(a, id)| ActionItem {
                description: a.description.trim().to_string(),
                owner: non_blank(a.owner.as_deref()),
                due_date: non_blank(a.due_date.as_deref()),
                decision_id: decision_ids.reference(
                    a.decision_id.as_deref(),
                    &format!("Action item '{}'", id),
                    &mut warnings,
                ),
                citation: a.timestamp.as_deref().map(Citation::unverified),
                id,
            })
            .collect()
    } else {
        Vec::new()
    };

    let quotes = if template.requests(OutputKind::Quotes) {
        let raw: Vec<&RawQuote> = output
            .quotes
            .iter()
            .filter(|q| !q.text.trim().is_empty())
            .collect();
        let ids = allocate_ids("quote", raw.iter().map(|q| q.id.as_deref()));
        raw.iter()
            .zip(ids.ids)
            .map(|(q, id)| Quote {
                id,
                text: q.text.trim().to_string(),
                speaker: non_blank(q.speaker.as_deref()),
                citation: q.timestamp.as_deref().map(Citation::unverified),
            })
            .collect()
    } else {
        Vec::new()
    };

    AnalysisResults {
        summary,
        sections,
        agenda_items,
        decisions,
        action_items,
        quotes,
        relationship_warnings: warnings,
    }
}

/// The inverse view: results in the shape phases answer with, ids and
/// references included. Used to show a draft to the reviewer so a revision
/// comes back in a shape `assemble_results` understands.
pub fn results_to_output(results: &AnalysisResults) -> PhaseOutput {
    PhaseOutput {
        summary: results.summary.clone(),
        sections: results
            .sections
            .iter()
            .filter(|s| !s.placeholder)
            .map(|s| RawSection {
                id: s.id.clone(),
                content: s.content.clone(),
                evidence: s.evidence.iter().map(|c| c.timestamp.clone()).collect(),
            })
            .collect(),
        agenda_items: results
            .agenda_items
            .iter()
            .map(|a| RawAgendaItem {
                id: Some(a.id.clone()),
                title: a.title.clone(),
                description: a.description.clone(),
                timestamp: a.citation.as_ref().map(|c| c.timestamp.clone()),
            })
            .collect(),
        decisions: results
            .decisions
            .iter()
            .map(|d| RawDecision {
                id: Some(d.id.clone()),
                description: d.description.clone(),
                agenda_item_id: d.agenda_item_id.clone(),
                timestamp: d.citation.as_ref().map(|c| c.timestamp.clone()),
            })
            .collect(),
        action_items: results
            .action_items
            .iter()
            .map(|a| RawActionItem {
                id: Some(a.id.clone()),
                description: a.description.clone(),
                owner: a.owner.clone(),
                due_date: a.due_date.clone(),
                decision_id: a.decision_id.clone(),
                timestamp: a.citation.as_ref().map(|c| c.timestamp.clone()),
            })
            .collect(),
        quotes: results
            .quotes
            .iter()
            .map(|q| RawQuote {
                id: Some(q.id.clone()),
                text: q.text.clone(),
                speaker: q.speaker.clone(),
                timestamp: q.citation.as_ref().map(|c| c.timestamp.clone()),
            })
            .collect(),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Final ids for one kind, in item order.
#[derive(Debug, Default)]
struct AllocatedIds {
    ids: Vec<String>,
    /// Model ids given to more than one item
    ambiguous: HashSet<String>,
}

impl AllocatedIds {
    /// Carries a reference over unless it names an ambiguous id; those are
    /// dropped so the linker matches by content instead.
    fn reference(
        &self,
        value: Option<&str>,
        owner: &str,
        warnings: &mut Vec<String>,
    ) -> Option<String> {
        let value = non_blank(value)?;
        if self.ambiguous.contains(&value) {
            debug!("{} references ambiguous id '{}'", owner, value);
            warnings.push(format!(
                "{} references '{}', which more than one item used as its id",
                owner, value
            ));
            return None;
        }
        Some(value)
    }
}

/// Every model-provided id is reserved up front, so a generated `prefix-N`
/// never takes one. The first item with an id keeps it; later repeats and
/// items without one are numbered by position.
fn allocate_ids<'a>(
    prefix: &str,
    proposed: impl Iterator<Item = Option<&'a str>>,
) -> AllocatedIds {
    let proposed: Vec<Option<&str>> = proposed
        .map(|id| id.map(str::trim).filter(|s| !s.is_empty()))
        .collect();

    let mut used: HashSet<String> = HashSet::new();
    let mut ambiguous = HashSet::new();
    for id in proposed.iter().flatten() {
        if !used.insert(id.to_string()) {
            ambiguous.insert(id.to_string());
        }
    }

    let mut kept: HashSet<&str> = HashSet::new();
    let ids = proposed
        .iter()
        .enumerate()
        .map(|(index, id)| {
            if let Some(id) = id {
                if kept.insert(*id) {
                    return id.to_string();
                }
            }
            let mut n = index + 1;
            loop {
                let candidate = format!("{}-{}", prefix, n);
                if used.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect();

    AllocatedIds { ids, ambiguous }
}
