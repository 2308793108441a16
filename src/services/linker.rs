//! Relationship Linker
//!
//! Deterministic post-processing of merged results. No model calls.
//!
//! - Decisions get an `agendaItemId`, action items a `decisionId`: an explicit
//!   model reference is resolved by id, then by case-insensitive title; items
//!   without one are matched by keyword overlap above a threshold.
//! - Timestamp citations are checked against segment time ranges. Misses are
//!   flagged in `relationshipWarnings`, never dropped.
//!
//! References only point one level up (action -> decision -> agenda), so the
//! chain cannot loop.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use recap_core::{parse_timestamp, TimestampedTranscript};

use crate::models::analysis::{AnalysisResults, Citation};

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "will", "are", "was", "were", "has",
    "have", "had", "our", "its", "into", "about", "over", "under", "should", "would", "could",
    "can", "all", "any", "but", "not", "per", "via", "who", "what", "when", "where", "which",
    "they", "them", "their", "there", "then", "than", "also", "been", "being", "out", "off",
    "next", "each", "more", "most", "some", "such", "only", "own", "same", "very", "just",
];

fn word_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").ok())
        .as_ref()
}

/// Lowercased content words of at least three characters.
pub fn keywords(text: &str) -> HashSet<String> {
    let Some(pattern) = word_pattern() else {
        return HashSet::new();
    };
    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| w.chars().count() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Overlap coefficient `|A ∩ B| / min(|A|, |B|)`; 0 when either side is empty.
pub fn keyword_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / smaller as f64
}

/// A link target: its id, its title, and its keywords.
struct Target {
    id: String,
    title: String,
    keywords: HashSet<String>,
}

enum Resolution {
    Linked(String),
    Unresolved,
    NoMatch,
}

fn resolve(
    explicit: Option<&str>,
    text: &str,
    targets: &[Target],
    min_overlap: f64,
) -> Resolution {
    if let Some(reference) = explicit {
        let reference = reference.trim();
        if let Some(t) = targets.iter().find(|t| t.id == reference) {
            return Resolution::Linked(t.id.clone());
        }
        if let Some(t) = targets
            .iter()
            .find(|t| t.title.trim().eq_ignore_ascii_case(reference))
        {
            return Resolution::Linked(t.id.clone());
        }
    }

    let words = keywords(text);
    let mut best: Option<(&Target, f64)> = None;
    for target in targets {
        let score = keyword_overlap(&words, &target.keywords);
        if score >= min_overlap && best.map_or(true, |(_, s)| score > s) {
            best = Some((target, score));
        }
    }
    match (best, explicit) {
        (Some((target, _)), _) => Resolution::Linked(target.id.clone()),
        (None, Some(_)) => Resolution::Unresolved,
        (None, None) => Resolution::NoMatch,
    }
}

pub struct RelationshipLinker<'a> {
    transcript: &'a TimestampedTranscript,
    min_overlap: f64,
}

impl<'a> RelationshipLinker<'a> {
    pub fn new(transcript: &'a TimestampedTranscript, min_overlap: f64) -> Self {
        Self {
            transcript,
            min_overlap,
        }
    }

    /// Resolve references and citations in place.
    pub fn link(&self, results: &mut AnalysisResults) {
        let mut warnings = Vec::new();

        let agenda: Vec<Target> = results
            .agenda_items
            .iter()
            .map(|a| Target {
                id: a.id.clone(),
                title: a.title.clone(),
                keywords: keywords(&format!(
                    "{} {}",
                    a.title,
                    a.description.as_deref().unwrap_or_default()
                )),
            })
            .collect();
        for decision in &mut results.decisions {
            let explicit = decision.agenda_item_id.take();
            match resolve(
                explicit.as_deref(),
                &decision.description,
                &agenda,
                self.min_overlap,
            ) {
                Resolution::Linked(id) => decision.agenda_item_id = Some(id),
                Resolution::Unresolved => warnings.push(format!(
                    "Decision '{}' references unknown agenda item '{}'",
                    decision.id,
                    explicit.unwrap_or_default()
                )),
                Resolution::NoMatch => {}
            }
        }

        let decisions: Vec<Target> = results
            .decisions
            .iter()
            .map(|d| Target {
                id: d.id.clone(),
                title: d.description.clone(),
                keywords: keywords(&d.description),
            })
            .collect();
        for action in &mut results.action_items {
            let explicit = action.decision_id.take();
            match resolve(
                explicit.as_deref(),
                &action.description,
                &decisions,
                self.min_overlap,
            ) {
                Resolution::Linked(id) => action.decision_id = Some(id),
                Resolution::Unresolved => warnings.push(format!(
                    "Action item '{}' references unknown decision '{}'",
                    action.id,
                    explicit.unwrap_or_default()
                )),
                Resolution::NoMatch => {}
            }
        }

        for section in &mut results.sections {
            for citation in &mut section.evidence {
                self.verify(citation, &format!("Section '{}'", section.id), &mut warnings);
            }
        }
        for item in &mut results.agenda_items {
            if let Some(citation) = item.citation.as_mut() {
                self.verify(citation, &format!("Agenda item '{}'", item.id), &mut warnings);
            }
        }
        for item in &mut results.decisions {
            if let Some(citation) = item.citation.as_mut() {
                self.verify(citation, &format!("Decision '{}'", item.id), &mut warnings);
            }
        }
        for item in &mut results.action_items {
            if let Some(citation) = item.citation.as_mut() {
                self.verify(citation, &format!("Action item '{}'", item.id), &mut warnings);
            }
        }
        for item in &mut results.quotes {
            if let Some(citation) = item.citation.as_mut() {
                self.verify(citation, &format!("Quote '{}'", item.id), &mut warnings);
            }
        }

        let linked_decisions = results
            .decisions
            .iter()
            .filter(|d| d.agenda_item_id.is_some())
            .count();
        let linked_actions = results
            .action_items
            .iter()
            .filter(|a| a.decision_id.is_some())
            .count();
        info!(
            "Linked {}/{} decisions and {}/{} action items ({} warnings)",
            linked_decisions,
            results.decisions.len(),
            linked_actions,
            results.action_items.len(),
            warnings.len()
        );

        results.relationship_warnings.extend(warnings);
    }

    fn verify(&self, citation: &mut Citation, owner: &str, warnings: &mut Vec<String>) {
        let Some(seconds) = parse_timestamp(&citation.timestamp) else {
            debug!("{} has unparseable timestamp '{}'", owner, citation.timestamp);
            citation.verified = false;
            warnings.push(format!(
                "{} cites '{}', which is not a transcript timestamp",
                owner, citation.timestamp
            ));
            return;
        };
        citation.seconds = Some(seconds);
        match self.transcript.segment_at(seconds) {
            Some(segment) => {
                citation.verified = true;
                citation.segment_index = Some(segment.index);
            }
            None => {
                citation.verified = false;
                citation.segment_index = None;
                warnings.push(format!(
                    "{} cites {}, which matches no transcript segment",
                    owner, citation.timestamp
                ));
            }
        }
    }
}
