//! Cascade Digest
//!
//! Condensed view of earlier cascade passes. Built as a fold over prior phase
//! outputs (`absorb` consumes and returns the accumulator), so each pass gets
//! an explicit value instead of reading shared state.

use crate::models::output::PhaseOutput;

const MAX_ITEMS_PER_KIND: usize = 6;

#[derive(Debug, Clone, PartialEq)]
struct DigestEntry {
    title: String,
    lines: Vec<String>,
}

/// Bounded digest of prior phase outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseDigest {
    entries: Vec<DigestEntry>,
    max_chars: usize,
}

impl PhaseDigest {
    pub fn new(max_chars: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_chars,
        }
    }

    /// Fold one phase into the digest. `None` marks a phase that produced nothing.
    pub fn absorb(mut self, title: &str, output: Option<&PhaseOutput>) -> Self {
        let lines = match output {
            Some(output) if !output.is_empty() => condense(output),
            Some(_) => vec!["- (no findings)".to_string()],
            None => vec!["- (phase failed; no output)".to_string()],
        };
        self.entries.push(DigestEntry {
            title: title.to_string(),
            lines,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Render within `max_chars`. The budget is split evenly across entries so
    /// late passes are not starved by early ones.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let per_entry = (self.max_chars / self.entries.len()).max(80);
        let rendered = self
            .entries
            .iter()
            .map(|entry| {
                let block = format!("### {}\n{}", entry.title, entry.lines.join("\n"));
                truncate(&block, per_entry)
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        truncate(&rendered, self.max_chars)
    }
}

fn condense(output: &PhaseOutput) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(summary) = output.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(format!("- Summary: {}", truncate(first_line(summary), 240)));
    }
    for section in output.sections.iter().filter(|s| !s.content.trim().is_empty()) {
        lines.push(format!(
            "- Section {}: {}",
            section.id,
            truncate(first_line(&section.content), 160)
        ));
    }

    push_items(
        &mut lines,
        "Agenda",
        output.agenda_items.iter().map(|a| a.title.as_str()),
    );
    push_items(
        &mut lines,
        "Decisions",
        output.decisions.iter().map(|d| d.description.as_str()),
    );
    push_items(
        &mut lines,
        "Action items",
        output.action_items.iter().map(|a| a.description.as_str()),
    );
    if !output.quotes.is_empty() {
        lines.push(format!("- Quotes captured: {}", output.quotes.len()));
    }

    if lines.is_empty() {
        lines.push("- (no findings)".to_string());
    }
    lines
}

fn push_items<'a>(lines: &mut Vec<String>, label: &str, items: impl Iterator<Item = &'a str>) {
    let items: Vec<&str> = items.filter(|s| !s.trim().is_empty()).collect();
    if items.is_empty() {
        return;
    }
    let shown = items
        .iter()
        .take(MAX_ITEMS_PER_KIND)
        .map(|s| truncate(s, 100))
        .collect::<Vec<_>>()
        .join("; ");
    if items.len() > MAX_ITEMS_PER_KIND {
        lines.push(format!(
            "- {}: {} (+{} more)",
            label,
            shown,
            items.len() - MAX_ITEMS_PER_KIND
        ));
    } else {
        lines.push(format!("- {}: {}", label, shown));
    }
}

fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

/// Truncate to `max_chars` characters, marking the cut with `...`.
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
