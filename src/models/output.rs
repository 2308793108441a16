//! Phase Output Models
//!
//! The JSON shape every phase asks the model for. Parsing is lenient: all
//! fields are optional, camelCase and snake_case keys are both accepted, section
//! content may be a string or a list of strings, and timestamps may be quoted
//! markers or plain seconds.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use recap_core::format_timestamp;

/// Structured output of one phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseOutput {
    /// Overall summary, when requested
    pub summary: Option<String>,
    pub sections: Vec<RawSection>,
    #[serde(alias = "agenda_items", alias = "agenda")]
    pub agenda_items: Vec<RawAgendaItem>,
    pub decisions: Vec<RawDecision>,
    #[serde(alias = "action_items", alias = "actions")]
    pub action_items: Vec<RawActionItem>,
    pub quotes: Vec<RawQuote>,
}

impl PhaseOutput {
    pub fn is_empty(&self) -> bool {
        self.summary.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.sections.is_empty()
            && self.agenda_items.is_empty()
            && self.decisions.is_empty()
            && self.action_items.is_empty()
            && self.quotes.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.agenda_items.len() + self.decisions.len() + self.action_items.len() + self.quotes.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSection {
    /// Template section id
    #[serde(alias = "section_id", alias = "sectionId")]
    pub id: String,
    #[serde(deserialize_with = "string_or_list")]
    #[schemars(with = "String")]
    pub content: String,
    /// Timestamps supporting the content, as quoted from the transcript
    #[serde(deserialize_with = "timestamp_list")]
    #[schemars(with = "Vec<String>")]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAgendaItem {
    pub id: Option<String>,
    #[serde(alias = "topic", alias = "name")]
    pub title: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "opt_timestamp")]
    #[schemars(with = "Option<String>")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDecision {
    pub id: Option<String>,
    #[serde(alias = "decision", alias = "text")]
    pub description: String,
    /// Id or title of the agenda item this decision belongs to
    #[serde(alias = "agenda_item_id", alias = "agendaItem", alias = "agenda_item")]
    pub agenda_item_id: Option<String>,
    #[serde(deserialize_with = "opt_timestamp")]
    #[schemars(with = "Option<String>")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RawActionItem {
    pub id: Option<String>,
    #[serde(alias = "task", alias = "text")]
    pub description: String,
    #[serde(alias = "assignee")]
    pub owner: Option<String>,
    #[serde(alias = "due_date", alias = "due")]
    pub due_date: Option<String>,
    /// Id or description of the decision this action follows from
    #[serde(alias = "decision_id", alias = "decision")]
    pub decision_id: Option<String>,
    #[serde(deserialize_with = "opt_timestamp")]
    #[schemars(with = "Option<String>")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RawQuote {
    pub id: Option<String>,
    #[serde(alias = "quote")]
    pub text: String,
    pub speaker: Option<String>,
    #[serde(deserialize_with = "opt_timestamp")]
    #[schemars(with = "Option<String>")]
    pub timestamp: Option<String>,
}

/// A completed phase's output, kept for cancelled requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPhaseOutput {
    pub phase_id: String,
    pub output: PhaseOutput,
}

// ============================================================================
// Lenient field deserializers
// ============================================================================

fn string_or_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(value_as_text)
            .map(|line| {
                if line.starts_with("- ") {
                    line
                } else {
                    format!("- {}", line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => value_as_text(&other).unwrap_or_default(),
        None => String::new(),
    })
}

fn value_as_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn value_as_timestamp(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => n.as_f64().map(format_timestamp),
        _ => None,
    }
}

fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_timestamp))
}

fn timestamp_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => {
            items.iter().filter_map(value_as_timestamp).collect()
        }
        Some(single) => value_as_timestamp(&single).into_iter().collect(),
        None => Vec::new(),
    })
}
