//! Phase Response Parsing
//!
//! Pulls the JSON object out of a model response (fenced or raw) and parses it
//! into a `PhaseOutput`. Failures are `ParseError`, which the retry policy
//! treats as transient.

use serde::de::DeserializeOwned;

use recap_llm::{LlmError, LlmResult};

use crate::models::output::PhaseOutput;

/// Extract the first JSON object from text that may contain markdown fences.
pub fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let after_fence = &text[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return Some(after_fence[..end].trim());
        }
    }
    if let Some(start) = text.find("```") {
        let after_fence = &text[start + 3..];
        // Skip optional language identifier on first line
        let after_lang = match after_fence.find('\n') {
            Some(nl) => &after_fence[nl + 1..],
            None => after_fence,
        };
        if let Some(end) = after_lang.find("```") {
            let content = after_lang[..end].trim();
            if content.starts_with('{') {
                return Some(content);
            }
        }
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start <= end {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Parse any JSON response body into `T`.
pub fn parse_json_response<T: DeserializeOwned>(phase_id: &str, text: &str) -> LlmResult<T> {
    if text.trim().is_empty() {
        return Err(LlmError::parse(format!("phase '{}' returned an empty response", phase_id)));
    }
    let json = extract_json_object(text).ok_or_else(|| {
        LlmError::parse(format!(
            "phase '{}' response has no JSON object (starts with {:?})",
            phase_id,
            text.chars().take(80).collect::<String>()
        ))
    })?;
    serde_json::from_str(json).map_err(|e| {
        LlmError::parse(format!("phase '{}' response is not valid JSON: {}", phase_id, e))
    })
}

pub fn parse_phase_output(phase_id: &str, text: &str) -> LlmResult<PhaseOutput> {
    parse_json_response(phase_id, text)
}
