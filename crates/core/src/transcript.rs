//! Transcript Model
//!
//! Timestamped transcript segments and the canonical rendering handed to the
//! model. Every rendered line starts with a `[mm:ss]` (or `[hh:mm:ss]`) marker so
//! the model can quote times back verbatim, and the same markers resolve back to
//! segments through [`TimestampedTranscript::segment_at`].

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::tokens::estimate_tokens;

/// One transcribed utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub index: u32,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// Transcript as received at the request boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Check the segment invariants: non-empty, `0 <= start <= end`, ordered by start.
    pub fn validate(&self) -> CoreResult<()> {
        if self.segments.is_empty() {
            return Err(CoreError::transcript("transcript has no segments"));
        }

        let mut previous_start = 0.0_f64;
        for segment in &self.segments {
            if !segment.start.is_finite() || !segment.end.is_finite() {
                return Err(CoreError::transcript(format!(
                    "segment {} has a non-finite time range",
                    segment.index
                )));
            }
            if segment.start < 0.0 {
                return Err(CoreError::transcript(format!(
                    "segment {} starts before zero",
                    segment.index
                )));
            }
            if segment.start > segment.end {
                return Err(CoreError::transcript(format!(
                    "segment {} starts after it ends ({} > {})",
                    segment.index, segment.start, segment.end
                )));
            }
            if segment.start < previous_start {
                return Err(CoreError::transcript(format!(
                    "segment {} is out of order",
                    segment.index
                )));
            }
            previous_start = segment.start;
        }

        Ok(())
    }
}

/// Render seconds as `mm:ss`, or `hh:mm:ss` from one hour on.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Parse a `mm:ss` / `hh:mm:ss` timestamp, with or without surrounding brackets.
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    let trimmed = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim();
    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    let mut values = Vec::with_capacity(parts.len());
    for part in &parts {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return None;
        }
        values.push(part.parse::<f64>().ok()?);
    }

    let (hours, minutes, seconds) = match values.as_slice() {
        [m, s] => (0.0, *m, *s),
        [h, m, s] => {
            if *m >= 60.0 {
                return None;
            }
            (*h, *m, *s)
        }
        _ => return None,
    };
    if seconds >= 60.0 {
        return None;
    }

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Render one segment as a transcript line.
fn render_line(segment: &TranscriptSegment) -> String {
    let marker = format_timestamp(segment.start);
    match segment.speaker.as_deref().map(str::trim) {
        Some(speaker) if !speaker.is_empty() => {
            format!("[{}] {}: {}", marker, speaker, segment.text.trim())
        }
        _ => format!("[{}] {}", marker, segment.text.trim()),
    }
}

/// The canonical timestamp-annotated transcript. Built once per request.
#[derive(Debug, Clone)]
pub struct TimestampedTranscript {
    segments: Vec<TranscriptSegment>,
    lines: Vec<String>,
    rendered: String,
}

impl TimestampedTranscript {
    /// Build the rendering from ordered segments.
    pub fn build(segments: &[TranscriptSegment]) -> Self {
        let lines: Vec<String> = segments.iter().map(render_line).collect();
        let rendered = lines.join("\n");
        Self {
            segments: segments.to_vec(),
            lines,
            rendered,
        }
    }

    /// The full rendering.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.rendered)
    }

    /// Render a contiguous subset of segments.
    pub fn render_range(&self, range: Range<usize>) -> String {
        let end = range.end.min(self.lines.len());
        let start = range.start.min(end);
        self.lines[start..end].join("\n")
    }

    /// First and last rendered markers, e.g. `("00:00", "47:12")`.
    pub fn time_span(&self) -> Option<(String, String)> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        Some((format_timestamp(first.start), format_timestamp(last.end)))
    }

    /// Find the segment whose range contains `seconds`.
    ///
    /// Rendered markers drop fractional seconds, so ranges are widened to whole
    /// seconds before matching.
    pub fn segment_at(&self, seconds: f64) -> Option<&TranscriptSegment> {
        self.segments
            .iter()
            .find(|s| s.start.floor() <= seconds && seconds <= s.end.ceil())
    }

    /// Split the segments into `count` contiguous windows of similar token size.
    ///
    /// Windows cover every segment exactly once, in order. When there are at
    /// least `count` segments every window is non-empty; otherwise trailing
    /// windows are empty ranges.
    pub fn windows(&self, count: usize) -> Vec<Range<usize>> {
        if count == 0 {
            return Vec::new();
        }

        let weights: Vec<usize> = self
            .lines
            .iter()
            .map(|line| estimate_tokens(line).max(1))
            .collect();
        let total: usize = weights.iter().sum();
        let n = weights.len();

        let mut windows = Vec::with_capacity(count);
        let mut cursor = 0;
        let mut consumed = 0;
        for k in 0..count {
            let remaining_windows = count - k;
            if cursor >= n {
                windows.push(n..n);
                continue;
            }
            if remaining_windows == 1 {
                windows.push(cursor..n);
                cursor = n;
                continue;
            }

            let target = (total - consumed).div_ceil(remaining_windows);
            let start = cursor;
            let mut acc = 0;
            // Leave at least one segment for each later window when possible.
            let max_end = n.saturating_sub(remaining_windows - 1).max(start + 1);
            while cursor < max_end {
                acc += weights[cursor];
                cursor += 1;
                if acc >= target {
                    break;
                }
            }
            consumed += acc;
            windows.push(start..cursor);
        }

        windows
    }
}
