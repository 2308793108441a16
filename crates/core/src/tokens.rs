//! Token Estimation
//!
//! Rough token estimate used for routing and strategy selection: about four
//! characters per token, rounded up. Counting characters rather than bytes keeps
//! the estimate stable for non-ASCII transcripts.

/// Characters per token assumed by the estimator.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of `text`.
///
/// Pure and monotonic: appending text never lowers the estimate.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Estimate the combined token count of several prompt parts.
pub fn estimate_tokens_all<'a, I>(parts: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let chars: usize = parts.into_iter().map(|p| p.chars().count()).sum();
    chars.div_ceil(CHARS_PER_TOKEN)
}
