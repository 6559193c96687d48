//! Content moderation for generated dialogue.
//!
//! Every piece of LLM-generated text passes through [`ModerationFilter::sanitize`]
//! before it is stored or displayed. The filter is pure and total -- it
//! never fails, and re-applying it to already-sanitized text is a no-op.
//!
//! Two independent passes run in order:
//!
//! 1. *Sensitive-topic pass*: matched spans are stripped and the remainder
//!    is re-framed behind a neutral redirect prefix.
//! 2. *Severe-language pass*: each match is replaced with an ellipsis
//!    marker, preserving sentence rhythm instead of truncating.
//!
//! Patterns are matched case-insensitively as plain substrings. The
//! pattern lists are configuration, not architecture: defaults ship here
//! and `hamlet-config.yaml` can replace them wholesale.

use serde::Deserialize;

/// Marker substituted for severe-language matches.
const ELLIPSIS: &str = "\u{2026}";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Pattern lists and framing for the moderation filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModerationConfig {
    /// Topics the town steers conversations away from.
    #[serde(default = "default_sensitive_topics")]
    pub sensitive_topics: Vec<String>,

    /// Language that is blotted out rather than redirected.
    #[serde(default = "default_severe_language")]
    pub severe_language: Vec<String>,

    /// Prefix prepended when a sensitive topic was stripped.
    ///
    /// Must not itself contain any configured pattern, or idempotence
    /// is lost.
    #[serde(default = "default_redirect_prefix")]
    pub redirect_prefix: String,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            sensitive_topics: default_sensitive_topics(),
            severe_language: default_severe_language(),
            redirect_prefix: default_redirect_prefix(),
        }
    }
}

fn default_sensitive_topics() -> Vec<String> {
    [
        "religion",
        "the gospel",
        "scripture",
        "sermon",
        "the election",
        "ballot measure",
        "political party",
    ]
    .iter()
    .map(|s| String::from(*s))
    .collect()
}

fn default_severe_language() -> Vec<String> {
    [
        "damn you",
        "go to hell",
        "son of a bitch",
        "bastard",
        "piece of garbage",
        "moron",
        "idiot",
    ]
    .iter()
    .map(|s| String::from(*s))
    .collect()
}

fn default_redirect_prefix() -> String {
    String::from("Let's talk about everyday life instead: ")
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// The two-pass moderation filter.
///
/// Construct once from config and share; `sanitize` borrows immutably.
#[derive(Debug, Clone)]
pub struct ModerationFilter {
    config: ModerationConfig,
}

impl ModerationFilter {
    /// Build a filter from its configuration.
    pub const fn new(config: ModerationConfig) -> Self {
        Self { config }
    }

    /// Sanitize generated text. Pure, total, idempotent.
    pub fn sanitize(&self, text: &str) -> String {
        let redirected = self.sensitive_topic_pass(text);
        self.severe_language_pass(&redirected)
    }

    /// Strip sensitive-topic spans and re-frame behind the redirect prefix.
    ///
    /// Text with no matches passes through unchanged (this is what makes
    /// the pass idempotent: sanitized output has no matches left).
    fn sensitive_topic_pass(&self, text: &str) -> String {
        let spans = match_spans(text, &self.config.sensitive_topics);
        if spans.is_empty() {
            return text.to_owned();
        }
        let stripped = remove_spans(text, &spans);
        let mut framed = self.config.redirect_prefix.clone();
        framed.push_str(stripped.trim());
        framed
    }

    /// Replace each severe-language span with the ellipsis marker.
    fn severe_language_pass(&self, text: &str) -> String {
        let spans = match_spans(text, &self.config.severe_language);
        if spans.is_empty() {
            return text.to_owned();
        }
        replace_spans(text, &spans, ELLIPSIS)
    }
}

// ---------------------------------------------------------------------------
// Case-insensitive span matching
// ---------------------------------------------------------------------------

/// Find all case-insensitive occurrences of any pattern, as byte ranges
/// into `text`, merged and sorted.
///
/// Matching compares lowercased character streams so byte offsets always
/// land on valid boundaries of the original text, even for characters
/// whose lowercase form has a different length.
fn match_spans(text: &str, patterns: &[String]) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for pattern in patterns {
        let needle: Vec<char> = pattern.chars().flat_map(char::to_lowercase).collect();
        if needle.is_empty() {
            continue;
        }
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut i = 0;
        while i < chars.len() {
            if let Some(end) = match_at(&chars, i, &needle, text.len()) {
                if let Some(&(start_byte, _)) = chars.get(i) {
                    spans.push((start_byte, end));
                }
                // Continue after this match to catch repeats.
                while i < chars.len() && chars.get(i).is_some_and(|&(b, _)| b < end) {
                    i = i.saturating_add(1);
                }
            } else {
                i = i.saturating_add(1);
            }
        }
    }
    merge_spans(spans)
}

/// Try to match `needle` (lowercased chars) at char index `i`.
///
/// Returns the end byte offset of the match on success.
fn match_at(
    chars: &[(usize, char)],
    i: usize,
    needle: &[char],
    text_len: usize,
) -> Option<usize> {
    let mut needle_pos = 0;
    let mut char_pos = i;
    while needle_pos < needle.len() {
        let &(_, c) = chars.get(char_pos)?;
        for lc in c.to_lowercase() {
            if needle.get(needle_pos) == Some(&lc) {
                needle_pos = needle_pos.saturating_add(1);
            } else {
                return None;
            }
        }
        char_pos = char_pos.saturating_add(1);
    }
    // End offset is the byte start of the next char, or the text end.
    Some(chars.get(char_pos).map_or(text_len, |&(b, _)| b))
}

/// Merge overlapping or adjacent spans and sort by start offset.
fn merge_spans(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Remove the given sorted, non-overlapping spans from `text`.
fn remove_spans(text: &str, spans: &[(usize, usize)]) -> String {
    replace_spans(text, spans, "")
}

/// Replace each sorted, non-overlapping span in `text` with `marker`.
fn replace_spans(text: &str, spans: &[(usize, usize)], marker: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for &(start, end) in spans {
        if let Some(chunk) = text.get(cursor..start) {
            out.push_str(chunk);
        }
        out.push_str(marker);
        cursor = end;
    }
    if let Some(tail) = text.get(cursor..) {
        out.push_str(tail);
    }
    out
}
