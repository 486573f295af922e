//! Shared utilities for the skillsync codebase

use std::collections::BTreeSet;
use std::fmt;

/// A string wrapper that masks its contents in Debug/Display output.
/// Keeps LLM API keys out of logs.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Intentionally access the raw secret value (for request headers).
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lowercased alphanumeric word tokens of `text`.
///
/// Anything that is not an ASCII letter or digit separates tokens, so
/// `"Pub/Sub topics"` yields `{"pub", "sub", "topics"}` and a URL path
/// `"/docs/ts/primitives/pubsub"` yields `{"docs", "ts", "primitives", "pubsub"}`.
pub fn word_tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

/// Truncate `s` to at most `max` bytes without splitting a UTF-8 character.
pub fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if max >= s.len() {
        return s;
    }
    let mut i = max;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    &s[..i]
}

/// Collapse all whitespace runs (including newlines) into single spaces.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
