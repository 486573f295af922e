use anyhow::{bail, Result};
use std::fmt;
use std::str::FromStr;

use crate::markdown::CodeBlock;
use crate::pipeline::partition::Bucket;

/// Framework dialect a skill document targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dialect {
    Ts,
    Go,
    /// Mixed or absent vocabulary. Both dialect buckets are candidates.
    Ambiguous,
}

impl Dialect {
    pub fn as_str(&self) -> &str {
        match self {
            Dialect::Ts => "ts",
            Dialect::Go => "go",
            Dialect::Ambiguous => "ambiguous",
        }
    }

    /// Summary buckets the matcher searches for this dialect.
    pub fn candidate_buckets(&self) -> &'static [Bucket] {
        match self {
            Dialect::Ts => &[Bucket::Ts],
            Dialect::Go => &[Bucket::Go],
            Dialect::Ambiguous => &[Bucket::Ts, Bucket::Go],
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ts" | "typescript" | "encore.ts" | "javascript" | "js" | "node" => Ok(Dialect::Ts),
            "go" | "golang" | "encore.go" => Ok(Dialect::Go),
            _ => bail!("Unknown dialect: {}", s),
        }
    }
}

const TS_FENCES: &[&str] = &["ts", "typescript", "tsx", "js", "javascript"];
const GO_FENCES: &[&str] = &["go", "golang"];

const TS_SYNTAX: &[&str] = &["import {", "export const", "export async", "=>", "interface "];
const GO_SYNTAX: &[&str] = &["func ", ":=", "package ", "//encore:api"];

// Plain "go" and "ts" are too common in prose to count there.
const TS_VOCABULARY: &[&str] = &["encore.ts", "typescript", "node.js", "npm"];
const GO_VOCABULARY: &[&str] = &["encore.go", "golang", "go.mod"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Signals {
    ts: usize,
    go: usize,
}

impl Signals {
    fn add(&mut self, dialect: Dialect) {
        match dialect {
            Dialect::Ts => self.ts += 1,
            Dialect::Go => self.go += 1,
            Dialect::Ambiguous => {}
        }
    }
}

fn block_dialect(block: &CodeBlock) -> Option<Dialect> {
    if let Some(lang) = block.lang.as_deref() {
        if TS_FENCES.contains(&lang) {
            return Some(Dialect::Ts);
        }
        if GO_FENCES.contains(&lang) {
            return Some(Dialect::Go);
        }
        // Tagged with some other language (bash, json, ...): no signal.
        return None;
    }
    let ts = TS_SYNTAX.iter().any(|s| block.code.contains(s));
    let go = GO_SYNTAX.iter().any(|s| block.code.contains(s));
    match (ts, go) {
        (true, false) => Some(Dialect::Ts),
        (false, true) => Some(Dialect::Go),
        _ => None,
    }
}

/// Dialect named by product vocabulary in free text, e.g. "Encore.go".
fn text_dialects(text: &str) -> Signals {
    let mut signals = Signals::default();
    let lower = text.to_lowercase();
    let words = lower
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '.'))
        .map(|w| w.trim_matches('.'));
    for word in words {
        if TS_VOCABULARY.contains(&word) {
            signals.add(Dialect::Ts);
        } else if GO_VOCABULARY.contains(&word) {
            signals.add(Dialect::Go);
        }
    }
    signals
}

/// Detect a skill's dialect from its metadata, prose and code blocks.
///
/// `hint` is the frontmatter `dialect`/`language` value, `name` the skill
/// name, `text` the description and prose. Each of those and every code
/// block contributes a vote; any vote for both sides, or none at all, yields
/// [`Dialect::Ambiguous`].
pub fn detect_dialect(
    hint: Option<&str>,
    name: &str,
    text: &str,
    blocks: &[CodeBlock],
) -> Dialect {
    let mut signals = text_dialects(text);

    if let Some(dialect) = hint.and_then(|h| Dialect::from_str(h).ok()) {
        signals.add(dialect);
    }

    for token in name.to_lowercase().split(|c: char| !c.is_ascii_alphanumeric()) {
        match token {
            "ts" | "typescript" => signals.add(Dialect::Ts),
            "go" | "golang" => signals.add(Dialect::Go),
            _ => {}
        }
    }

    for block in blocks {
        if let Some(dialect) = block_dialect(block) {
            signals.add(dialect);
        }
    }

    match (signals.ts > 0, signals.go > 0) {
        (true, false) => Dialect::Ts,
        (false, true) => Dialect::Go,
        _ => Dialect::Ambiguous,
    }
}
