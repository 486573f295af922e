use std::collections::HashSet;

use super::summary::{SummaryEntry, SummaryIndex};

/// URLs of a fresh bucket that have no summary yet.
///
/// Exact string comparison: `https://a/x` and `https://a/x/` are distinct.
/// The result keeps first-occurrence order and holds no duplicates.
pub fn missing_links(fresh: &[String], index: &SummaryIndex) -> Vec<String> {
    let known = index.urls();
    let mut seen = HashSet::new();
    fresh
        .iter()
        .filter(|url| !known.contains(url.as_str()))
        .filter(|url| seen.insert(url.as_str()))
        .cloned()
        .collect()
}

/// Indexed entries whose URL is absent from the fresh bucket.
///
/// These are kept (summaries are append-only); callers only report them.
pub fn stale_entries<'a>(fresh: &[String], index: &'a SummaryIndex) -> Vec<&'a SummaryEntry> {
    let current: HashSet<&str> = fresh.iter().map(String::as_str).collect();
    index
        .entries()
        .iter()
        .filter(|e| !current.contains(e.url.as_str()))
        .collect()
}
