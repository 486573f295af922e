use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use super::partition::Bucket;
use super::store::Store;
use crate::util::single_line;

/// A curated one-to-two sentence description of a documentation page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub url: String,
    pub description: String,
    pub bucket: Bucket,
}

impl SummaryEntry {
    pub fn new(bucket: Bucket, url: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: description.into(),
            bucket,
        }
    }

    /// The entry as a summary-file bullet, without trailing newline.
    pub fn to_bullet(&self) -> String {
        format!("- {} - {}", self.url, single_line(&self.description))
    }
}

/// Parse one `- <url> - <summary>` bullet. Returns `None` for anything else.
fn parse_bullet(bucket: Bucket, line: &str) -> Option<SummaryEntry> {
    let rest = line.trim().strip_prefix("- ")?.trim_start();
    let (url, description) = match rest.split_once(char::is_whitespace) {
        Some((url, tail)) => (url, tail),
        None => (rest, ""),
    };
    let url = url.trim_start_matches('<').trim_end_matches('>');
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return None;
    }
    let description = description
        .trim_start()
        .trim_start_matches(['-', ':', '\u{2013}', '\u{2014}'])
        .trim();
    Some(SummaryEntry::new(bucket, url, description))
}

/// Already-summarized pages of one bucket, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryIndex {
    pub bucket: Bucket,
    entries: Vec<SummaryEntry>,
}

impl SummaryIndex {
    pub fn empty(bucket: Bucket) -> Self {
        Self {
            bucket,
            entries: Vec::new(),
        }
    }

    /// Parse a summary file. Lines that are not URL bullets are ignored and a
    /// repeated URL keeps its first entry.
    pub fn parse(bucket: Bucket, text: &str) -> Self {
        let mut seen = HashSet::new();
        let entries = text
            .lines()
            .filter_map(|line| parse_bullet(bucket, line))
            .filter(|entry| seen.insert(entry.url.clone()))
            .collect();
        Self { bucket, entries }
    }

    /// Load the index from `path`; a missing file is an empty index.
    pub fn load(store: &dyn Store, bucket: Bucket, path: &Path) -> Result<Self> {
        let index = match store.read(path)? {
            Some(text) => Self::parse(bucket, &text),
            None => Self::empty(bucket),
        };
        debug!(
            "Loaded {} {} summary entries from {}",
            index.len(),
            bucket,
            path.display()
        );
        Ok(index)
    }

    pub fn entries(&self) -> &[SummaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.iter().any(|e| e.url == url)
    }

    pub fn urls(&self) -> HashSet<&str> {
        self.entries.iter().map(|e| e.url.as_str()).collect()
    }

    /// Append `new_entries` to the end of the file at `path` and to this
    /// index. Existing file content is never rewritten; entries whose URL is
    /// already indexed are skipped. Returns the number of bullets written.
    pub fn append(
        &mut self,
        store: &dyn Store,
        path: &Path,
        new_entries: Vec<SummaryEntry>,
    ) -> Result<usize> {
        let mut chunk = String::new();
        let mut added = Vec::new();
        for entry in new_entries {
            if self.contains(&entry.url) || added.iter().any(|e: &SummaryEntry| e.url == entry.url)
            {
                debug!("Skipping already indexed {}", entry.url);
                continue;
            }
            chunk.push_str(&entry.to_bullet());
            chunk.push('\n');
            added.push(SummaryEntry {
                bucket: self.bucket,
                ..entry
            });
        }

        if added.is_empty() {
            return Ok(0);
        }

        if let Some(existing) = store.read(path)? {
            if !existing.is_empty() && !existing.ends_with('\n') {
                chunk.insert(0, '\n');
            }
        }
        store.append(path, &chunk)?;

        let count = added.len();
        info!(
            "Appended {} {} summaries to {}",
            count,
            self.bucket,
            path.display()
        );
        self.entries.extend(added);
        Ok(count)
    }
}
