use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Product area a documentation URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Ts,
    Go,
    Platform,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Ts, Bucket::Go, Bucket::Platform];

    pub fn as_str(&self) -> &str {
        match self {
            Bucket::Ts => "ts",
            Bucket::Go => "go",
            Bucket::Platform => "platform",
        }
    }

    /// Name of the newline-delimited link list for this bucket.
    pub fn links_file_name(&self) -> String {
        format!("{}.txt", self.as_str())
    }

    /// Name of the append-only summary file for this bucket.
    pub fn summary_file_name(&self) -> String {
        format!("{}-docs-summary.md", self.as_str())
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ts" => Ok(Bucket::Ts),
            "go" => Ok(Bucket::Go),
            "platform" => Ok(Bucket::Platform),
            _ => bail!("Unknown bucket: {}", s),
        }
    }
}

/// A bucket and the substring that selects its URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPattern {
    pub bucket: Bucket,
    pub pattern: String,
}

impl BucketPattern {
    pub fn new(bucket: Bucket, pattern: impl Into<String>) -> Self {
        Self {
            bucket,
            pattern: pattern.into(),
        }
    }
}

/// URLs selected for one bucket, in sitemap order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBucket {
    pub bucket: Bucket,
    pub urls: Vec<String>,
}

impl LinkBucket {
    /// Link list file contents: one URL per line, trailing newline when
    /// non-empty, empty string for an empty bucket.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for url in &self.urls {
            out.push_str(url);
            out.push('\n');
        }
        out
    }
}

/// The subsequence of `urls` containing `pattern`, order preserved.
pub fn filter_urls(urls: &[String], pattern: &str) -> Vec<String> {
    urls.iter()
        .filter(|url| url.contains(pattern))
        .cloned()
        .collect()
}

/// Apply every pattern independently. Buckets are not disjoint: a URL that
/// matches two patterns lands in both.
pub fn partition(urls: &[String], patterns: &[BucketPattern]) -> Vec<LinkBucket> {
    patterns
        .iter()
        .map(|p| LinkBucket {
            bucket: p.bucket,
            urls: filter_urls(urls, &p.pattern),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_urls_subsequence_in_order() {
        let input = urls(&[
            "https://encore.dev/docs/ts/a",
            "https://encore.dev/docs/go/a",
            "https://encore.dev/docs/ts/b",
            "https://encore.dev/blog/x",
        ]);
        assert_eq!(
            filter_urls(&input, "/docs/ts"),
            urls(&["https://encore.dev/docs/ts/a", "https://encore.dev/docs/ts/b"])
        );
    }

    #[test]
    fn test_filter_urls_no_match() {
        let input = urls(&["https://encore.dev/blog"]);
        assert!(filter_urls(&input, "/docs/").is_empty());
        assert!(filter_urls(&[], "/docs/").is_empty());
    }

    #[test]
    fn test_filter_urls_keeps_duplicates() {
        let input = urls(&["https://a/docs/ts/x", "https://a/docs/ts/x"]);
        assert_eq!(filter_urls(&input, "/ts/").len(), 2);
    }

    #[test]
    fn test_partition_non_exclusive() {
        let input = urls(&["https://encore.dev/docs/ts/go-migration"]);
        let buckets = partition(
            &input,
            &[
                BucketPattern::new(Bucket::Ts, "/docs/ts"),
                BucketPattern::new(Bucket::Go, "go-"),
            ],
        );
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].urls, input);
        assert_eq!(buckets[1].urls, input);
    }

    #[test]
    fn test_partition_preserves_pattern_order() {
        let buckets = partition(
            &[],
            &[
                BucketPattern::new(Bucket::Platform, "/platform"),
                BucketPattern::new(Bucket::Ts, "/ts"),
            ],
        );
        assert_eq!(buckets[0].bucket, Bucket::Platform);
        assert_eq!(buckets[1].bucket, Bucket::Ts);
    }

    #[test]
    fn test_render_link_list() {
        let bucket = LinkBucket {
            bucket: Bucket::Go,
            urls: urls(&["https://a", "https://b"]),
        };
        assert_eq!(bucket.render(), "https://a\nhttps://b\n");

        let empty = LinkBucket {
            bucket: Bucket::Platform,
            urls: Vec::new(),
        };
        assert_eq!(empty.render(), "");
    }

    #[test]
    fn test_bucket_names() {
        assert_eq!(Bucket::Ts.links_file_name(), "ts.txt");
        assert_eq!(Bucket::Platform.summary_file_name(), "platform-docs-summary.md");
        assert_eq!(Bucket::from_str("GO").unwrap(), Bucket::Go);
        assert!(Bucket::from_str("rust").is_err());
    }
}
