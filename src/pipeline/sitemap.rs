use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use super::fetch::PageFetcher;

static LOC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<loc>(.*?)</loc>").expect("valid <loc> regex"));

/// Every `<loc>` value in document order, trimmed. Duplicates are kept.
///
/// A document without `<loc>` elements yields an empty vector rather than
/// an error.
pub fn extract_urls(xml: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(xml)
        .map(|cap| cap[1].trim().to_string())
        .collect()
}

/// Fetch `url` and extract its URLs. A failed fetch aborts the run.
pub async fn fetch_sitemap(fetcher: &dyn PageFetcher, url: &str) -> Result<Vec<String>> {
    info!("Fetching sitemap {}", url);
    let xml = fetcher.fetch(url).await?;
    let urls = extract_urls(&xml);
    if urls.is_empty() {
        warn!(
            "Sitemap {} contained no <loc> entries ({} bytes); continuing with an empty URL list",
            url,
            xml.len()
        );
    } else {
        info!("Sitemap lists {} URLs", urls.len());
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fetch::{FetchError, StaticFetcher};

    #[test]
    fn test_extract_urls_document_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://encore.dev/docs/ts</loc><lastmod>2025-01-01</lastmod></url>
  <url><loc>https://encore.dev/docs/go</loc></url>
  <url><loc>https://encore.dev/docs/platform</loc></url>
</urlset>"#;
        assert_eq!(
            extract_urls(xml),
            vec![
                "https://encore.dev/docs/ts",
                "https://encore.dev/docs/go",
                "https://encore.dev/docs/platform",
            ]
        );
    }

    #[test]
    fn test_extract_urls_keeps_duplicates() {
        let xml = "<loc>https://a</loc><loc>https://b</loc><loc>https://a</loc>";
        assert_eq!(extract_urls(xml), vec!["https://a", "https://b", "https://a"]);
    }

    #[test]
    fn test_extract_urls_trims_whitespace_and_newlines() {
        let xml = "<url><loc>\n   https://encore.dev/docs/ts/cli  \n</loc></url>";
        assert_eq!(extract_urls(xml), vec!["https://encore.dev/docs/ts/cli"]);
    }

    #[test]
    fn test_extract_urls_empty_when_no_loc() {
        assert!(extract_urls("<html><body>Not a sitemap</body></html>").is_empty());
        assert!(extract_urls("").is_empty());
    }

    #[test]
    fn test_extract_urls_count_matches_elements() {
        let xml: String = (0..50)
            .map(|i| format!("<url><loc>https://encore.dev/docs/p{}</loc></url>", i))
            .collect();
        let urls = extract_urls(&xml);
        assert_eq!(urls.len(), 50);
        assert_eq!(urls[0], "https://encore.dev/docs/p0");
        assert_eq!(urls[49], "https://encore.dev/docs/p49");
    }

    #[tokio::test]
    async fn test_fetch_sitemap_propagates_fetch_error() {
        let fetcher = StaticFetcher::new();
        let err = fetch_sitemap(&fetcher, "https://encore.dev/sitemap.xml")
            .await
            .unwrap_err();
        let fetch_err = err.downcast_ref::<FetchError>().unwrap();
        assert!(matches!(fetch_err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_sitemap_empty_is_not_error() {
        let fetcher = StaticFetcher::new().with_page("https://x/sitemap.xml", "<urlset/>");
        let urls = fetch_sitemap(&fetcher, "https://x/sitemap.xml").await.unwrap();
        assert!(urls.is_empty());
    }
}
