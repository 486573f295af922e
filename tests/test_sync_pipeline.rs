//! Summary diff and append integration tests.

use anyhow::Result;
use async_trait::async_trait;
use skillsync::audit::AuditRecommendation;
use skillsync::config::Config;
use skillsync::llm::collaborator::DocsCollaborator;
use skillsync::pipeline::diff::missing_links;
use skillsync::pipeline::fetch::StaticFetcher;
use skillsync::pipeline::partition::Bucket;
use skillsync::pipeline::store::FsStore;
use skillsync::pipeline::summary::SummaryIndex;
use skillsync::pipeline::{Pipeline, RunState};
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

const SITEMAP_URL: &str = "https://encore.dev/sitemap.xml";
const A: &str = "https://encore.dev/docs/ts/a";
const B: &str = "https://encore.dev/docs/ts/b";
const C: &str = "https://encore.dev/docs/ts/c";

/// Summarizer that records which pages it was asked about.
#[derive(Default)]
struct RecordingSummarizer {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl DocsCollaborator for RecordingSummarizer {
    async fn summarize(&self, url: &str, page_text: &str) -> Result<String> {
        self.seen.lock().unwrap().push(url.to_string());
        Ok(format!("Summary of {}\nwith two lines.", page_text.trim()))
    }

    async fn compare(
        &self,
        _skill_name: &str,
        _skill_body: &str,
        _url: &str,
        _page_text: &str,
    ) -> Result<Vec<AuditRecommendation>> {
        Ok(Vec::new())
    }
}

fn sitemap(urls: &[&str]) -> String {
    let mut xml = String::from("<urlset>\n");
    for url in urls {
        xml.push_str(&format!("  <url><loc>{}</loc></url>\n", url));
    }
    xml.push_str("</urlset>\n");
    xml
}

fn existing_summary() -> String {
    format!(
        "# Encore.ts documentation\n\n- {} - Page A.\n- {} - Page B.\n",
        A, B
    )
}

#[test]
fn test_diff_of_abc_against_ab_is_c() {
    let index = SummaryIndex::parse(Bucket::Ts, &existing_summary());
    let fresh = vec![A.to_string(), B.to_string(), C.to_string()];
    assert_eq!(missing_links(&fresh, &index), vec![C.to_string()]);
}

#[tokio::test]
async fn test_sync_appends_only_missing_and_keeps_order() -> Result<()> {
    let tmp = TempDir::new()?;
    fs::write(tmp.path().join("ts-docs-summary.md"), existing_summary())?;
    let store = FsStore::new(tmp.path());
    let fetcher = StaticFetcher::new()
        .with_page(SITEMAP_URL, sitemap(&[A, B, C]))
        .with_page(C, "# Page C");
    let summarizer = RecordingSummarizer::default();
    let mut pipeline = Pipeline::new(Config::default(), &fetcher, &store, &summarizer)?;

    let outcome = pipeline.sync().await?;

    assert_eq!(outcome.added, 1);
    assert_eq!(pipeline.state(), RunState::SummaryUpdated);
    assert_eq!(*summarizer.seen.lock().unwrap(), vec![C.to_string()]);

    let text = fs::read_to_string(tmp.path().join("ts-docs-summary.md"))?;
    assert!(text.starts_with(&existing_summary()));
    assert_eq!(
        text,
        format!(
            "{}- {} - Summary of # Page C with two lines.\n",
            existing_summary(),
            C
        )
    );

    let index = SummaryIndex::parse(Bucket::Ts, &text);
    let urls: Vec<_> = index.entries().iter().map(|e| e.url.as_str()).collect();
    assert_eq!(urls, vec![A, B, C]);
    Ok(())
}

#[tokio::test]
async fn test_second_sync_is_a_no_op() -> Result<()> {
    let tmp = TempDir::new()?;
    let store = FsStore::new(tmp.path());
    let fetcher = StaticFetcher::new()
        .with_page(SITEMAP_URL, sitemap(&[A, B]))
        .with_page(A, "# Page A")
        .with_page(B, "# Page B");
    let summarizer = RecordingSummarizer::default();

    let first = Pipeline::new(Config::default(), &fetcher, &store, &summarizer)?
        .sync()
        .await?;
    let after_first = fs::read_to_string(tmp.path().join("ts-docs-summary.md"))?;
    let second = Pipeline::new(Config::default(), &fetcher, &store, &summarizer)?
        .sync()
        .await?;
    let after_second = fs::read_to_string(tmp.path().join("ts-docs-summary.md"))?;

    assert_eq!(first.added, 2);
    assert_eq!(second.added, 0);
    assert_eq!(after_first, after_second);
    assert_eq!(summarizer.seen.lock().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_url_leaving_sitemap_keeps_its_summary() -> Result<()> {
    let tmp = TempDir::new()?;
    fs::write(tmp.path().join("ts-docs-summary.md"), existing_summary())?;
    let store = FsStore::new(tmp.path());
    let fetcher = StaticFetcher::new().with_page(SITEMAP_URL, sitemap(&[A]));
    let summarizer = RecordingSummarizer::default();

    let outcome = Pipeline::new(Config::default(), &fetcher, &store, &summarizer)?
        .sync()
        .await?;

    assert_eq!(outcome.stale, 1);
    assert_eq!(outcome.added, 0);
    assert_eq!(
        fs::read_to_string(tmp.path().join("ts-docs-summary.md"))?,
        existing_summary()
    );
    Ok(())
}

#[tokio::test]
async fn test_trailing_slash_is_a_distinct_url() -> Result<()> {
    let tmp = TempDir::new()?;
    fs::write(tmp.path().join("ts-docs-summary.md"), existing_summary())?;
    let store = FsStore::new(tmp.path());
    let a_slash = format!("{}/", A);
    let fetcher = StaticFetcher::new()
        .with_page(SITEMAP_URL, sitemap(&[a_slash.as_str()]))
        .with_page(a_slash.as_str(), "# Page A again");
    let summarizer = RecordingSummarizer::default();

    let outcome = Pipeline::new(Config::default(), &fetcher, &store, &summarizer)?
        .sync()
        .await?;

    assert_eq!(outcome.added, 1);
    assert_eq!(*summarizer.seen.lock().unwrap(), vec![a_slash]);
    Ok(())
}
