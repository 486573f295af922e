//! The documentation-sync workflow: sitemap → link buckets → summary diff →
//! summary append → skill audit → report.

pub mod diff;
pub mod fetch;
pub mod partition;
pub mod sitemap;
pub mod store;
pub mod summary;

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use self::fetch::PageFetcher;
use self::partition::LinkBucket;
use self::store::Store;
use self::summary::{SummaryEntry, SummaryIndex};
use crate::audit::matcher::CrossReferenceMatcher;
use crate::audit::{report, SkillAudit};
use crate::config::Config;
use crate::llm::collaborator::DocsCollaborator;
use crate::markdown;
use crate::skills::SkillIndex;

/// Progress of a pipeline run. `ReportWritten` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    SitemapFetched,
    Partitioned,
    Diffed,
    SummaryUpdated,
    Matched,
    ReportWritten,
    Aborted,
}

impl RunState {
    pub fn as_str(&self) -> &str {
        match self {
            RunState::Init => "init",
            RunState::SitemapFetched => "sitemap-fetched",
            RunState::Partitioned => "partitioned",
            RunState::Diffed => "diffed",
            RunState::SummaryUpdated => "summary-updated",
            RunState::Matched => "matched",
            RunState::ReportWritten => "report-written",
            RunState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the `sync` stage.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub buckets: Vec<LinkBucket>,
    /// Summary indexes after the append
    pub indexes: Vec<SummaryIndex>,
    /// Bullets appended across all summary files
    pub added: usize,
    /// Indexed URLs no longer in the sitemap (kept, only reported)
    pub stale: usize,
}

/// Result of a full run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub sync: SyncOutcome,
    pub audits: Vec<SkillAudit>,
}

/// One run of the workflow over injected fetch, storage and LLM
/// capabilities. Stages run strictly in sequence.
pub struct Pipeline<'a> {
    config: Config,
    fetcher: &'a dyn PageFetcher,
    store: &'a dyn Store,
    collaborator: &'a dyn DocsCollaborator,
    state: RunState,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: Config,
        fetcher: &'a dyn PageFetcher,
        store: &'a dyn Store,
        collaborator: &'a dyn DocsCollaborator,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fetcher,
            store,
            collaborator,
            state: RunState::Init,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn advance(&mut self, next: RunState) {
        info!("State: {} -> {}", self.state, next);
        self.state = next;
    }

    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|e| {
            let last = self.state;
            self.state = RunState::Aborted;
            warn!("Run aborted after {}", last);
            e.context(format!("run aborted after {}", last))
        })
    }

    /// Fetch the sitemap, partition it and rewrite every link list file.
    pub async fn fetch(&mut self) -> Result<Vec<LinkBucket>> {
        let result = self.fetch_links().await;
        self.finish(result)
    }

    /// `fetch`, then summarize every link missing from its summary file and
    /// append the new bullets.
    pub async fn sync(&mut self) -> Result<SyncOutcome> {
        let result = self.sync_summaries().await;
        self.finish(result)
    }

    /// Audit every skill against the current summary files and write the
    /// report.
    pub async fn audit(&mut self) -> Result<Vec<SkillAudit>> {
        let result = self.audit_current().await;
        self.finish(result)
    }

    /// The whole chain: `sync` followed by `audit` over the updated indexes.
    pub async fn run(&mut self) -> Result<RunOutcome> {
        let result = self.run_all().await;
        self.finish(result)
    }

    async fn audit_current(&mut self) -> Result<Vec<SkillAudit>> {
        let indexes = self.load_indexes()?;
        self.audit_skills(&indexes).await
    }

    async fn run_all(&mut self) -> Result<RunOutcome> {
        let sync = self.sync_summaries().await?;
        let audits = self.audit_skills(&sync.indexes).await?;
        Ok(RunOutcome { sync, audits })
    }

    async fn fetch_links(&mut self) -> Result<Vec<LinkBucket>> {
        let urls = sitemap::fetch_sitemap(self.fetcher, &self.config.sitemap.url).await?;
        self.advance(RunState::SitemapFetched);

        let buckets = partition::partition(&urls, &self.config.buckets);
        // Nothing is written until every bucket is computed.
        for bucket in &buckets {
            let path = self.config.paths.links_file(bucket.bucket);
            self.store
                .write(&path, &bucket.render())
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(
                "Wrote {} {} links to {}",
                bucket.urls.len(),
                bucket.bucket,
                path.display()
            );
        }
        self.advance(RunState::Partitioned);
        Ok(buckets)
    }

    fn load_indexes(&self) -> Result<Vec<SummaryIndex>> {
        self.config
            .buckets
            .iter()
            .map(|b| {
                let path = self.config.paths.summary_file(b.bucket);
                SummaryIndex::load(self.store, b.bucket, &path)
                    .with_context(|| format!("failed to read {}", path.display()))
            })
            .collect()
    }

    async fn sync_summaries(&mut self) -> Result<SyncOutcome> {
        let buckets = self.fetch_links().await?;
        let mut indexes = self.load_indexes()?;

        let mut stale = 0;
        let mut missing = Vec::with_capacity(buckets.len());
        for (bucket, index) in buckets.iter().zip(&indexes) {
            let links = diff::missing_links(&bucket.urls, index);
            let gone = diff::stale_entries(&bucket.urls, index);
            info!(
                "{}: {} fresh, {} indexed, {} missing, {} stale",
                bucket.bucket,
                bucket.urls.len(),
                index.len(),
                links.len(),
                gone.len()
            );
            for entry in &gone {
                debug!("Stale {} summary kept: {}", bucket.bucket, entry.url);
            }
            stale += gone.len();
            missing.push(links);
        }
        self.advance(RunState::Diffed);

        // A URL in two buckets is fetched and summarized once.
        let mut summaries: HashMap<String, String> = HashMap::new();
        let mut pending = Vec::with_capacity(missing.len());
        for (bucket, links) in buckets.iter().zip(missing) {
            let mut entries = Vec::with_capacity(links.len());
            for url in links {
                if !summaries.contains_key(&url) {
                    let body = self
                        .fetcher
                        .fetch(&url)
                        .await
                        .with_context(|| format!("failed to fetch {} for summary", url))?;
                    let text = markdown::page_text(&body);
                    let summary = self.collaborator.summarize(&url, &text).await?;
                    summaries.insert(url.clone(), summary);
                }
                let description = summaries.get(&url).cloned().unwrap_or_default();
                entries.push(SummaryEntry::new(bucket.bucket, url, description));
            }
            pending.push(entries);
        }

        let mut added = 0;
        for (index, entries) in indexes.iter_mut().zip(pending) {
            let path = self.config.paths.summary_file(index.bucket);
            added += index
                .append(self.store, &path, entries)
                .with_context(|| format!("failed to append to {}", path.display()))?;
        }
        self.advance(RunState::SummaryUpdated);

        if stale > 0 {
            warn!(
                "{} summarized URL(s) no longer appear in the sitemap and were kept",
                stale
            );
        }

        Ok(SyncOutcome {
            buckets,
            indexes,
            added,
            stale,
        })
    }

    async fn audit_skills(&mut self, indexes: &[SummaryIndex]) -> Result<Vec<SkillAudit>> {
        let skills = SkillIndex::load(
            self.store,
            &self.config.paths.skills_glob,
            &self.config.audit.stop_tokens,
        )?;

        let audits = {
            let mut matcher = CrossReferenceMatcher::new(self.fetcher, &self.config.audit)
                .with_collaborator(self.collaborator);
            matcher.audit_all(&skills, indexes).await?
        };
        self.advance(RunState::Matched);

        report::write_report(self.store, &self.config.paths.report, &audits)?;
        self.advance(RunState::ReportWritten);
        Ok(audits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockLlmClient;
    use crate::llm::collaborator::LlmCollaborator;
    use crate::pipeline::fetch::StaticFetcher;
    use crate::pipeline::store::MemoryStore;
    use std::path::Path;

    const SITEMAP_URL: &str = "https://encore.dev/sitemap.xml";
    const SITEMAP: &str = "<urlset>\
        <url><loc>https://encore.dev/docs/ts/primitives/pubsub</loc></url>\
        <url><loc>https://encore.dev/docs/go/primitives/pubsub</loc></url>\
        </urlset>";

    fn dry_run_collaborator() -> LlmCollaborator {
        LlmCollaborator::new(Box::new(MockLlmClient::new()), 1000)
    }

    fn fetcher() -> StaticFetcher {
        StaticFetcher::new()
            .with_page(SITEMAP_URL, SITEMAP)
            .with_page("https://encore.dev/docs/ts/primitives/pubsub", "# TS Pub/Sub")
            .with_page("https://encore.dev/docs/go/primitives/pubsub", "# Go Pub/Sub")
    }

    #[test]
    fn test_run_state_display() {
        assert_eq!(RunState::SummaryUpdated.to_string(), "summary-updated");
        assert_eq!(RunState::Aborted.as_str(), "aborted");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let fetcher = fetcher();
        let store = MemoryStore::new();
        let collaborator = dry_run_collaborator();
        let mut config = Config::default();
        config.sitemap.url = String::new();
        assert!(Pipeline::new(config, &fetcher, &store, &collaborator).is_err());
    }

    #[tokio::test]
    async fn test_fetch_writes_link_files() {
        let fetcher = fetcher();
        let store = MemoryStore::new();
        let collaborator = dry_run_collaborator();
        let mut pipeline =
            Pipeline::new(Config::default(), &fetcher, &store, &collaborator).unwrap();

        let buckets = pipeline.fetch().await.unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(pipeline.state(), RunState::Partitioned);
        assert_eq!(
            store.read(Path::new("ts.txt")).unwrap().unwrap(),
            "https://encore.dev/docs/ts/primitives/pubsub\n"
        );
        assert_eq!(store.read(Path::new("platform.txt")).unwrap().unwrap(), "");
    }

    #[tokio::test]
    async fn test_sync_summarizes_missing_only() {
        let fetcher = fetcher();
        let store = MemoryStore::new().with_file(
            "ts-docs-summary.md",
            "- https://encore.dev/docs/ts/primitives/pubsub - Topics.\n",
        );
        let collaborator = dry_run_collaborator();
        let mut pipeline =
            Pipeline::new(Config::default(), &fetcher, &store, &collaborator).unwrap();

        let outcome = pipeline.sync().await.unwrap();
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.stale, 0);
        assert_eq!(pipeline.state(), RunState::SummaryUpdated);
        assert_eq!(
            store.read(Path::new("go-docs-summary.md")).unwrap().unwrap(),
            "- https://encore.dev/docs/go/primitives/pubsub - Placeholder summary generated in dry-run mode.\n"
        );
        // The already summarized ts page was never fetched
        assert!(!fetcher
            .requests()
            .contains(&"https://encore.dev/docs/ts/primitives/pubsub".to_string()));
    }

    #[tokio::test]
    async fn test_sync_counts_stale_entries() {
        let fetcher = fetcher();
        let store = MemoryStore::new().with_file(
            "ts-docs-summary.md",
            "- https://encore.dev/docs/ts/primitives/pubsub - Topics.\n\
             - https://encore.dev/docs/ts/removed - Gone.\n",
        );
        let collaborator = dry_run_collaborator();
        let mut pipeline =
            Pipeline::new(Config::default(), &fetcher, &store, &collaborator).unwrap();

        let outcome = pipeline.sync().await.unwrap();
        assert_eq!(outcome.stale, 1);
        let ts = store.read(Path::new("ts-docs-summary.md")).unwrap().unwrap();
        assert!(ts.contains("https://encore.dev/docs/ts/removed"));
    }

    #[tokio::test]
    async fn test_sitemap_failure_aborts_with_state() {
        let fetcher = StaticFetcher::new();
        let store = MemoryStore::new().with_file("ts.txt", "https://old\n");
        let collaborator = dry_run_collaborator();
        let mut pipeline =
            Pipeline::new(Config::default(), &fetcher, &store, &collaborator).unwrap();

        let err = pipeline.run().await.unwrap_err();
        assert_eq!(pipeline.state(), RunState::Aborted);
        assert!(err.to_string().contains("run aborted after init"));
        assert_eq!(store.read(Path::new("ts.txt")).unwrap().unwrap(), "https://old\n");
    }

    #[tokio::test]
    async fn test_page_failure_aborts_after_diff() {
        let fetcher = StaticFetcher::new().with_page(SITEMAP_URL, SITEMAP);
        let store = MemoryStore::new();
        let collaborator = dry_run_collaborator();
        let mut pipeline =
            Pipeline::new(Config::default(), &fetcher, &store, &collaborator).unwrap();

        let err = pipeline.sync().await.unwrap_err();
        assert!(err.to_string().contains("run aborted after diffed"));
        assert!(store.read(Path::new("ts-docs-summary.md")).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_audit_without_skills_writes_empty_report() {
        let fetcher = StaticFetcher::new();
        let store = MemoryStore::new();
        let collaborator = dry_run_collaborator();
        let mut pipeline =
            Pipeline::new(Config::default(), &fetcher, &store, &collaborator).unwrap();

        let audits = pipeline.audit().await.unwrap();
        assert!(audits.is_empty());
        assert_eq!(pipeline.state(), RunState::ReportWritten);
        let report = store.read(Path::new("update-skills.md")).unwrap().unwrap();
        assert!(report.starts_with(report::REPORT_TITLE));
    }
}
