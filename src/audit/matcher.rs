//! Cross-reference skill documents with the documentation pages their
//! summary entries point to.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

use super::shapes::{self, Imports};
use super::{AuditRecommendation, Category, SkillAudit};
use crate::config::AuditConfig;
use crate::llm::collaborator::DocsCollaborator;
use crate::markdown;
use crate::pipeline::fetch::PageFetcher;
use crate::pipeline::summary::{SummaryEntry, SummaryIndex};
use crate::skills::{SkillDocument, SkillIndex};
use crate::util::word_tokens;

/// Inline code that names an API: `Topic`, `pubsub.NewTopic`, `api.raw()`.
static API_CLAIM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*(?:\(\))?$")
        .expect("valid api claim regex")
});

/// A documentation page as the comparison sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    /// Readable page text (tags stripped for HTML pages)
    pub text: String,
    /// Code snippets shown on the page
    pub snippets: Vec<String>,
}

impl FetchedPage {
    pub fn from_body(url: &str, body: &str) -> Self {
        Self {
            url: url.to_string(),
            text: markdown::page_text(body),
            snippets: markdown::page_code_snippets(body),
        }
    }
}

/// Path component of an absolute URL, or the whole string if it has none.
fn url_path(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    rest.find('/').map(|i| &rest[i..]).unwrap_or("")
}

/// Summary entries relevant to `skill`: entries from the skill's dialect
/// buckets whose description or URL path shares a token with its keywords.
/// Index order is kept and a URL is only returned once.
pub fn select_candidates<'a>(
    skill: &SkillDocument,
    indexes: &'a [SummaryIndex],
    stop_tokens: &[String],
) -> Vec<&'a SummaryEntry> {
    let buckets = skill.dialect.candidate_buckets();
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for index in indexes.iter().filter(|i| buckets.contains(&i.bucket)) {
        for entry in index.entries() {
            let mut tokens = word_tokens(&entry.description);
            tokens.extend(word_tokens(url_path(&entry.url)));
            tokens.retain(|t| !stop_tokens.iter().any(|s| s == t));

            if tokens.is_disjoint(&skill.keywords) {
                continue;
            }
            if seen.insert(entry.url.as_str()) {
                candidates.push(entry);
            }
        }
    }
    candidates
}

fn backticked<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    names
        .into_iter()
        .map(|n| format!("`{}`", n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lines of `code` that mention any of `names`, or the whole block if none do.
fn lines_mentioning(code: &str, names: &BTreeSet<String>) -> String {
    let lines: Vec<&str> = code
        .lines()
        .filter(|line| {
            shapes::identifier_set(line)
                .iter()
                .any(|id| names.contains(id))
        })
        .collect();
    if lines.is_empty() {
        code.trim().to_string()
    } else {
        lines.join("\n")
    }
}

/// Deterministic comparison of a skill against the union of `pages`.
///
/// Every code block whose framework API usages name identifiers the pages
/// never mention yields one recommendation: `Incorrect` when a documentation
/// snippet calls the same API with option names the skill lacks, `Outdated`
/// otherwise. When the skill imports nothing from `import_prefixes`, its
/// constructor and qualified calls stand in for framework usages, limited to
/// callees the pages name. API names quoted as inline code in the prose that
/// no page mentions yield a single `Missing` recommendation.
pub fn compare_structure(
    skill: &SkillDocument,
    pages: &[FetchedPage],
    import_prefixes: &[String],
) -> Vec<AuditRecommendation> {
    let mut docs_ids = HashSet::new();
    let mut snippets = Vec::new();
    for page in pages {
        docs_ids.extend(shapes::identifier_set(&page.text));
        snippets.extend(page.snippets.iter().cloned());
    }
    let skill_ids = shapes::identifier_set(&skill.body);

    let blocks = skill.code_blocks();
    // Imports shown once at the top of a skill apply to later fragments too.
    let mut imports = Imports::default();
    for block in &blocks {
        imports.merge(shapes::framework_imports(&block.code, import_prefixes));
    }

    let mut recommendations = Vec::new();
    for block in &blocks {
        let usages: Vec<shapes::ApiUsage> = if imports.is_empty() {
            // Import-less fragment: only calls of APIs the docs know about
            shapes::bare_usages(&block.code)
                .into_iter()
                .filter(|u| docs_ids.contains(u.call_name()))
                .collect()
        } else {
            shapes::api_usages(&block.code, &imports)
        };

        let mut missing = BTreeSet::new();
        for usage in &usages {
            missing.extend(
                usage
                    .identifiers()
                    .filter(|id| !docs_ids.contains(*id))
                    .cloned(),
            );
        }
        if missing.is_empty() {
            continue;
        }

        // A docs call of the same API with keys this skill never uses
        // is the renamed form of the stale ones.
        let replacement = usages
            .iter()
            .filter(|u| u.identifiers().any(|id| missing.contains(id)))
            .filter(|u| docs_ids.contains(u.call_name()))
            .flat_map(|u| shapes::docs_calls(u.call_name(), &snippets))
            .find_map(|call| {
                let fresh: BTreeSet<String> = call
                    .keys
                    .iter()
                    .filter(|k| !skill_ids.contains(*k))
                    .cloned()
                    .collect();
                (!fresh.is_empty()).then_some((fresh, call.snippet))
            });

        let current_text = lines_mentioning(&block.code, &missing);
        let recommendation = match replacement {
            Some((fresh, snippet)) => AuditRecommendation {
                skill_name: skill.name.clone(),
                category: Category::Incorrect,
                current_text,
                docs_text: snippet,
                suggested_change: format!(
                    "Replace {} with {} as used in the current documentation.",
                    backticked(&missing),
                    backticked(&fresh)
                ),
            },
            None => AuditRecommendation {
                skill_name: skill.name.clone(),
                category: Category::Outdated,
                current_text,
                docs_text: format!(
                    "{} not found in {} checked page(s).",
                    backticked(&missing),
                    pages.len()
                ),
                suggested_change: format!(
                    "Update or remove {} to match the current documentation.",
                    backticked(&missing)
                ),
            },
        };
        debug!(
            "{}: {} block mentions {}",
            skill.name,
            recommendation.category,
            backticked(&missing)
        );
        recommendations.push(recommendation);
    }

    let mut unsupported: Vec<String> = Vec::new();
    for span in markdown::inline_code_spans(&skill.prose()) {
        let is_api_like = API_CLAIM_RE.is_match(&span)
            && (span.contains('.')
                || span.ends_with("()")
                || span.chars().any(|c| c.is_ascii_uppercase()));
        if !is_api_like || unsupported.contains(&span) {
            continue;
        }
        let supported = shapes::identifier_set(&span)
            .iter()
            .all(|id| docs_ids.contains(id));
        if !supported {
            unsupported.push(span);
        }
    }
    if !unsupported.is_empty() {
        recommendations.push(AuditRecommendation {
            skill_name: skill.name.clone(),
            category: Category::Missing,
            current_text: backticked(&unsupported),
            docs_text: format!("Not mentioned in {} checked page(s).", pages.len()),
            suggested_change: format!(
                "Confirm {} still exists; correct or remove the claim.",
                backticked(&unsupported)
            ),
        });
    }

    recommendations
}

/// Recommendation for a skill no summary entry relates to.
fn no_candidates(skill: &SkillDocument) -> AuditRecommendation {
    let buckets = skill
        .dialect
        .candidate_buckets()
        .iter()
        .map(|b| b.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    AuditRecommendation {
        skill_name: skill.name.clone(),
        category: Category::Missing,
        current_text: format!("Keywords: {}", backticked(&skill.keywords)),
        docs_text: format!("No summary entry in the {} docs matches these keywords.", buckets),
        suggested_change: "Check that the topic is still documented, or add keywords that \
                           match its documentation pages."
            .to_string(),
    }
}

/// Audits skills one at a time. Pages are fetched sequentially and cached
/// for the lifetime of the matcher.
pub struct CrossReferenceMatcher<'a> {
    fetcher: &'a dyn PageFetcher,
    collaborator: Option<&'a dyn DocsCollaborator>,
    config: &'a AuditConfig,
    cache: HashMap<String, FetchedPage>,
}

impl<'a> CrossReferenceMatcher<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, config: &'a AuditConfig) -> Self {
        Self {
            fetcher,
            collaborator: None,
            config,
            cache: HashMap::new(),
        }
    }

    /// Also run the collaborator's free-form comparison on every candidate.
    pub fn with_collaborator(mut self, collaborator: &'a dyn DocsCollaborator) -> Self {
        self.collaborator = Some(collaborator);
        self
    }

    /// Number of distinct pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.cache.len()
    }

    async fn page(&mut self, url: &str) -> Result<FetchedPage> {
        if let Some(page) = self.cache.get(url) {
            debug!("Cache hit for {}", url);
            return Ok(page.clone());
        }
        let body = self.fetcher.fetch(url).await?;
        let page = FetchedPage::from_body(url, &body);
        self.cache.insert(url.to_string(), page.clone());
        Ok(page)
    }

    pub async fn audit_skill(
        &mut self,
        skill: &SkillDocument,
        indexes: &[SummaryIndex],
    ) -> Result<SkillAudit> {
        let candidates = select_candidates(skill, indexes, &self.config.stop_tokens);
        info!(
            "Auditing {} ({}): {} candidate page(s)",
            skill.name,
            skill.dialect,
            candidates.len()
        );

        let mut audit = SkillAudit {
            skill_name: skill.name.clone(),
            dialect: skill.dialect,
            sources: candidates.iter().map(|e| e.url.clone()).collect(),
            recommendations: Vec::new(),
        };

        if candidates.is_empty() {
            audit.recommendations.push(no_candidates(skill));
            return Ok(audit);
        }

        let mut pages = Vec::with_capacity(candidates.len());
        for entry in &candidates {
            let page = self
                .page(&entry.url)
                .await
                .with_context(|| format!("failed to fetch docs for skill {}", skill.name))?;
            pages.push(page);
        }

        audit.recommendations = compare_structure(skill, &pages, &self.config.import_prefixes);

        if let Some(collaborator) = self.collaborator {
            if self.config.llm_compare {
                for page in &pages {
                    let extra = collaborator
                        .compare(&skill.name, &skill.body, &page.url, &page.text)
                        .await?;
                    audit.recommendations.extend(extra);
                }
            }
        }

        Ok(audit)
    }

    /// Audit every skill in name order.
    pub async fn audit_all(
        &mut self,
        skills: &SkillIndex,
        indexes: &[SummaryIndex],
    ) -> Result<Vec<SkillAudit>> {
        let mut audits = Vec::with_capacity(skills.len());
        for skill in skills.skills() {
            audits.push(self.audit_skill(skill, indexes).await?);
        }
        let total: usize = audits.iter().map(|a| a.recommendations.len()).sum();
        info!(
            "Audited {} skills, {} recommendation(s), {} page(s) fetched",
            audits.len(),
            total,
            self.pages_fetched()
        );
        Ok(audits)
    }
}
