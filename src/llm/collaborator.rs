//! The non-deterministic half of the workflow: page summaries and
//! free-form skill comparison, both delegated to an LLM.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::str::FromStr;
use tracing::{debug, warn};

use super::client::LlmClient;
use super::prompts;
use crate::audit::{AuditRecommendation, Category};
use crate::util::{single_line, truncate_on_char_boundary};

/// External capability that writes summaries and judges skills.
#[async_trait]
pub trait DocsCollaborator: Send + Sync {
    /// One or two sentence description of a documentation page.
    async fn summarize(&self, url: &str, page_text: &str) -> Result<String>;

    /// Divergences between a skill document and one documentation page.
    async fn compare(
        &self,
        skill_name: &str,
        skill_body: &str,
        url: &str,
        page_text: &str,
    ) -> Result<Vec<AuditRecommendation>>;
}

/// `DocsCollaborator` backed by an [`LlmClient`].
pub struct LlmCollaborator {
    client: Box<dyn LlmClient>,
    max_page_chars: usize,
}

impl LlmCollaborator {
    pub fn new(client: Box<dyn LlmClient>, max_page_chars: usize) -> Self {
        Self {
            client,
            max_page_chars,
        }
    }
}

#[async_trait]
impl DocsCollaborator for LlmCollaborator {
    async fn summarize(&self, url: &str, page_text: &str) -> Result<String> {
        let page = truncate_on_char_boundary(page_text, self.max_page_chars);
        let prompt = prompts::summarize_prompt(url, page);
        let response = self
            .client
            .complete(&prompt)
            .await
            .with_context(|| format!("summary LLM call failed for {}", url))?;

        let summary = single_line(response.trim().trim_matches('"'));
        if summary.is_empty() {
            bail!("LLM returned an empty summary for {}", url);
        }
        Ok(summary)
    }

    async fn compare(
        &self,
        skill_name: &str,
        skill_body: &str,
        url: &str,
        page_text: &str,
    ) -> Result<Vec<AuditRecommendation>> {
        let page = truncate_on_char_boundary(page_text, self.max_page_chars);
        let prompt = prompts::compare_prompt(skill_name, skill_body, url, page);
        let response = self
            .client
            .complete(&prompt)
            .await
            .with_context(|| {
                format!("compare LLM call failed for {} against {}", skill_name, url)
            })?;
        Ok(parse_compare_response(skill_name, &response))
    }
}

/// Parse the compare JSON. Unparseable output counts as "no findings" so a
/// flaky answer never invents recommendations.
fn parse_compare_response(skill_name: &str, response: &str) -> Vec<AuditRecommendation> {
    let json_str = extract_json_block(response);
    let parsed: serde_json::Value = match serde_json::from_str(&json_str) {
        Ok(v) => v,
        Err(e) => {
            warn!("compare: failed to parse LLM JSON for {}: {}", skill_name, e);
            return Vec::new();
        }
    };

    let items = parsed
        .get("recommendations")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let field = |item: &serde_json::Value, key: &str| {
        item.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string()
    };

    items
        .iter()
        .filter_map(|item| {
            let category = item
                .get("category")
                .and_then(|v| v.as_str())
                .and_then(|c| Category::from_str(c).ok());
            let Some(category) = category else {
                debug!("compare: skipping item without a known category");
                return None;
            };
            let suggested_change = field(item, "change");
            if suggested_change.is_empty() {
                return None;
            }
            Some(AuditRecommendation {
                skill_name: skill_name.to_string(),
                category,
                current_text: field(item, "current"),
                docs_text: field(item, "docs"),
                suggested_change,
            })
        })
        .collect()
}

/// Extract a JSON object from a string that may have markdown fences or preamble text.
fn extract_json_block(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return trimmed[start + 7..start + 7 + end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                return trimmed[start..=end].to_string();
            }
        }
    }

    trimmed.to_string()
}
