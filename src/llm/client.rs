use anyhow::Result;
use async_trait::async_trait;

use super::prompts::{COMPARE_MARKER, SUMMARIZE_MARKER};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Offline client for `--dry-run`. Answers summarize prompts with a fixed
/// sentence and compare prompts with "no findings".
pub struct MockLlmClient;

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.contains(SUMMARIZE_MARKER) {
            Ok("Placeholder summary generated in dry-run mode.".to_string())
        } else if prompt.contains(COMPARE_MARKER) {
            Ok(r#"{"recommendations": []}"#.to_string())
        } else {
            Ok(r#"{"status": "mock"}"#.to_string())
        }
    }
}
