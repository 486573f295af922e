use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::pipeline::partition::{Bucket, BucketPattern};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sitemap: SitemapConfig,
    #[serde(default = "default_buckets")]
    pub buckets: Vec<BucketPattern>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    #[serde(default = "default_sitemap_url")]
    pub url: String,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            url: default_sitemap_url(),
        }
    }
}

/// Locations of the persisted artifacts, relative to the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding `ts.txt`, `go.txt`, `platform.txt`
    #[serde(default = "default_dot")]
    pub links_dir: PathBuf,

    /// Directory holding the `<bucket>-docs-summary.md` files
    #[serde(default = "default_dot")]
    pub summary_dir: PathBuf,

    /// Glob selecting skill documents
    #[serde(default = "default_skills_glob")]
    pub skills_glob: String,

    /// Audit report output
    #[serde(default = "default_report")]
    pub report: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            links_dir: default_dot(),
            summary_dir: default_dot(),
            skills_glob: default_skills_glob(),
            report: default_report(),
        }
    }
}

impl PathsConfig {
    pub fn links_file(&self, bucket: Bucket) -> PathBuf {
        self.links_dir.join(bucket.links_file_name())
    }

    pub fn summary_file(&self, bucket: Bucket) -> PathBuf {
        self.summary_dir.join(bucket.summary_file_name())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Also ask the LLM collaborator to compare each skill against each page
    #[serde(default)]
    pub llm_compare: bool,

    /// Tokens too generic to link a skill to a page (product and dialect names)
    #[serde(default = "default_stop_tokens")]
    pub stop_tokens: Vec<String>,

    /// Page text sent to the LLM is truncated to this many bytes
    #[serde(default = "default_max_page_chars")]
    pub max_page_chars: usize,

    /// Import paths that mark a code symbol as framework API
    #[serde(default = "default_import_prefixes")]
    pub import_prefixes: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            llm_compare: false,
            stop_tokens: default_stop_tokens(),
            max_page_chars: default_max_page_chars(),
            import_prefixes: default_import_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>, // For OpenAI-compatible APIs

    /// Optional: Override max_tokens for LLM requests
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Request timeout for LLM calls in seconds (default: 120)
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: Some("AI_API_KEY".to_string()),
            base_url: None,
            max_tokens: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    /// Get max_tokens value, using provider-specific default if not specified.
    /// Summaries are short, so the defaults stay small.
    pub fn get_max_tokens(&self) -> u32 {
        if let Some(tokens) = self.max_tokens {
            return tokens;
        }

        match self.provider.as_str() {
            "openai-compatible" => 4096, // ollama and similar
            _ => 2048,
        }
    }
}

fn default_sitemap_url() -> String {
    "https://encore.dev/sitemap.xml".to_string()
}

fn default_buckets() -> Vec<BucketPattern> {
    vec![
        BucketPattern::new(Bucket::Ts, "/docs/ts"),
        BucketPattern::new(Bucket::Go, "/docs/go"),
        BucketPattern::new(Bucket::Platform, "/docs/platform"),
    ]
}

fn default_dot() -> PathBuf {
    PathBuf::from(".")
}

fn default_skills_glob() -> String {
    "skills/*/SKILL.md".to_string()
}

fn default_report() -> PathBuf {
    PathBuf::from("update-skills.md")
}

fn default_stop_tokens() -> Vec<String> {
    [
        "encore", "dev", "docs", "ts", "go", "typescript", "golang", "https", "http", "www",
        "the", "and", "for", "with", "how", "use", "using", "a", "an", "of", "to", "in", "on",
        "is", "your",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_page_chars() -> usize {
    60_000
}

fn default_import_prefixes() -> Vec<String> {
    vec!["encore.dev".to_string()]
}

fn default_llm_timeout() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sitemap: SitemapConfig::default(),
            buckets: default_buckets(),
            paths: PathsConfig::default(),
            http: HttpConfig::default(),
            audit: AuditConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Config {
    /// Load config from the working directory or user config directory
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Load configuration from a specific path, or use default search paths
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        // An explicit path must exist and parse
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path);
        }

        if let Ok(config) = Self::load_from_path("skillsync.toml") {
            debug!("Loaded config from ./skillsync.toml");
            return Ok(config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("skillsync").join("config.toml");
            if let Ok(config) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sitemap.url.trim().is_empty() {
            bail!("sitemap.url must not be empty");
        }
        for (i, b) in self.buckets.iter().enumerate() {
            if b.pattern.is_empty() {
                bail!("Bucket {} has an empty pattern", b.bucket);
            }
            if self.buckets[..i].iter().any(|other| other.bucket == b.bucket) {
                bail!("Bucket {} is configured more than once", b.bucket);
            }
        }
        Ok(())
    }

    /// Get API key from environment variable specified in config
    pub fn get_api_key(&self) -> Result<String> {
        match &self.llm.api_key_env {
            Some(env_var) => {
                // "none" means no API key needed (e.g., Ollama)
                if env_var.to_lowercase() == "none" {
                    return Ok(String::new());
                }

                // Local OpenAI-compatible servers usually need no key
                if self.llm.provider == "openai-compatible" {
                    return Ok(env::var(env_var).unwrap_or_default());
                }

                env::var(env_var).map_err(|_| {
                    anyhow::anyhow!("API key not found in environment variable: {}", env_var)
                })
            }
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sitemap.url, "https://encore.dev/sitemap.xml");
        assert_eq!(config.buckets.len(), 3);
        assert_eq!(config.buckets[0].bucket, Bucket::Ts);
        assert_eq!(config.paths.report, PathBuf::from("update-skills.md"));
        assert!(!config.audit.llm_compare);
        assert_eq!(config.audit.import_prefixes, vec!["encore.dev".to_string()]);
        assert!(config.http.timeout_secs.is_none());
        assert_eq!(config.llm.provider, "anthropic");
    }

    #[test]
    fn test_paths_helpers() {
        let paths = PathsConfig {
            links_dir: PathBuf::from("links"),
            summary_dir: PathBuf::from("summaries"),
            ..PathsConfig::default()
        };
        assert_eq!(paths.links_file(Bucket::Go), PathBuf::from("links/go.txt"));
        assert_eq!(
            paths.summary_file(Bucket::Ts),
            PathBuf::from("summaries/ts-docs-summary.md")
        );
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("bucket = \"platform\""));
        let back: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.buckets, config.buckets);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[sitemap]
url = "https://example.com/sitemap.xml"

[[buckets]]
bucket = "go"
pattern = "/go/"
"#,
        )
        .unwrap();
        assert_eq!(config.sitemap.url, "https://example.com/sitemap.xml");
        assert_eq!(config.buckets, vec![BucketPattern::new(Bucket::Go, "/go/")]);
        assert_eq!(config.paths.skills_glob, "skills/*/SKILL.md");
        assert_eq!(config.llm.timeout_secs, 120);
    }

    #[test]
    fn test_unknown_bucket_rejected() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[[buckets]]\nbucket = \"rust\"\npattern = \"/rs\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.buckets.push(BucketPattern::new(Bucket::Ts, "/ts/"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));

        let mut config = Config::default();
        config.buckets[1].pattern.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sitemap.url = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        assert!(Config::load_with_path(Some("/nonexistent/skillsync.toml".to_string())).is_err());
    }

    #[test]
    fn test_max_tokens_defaults() {
        let mut llm = LlmConfig::default();
        assert_eq!(llm.get_max_tokens(), 2048);
        llm.provider = "openai-compatible".to_string();
        assert_eq!(llm.get_max_tokens(), 4096);
        llm.max_tokens = Some(300);
        assert_eq!(llm.get_max_tokens(), 300);
    }

    #[test]
    #[serial]
    fn test_api_key_from_env() {
        env::set_var("SKILLSYNC_TEST_API_KEY", "test_key_123");
        let mut config = Config::default();
        config.llm.api_key_env = Some("SKILLSYNC_TEST_API_KEY".to_string());
        assert_eq!(config.get_api_key().unwrap(), "test_key_123");
        env::remove_var("SKILLSYNC_TEST_API_KEY");
    }

    #[test]
    #[serial]
    fn test_api_key_missing_fails() {
        let mut config = Config::default();
        config.llm.api_key_env = Some("SKILLSYNC_NONEXISTENT_KEY_XYZ".to_string());
        assert!(config.get_api_key().is_err());
    }

    #[test]
    fn test_api_key_none_for_ollama() {
        let mut config = Config::default();
        config.llm.api_key_env = Some("none".to_string());
        assert_eq!(config.get_api_key().unwrap(), "");
    }
}
