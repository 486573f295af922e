pub mod audit;
pub mod fetch;
pub mod run;
pub mod sync;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::llm::client::{LlmClient, MockLlmClient};
use crate::llm::collaborator::LlmCollaborator;
use crate::llm::factory;
use crate::pipeline::fetch::HttpFetcher;
use crate::pipeline::store::FsStore;
use crate::pipeline::Pipeline;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct CommonArgs {
    pub config: Option<String>,
    /// Working directory holding link lists, summaries, skills and the report
    pub dir: PathBuf,
    pub dry_run: bool,
    pub model: Option<String>,
    pub provider: Option<String>,
}

/// Whether a command talks to the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmUse {
    /// Never consulted; no API key is looked up
    None,
    /// Page summaries
    Required,
    /// Only when `audit.llm_compare` is enabled
    AuditCompare,
}

/// Loaded configuration plus the real capabilities a command runs with.
pub struct Workspace {
    config: Config,
    fetcher: HttpFetcher,
    store: FsStore,
    collaborator: LlmCollaborator,
}

impl Workspace {
    pub fn open(args: CommonArgs, llm: LlmUse) -> Result<Self> {
        let config_path = args.config.clone().or_else(|| {
            // A workspace's own config wins over the process directory's
            let local = args.dir.join("skillsync.toml");
            local
                .is_file()
                .then(|| local.to_string_lossy().into_owned())
        });
        if let Some(ref cfg) = config_path {
            info!("Config: {}", cfg);
        }
        let mut config = Config::load_with_path(config_path)?;

        if let Some(provider) = args.provider {
            info!("CLI override: provider = {}", provider);
            config.llm.provider = provider;
        }
        if let Some(model) = args.model {
            info!("CLI override: model = {}", model);
            config.llm.model = model;
        }
        info!("Working directory: {}", args.dir.display());
        info!("Dry run: {}", args.dry_run);

        let needs_llm = match llm {
            LlmUse::None => false,
            LlmUse::Required => true,
            LlmUse::AuditCompare => config.audit.llm_compare,
        };
        let client: Box<dyn LlmClient> = if needs_llm {
            factory::create_client(&config, args.dry_run)?
        } else {
            Box::new(MockLlmClient::new())
        };
        let collaborator = LlmCollaborator::new(client, config.audit.max_page_chars);

        Ok(Self {
            fetcher: HttpFetcher::new(config.http.timeout_secs)?,
            store: FsStore::new(args.dir),
            collaborator,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pipeline(&self) -> Result<Pipeline<'_>> {
        Pipeline::new(
            self.config.clone(),
            &self.fetcher,
            &self.store,
            &self.collaborator,
        )
    }
}
