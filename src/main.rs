use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use skillsync::cli::{self, CommonArgs};

#[derive(Parser)]
#[command(name = "skillsync", version)]
#[command(
    about = "Sync documentation link lists and summaries, and audit skill documents against them",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    common: GlobalArgs,
}

#[derive(Args, Debug, Clone)]
struct GlobalArgs {
    /// Path to config file (defaults to ./skillsync.toml or ~/.config/skillsync/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory holding link lists, summaries, skills and the report
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,

    /// Use mock LLM client for testing
    #[arg(long, global = true)]
    dry_run: bool,

    /// Override LLM model (e.g., "claude-sonnet-4-20250514", "gpt-4o")
    #[arg(long, global = true)]
    model: Option<String>,

    /// Override LLM provider (anthropic, openai, openai-compatible)
    #[arg(long, global = true)]
    provider: Option<String>,
}

impl From<GlobalArgs> for CommonArgs {
    fn from(args: GlobalArgs) -> Self {
        CommonArgs {
            config: args.config,
            dir: args.dir,
            dry_run: args.dry_run,
            model: args.model,
            provider: args.provider,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Fetch the sitemap and rewrite the per-bucket link lists (default)
    Fetch,
    /// Fetch, then summarize pages missing from the summary files
    Sync,
    /// Audit skill documents against the summarized pages and write the report
    Audit,
    /// Sync followed by audit
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let args = CommonArgs::from(cli.common);

    match cli.command.unwrap_or(Commands::Fetch) {
        Commands::Fetch => cli::fetch::run(args).await?,
        Commands::Sync => cli::sync::run(args).await?,
        Commands::Audit => cli::audit::run(args).await?,
        Commands::Run => cli::run::run(args).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_no_subcommand_defaults() {
        let cli = Cli::try_parse_from(["skillsync"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.common.dir, PathBuf::from("."));
        assert!(cli.common.config.is_none());
        assert!(!cli.common.dry_run);
    }

    #[test]
    fn test_parse_subcommands() {
        for (name, expected) in [
            ("fetch", Commands::Fetch),
            ("sync", Commands::Sync),
            ("audit", Commands::Audit),
            ("run", Commands::Run),
        ] {
            let cli = Cli::try_parse_from(["skillsync", name]).unwrap();
            assert_eq!(cli.command, Some(expected));
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "skillsync",
            "run",
            "--config",
            "ci.toml",
            "--dir",
            "/tmp/skills-repo",
            "--model",
            "gpt-4o",
            "--provider",
            "openai",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Run));
        let args = CommonArgs::from(cli.common);
        assert_eq!(args.config.as_deref(), Some("ci.toml"));
        assert_eq!(args.dir, PathBuf::from("/tmp/skills-repo"));
        assert_eq!(args.model.as_deref(), Some("gpt-4o"));
        assert_eq!(args.provider.as_deref(), Some("openai"));
        assert!(args.dry_run);
    }

    #[test]
    fn test_parse_unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["skillsync", "generate"]).is_err());
    }
}
