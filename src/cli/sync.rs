use anyhow::Result;

use super::{CommonArgs, LlmUse, Workspace};

pub async fn run(args: CommonArgs) -> Result<()> {
    let workspace = Workspace::open(args, LlmUse::Required)?;
    let mut pipeline = workspace.pipeline()?;
    let outcome = pipeline.sync().await?;

    for index in &outcome.indexes {
        println!(
            "{}: {} summaries",
            workspace.config().paths.summary_file(index.bucket).display(),
            index.len()
        );
    }
    println!("Added {} summaries", outcome.added);
    if outcome.stale > 0 {
        println!(
            "{} summarized pages are no longer in the sitemap (kept)",
            outcome.stale
        );
    }
    Ok(())
}
