use anyhow::Result;

use super::{CommonArgs, LlmUse, Workspace};

pub async fn run(args: CommonArgs) -> Result<()> {
    let workspace = Workspace::open(args, LlmUse::None)?;
    let mut pipeline = workspace.pipeline()?;
    let buckets = pipeline.fetch().await?;

    for bucket in &buckets {
        println!(
            "{}: {} links",
            workspace.config().paths.links_file(bucket.bucket).display(),
            bucket.urls.len()
        );
    }
    Ok(())
}
