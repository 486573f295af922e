use anyhow::Result;

use super::audit::print_audits;
use super::{CommonArgs, LlmUse, Workspace};

pub async fn run(args: CommonArgs) -> Result<()> {
    let workspace = Workspace::open(args, LlmUse::Required)?;
    let mut pipeline = workspace.pipeline()?;
    let outcome = pipeline.run().await?;

    println!(
        "Added {} summaries ({} stale kept)",
        outcome.sync.added, outcome.sync.stale
    );
    print_audits(&workspace.config().paths.report, &outcome.audits);
    Ok(())
}
