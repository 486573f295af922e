use anyhow::Result;
use std::path::Path;

use super::{CommonArgs, LlmUse, Workspace};
use crate::audit::SkillAudit;

/// One line per skill plus the report location.
pub(crate) fn print_audits(report: &Path, audits: &[SkillAudit]) {
    for audit in audits {
        println!(
            "{} ({}): {} recommendation(s) from {} page(s)",
            audit.skill_name,
            audit.dialect,
            audit.recommendations.len(),
            audit.sources.len()
        );
    }
    println!("Report written to {}", report.display());
}

pub async fn run(args: CommonArgs) -> Result<()> {
    let workspace = Workspace::open(args, LlmUse::AuditCompare)?;
    let mut pipeline = workspace.pipeline()?;
    let audits = pipeline.audit().await?;

    print_audits(&workspace.config().paths.report, &audits);
    Ok(())
}
