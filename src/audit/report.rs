//! `update-skills.md`: the audit report, regenerated in full on every run.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use super::{AuditRecommendation, SkillAudit};
use crate::pipeline::store::Store;

pub const REPORT_TITLE: &str = "# Skill Update Recommendations";

/// Render one section per skill, sorted by skill name.
pub fn render_report(audits: &[SkillAudit]) -> String {
    let mut sorted: Vec<&SkillAudit> = audits.iter().collect();
    sorted.sort_by(|a, b| a.skill_name.cmp(&b.skill_name));

    let total: usize = sorted.iter().map(|a| a.recommendations.len()).sum();
    let mut out = String::new();
    out.push_str(REPORT_TITLE);
    out.push_str("\n\n");
    out.push_str(&format!(
        "{} skill(s) audited, {} recommendation(s).\n",
        sorted.len(),
        total
    ));

    for audit in sorted {
        render_skill(&mut out, audit);
    }
    out
}

fn render_skill(out: &mut String, audit: &SkillAudit) {
    out.push_str(&format!(
        "\n## {}\n\n**Dialect:** {}\n\n### Sources checked\n\n",
        audit.skill_name, audit.dialect
    ));
    if audit.sources.is_empty() {
        out.push_str("- (none)\n");
    }
    for url in &audit.sources {
        out.push_str(&format!("- {}\n", url));
    }

    out.push_str("\n### Recommended Updates\n\n");
    if audit.recommendations.is_empty() {
        out.push_str("No updates recommended.\n");
        return;
    }
    for (i, rec) in audit.recommendations.iter().enumerate() {
        render_recommendation(out, i + 1, rec);
    }
}

fn render_recommendation(out: &mut String, number: usize, rec: &AuditRecommendation) {
    let marker = format!("{}. ", number);
    let indent = " ".repeat(marker.len());

    out.push_str(&format!("{}**Category:** {}\n", marker, rec.category));
    render_field(out, &indent, "Current", &rec.current_text);
    render_field(out, &indent, "Docs say", &rec.docs_text);
    render_field(out, &indent, "Recommended change", &rec.suggested_change);
    out.push('\n');
}

/// Single-line values follow the label; multi-line values go in a fence
/// indented under the list item.
fn render_field(out: &mut String, indent: &str, label: &str, value: &str) {
    let value = value.trim_end();
    if value.is_empty() {
        out.push_str(&format!("{}**{}:** (none)\n", indent, label));
        return;
    }
    if !value.contains('\n') {
        out.push_str(&format!("{}**{}:** {}\n", indent, label, value));
        return;
    }

    let fence = fence_for(value);
    out.push_str(&format!("{}**{}:**\n", indent, label));
    out.push_str(&format!("{}{}\n", indent, fence));
    for line in value.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&format!("{}{}\n", indent, line));
        }
    }
    out.push_str(&format!("{}{}\n", indent, fence));
}

/// A backtick fence longer than any backtick run inside `value`.
fn fence_for(value: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in value.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

/// Render and write the report, replacing any previous one.
pub fn write_report(store: &dyn Store, path: &Path, audits: &[SkillAudit]) -> Result<()> {
    let report = render_report(audits);
    store
        .write(path, &report)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    info!("Wrote {} ({} skills)", path.display(), audits.len());
    Ok(())
}
