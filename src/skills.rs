//! Skill documents: the static SKILL.md corpus, loaded fresh on each audit.

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::detector::{detect_dialect, Dialect};
use crate::markdown::{self, CodeBlock};
use crate::pipeline::store::Store;
use crate::util::word_tokens;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillDocument {
    pub name: String,
    pub dialect: Dialect,
    pub keywords: BTreeSet<String>,
    /// Document text after the frontmatter
    pub body: String,
    pub path: PathBuf,
}

impl SkillDocument {
    /// Parse a skill document. `path` supplies the fallback name (its parent
    /// directory, or the file stem) when the frontmatter has no `name`.
    pub fn parse(path: &Path, text: &str, stop_tokens: &[String]) -> Self {
        let (fields, body) = markdown::split_frontmatter(text);

        let name = fields
            .get("name")
            .filter(|n| !n.is_empty())
            .cloned()
            .unwrap_or_else(|| fallback_name(path));

        let hint = fields
            .get("dialect")
            .or_else(|| fields.get("language"))
            .map(String::as_str);
        let blocks = markdown::fenced_blocks(body);
        let mut text = fields.get("description").cloned().unwrap_or_default();
        text.push('\n');
        text.push_str(&markdown::prose(body));
        let dialect = detect_dialect(hint, &name, &text, &blocks);

        let mut keywords = word_tokens(&name);
        for key in ["keywords", "tags"] {
            if let Some(value) = fields.get(key) {
                for item in markdown::parse_list(value) {
                    keywords.extend(word_tokens(&item));
                }
            }
        }
        keywords.retain(|k| !stop_tokens.iter().any(|s| s == k));

        Self {
            name,
            dialect,
            keywords,
            body: body.to_string(),
            path: path.to_path_buf(),
        }
    }

    pub fn code_blocks(&self) -> Vec<CodeBlock> {
        markdown::fenced_blocks(&self.body)
    }

    /// Body with code blocks removed.
    pub fn prose(&self) -> String {
        markdown::prose(&self.body)
    }
}

fn fallback_name(path: &Path) -> String {
    let from_dir = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != ".");
    let from_stem = path.file_stem().and_then(|n| n.to_str());
    from_dir.or(from_stem).unwrap_or("skill").to_string()
}

/// All skill documents of one audit run, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct SkillIndex {
    skills: Vec<SkillDocument>,
}

impl SkillIndex {
    /// Build an index, rejecting duplicate skill names.
    pub fn from_documents(mut skills: Vec<SkillDocument>) -> Result<Self> {
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        for pair in skills.windows(2) {
            if pair[0].name == pair[1].name {
                bail!(
                    "Duplicate skill name '{}' in {} and {}",
                    pair[0].name,
                    pair[0].path.display(),
                    pair[1].path.display()
                );
            }
        }
        Ok(Self { skills })
    }

    /// Load every document matching `pattern` from `store`.
    pub fn load(store: &dyn Store, pattern: &str, stop_tokens: &[String]) -> Result<Self> {
        let mut skills = Vec::new();
        for path in store.list(pattern)? {
            let text = store
                .read(&path)?
                .with_context(|| format!("skill document vanished: {}", path.display()))?;
            let skill = SkillDocument::parse(&path, &text, stop_tokens);
            debug!(
                "Loaded skill {} ({}, keywords: {:?})",
                skill.name, skill.dialect, skill.keywords
            );
            skills.push(skill);
        }
        info!("Loaded {} skill documents matching {}", skills.len(), pattern);
        Self::from_documents(skills)
    }

    pub fn skills(&self) -> &[SkillDocument] {
        &self.skills
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SkillDocument> {
        self.skills.iter().find(|s| s.name == name)
    }
}
