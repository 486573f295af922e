//! skillsync - Keep framework skill documents in sync with their documentation
//!
//! Crawls a documentation sitemap into per-dialect link lists, keeps
//! append-only page summary files current with an LLM summarizer, and audits
//! each SKILL.md against the pages its topic maps to, producing a Markdown
//! report of recommended updates.

pub mod audit;
pub mod cli;
pub mod config;
pub mod detector;
pub mod llm;
pub mod markdown;
pub mod pipeline;
pub mod skills;
pub mod util;
