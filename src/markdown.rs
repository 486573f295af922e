//! Minimal Markdown/HTML helpers for skill documents and fetched doc pages.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`\n]+)`").expect("valid inline code regex"));
static PRE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<pre[^>]*>(.*?)</pre>").expect("valid pre regex"));
static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid script regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag regex"));

/// A fenced code block: the info-string language (if any) and its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub lang: Option<String>,
    pub code: String,
}

/// Split a leading `---` frontmatter block from the document.
///
/// Returns the `key: value` fields (keys lowercased) and the remaining body.
/// YAML list items under a key (`  - item`) are joined into a comma-separated
/// value. Documents without frontmatter return an empty map and the full text.
pub fn split_frontmatter(doc: &str) -> (BTreeMap<String, String>, &str) {
    let mut fields = BTreeMap::new();
    let Some(rest) = doc.strip_prefix("---") else {
        return (fields, doc);
    };
    let Some(end) = rest.find("\n---") else {
        return (fields, doc);
    };
    let block = &rest[..end];
    let after = &rest[end + 4..];
    let body = after.strip_prefix('\n').unwrap_or(after);

    let mut current_key: Option<String> = None;
    for line in block.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(item) = trimmed.strip_prefix("- ") {
            if let Some(key) = &current_key {
                let entry: &mut String = fields.entry(key.clone()).or_default();
                if !entry.is_empty() {
                    entry.push_str(", ");
                }
                entry.push_str(unquote(item.trim()));
            }
            continue;
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            let key = key.trim().to_lowercase();
            fields.insert(key.clone(), unquote(value.trim()).to_string());
            current_key = Some(key);
        }
    }

    (fields, body)
}

fn unquote(s: &str) -> &str {
    s.trim_matches('"').trim_matches('\'')
}

/// Parse a frontmatter list value: `[a, b]`, `a, b` or a single item.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|item| unquote(item.trim()).trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// All ``` fenced code blocks in document order. An unterminated fence runs
/// to the end of the document.
pub fn fenced_blocks(doc: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<(Option<String>, Vec<&str>)> = None;

    for line in doc.lines() {
        let trimmed = line.trim_start();
        if let Some(info) = trimmed.strip_prefix("```") {
            match current.take() {
                Some((lang, lines)) => blocks.push(CodeBlock {
                    lang,
                    code: lines.join("\n"),
                }),
                None => {
                    let lang = info
                        .split_whitespace()
                        .next()
                        .map(|l| l.to_lowercase())
                        .filter(|l| !l.is_empty());
                    current = Some((lang, Vec::new()));
                }
            }
            continue;
        }
        if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some((lang, lines)) = current {
        blocks.push(CodeBlock {
            lang,
            code: lines.join("\n"),
        });
    }
    blocks
}

/// The document with every fenced code block removed.
pub fn prose(doc: &str) -> String {
    let mut out = String::new();
    let mut in_fence = false;
    for line in doc.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Contents of `inline code` spans, in order.
pub fn inline_code_spans(text: &str) -> Vec<String> {
    INLINE_CODE_RE
        .captures_iter(text)
        .map(|cap| cap[1].trim().to_string())
        .collect()
}

pub fn looks_like_html(doc: &str) -> bool {
    let head = doc.trim_start();
    let head = &head[..head.len().min(512)];
    let lower = head.to_ascii_lowercase();
    lower.starts_with("<!doctype html") || lower.starts_with("<html") || lower.contains("<body")
}

/// Strip tags from an HTML page and decode the common entities.
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_STYLE_RE.replace_all(html, " ");
    let text = TAG_RE.replace_all(&without_scripts, " ");
    decode_entities(&text)
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Code snippets of a documentation page: `<pre>` blocks for HTML pages,
/// fenced blocks otherwise.
pub fn page_code_snippets(page: &str) -> Vec<String> {
    if looks_like_html(page) {
        PRE_BLOCK_RE
            .captures_iter(page)
            .map(|cap| html_to_text(&cap[1]))
            .collect()
    } else {
        fenced_blocks(page).into_iter().map(|b| b.code).collect()
    }
}

/// Readable text of a documentation page, whichever format it was served in.
pub fn page_text(page: &str) -> String {
    if looks_like_html(page) {
        html_to_text(page)
    } else {
        page.to_string()
    }
}
