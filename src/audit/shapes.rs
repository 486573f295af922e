//! Code-shape extraction for TypeScript and Go snippets.
//!
//! A code shape is the set of framework API usages in a snippet: the API
//! name and the option keys passed to it directly as an object or struct
//! literal. Locally declared names (variables, handlers, event types) are
//! never part of a shape, so they are not expected to appear in the docs.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};

static TS_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s+(?:type\s+)?\{([^}]*)\}\s*from\s*["']([^"']+)["']\s*;?"#)
        .expect("valid ts import regex")
});
static GO_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*(?:import\s+)?(?:([A-Za-z_]\w*)\s+)?"([^"\s]+)"\s*$"#)
        .expect("valid go import regex")
});
static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("valid identifier regex"));
static NEW_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bnew\s+([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*)").expect("valid constructor regex")
});
static QUALIFIED_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_]\w*)\.([A-Za-z_]\w*)").expect("valid qualified call regex")
});
static PROPERTY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*:(?:[^:=]|$)").expect("valid property regex")
});

/// Framework names a snippet imports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Imports {
    /// TypeScript local binding -> exported name
    pub ts_names: BTreeMap<String, String>,
    /// Go package identifiers
    pub go_packages: BTreeSet<String>,
}

impl Imports {
    pub fn is_empty(&self) -> bool {
        self.ts_names.is_empty() && self.go_packages.is_empty()
    }

    pub fn merge(&mut self, other: Imports) {
        self.ts_names.extend(other.ts_names);
        self.go_packages.extend(other.go_packages);
    }
}

/// One use of a framework API inside a snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUsage {
    /// Display name, e.g. `Topic`, `api.raw` or `pubsub.NewTopic`
    pub api: String,
    /// Identifiers the documentation must contain for this usage to be current
    pub names: Vec<String>,
    /// Option keys passed directly in an object/struct literal
    pub keys: BTreeSet<String>,
}

impl ApiUsage {
    /// Name used to find the same call in documentation snippets.
    pub fn call_name(&self) -> &str {
        self.names.last().map(String::as_str).unwrap_or(&self.api)
    }

    /// Every identifier this usage depends on.
    pub fn identifiers(&self) -> impl Iterator<Item = &String> {
        self.names.iter().chain(self.keys.iter())
    }
}

/// Framework imports of `code`. Only module paths starting with one of
/// `prefixes` count.
pub fn framework_imports(code: &str, prefixes: &[String]) -> Imports {
    let is_framework = |path: &str| prefixes.iter().any(|p| path.starts_with(p.as_str()));
    let mut imports = Imports::default();

    for cap in TS_IMPORT_RE.captures_iter(code) {
        if !is_framework(&cap[2]) {
            continue;
        }
        for item in cap[1].split(',') {
            let item = item.trim().trim_start_matches("type ").trim();
            if item.is_empty() {
                continue;
            }
            let (exported, local) = match item.split_once(" as ") {
                Some((exported, local)) => (exported.trim(), local.trim()),
                None => (item, item),
            };
            imports
                .ts_names
                .insert(local.to_string(), exported.to_string());
        }
    }

    for cap in GO_IMPORT_RE.captures_iter(code) {
        let path = &cap[2];
        if !is_framework(path) {
            continue;
        }
        let package = match cap.get(1) {
            Some(alias) => alias.as_str().to_string(),
            None => path.rsplit('/').next().unwrap_or(path).to_string(),
        };
        if package != "_" {
            imports.go_packages.insert(package);
        }
    }

    imports
}

/// Replace comments and string-literal contents with spaces, keeping byte
/// offsets and newlines, so structure can be scanned without tripping over
/// text.
pub fn mask_code(code: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str(char),
    }

    let mut out = String::with_capacity(code.len());
    let mut state = State::Code;
    let mut chars = code.chars().peekable();
    let blank = |out: &mut String, c: char| {
        if c == '\n' {
            out.push('\n');
        } else {
            out.extend(std::iter::repeat(' ').take(c.len_utf8()));
        }
    };

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::BlockComment;
                }
                '"' | '\'' | '`' => {
                    out.push(c);
                    state = State::Str(c);
                }
                _ => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                }
                blank(&mut out, c);
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
            State::Str(quote) => {
                if c == '\\' {
                    blank(&mut out, c);
                    if let Some(escaped) = chars.next() {
                        blank(&mut out, escaped);
                    }
                } else if c == quote {
                    out.push(c);
                    state = State::Code;
                } else if c == '\n' && quote != '`' {
                    // Unterminated single-line string
                    out.push('\n');
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
        }
    }
    out
}

/// Skip whitespace from `pos`, then an optional generic argument list
/// (`<...>` or `[...]`). Returns the offset of a following opener, if the
/// opener is one of `openers`.
fn opener_after(masked: &str, pos: usize, openers: &[u8]) -> Option<usize> {
    let bytes = masked.as_bytes();
    let skip_ws = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    };

    let mut i = skip_ws(pos);
    if i < bytes.len() && (bytes[i] == b'<' || bytes[i] == b'[') {
        let (open, close) = if bytes[i] == b'<' { (b'<', b'>') } else { (b'[', b']') };
        let mut depth = 0usize;
        while i < bytes.len() {
            if bytes[i] == open {
                depth += 1;
            } else if bytes[i] == close {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            } else if bytes[i] == b';' || bytes[i] == b'{' || (bytes[i] == b'(' && open == b'<') {
                // Not a generic list (e.g. a comparison)
                return None;
            }
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        i = skip_ws(i + 1);
    }

    if i < bytes.len() && openers.contains(&bytes[i]) {
        Some(i)
    } else {
        None
    }
}

/// Keys of object/struct literals passed directly to the call or literal
/// opening at `open`.
///
/// For `(`, only properties of `{...}` arguments count; for `{`, the
/// literal's own fields. Properties inside nested function bodies or
/// nested literals are ignored.
pub fn literal_keys(masked: &str, open: usize) -> BTreeSet<String> {
    let bytes = masked.as_bytes();
    let target_depth = if bytes.get(open) == Some(&b'{') { 1 } else { 2 };
    let mut stack: Vec<u8> = Vec::new();
    let mut keys = BTreeSet::new();

    let key_at = |at: usize| {
        PROPERTY_RE
            .captures(&masked[at..])
            .map(|cap| cap[1].to_string())
    };

    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            c @ (b'(' | b'[' | b'{') => {
                stack.push(c);
                if c == b'{' && stack.len() == target_depth {
                    keys.extend(key_at(i + 1));
                }
            }
            b')' | b']' | b'}' => {
                stack.pop();
                if stack.is_empty() {
                    break;
                }
            }
            b',' if stack.len() == target_depth && stack.last() == Some(&b'{') => {
                keys.extend(key_at(i + 1));
            }
            _ => {}
        }
        i += 1;
    }
    keys
}

fn usage_regex(prefix: &str, name: &str) -> Option<Regex> {
    Regex::new(&format!(r"{}\b{}\b", prefix, regex::escape(name))).ok()
}

/// Framework API usages in `code`, given the imports in scope.
pub fn api_usages(code: &str, imports: &Imports) -> Vec<ApiUsage> {
    let masked = mask_code(code);
    // Import statements name every API once; they are not usages.
    let masked = TS_IMPORT_RE
        .replace_all(&masked, |caps: &regex::Captures| " ".repeat(caps[0].len()))
        .into_owned();
    let mut usages = Vec::new();

    for package in &imports.go_packages {
        let Some(re) = Regex::new(&format!(r"\b{}\.([A-Za-z_]\w*)", regex::escape(package))).ok()
        else {
            continue;
        };
        for cap in re.captures_iter(&masked) {
            let whole = cap.get(0).map(|m| m.end()).unwrap_or(0);
            let name = cap[1].to_string();
            let keys = opener_after(&masked, whole, b"({")
                .map(|open| literal_keys(&masked, open))
                .unwrap_or_default();
            usages.push(ApiUsage {
                api: format!("{}.{}", package, name),
                names: vec![name],
                keys,
            });
        }
    }

    for (local, exported) in &imports.ts_names {
        let Some(re) = Regex::new(&format!(
            r"\b{}\b(?:\s*\.\s*([A-Za-z_]\w*))?",
            regex::escape(local)
        ))
        .ok() else {
            continue;
        };
        for cap in re.captures_iter(&masked) {
            let end = cap.get(0).map(|m| m.end()).unwrap_or(0);
            let mut names = vec![exported.clone()];
            let mut api = exported.clone();
            if let Some(member) = cap.get(1) {
                names.push(member.as_str().to_string());
                api = format!("{}.{}", exported, member.as_str());
            }
            let keys = opener_after(&masked, end, b"(")
                .map(|open| literal_keys(&masked, open))
                .unwrap_or_default();
            usages.push(ApiUsage { api, names, keys });
        }
    }

    usages
}

/// Constructor and qualified calls in `code` that pass an object or struct
/// literal: `new Topic(..., { ... })`, `pubsub.NewTopic(...)`,
/// `pubsub.TopicConfig{ ... }`. Used for fragments with no framework import
/// in scope, so calls without literal keys are left out.
pub fn bare_usages(code: &str) -> Vec<ApiUsage> {
    let masked = mask_code(code);
    let masked = TS_IMPORT_RE
        .replace_all(&masked, |caps: &regex::Captures| " ".repeat(caps[0].len()))
        .into_owned();
    let mut usages = Vec::new();
    let mut taken = HashSet::new();

    for cap in NEW_CALL_RE.captures_iter(&masked) {
        let (Some(whole), Some(path)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        taken.insert(path.start());
        let Some(open) = opener_after(&masked, whole.end(), b"(") else {
            continue;
        };
        let keys = literal_keys(&masked, open);
        if keys.is_empty() {
            continue;
        }
        let name = path.as_str().rsplit('.').next().unwrap_or(path.as_str());
        usages.push(ApiUsage {
            api: path.as_str().to_string(),
            names: vec![name.to_string()],
            keys,
        });
    }

    for cap in QUALIFIED_CALL_RE.captures_iter(&masked) {
        let (Some(whole), Some(package)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        // Part of a longer chain, or the constructor handled above
        if taken.contains(&whole.start()) || masked[..whole.start()].ends_with('.') {
            continue;
        }
        let Some(open) = opener_after(&masked, whole.end(), b"({") else {
            continue;
        };
        let keys = literal_keys(&masked, open);
        if keys.is_empty() {
            continue;
        }
        let name = cap[2].to_string();
        usages.push(ApiUsage {
            api: format!("{}.{}", package.as_str(), name),
            names: vec![name],
            keys,
        });
    }

    usages
}

/// A call or literal of `name` found in a documentation snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsCall {
    pub keys: BTreeSet<String>,
    /// The snippet text containing the call
    pub snippet: String,
}

/// Calls of `name` in documentation `snippets`, with their option keys.
/// Imports are not required: doc snippets are often fragments.
pub fn docs_calls(name: &str, snippets: &[String]) -> Vec<DocsCall> {
    let Some(re) = usage_regex(r"(?:\bnew\s+)?(?:[A-Za-z_]\w*\.)?", name) else {
        return Vec::new();
    };
    let mut calls = Vec::new();
    for snippet in snippets {
        let masked = mask_code(snippet);
        for m in re.find_iter(&masked) {
            if let Some(open) = opener_after(&masked, m.end(), b"({") {
                let keys = literal_keys(&masked, open);
                if !keys.is_empty() {
                    calls.push(DocsCall {
                        keys,
                        snippet: snippet.trim().to_string(),
                    });
                }
            }
        }
    }
    calls
}

/// Every identifier-like token in `text`, case preserved.
pub fn identifier_set(text: &str) -> HashSet<String> {
    IDENT_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
