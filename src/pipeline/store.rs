use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

/// File access used by the pipeline for link lists, summaries and reports.
///
/// Paths are relative to the store's root.
pub trait Store: Send + Sync {
    /// Contents of `path`, or `None` if it does not exist.
    fn read(&self, path: &Path) -> Result<Option<String>>;

    /// Replace `path` with `content`, creating parent directories.
    fn write(&self, path: &Path, content: &str) -> Result<()>;

    /// Append `content` to the end of `path`, creating it if needed.
    fn append(&self, path: &Path, content: &str) -> Result<()>;

    /// Existing files matching the glob `pattern`, sorted. `*` does not
    /// cross `/`.
    fn list(&self, pattern: &str) -> Result<Vec<PathBuf>>;
}

fn match_options() -> MatchOptions {
    MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::new()
    }
}

/// `Store` rooted at a directory on disk.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        Ok(())
    }
}

impl Store for FsStore {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        let full = self.resolve(path);
        if !full.exists() {
            return Ok(None);
        }
        fs::read_to_string(&full)
            .map(Some)
            .with_context(|| format!("failed to read {}", full.display()))
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        let full = self.resolve(path);
        Self::ensure_parent(&full)?;
        fs::write(&full, content).with_context(|| format!("failed to write {}", full.display()))
    }

    fn append(&self, path: &Path, content: &str) -> Result<()> {
        let full = self.resolve(path);
        Self::ensure_parent(&full)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full)
            .with_context(|| format!("failed to open {} for append", full.display()))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("failed to append to {}", full.display()))
    }

    fn list(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        // The root is a literal path; only `pattern` carries glob syntax.
        let root = Pattern::escape(&self.root.to_string_lossy());
        let full = Path::new(&root).join(pattern);
        let full = full.to_string_lossy();
        let mut paths = Vec::new();
        for entry in glob::glob_with(&full, match_options())
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            let path = entry.context("failed to read glob entry")?;
            if path.is_file() {
                let relative = path.strip_prefix(&self.root).unwrap_or(&path);
                paths.push(relative.to_path_buf());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// In-memory `Store` for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        if let Ok(mut files) = self.files.lock() {
            files.insert(Self::key(&path.into()), content.into());
        }
        self
    }

    /// `./a.txt` and `a.txt` name the same file.
    fn key(path: &Path) -> PathBuf {
        path.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    }

    fn files(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<PathBuf, String>>> {
        self.files
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl Store for MemoryStore {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.files()?.get(&Self::key(path)).cloned())
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        self.files()?.insert(Self::key(path), content.to_string());
        Ok(())
    }

    fn append(&self, path: &Path, content: &str) -> Result<()> {
        self.files()?
            .entry(Self::key(path))
            .or_default()
            .push_str(content);
        Ok(())
    }

    fn list(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = Pattern::new(pattern)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?;
        let options = match_options();
        // BTreeMap keys are already sorted
        Ok(self
            .files()?
            .keys()
            .filter(|path| pattern.matches_path_with(path, options))
            .cloned()
            .collect())
    }
}
