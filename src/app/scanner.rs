use crate::app::models::{FileEntry, FileKind, RuntimeConfig};
use crate::app::paths::{display_relative, is_markdown};
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

pub struct Scanner {
    root: PathBuf,
    exclude_set: GlobSet,
    respect_gitignore: bool,
    /// Never descended into, e.g. an output folder nested in the input.
    skip_dir: Option<PathBuf>,
}

impl Scanner {
    pub fn new(root: PathBuf, config: &RuntimeConfig) -> Result<Self> {
        Ok(Self {
            root,
            exclude_set: build_globset(&config.exclude)?,
            respect_gitignore: config.respect_gitignore,
            skip_dir: None,
        })
    }

    pub fn skip_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.skip_dir = Some(dir.into());
        self
    }

    /// Every file under the root, sorted by path. Directories are walked, not returned.
    pub fn scan(&self) -> Vec<FileEntry> {
        let mut entries = Vec::new();

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .hidden(false)
            .git_ignore(self.respect_gitignore)
            .require_git(false);

        if let Some(skip) = self.skip_dir.clone() {
            builder.filter_entry(move |entry| entry.path() != skip.as_path());
        }

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    if let Some(processed) = self.process_entry(entry.path()) {
                        entries.push(processed);
                    }
                }
                Err(err) => log::warn!("Error walking entry: {}", err),
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    fn process_entry(&self, path: &Path) -> Option<FileEntry> {
        if path == self.root || !path.is_file() {
            return None;
        }

        // Hidden files are walked, but repository metadata is never content.
        let relative = path.strip_prefix(&self.root).ok()?;
        if relative.components().any(|c| c.as_os_str() == ".git") {
            return None;
        }

        if self.exclude_set.is_match(relative) {
            log::debug!("Excluded {}", relative.display());
            return None;
        }

        let kind = if is_markdown(path) {
            FileKind::Markdown
        } else {
            FileKind::Other
        };

        Some(FileEntry {
            path: path.to_path_buf(),
            relative_path: display_relative(&self.root, path),
            kind,
        })
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat).context(format!("Invalid glob pattern: {}", pat))?);
    }
    Ok(builder.build()?)
}
