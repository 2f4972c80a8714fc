//! Filesystem layout: where clones and archives live.

use crate::config::PipelineConfig;
use std::path::{Path, PathBuf};

/// Suffix of every archive the pipeline writes or reads.
pub const ARCHIVE_SUFFIX: &str = ".tar.xz";

/// Directory name for a repository locator: `{owner}_{repo}`.
///
/// Only the part after the last `:` counts, so both `https://host/a/b` and
/// `git@host:a/b.git` map to `a_b`. A trailing `/` or `.git` is ignored.
/// Returns `None` when no usable name remains.
#[must_use]
pub fn directory_name(locator: &str) -> Option<String> {
    let path = locator.trim().rsplit(':').next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let tail = &segments[segments.len().saturating_sub(2)..];
    if tail.is_empty() || tail.iter().any(|s| matches!(*s, "." | "..")) {
        return None;
    }
    Some(tail.join("_"))
}

/// Resolves clone directories and archive paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    working_directory: PathBuf,
    output_directory: Option<PathBuf>,
}

impl Layout {
    /// Creates a layout rooted at `working_directory`.
    #[must_use]
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
            output_directory: None,
        }
    }

    /// Builds the layout a configuration describes.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        let layout = Self::new(&config.working_directory);
        match &config.output_directory {
            Some(dir) => layout.with_output_directory(dir),
            None => layout,
        }
    }

    /// Sends archives to `dir` instead of next to their directories.
    #[must_use]
    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(dir.into());
        self
    }

    /// Base directory for clones and relative paths.
    #[must_use]
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// The resolved archive output directory, if any.
    #[must_use]
    pub fn output_directory(&self) -> Option<PathBuf> {
        self.output_directory.as_deref().map(|dir| self.resolve(dir))
    }

    /// Joins relative paths onto the working directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_directory.join(path)
        }
    }

    /// Clone directory for a locator.
    #[must_use]
    pub fn directory_for_locator(&self, locator: &str) -> Option<PathBuf> {
        directory_name(locator).map(|name| self.working_directory.join(name))
    }

    /// Archive path for a directory.
    #[must_use]
    pub fn archive_for(&self, directory: &Path) -> Option<PathBuf> {
        let directory = self.resolve(directory);
        let mut name = directory.file_name()?.to_os_string();
        name.push(ARCHIVE_SUFFIX);
        let parent = match self.output_directory() {
            Some(dir) => dir,
            None => directory.parent()?.to_path_buf(),
        };
        Some(parent.join(name))
    }

    /// Directory an archive unpacks to; `None` unless the name ends in
    /// [`ARCHIVE_SUFFIX`].
    #[must_use]
    pub fn directory_for_archive(&self, archive: &Path) -> Option<PathBuf> {
        let archive = self.resolve(archive);
        let name = archive.file_name()?.to_str()?;
        let stem = name.strip_suffix(ARCHIVE_SUFFIX)?;
        if stem.is_empty() {
            return None;
        }
        Some(archive.with_file_name(stem))
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(".")
    }
}
