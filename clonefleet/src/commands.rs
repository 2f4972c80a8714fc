//! Command construction for git, tar and xz.
//!
//! The pipeline only ever sees [`ExternalCommand`]s; this module is the one
//! place that knows what the shell scripts look like.

use crate::process::{shell_quote, ExternalCommand};
use std::fmt::Debug;
use std::path::Path;

/// Builds the external commands the stages run.
pub trait CommandFactory: Send + Sync + Debug {
    /// Clones `locator` into `directory`.
    fn clone_repository(&self, locator: &str, directory: &Path, minimal_depth: bool)
        -> ExternalCommand;

    /// Extracts `archive` next to itself.
    fn unpack_archive(&self, archive: &Path) -> ExternalCommand;

    /// Fetches the full history of the shallow clone in `directory`.
    fn unshallow(&self, directory: &Path) -> ExternalCommand;

    /// Packs `directory` into `archive` and removes the directory.
    fn compress_directory(&self, directory: &Path, archive: &Path) -> ExternalCommand;

    /// Tests the integrity of `archive`.
    fn test_archive(&self, archive: &Path) -> ExternalCommand;
}

/// `git` for cloning, `tar` piped through `xz -9e` for archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitTarXz;

impl GitTarXz {
    /// Creates the factory.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn parent_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

impl CommandFactory for GitTarXz {
    fn clone_repository(
        &self,
        locator: &str,
        directory: &Path,
        minimal_depth: bool,
    ) -> ExternalCommand {
        let depth = if minimal_depth { " --depth=1" } else { "" };
        ExternalCommand::new(format!(
            "git clone --recursive{depth} {} {}",
            shell_quote(locator),
            shell_quote(directory)
        ))
    }

    fn unpack_archive(&self, archive: &Path) -> ExternalCommand {
        ExternalCommand::new(format!(
            "tar -C {} -xf {}",
            shell_quote(parent_of(archive)),
            shell_quote(archive)
        ))
    }

    fn unshallow(&self, directory: &Path) -> ExternalCommand {
        ExternalCommand::new(
            "git fetch --unshallow && \
             git config remote.origin.fetch '+refs/heads/*:refs/remotes/origin/*' && \
             git fetch origin",
        )
        .in_dir(directory)
    }

    fn compress_directory(&self, directory: &Path, archive: &Path) -> ExternalCommand {
        let name = directory
            .file_name()
            .map_or_else(|| shell_quote(directory), shell_quote);
        let partial = format!("{}.part", archive.to_string_lossy());
        ExternalCommand::new(format!(
            "tar -C {parent} -cf - {name} | xz -9e -c - > {part} && mv {part} {archive} && rm -rf {dir}",
            parent = shell_quote(parent_of(directory)),
            part = shell_quote(&partial),
            archive = shell_quote(archive),
            dir = shell_quote(directory),
        ))
    }

    fn test_archive(&self, archive: &Path) -> ExternalCommand {
        ExternalCommand::new(format!("xz -t {}", shell_quote(archive)))
    }
}
