//! Opaque external commands.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A fully formed shell script and the directory it runs in.
///
/// The orchestration layer never looks inside `script`; it only launches it
/// and observes the exit status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalCommand {
    /// The script handed to the shell.
    pub script: String,
    /// Working directory, or the current one when `None`.
    pub cwd: Option<PathBuf>,
}

impl ExternalCommand {
    /// Creates a command that runs in the current directory.
    #[must_use]
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            cwd: None,
        }
    }

    /// Runs the command inside `dir`.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cwd {
            Some(dir) => write!(f, "(cd {}) {}", dir.display(), self.script),
            None => f.write_str(&self.script),
        }
    }
}

/// Quotes a path or URL for POSIX `sh`.
#[must_use]
pub fn shell_quote(value: impl AsRef<Path>) -> String {
    let raw = value.as_ref().to_string_lossy();
    let safe = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ':' | '@' | '+' | ','));
    if safe {
        raw.into_owned()
    } else {
        format!("'{}'", raw.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paths_are_left_alone() {
        assert_eq!(shell_quote(Path::new("/srv/a_b.tar.xz")), "/srv/a_b.tar.xz");
        assert_eq!(shell_quote("git@host:owner/repo.git"), "git@host:owner/repo.git");
    }

    #[test]
    fn test_spaces_and_quotes_are_quoted() {
        assert_eq!(shell_quote(Path::new("my repo")), "'my repo'");
        assert_eq!(shell_quote(Path::new("it's")), r"'it'\''s'");
        assert_eq!(shell_quote(Path::new("")), "''");
    }

    #[test]
    fn test_display_includes_directory() {
        let cmd = ExternalCommand::new("git fetch origin").in_dir("/work/a_b");
        assert_eq!(cmd.to_string(), "(cd /work/a_b) git fetch origin");
        assert_eq!(ExternalCommand::new("true").to_string(), "true");
    }
}
