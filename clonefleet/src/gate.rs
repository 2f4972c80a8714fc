//! Resumability gate.

use crate::commands::CommandFactory;
use crate::scheduler::Scheduler;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Decides whether an item's output is already in place.
///
/// An output counts only if it is a non-empty file that passes the archive
/// integrity test. The test runs through the stage's scheduler so it is
/// counted against the budget like any other process.
#[derive(Debug, Clone)]
pub struct ResumabilityGate {
    commands: Arc<dyn CommandFactory>,
}

impl ResumabilityGate {
    /// Creates a gate testing archives with `commands`.
    #[must_use]
    pub fn new(commands: Arc<dyn CommandFactory>) -> Self {
        Self { commands }
    }

    /// Returns true if `path` exists and is a valid archive.
    pub async fn exists_and_valid(&self, path: &Path, scheduler: &mut Scheduler) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {}
            Ok(_) => {
                debug!(path = %path.display(), "Existing output is empty or not a file");
                return false;
            }
            Err(_) => return false,
        }

        let status = scheduler.check(self.commands.test_archive(path)).await;
        if status != 0 {
            debug!(path = %path.display(), status, "Existing output failed its integrity test");
        }
        status == 0
    }
}
