use super::StageOperation;
use crate::commands::CommandFactory;
use crate::core::WorkItem;
use crate::layout::Layout;
use crate::process::ExternalCommand;
use std::path::PathBuf;
use std::sync::Arc;

/// Fetches the full history of a shallow clone in place.
#[derive(Debug, Clone)]
pub struct Unshallow {
    layout: Layout,
    commands: Arc<dyn CommandFactory>,
}

impl Unshallow {
    /// Creates the operation.
    #[must_use]
    pub fn new(layout: Layout, commands: Arc<dyn CommandFactory>) -> Self {
        Self { layout, commands }
    }
}

impl StageOperation for Unshallow {
    fn name(&self) -> &str {
        "unshallow"
    }

    fn verb(&self) -> &str {
        "Unshallowing"
    }

    fn derive(&self, item: &WorkItem) -> Option<WorkItem> {
        Some(WorkItem::from(self.layout.resolve(item.as_path())))
    }

    fn precondition(&self, item: &WorkItem) -> Option<PathBuf> {
        Some(self.layout.resolve(item.as_path()))
    }

    fn command(&self, _item: &WorkItem, derived: &WorkItem) -> ExternalCommand {
        self.commands.unshallow(derived.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::GitTarXz;

    fn unshallow() -> Unshallow {
        Unshallow::new(Layout::new("/w"), Arc::new(GitTarXz::new()))
    }

    #[test]
    fn test_relative_directory_resolves_against_working_directory() {
        let op = unshallow();
        let item = WorkItem::new("a_b");
        assert_eq!(op.derive(&item), Some(WorkItem::new("/w/a_b")));
        assert_eq!(op.precondition(&item), Some(PathBuf::from("/w/a_b")));

        let absolute = WorkItem::new("/elsewhere/c_d");
        assert_eq!(op.derive(&absolute), Some(absolute.clone()));
    }

    #[test]
    fn test_command_runs_inside_the_directory() {
        let op = unshallow();
        let item = WorkItem::new("a_b");
        let derived = op.derive(&item).unwrap();
        let cmd = op.command(&item, &derived);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/w/a_b")));
        assert!(cmd.script.starts_with("git fetch --unshallow"));
        assert_eq!(op.name(), "unshallow");
    }
}
