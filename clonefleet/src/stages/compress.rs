use super::StageOperation;
use crate::commands::CommandFactory;
use crate::core::WorkItem;
use crate::layout::Layout;
use crate::process::ExternalCommand;
use std::path::PathBuf;
use std::sync::Arc;

/// Packs a directory into `{name}.tar.xz` and removes it.
///
/// The archive goes to the layout's output directory when one is set.
#[derive(Debug, Clone)]
pub struct CompressDirectory {
    layout: Layout,
    commands: Arc<dyn CommandFactory>,
}

impl CompressDirectory {
    /// Creates the operation.
    #[must_use]
    pub fn new(layout: Layout, commands: Arc<dyn CommandFactory>) -> Self {
        Self { layout, commands }
    }
}

impl StageOperation for CompressDirectory {
    fn name(&self) -> &str {
        "compress"
    }

    fn verb(&self) -> &str {
        "Compressing"
    }

    fn derive(&self, item: &WorkItem) -> Option<WorkItem> {
        self.layout.archive_for(item.as_path()).map(WorkItem::from)
    }

    fn precondition(&self, item: &WorkItem) -> Option<PathBuf> {
        Some(self.layout.resolve(item.as_path()))
    }

    fn command(&self, item: &WorkItem, derived: &WorkItem) -> ExternalCommand {
        self.commands
            .compress_directory(&self.layout.resolve(item.as_path()), derived.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::GitTarXz;

    #[test]
    fn test_archive_goes_to_output_directory() {
        let layout = Layout::new("/w").with_output_directory("/out");
        let op = CompressDirectory::new(layout, Arc::new(GitTarXz::new()));
        let item = WorkItem::new("/w/a_b");
        let archive = op.derive(&item).unwrap();
        assert_eq!(archive.as_str(), "/out/a_b.tar.xz");
        assert!(op.command(&item, &archive).script.contains("/out/a_b.tar.xz.part"));
    }
}
