use super::StageOperation;
use crate::commands::CommandFactory;
use crate::core::WorkItem;
use crate::layout::Layout;
use crate::process::ExternalCommand;
use std::path::PathBuf;
use std::sync::Arc;

/// Clones a locator into `{owner}_{repo}` under the working directory.
#[derive(Debug, Clone)]
pub struct CloneRepository {
    layout: Layout,
    commands: Arc<dyn CommandFactory>,
    minimal_depth: bool,
}

impl CloneRepository {
    /// Creates the operation.
    #[must_use]
    pub fn new(layout: Layout, commands: Arc<dyn CommandFactory>) -> Self {
        Self {
            layout,
            commands,
            minimal_depth: false,
        }
    }

    /// Clones with `--depth=1`.
    #[must_use]
    pub fn with_minimal_depth(mut self, enabled: bool) -> Self {
        self.minimal_depth = enabled;
        self
    }
}

impl StageOperation for CloneRepository {
    fn name(&self) -> &str {
        "clone"
    }

    fn verb(&self) -> &str {
        "Cloning"
    }

    fn derive(&self, item: &WorkItem) -> Option<WorkItem> {
        self.layout
            .directory_for_locator(item.as_str())
            .map(WorkItem::from)
    }

    // A finished clone is only known by its archive.
    fn expected_output(&self, _item: &WorkItem, derived: &WorkItem) -> Option<PathBuf> {
        self.layout.archive_for(derived.as_path())
    }

    fn command(&self, item: &WorkItem, derived: &WorkItem) -> ExternalCommand {
        self.commands
            .clone_repository(item.as_str().trim(), derived.as_path(), self.minimal_depth)
    }
}
