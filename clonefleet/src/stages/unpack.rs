use super::StageOperation;
use crate::commands::CommandFactory;
use crate::core::WorkItem;
use crate::layout::Layout;
use crate::process::ExternalCommand;
use std::path::PathBuf;
use std::sync::Arc;

/// Extracts `{name}.tar.xz` into `{name}/` beside it.
#[derive(Debug, Clone)]
pub struct UnpackArchive {
    layout: Layout,
    commands: Arc<dyn CommandFactory>,
}

impl UnpackArchive {
    /// Creates the operation.
    #[must_use]
    pub fn new(layout: Layout, commands: Arc<dyn CommandFactory>) -> Self {
        Self { layout, commands }
    }
}

impl StageOperation for UnpackArchive {
    fn name(&self) -> &str {
        "unpack"
    }

    fn verb(&self) -> &str {
        "Unpacking"
    }

    fn derive(&self, item: &WorkItem) -> Option<WorkItem> {
        self.layout
            .directory_for_archive(item.as_path())
            .map(WorkItem::from)
    }

    fn precondition(&self, item: &WorkItem) -> Option<PathBuf> {
        Some(self.layout.resolve(item.as_path()))
    }

    fn command(&self, item: &WorkItem, _derived: &WorkItem) -> ExternalCommand {
        self.commands
            .unpack_archive(&self.layout.resolve(item.as_path()))
    }
}
