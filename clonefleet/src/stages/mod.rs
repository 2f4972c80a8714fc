//! Stage operations.
//!
//! A [`StageOperation`] says what one pipeline step does with a work item:
//! which downstream item it produces, what must exist before it runs, which
//! output makes it redundant and which command does the work. The generic
//! driver in [`crate::pipeline::Stage`] takes care of the rest.

mod clone;
mod compress;
mod unpack;
mod unshallow;

pub use clone::CloneRepository;
pub use compress::CompressDirectory;
pub use unpack::UnpackArchive;
pub use unshallow::Unshallow;

use crate::core::WorkItem;
use crate::process::ExternalCommand;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::PathBuf;

/// What a stage does with an item the resumability gate skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipAction {
    /// Publish nothing.
    #[default]
    Drop,
    /// Publish the downstream item as if the operation had just succeeded.
    Forward,
}

/// One pipeline step.
pub trait StageOperation: Send + Sync + Debug {
    /// Stage name used in logs, events and reports.
    fn name(&self) -> &str;

    /// Progress verb, e.g. "Cloning".
    fn verb(&self) -> &str;

    /// The item this step publishes for `item`, or `None` if the item is
    /// unusable.
    fn derive(&self, item: &WorkItem) -> Option<WorkItem>;

    /// A path that must exist when the item is dispatched.
    fn precondition(&self, _item: &WorkItem) -> Option<PathBuf> {
        None
    }

    /// Output whose presence makes the operation redundant.
    fn expected_output(&self, _item: &WorkItem, _derived: &WorkItem) -> Option<PathBuf> {
        None
    }

    /// The command producing `derived` from `item`.
    fn command(&self, item: &WorkItem, derived: &WorkItem) -> ExternalCommand;

    /// Handling of gate skips.
    fn on_skip(&self) -> SkipAction {
        SkipAction::Drop
    }
}
