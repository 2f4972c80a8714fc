//! Pipeline event definitions.

use crate::core::{Outcome, WorkItem};
use serde::{Deserialize, Serialize};

/// Something that happened to a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// An operation was submitted.
    Dispatched {
        /// Stage name.
        stage: String,
        /// What the stage consumed.
        item: WorkItem,
        /// What it will produce.
        target: WorkItem,
        /// Progress verb, e.g. "Cloning".
        verb: String,
    },
    /// The expected output already exists and is valid.
    Skipped {
        /// Stage name.
        stage: String,
        /// The item.
        item: WorkItem,
    },
    /// The item could not be dispatched and was dropped.
    Dropped {
        /// Stage name.
        stage: String,
        /// The item.
        item: WorkItem,
        /// Why.
        reason: String,
    },
    /// An operation exited with status zero.
    Completed {
        /// Stage name.
        stage: String,
        /// The produced item.
        item: WorkItem,
    },
    /// An operation exited non-zero.
    Failed {
        /// Stage name.
        stage: String,
        /// The item that did not advance.
        item: WorkItem,
        /// How it ended.
        outcome: Outcome,
    },
    /// A stalled operation was cancelled and launched again.
    Restarted {
        /// Stage name.
        stage: String,
        /// The item.
        item: WorkItem,
        /// The new attempt number.
        attempt: u32,
    },
    /// A restarted operation hit its deadline.
    Abandoned {
        /// Stage name.
        stage: String,
        /// The item.
        item: WorkItem,
    },
    /// A stage published its end of stream.
    StageFinished {
        /// Stage name.
        stage: String,
        /// Operations that succeeded.
        succeeded: usize,
        /// Operations that failed or were abandoned.
        failed: usize,
    },
}

/// Discriminant of a [`PipelineEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// [`PipelineEvent::Dispatched`]
    Dispatched,
    /// [`PipelineEvent::Skipped`]
    Skipped,
    /// [`PipelineEvent::Dropped`]
    Dropped,
    /// [`PipelineEvent::Completed`]
    Completed,
    /// [`PipelineEvent::Failed`]
    Failed,
    /// [`PipelineEvent::Restarted`]
    Restarted,
    /// [`PipelineEvent::Abandoned`]
    Abandoned,
    /// [`PipelineEvent::StageFinished`]
    StageFinished,
}

impl PipelineEvent {
    /// The event's kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Dispatched { .. } => EventKind::Dispatched,
            Self::Skipped { .. } => EventKind::Skipped,
            Self::Dropped { .. } => EventKind::Dropped,
            Self::Completed { .. } => EventKind::Completed,
            Self::Failed { .. } => EventKind::Failed,
            Self::Restarted { .. } => EventKind::Restarted,
            Self::Abandoned { .. } => EventKind::Abandoned,
            Self::StageFinished { .. } => EventKind::StageFinished,
        }
    }

    /// The stage that emitted the event.
    #[must_use]
    pub fn stage(&self) -> &str {
        match self {
            Self::Dispatched { stage, .. }
            | Self::Skipped { stage, .. }
            | Self::Dropped { stage, .. }
            | Self::Completed { stage, .. }
            | Self::Failed { stage, .. }
            | Self::Restarted { stage, .. }
            | Self::Abandoned { stage, .. }
            | Self::StageFinished { stage, .. } => stage,
        }
    }

    /// The item the event concerns, if any.
    #[must_use]
    pub const fn item(&self) -> Option<&WorkItem> {
        match self {
            Self::Dispatched { item, .. }
            | Self::Skipped { item, .. }
            | Self::Dropped { item, .. }
            | Self::Completed { item, .. }
            | Self::Failed { item, .. }
            | Self::Restarted { item, .. }
            | Self::Abandoned { item, .. } => Some(item),
            Self::StageFinished { .. } => None,
        }
    }
}
