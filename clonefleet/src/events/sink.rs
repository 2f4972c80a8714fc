//! Event sink trait and implementations.

use super::{EventKind, PipelineEvent};
use crate::core::WorkItem;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

/// Receives pipeline events.
///
/// Emitting must never fail or block for long; the scheduler calls this from
/// inside its wait loop.
pub trait EventSink: Send + Sync {
    /// Handles one event.
    fn emit(&self, event: &PipelineEvent);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &PipelineEvent) {}
}

/// Writes events through `tracing`: dispatches as progress lines at info,
/// failures and restarts as warnings, the rest at debug.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventSink;

impl LoggingEventSink {
    /// Creates a logging sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Dispatched {
                stage,
                item,
                target,
                verb,
            } => {
                info!(stage = %stage, item = %item, output = %target, "{verb} {item} to {target}");
            }
            PipelineEvent::Skipped { stage, item } => {
                info!(stage = %stage, item = %item, "Skipping {item}: output already present");
            }
            PipelineEvent::Dropped {
                stage,
                item,
                reason,
            } => {
                debug!(stage = %stage, item = %item, reason = %reason, "Dropped item");
            }
            PipelineEvent::Completed { stage, item } => {
                debug!(stage = %stage, item = %item, "Operation finished");
            }
            PipelineEvent::Failed {
                stage,
                item,
                outcome,
            } => {
                warn!(stage = %stage, item = %item, outcome = %outcome, "Operation failed");
            }
            PipelineEvent::Restarted {
                stage,
                item,
                attempt,
            } => {
                warn!(stage = %stage, item = %item, attempt, "Restarting stalled operation");
            }
            PipelineEvent::Abandoned { stage, item } => {
                warn!(stage = %stage, item = %item, "Abandoned operation");
            }
            PipelineEvent::StageFinished {
                stage,
                succeeded,
                failed,
            } => {
                info!(stage = %stage, succeeded, failed, "Stage finished");
            }
        }
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events of one kind.
    #[must_use]
    pub fn events_of_kind(&self, kind: EventKind) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    /// Items of all events of one kind, in emission order.
    #[must_use]
    pub fn items_of_kind(&self, kind: EventKind) -> Vec<WorkItem> {
        self.events_of_kind(kind)
            .iter()
            .filter_map(|e| e.item().cloned())
            .collect()
    }

    /// Items that were restarted.
    #[must_use]
    pub fn restarted(&self) -> Vec<WorkItem> {
        self.items_of_kind(EventKind::Restarted)
    }

    /// Items that were abandoned.
    #[must_use]
    pub fn abandoned(&self) -> Vec<WorkItem> {
        self.items_of_kind(EventKind::Abandoned)
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        self.events.write().push(event.clone());
    }
}
