//! Run reports.

use crate::core::{Outcome, WorkItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An operation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Stage name.
    pub stage: String,
    /// The item the operation was producing.
    pub item: WorkItem,
    /// How it ended.
    pub outcome: Outcome,
    /// Attempt that produced the outcome.
    pub attempt: u32,
    /// When the failure was observed.
    pub at: DateTime<Utc>,
}

impl FailureRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(stage: impl Into<String>, item: WorkItem, outcome: Outcome, attempt: u32) -> Self {
        Self {
            stage: stage.into(),
            item,
            outcome,
            attempt,
            at: Utc::now(),
        }
    }
}

/// Per-stage accounting.
///
/// Every received item is either dispatched, skipped or dropped, and every
/// dispatched operation ends as succeeded, failed or abandoned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// Stage name.
    pub stage: String,
    /// Items read from the input queue.
    pub received: usize,
    /// Operations submitted.
    pub dispatched: usize,
    /// Operations that exited 0.
    pub succeeded: usize,
    /// Operations that exited non-zero.
    pub failed: usize,
    /// Items whose output already existed.
    pub skipped: usize,
    /// Items whose precondition was missing.
    pub dropped: usize,
    /// Restarted operations that missed their deadline.
    pub abandoned: usize,
    /// Items published downstream.
    pub forwarded: usize,
    /// Operations cancelled and resubmitted after a stall.
    pub restarted: usize,
    /// Integrity checks run by the resumability gate.
    pub checks: usize,
    /// Processes launched, restarts included.
    pub launched: usize,
    /// Most operations in flight at once.
    pub peak_in_flight: usize,
    /// Wall time from start to end of stream.
    pub duration_ms: f64,
    /// Failed and abandoned operations.
    pub failures: Vec<FailureRecord>,
}

impl StageReport {
    /// Creates an empty report for `stage`.
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            ..Self::default()
        }
    }

    /// Returns true if every operation succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a whole pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Pipeline name.
    pub name: String,
    /// Run identifier, also attached to the tracing span.
    pub run_id: String,
    /// Stage reports in pipeline order.
    pub stages: Vec<StageReport>,
    /// Wall time of the run.
    pub duration_ms: f64,
}

impl PipelineReport {
    /// Report of the stage named `name`.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }

    /// Failed and abandoned operations across all stages.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.stages.iter().map(|s| s.failures.len()).sum()
    }

    /// Returns true if any operation failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Every failure, in stage order.
    #[must_use]
    pub fn failures(&self) -> Vec<&FailureRecord> {
        self.stages.iter().flat_map(|s| s.failures.iter()).collect()
    }

    /// Serializes the report to pretty-printed JSON.
    pub fn to_json(&self) -> crate::errors::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
