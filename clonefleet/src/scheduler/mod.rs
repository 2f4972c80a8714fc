//! Bounded worker scheduling.
//!
//! This module provides:
//! - `Budget`, the per-stage concurrency target and its soft/hard limits
//! - `PendingOperation`, a launched process tagged with its work item
//! - `StallPolicy` / `StallDetector` for detecting hung batches
//! - `Scheduler`, which owns the active set and enforces all of the above

mod bounded;
mod budget;
mod pending;
mod stall;

pub use bounded::{Scheduler, SchedulerStats, WaitResult};
pub use budget::Budget;
pub use pending::{CancelledOperation, Completion, PendingOperation};
pub use stall::{StallDetector, StallPolicy, StallVerdict};
