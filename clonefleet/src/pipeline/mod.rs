//! Pipeline building and execution.
//!
//! This module provides:
//! - Sentinel-terminated queues between stages
//! - The stage driver (receive, gate, dispatch, publish, drain)
//! - The composer chaining stages into one run
//! - Per-stage and per-run reports

mod composer;
mod queue;
mod report;
mod stage;

mod integration_tests;

pub use composer::Pipeline;
pub use queue::{stage_queue, Message, StageReceiver, StageSender};
pub use report::{FailureRecord, PipelineReport, StageReport};
pub use stage::{Forwarding, Stage};
