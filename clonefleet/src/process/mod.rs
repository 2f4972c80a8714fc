//! Launching external operations.
//!
//! This module provides:
//! - `ExternalCommand`, an opaque shell script plus working directory
//! - the `ProcessRunner` seam used by the scheduler
//! - `ShellRunner`, the `sh -c` implementation

mod command;
mod runner;

pub use command::{shell_quote, ExternalCommand};
pub use runner::{OperationFuture, ProcessRunner, ShellRunner, UNKNOWN_STATUS};

#[cfg(test)]
pub use runner::MockProcessRunner;
