//! # Clonefleet
//!
//! Bulk repository acquisition: clone, archive and later re-hydrate large
//! numbers of git repositories while keeping the machine within a fixed
//! process budget.
//!
//! Clonefleet provides:
//!
//! - **Bounded scheduling**: each stage keeps its external processes near a
//!   budget derived from the core count and never above twice that budget
//! - **Stall recovery**: a batch that makes no progress for several timeout
//!   windows is killed and resubmitted, with an absolute deadline as backstop
//! - **Chained stages**: sentinel-terminated queues link clone, unpack,
//!   unshallow and compress steps that all run on one task
//! - **Resumability**: existing archives that pass `xz -t` are not redone
//! - **Run reports**: per-stage counts and every failed item
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clonefleet::prelude::*;
//!
//! # async fn run() -> clonefleet::Result<()> {
//! init_tracing(LogFormat::Text, "info")?;
//!
//! let locators = parse_locators("https://github.com/a/b\nhttps://github.com/c/d\n");
//! let config = PipelineConfig::new().with_compress(true).with_resume(true);
//! let report = Orchestrator::new(config)?.clone_repositories(locators).await?;
//! assert!(!report.has_failures());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod gate;
pub mod input;
pub mod layout;
pub mod observability;
pub mod pipeline;
pub mod process;
pub mod scheduler;
pub mod stages;
pub mod testing;
pub mod workflow;

pub use errors::{ClonefleetError, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::commands::{CommandFactory, GitTarXz};
    pub use crate::config::PipelineConfig;
    pub use crate::core::{Outcome, StageState, WorkItem};
    pub use crate::errors::{ClonefleetError, ConfigError, Result};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink, PipelineEvent};
    pub use crate::gate::ResumabilityGate;
    pub use crate::input::{parse_locators, read_locators};
    pub use crate::layout::{directory_name, Layout};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{
        Forwarding, Pipeline, PipelineReport, Stage, StageReport,
    };
    pub use crate::process::{ExternalCommand, ProcessRunner, ShellRunner};
    pub use crate::scheduler::{Budget, Scheduler, StallPolicy};
    pub use crate::stages::{SkipAction, StageOperation};
    pub use crate::workflow::Orchestrator;
}
