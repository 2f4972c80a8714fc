//! Testing utilities for clonefleet pipelines.
//!
//! This module provides:
//! - A scripted fake process runner with per-command behaviours
//! - A recording wrapper around any real runner
//! - Concurrency and cancellation counters for both

mod runner;

pub use runner::{Behavior, RecordingRunner, ScriptedRunner};
