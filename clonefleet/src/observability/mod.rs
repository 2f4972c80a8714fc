//! Observability utilities.
//!
//! This module provides:
//! - Subscriber installation for binaries embedding the pipeline
//! - Run span attributes and timing

mod logging;
mod span;

pub use logging::{init_tracing, LogFormat};
pub use span::{RunSpanAttributes, SpanTimer};
