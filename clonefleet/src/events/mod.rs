//! Progress events.
//!
//! Stages and schedulers report what they do through an [`EventSink`].
//! The default sink writes progress lines through `tracing`.

mod event;
mod sink;

pub use event::{EventKind, PipelineEvent};
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
