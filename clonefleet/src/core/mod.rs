//! Core types shared by the scheduler and the pipeline.

mod item;
mod status;

pub use item::WorkItem;
pub use status::{Outcome, StageState};
