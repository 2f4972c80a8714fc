//! Operation outcome and stage state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a pending operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The process exited with this status.
    Exited(i32),
    /// A restarted operation outlived its deadline and was killed.
    Abandoned,
}

impl Outcome {
    /// Returns true for a zero exit status.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// The exit status, if the process exited.
    #[must_use]
    pub const fn status(self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(code),
            Self::Abandoned => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit {code}"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Lifecycle of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Consuming items from the input queue.
    #[default]
    Running,
    /// End of input seen; waiting for the remaining operations.
    Draining,
    /// End of stream published downstream.
    Done,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Draining => write!(f, "draining"),
            Self::Done => write!(f, "done"),
        }
    }
}
