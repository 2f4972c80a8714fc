//! Concurrency budget.

use serde::{Deserialize, Serialize};
use std::thread;

/// The number of operations a stage aims to keep in flight.
///
/// A stage starts waiting for completions once more than `soft_limit()`
/// operations are active and never lets more than `hard_limit()` run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "usize", into = "usize")]
pub struct Budget {
    slots: usize,
}

impl Budget {
    /// Creates a budget; zero is clamped to one.
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            slots: slots.max(1),
        }
    }

    /// One slot per logical core.
    #[must_use]
    pub fn from_parallelism() -> Self {
        Self::new(thread::available_parallelism().map_or(1, usize::from))
    }

    /// The configured slot count.
    #[must_use]
    pub const fn slots(self) -> usize {
        self.slots
    }

    /// Above this many active operations, a submission first waits for one
    /// completion.
    #[must_use]
    pub const fn soft_limit(self) -> usize {
        self.slots / 2
    }

    /// Active operations never exceed this.
    #[must_use]
    pub const fn hard_limit(self) -> usize {
        self.slots * 2
    }
}

impl From<usize> for Budget {
    fn from(slots: usize) -> Self {
        Self::new(slots)
    }
}

impl From<Budget> for usize {
    fn from(budget: Budget) -> Self {
        budget.slots
    }
}
