//! Stall detection.

use std::time::Duration;

/// Timing knobs for stall detection and the restart backstop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallPolicy {
    wait_timeout: Duration,
    threshold: u32,
    restart_deadline: Duration,
}

impl Default for StallPolicy {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(30 * 60),
            threshold: 3,
            restart_deadline: Duration::from_secs(6 * 60 * 60),
        }
    }
}

impl StallPolicy {
    /// Creates a policy. A zero threshold is raised to one.
    #[must_use]
    pub fn new(wait_timeout: Duration, threshold: u32, restart_deadline: Duration) -> Self {
        Self {
            wait_timeout,
            threshold: threshold.max(1),
            restart_deadline,
        }
    }

    /// How long one wait may go without a completion.
    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// Consecutive timeouts that make a batch stalled.
    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Absolute lifetime granted to a restarted operation.
    #[must_use]
    pub const fn restart_deadline(&self) -> Duration {
        self.restart_deadline
    }

    /// Upper bound for a single synchronous check (one full stall episode).
    #[must_use]
    pub fn check_timeout(&self) -> Duration {
        self.wait_timeout.saturating_mul(self.threshold)
    }
}

/// What to do after a wait timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallVerdict {
    /// Keep waiting on the same pending set; holds the consecutive count.
    KeepWaiting(u32),
    /// Cancel and resubmit the pending batch.
    Stalled,
}

/// Counts consecutive timeouts within one waiting episode.
#[derive(Debug, Clone)]
pub struct StallDetector {
    threshold: u32,
    consecutive: u32,
}

impl StallDetector {
    /// Creates a detector for the given policy.
    #[must_use]
    pub fn new(policy: &StallPolicy) -> Self {
        Self {
            threshold: policy.threshold(),
            consecutive: 0,
        }
    }

    /// Records a wait that ended without any completion.
    pub fn record_timeout(&mut self) -> StallVerdict {
        self.consecutive += 1;
        if self.consecutive >= self.threshold {
            self.consecutive = 0;
            StallVerdict::Stalled
        } else {
            StallVerdict::KeepWaiting(self.consecutive)
        }
    }

    /// Records a completion; the episode starts over.
    pub fn record_progress(&mut self) {
        self.consecutive = 0;
    }

    /// Current consecutive timeout count.
    #[must_use]
    pub const fn consecutive(&self) -> u32 {
        self.consecutive
    }
}
