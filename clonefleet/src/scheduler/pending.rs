//! In-flight operations.

use crate::core::{Outcome, WorkItem};
use crate::process::{ExternalCommand, OperationFuture, ProcessRunner};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{sleep, Instant, Sleep};

/// One launched external process, tagged with the item it produces.
///
/// The label travels with the handle so a stalled operation can be
/// resubmitted and a finished one published downstream.
pub struct PendingOperation {
    label: WorkItem,
    command: ExternalCommand,
    attempt: u32,
    started: Instant,
    handle: OperationFuture,
    deadline: Option<Pin<Box<Sleep>>>,
}

/// A finished operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// The downstream identifier the operation was tagged with.
    pub label: WorkItem,
    /// How it ended.
    pub outcome: Outcome,
    /// 1 for the first launch, 2 after one restart, ...
    pub attempt: u32,
    /// Time between launch and completion.
    pub elapsed: Duration,
}

impl Completion {
    /// Returns true if the process exited with status zero.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }
}

/// What is left of an operation after cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelledOperation {
    /// The operation's label.
    pub label: WorkItem,
    /// The command, ready to be launched again.
    pub command: ExternalCommand,
    /// The attempt that was cancelled.
    pub attempt: u32,
}

impl PendingOperation {
    /// Launches `command` through `runner`.
    pub fn launch(
        runner: &dyn ProcessRunner,
        label: WorkItem,
        command: ExternalCommand,
        attempt: u32,
    ) -> Self {
        let handle = runner.launch(&command);
        Self {
            label,
            command,
            attempt,
            started: Instant::now(),
            handle,
            deadline: None,
        }
    }

    /// Resolves as [`Outcome::Abandoned`] if still running after `limit`.
    #[must_use]
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some(Box::pin(sleep(limit)));
        self
    }

    /// The label the operation is tagged with.
    #[must_use]
    pub const fn label(&self) -> &WorkItem {
        &self.label
    }

    /// The attempt number.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Drops the process handle, which kills the process.
    #[must_use]
    pub fn cancel(self) -> CancelledOperation {
        CancelledOperation {
            label: self.label,
            command: self.command,
            attempt: self.attempt,
        }
    }
}

impl Future for PendingOperation {
    type Output = Completion;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let outcome = if let Poll::Ready(status) = this.handle.as_mut().poll(cx) {
            Outcome::Exited(status)
        } else if this
            .deadline
            .as_mut()
            .is_some_and(|deadline| deadline.as_mut().poll(cx).is_ready())
        {
            Outcome::Abandoned
        } else {
            return Poll::Pending;
        };

        Poll::Ready(Completion {
            label: this.label.clone(),
            outcome,
            attempt: this.attempt,
            elapsed: this.started.elapsed(),
        })
    }
}

impl fmt::Debug for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("label", &self.label)
            .field("command", &self.command)
            .field("attempt", &self.attempt)
            .field("has_deadline", &self.deadline.is_some())
            .finish_non_exhaustive()
    }
}
