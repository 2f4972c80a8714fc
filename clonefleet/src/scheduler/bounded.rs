//! Bounded worker scheduler.

use super::pending::{Completion, PendingOperation};
use super::stall::{StallDetector, StallPolicy, StallVerdict};
use super::Budget;
use crate::core::{Outcome, WorkItem};
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::process::{ExternalCommand, ProcessRunner, UNKNOWN_STATUS};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Counters kept by a scheduler over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Processes launched for submitted operations, restarts included.
    pub launched: usize,
    /// Synchronous checks run through [`Scheduler::check`].
    pub checks: usize,
    /// Times a pending batch was declared stalled.
    pub stalls: usize,
    /// Operations cancelled and resubmitted.
    pub restarts: usize,
    /// Restarted operations killed at their deadline.
    pub abandoned: usize,
    /// Highest number of processes alive at once.
    pub peak_in_flight: usize,
}

/// Result of a single [`Scheduler::wait_one`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// An operation finished and was queued for [`Scheduler::take_completed`].
    Completed,
    /// The pending batch stalled and was resubmitted.
    Restarted,
    /// Nothing was in flight.
    Idle,
}

/// Caps the number of in-flight operations of one stage.
///
/// The active set is owned here and only changes through `submit`, `check`
/// and the wait methods. Finished operations are removed as soon as they are
/// observed and handed out, in completion order, by `take_completed`.
pub struct Scheduler {
    stage: String,
    budget: Budget,
    policy: StallPolicy,
    runner: Arc<dyn ProcessRunner>,
    events: Arc<dyn EventSink>,
    active: FuturesUnordered<PendingOperation>,
    restarted: FuturesUnordered<PendingOperation>,
    completed: VecDeque<Completion>,
    detector: StallDetector,
    stats: SchedulerStats,
}

impl Scheduler {
    /// Creates a scheduler for `stage`.
    #[must_use]
    pub fn new(
        stage: impl Into<String>,
        budget: Budget,
        policy: StallPolicy,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            stage: stage.into(),
            budget,
            policy,
            runner,
            events: Arc::new(NoOpEventSink),
            active: FuturesUnordered::new(),
            restarted: FuturesUnordered::new(),
            completed: VecDeque::new(),
            detector: StallDetector::new(&policy),
            stats: SchedulerStats::default(),
        }
    }

    /// Sets the sink notified about restarts and abandoned operations.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The stage this scheduler belongs to.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// The budget.
    #[must_use]
    pub const fn budget(&self) -> Budget {
        self.budget
    }

    /// Operations still running, restarted ones included.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.active.len() + self.restarted.len()
    }

    /// Lifetime counters.
    #[must_use]
    pub const fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Returns true if finished operations are waiting to be taken.
    #[must_use]
    pub fn has_completed(&self) -> bool {
        !self.completed.is_empty()
    }

    /// Hands out finished operations in completion order.
    pub fn take_completed(&mut self) -> Vec<Completion> {
        self.completed.drain(..).collect()
    }

    /// Launches an operation tagged with `label`, throttling first.
    pub async fn submit(&mut self, label: WorkItem, command: ExternalCommand) {
        self.throttle().await;

        debug!(stage = %self.stage, %label, "Launching operation");
        let op = PendingOperation::launch(self.runner.as_ref(), label, command, 1);
        self.active.push(op);
        self.stats.launched += 1;
        self.note_in_flight(self.in_flight());
    }

    /// Runs `command` to completion and returns its status.
    ///
    /// The check takes a slot like any other operation. It is given one full
    /// stall episode; past that it is killed and reported as
    /// [`UNKNOWN_STATUS`].
    pub async fn check(&mut self, command: ExternalCommand) -> i32 {
        self.throttle().await;

        self.stats.checks += 1;
        self.note_in_flight(self.in_flight() + 1);
        let limit = self.policy.check_timeout();
        let handle = self.runner.launch(&command);
        if let Ok(status) = timeout(limit, handle).await {
            status
        } else {
            warn!(
                stage = %self.stage,
                command = %command,
                timeout_secs = limit.as_secs(),
                "Check did not finish in time"
            );
            UNKNOWN_STATUS
        }
    }

    /// Waits until at most `target` operations are in flight.
    pub async fn drain_until(&mut self, target: usize) {
        while self.in_flight() > target {
            if self.wait_one().await == WaitResult::Idle {
                break;
            }
        }
    }

    /// Waits for every operation, restarted ones included.
    pub async fn drain(&mut self) {
        self.drain_until(0).await;
    }

    /// Waits for the first of the in-flight operations to finish.
    ///
    /// Each wait on the active batch is bounded by the stall timeout; after
    /// the configured number of consecutive timeouts the whole batch is
    /// cancelled and resubmitted. Restarted operations are not subject to the
    /// stall timeout since their own deadline bounds them.
    ///
    /// Cancel safe: dropping the future loses no completion.
    pub async fn wait_one(&mut self) -> WaitResult {
        loop {
            if self.active.is_empty() {
                return match self.restarted.next().await {
                    Some(done) => {
                        self.detector.record_progress();
                        self.finish(done);
                        WaitResult::Completed
                    }
                    None => WaitResult::Idle,
                };
            }

            let has_restarted = !self.restarted.is_empty();
            let wait = self.policy.wait_timeout();
            let step = tokio::select! {
                Some(done) = self.active.next() => Some(done),
                Some(done) = self.restarted.next(), if has_restarted => Some(done),
                () = sleep(wait) => None,
            };

            if let Some(done) = step {
                self.detector.record_progress();
                self.finish(done);
                return WaitResult::Completed;
            }

            match self.detector.record_timeout() {
                StallVerdict::KeepWaiting(count) => {
                    warn!(
                        stage = %self.stage,
                        pending = self.active.len(),
                        timeouts = count,
                        threshold = self.policy.threshold(),
                        "No operation finished within the stall timeout"
                    );
                }
                StallVerdict::Stalled => {
                    self.restart_stalled();
                    return WaitResult::Restarted;
                }
            }
        }
    }

    async fn throttle(&mut self) {
        if self.in_flight() > self.budget.soft_limit() {
            self.wait_one().await;
        }
        // Leave room for the launch that follows.
        self.drain_until(self.budget.hard_limit() - 1).await;
    }

    fn restart_stalled(&mut self) {
        let stalled = std::mem::take(&mut self.active);
        self.stats.stalls += 1;
        warn!(
            stage = %self.stage,
            count = stalled.len(),
            "Pending batch stalled; cancelling and resubmitting it"
        );

        for op in stalled {
            let cancelled = op.cancel();
            let attempt = cancelled.attempt + 1;
            self.events.emit(&PipelineEvent::Restarted {
                stage: self.stage.clone(),
                item: cancelled.label.clone(),
                attempt,
            });

            let fresh = PendingOperation::launch(
                self.runner.as_ref(),
                cancelled.label,
                cancelled.command,
                attempt,
            )
            .with_deadline(self.policy.restart_deadline());
            self.restarted.push(fresh);
            self.stats.restarts += 1;
            self.stats.launched += 1;
        }
        self.note_in_flight(self.in_flight());
    }

    fn finish(&mut self, done: Completion) {
        if done.outcome == Outcome::Abandoned {
            self.stats.abandoned += 1;
            warn!(
                stage = %self.stage,
                item = %done.label,
                deadline_secs = self.policy.restart_deadline().as_secs(),
                "Restarted operation missed its deadline; giving up on it"
            );
            self.events.emit(&PipelineEvent::Abandoned {
                stage: self.stage.clone(),
                item: done.label.clone(),
            });
        }
        self.completed.push_back(done);
    }

    fn note_in_flight(&mut self, count: usize) {
        self.stats.peak_in_flight = self.stats.peak_in_flight.max(count);
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("stage", &self.stage)
            .field("budget", &self.budget)
            .field("active", &self.active.len())
            .field("restarted", &self.restarted.len())
            .field("completed", &self.completed.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
