//! Fake and recording process runners.

use crate::process::{ExternalCommand, OperationFuture, ProcessRunner};
use futures::future;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// What a scripted launch does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Exit with `status` once `after` has elapsed.
    Exit {
        /// Exit status.
        status: i32,
        /// Run time.
        after: Duration,
    },
    /// Never finish.
    Hang,
}

impl Behavior {
    /// Exits immediately.
    #[must_use]
    pub const fn exit(status: i32) -> Self {
        Self::Exit {
            status,
            after: Duration::ZERO,
        }
    }

    /// Exits after `after`.
    #[must_use]
    pub const fn exit_after(status: i32, after: Duration) -> Self {
        Self::Exit { status, after }
    }
}

#[derive(Debug, Default)]
struct Counters {
    launches: Vec<String>,
    live: usize,
    peak: usize,
    cancellations: usize,
}

/// Shared launch bookkeeping.
#[derive(Debug, Clone, Default)]
struct Tracker {
    counters: Arc<Mutex<Counters>>,
}

impl Tracker {
    fn enter(&self, command: &ExternalCommand) -> LiveGuard {
        let mut counters = self.counters.lock();
        counters.launches.push(command.script.clone());
        counters.live += 1;
        counters.peak = counters.peak.max(counters.live);
        LiveGuard {
            counters: Arc::clone(&self.counters),
            finished: false,
        }
    }

    fn launches(&self) -> Vec<String> {
        self.counters.lock().launches.clone()
    }

    fn launches_matching(&self, pattern: &str) -> usize {
        self.counters
            .lock()
            .launches
            .iter()
            .filter(|script| script.contains(pattern))
            .count()
    }

    fn live(&self) -> usize {
        self.counters.lock().live
    }

    fn peak(&self) -> usize {
        self.counters.lock().peak
    }

    fn cancellations(&self) -> usize {
        self.counters.lock().cancellations
    }
}

/// Alive while a launched operation is; counts a cancellation when dropped
/// before the operation finished.
struct LiveGuard {
    counters: Arc<Mutex<Counters>>,
    finished: bool,
}

impl LiveGuard {
    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        let mut counters = self.counters.lock();
        counters.live -= 1;
        if !self.finished {
            counters.cancellations += 1;
        }
    }
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    behaviors: VecDeque<Behavior>,
}

impl Rule {
    // The last behaviour sticks.
    fn next(&mut self) -> Option<Behavior> {
        if self.behaviors.len() > 1 {
            self.behaviors.pop_front()
        } else {
            self.behaviors.front().copied()
        }
    }
}

/// A process runner that launches nothing and plays back scripted
/// behaviours instead.
///
/// The first rule whose pattern occurs in the command script decides what a
/// launch does; each launch consumes one behaviour of that rule and the last
/// one repeats. Scripts matching no rule use the default behaviour.
///
/// # Example
///
/// ```
/// use clonefleet::testing::{Behavior, ScriptedRunner};
/// use std::time::Duration;
///
/// let runner = ScriptedRunner::succeeding()
///     .with_rule("git clone", [Behavior::Hang, Behavior::exit(0)])
///     .with_rule("xz -t", [Behavior::exit_after(1, Duration::from_secs(2))]);
/// assert_eq!(runner.launch_count(), 0);
/// ```
#[derive(Debug)]
pub struct ScriptedRunner {
    default: Behavior,
    rules: Mutex<Vec<Rule>>,
    tracker: Tracker,
}

impl ScriptedRunner {
    /// Creates a runner where unmatched scripts behave as `default`.
    #[must_use]
    pub fn new(default: Behavior) -> Self {
        Self {
            default,
            rules: Mutex::new(Vec::new()),
            tracker: Tracker::default(),
        }
    }

    /// Creates a runner where unmatched scripts exit 0 immediately.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::new(Behavior::exit(0))
    }

    /// Adds a rule for scripts containing `pattern`.
    #[must_use]
    pub fn with_rule(
        self,
        pattern: impl Into<String>,
        behaviors: impl IntoIterator<Item = Behavior>,
    ) -> Self {
        let behaviors: VecDeque<Behavior> = behaviors.into_iter().collect();
        if !behaviors.is_empty() {
            self.rules.lock().push(Rule {
                pattern: pattern.into(),
                behaviors,
            });
        }
        self
    }

    /// Every launched script, in launch order.
    #[must_use]
    pub fn launches(&self) -> Vec<String> {
        self.tracker.launches()
    }

    /// Number of launches.
    #[must_use]
    pub fn launch_count(&self) -> usize {
        self.tracker.launches().len()
    }

    /// Number of launched scripts containing `pattern`.
    #[must_use]
    pub fn launches_matching(&self, pattern: &str) -> usize {
        self.tracker.launches_matching(pattern)
    }

    /// Operations currently alive.
    #[must_use]
    pub fn live(&self) -> usize {
        self.tracker.live()
    }

    /// Most operations alive at once.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.tracker.peak()
    }

    /// Operations dropped before they finished.
    #[must_use]
    pub fn cancellations(&self) -> usize {
        self.tracker.cancellations()
    }

    fn behavior_for(&self, script: &str) -> Behavior {
        self.rules
            .lock()
            .iter_mut()
            .find(|rule| script.contains(&rule.pattern))
            .and_then(Rule::next)
            .unwrap_or(self.default)
    }
}

impl ProcessRunner for ScriptedRunner {
    fn launch(&self, command: &ExternalCommand) -> OperationFuture {
        let behavior = self.behavior_for(&command.script);
        let guard = self.tracker.enter(command);
        match behavior {
            Behavior::Exit { status, after } => Box::pin(async move {
                if !after.is_zero() {
                    sleep(after).await;
                }
                guard.finish();
                status
            }),
            Behavior::Hang => Box::pin(async move {
                let _guard = guard;
                future::pending::<i32>().await
            }),
        }
    }
}

/// Wraps a real runner and records what it launches.
#[derive(Debug)]
pub struct RecordingRunner<R> {
    inner: R,
    tracker: Tracker,
}

impl<R: ProcessRunner> RecordingRunner<R> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            tracker: Tracker::default(),
        }
    }

    /// Every launched script, in launch order.
    #[must_use]
    pub fn launches(&self) -> Vec<String> {
        self.tracker.launches()
    }

    /// Number of launched scripts containing `pattern`.
    #[must_use]
    pub fn launches_matching(&self, pattern: &str) -> usize {
        self.tracker.launches_matching(pattern)
    }

    /// Operations currently alive.
    #[must_use]
    pub fn live(&self) -> usize {
        self.tracker.live()
    }

    /// Most operations alive at once.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.tracker.peak()
    }
}

impl<R: ProcessRunner> ProcessRunner for RecordingRunner<R> {
    fn launch(&self, command: &ExternalCommand) -> OperationFuture {
        let guard = self.tracker.enter(command);
        let handle = self.inner.launch(command);
        Box::pin(async move {
            let status = handle.await;
            guard.finish();
            status
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, task};

    #[tokio::test]
    async fn test_default_and_rules() {
        let runner = ScriptedRunner::new(Behavior::exit(3))
            .with_rule("clone", [Behavior::exit(0), Behavior::exit(128)]);

        assert_eq!(runner.launch(&ExternalCommand::new("tar -xf a")).await, 3);
        assert_eq!(runner.launch(&ExternalCommand::new("git clone a")).await, 0);
        assert_eq!(runner.launch(&ExternalCommand::new("git clone b")).await, 128);
        assert_eq!(runner.launch(&ExternalCommand::new("git clone c")).await, 128);

        assert_eq!(runner.launch_count(), 4);
        assert_eq!(runner.launches_matching("clone"), 3);
        assert_eq!(runner.launches()[0], "tar -xf a");
    }

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let runner = ScriptedRunner::succeeding()
            .with_rule("xz -t", [Behavior::exit(1)])
            .with_rule("xz", [Behavior::exit(2)]);

        assert_eq!(runner.launch(&ExternalCommand::new("xz -t a")).await, 1);
        assert_eq!(runner.launch(&ExternalCommand::new("xz -9e")).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_and_peak() {
        let runner = ScriptedRunner::new(Behavior::exit_after(0, Duration::from_secs(1)));
        let a = runner.launch(&ExternalCommand::new("a"));
        let b = runner.launch(&ExternalCommand::new("b"));
        assert_eq!(runner.live(), 2);

        futures::future::join(a, b).await;
        assert_eq!(runner.live(), 0);
        assert_eq!(runner.peak(), 2);
        assert_eq!(runner.cancellations(), 0);
    }

    #[test]
    fn test_hang_counts_cancellation_on_drop() {
        let runner = ScriptedRunner::new(Behavior::Hang);
        let mut hung = task::spawn(runner.launch(&ExternalCommand::new("git fetch")));
        assert_pending!(hung.poll());
        assert_eq!(runner.live(), 1);

        drop(hung);
        assert_eq!(runner.live(), 0);
        assert_eq!(runner.cancellations(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recording_runner_delegates() {
        let runner = RecordingRunner::new(crate::process::ShellRunner::new());
        assert_eq!(runner.launch(&ExternalCommand::new("exit 4")).await, 4);
        assert_eq!(runner.launches(), vec!["exit 4".to_string()]);
        assert_eq!(runner.launches_matching("exit"), 1);
        assert_eq!(runner.peak(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_exit_is_not_a_cancellation() {
        let runner = ScriptedRunner::succeeding();
        for name in ["a", "b", "c"] {
            assert_eq!(runner.launch(&ExternalCommand::new(name)).await, 0);
        }
        assert_eq!(runner.live(), 0);
        assert_eq!(runner.peak(), 1);
        assert_eq!(runner.cancellations(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recording_runner_measures_overlap() {
        let runner = RecordingRunner::new(crate::process::ShellRunner::new());
        let a = runner.launch(&ExternalCommand::new("sleep 0.2"));
        let b = runner.launch(&ExternalCommand::new("sleep 0.2"));
        assert_eq!(runner.live(), 2);

        let (x, y) = futures::future::join(a, b).await;
        assert_eq!((x, y), (0, 0));
        assert_eq!(runner.live(), 0);
        assert_eq!(runner.peak(), 2);
    }
}
