//! The stage driver.

use super::queue::{StageReceiver, StageSender};
use super::report::{FailureRecord, StageReport};
use crate::core::{Outcome, StageState, WorkItem};
use crate::events::{EventSink, LoggingEventSink, PipelineEvent};
use crate::gate::ResumabilityGate;
use crate::process::ProcessRunner;
use crate::scheduler::{Budget, Scheduler, StallPolicy};
use crate::stages::{SkipAction, StageOperation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

/// Which completions a stage publishes downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Forwarding {
    /// Only operations that exited 0.
    #[default]
    SuccessOnly,
    /// Every operation that exited, whatever its status.
    AllCompleted,
}

/// One running pipeline step.
///
/// A stage reads items from its input queue, submits one operation per item
/// through its own [`Scheduler`], and publishes the derived items of finished
/// operations in completion order. When the input ends it drains, publishes
/// what is left and then ends its output queue.
pub struct Stage {
    operation: Box<dyn StageOperation>,
    scheduler: Scheduler,
    gate: Option<ResumabilityGate>,
    events: Arc<dyn EventSink>,
    forwarding: Forwarding,
    state: StageState,
    report: StageReport,
}

impl Stage {
    /// Creates a stage running `operation` under `budget`.
    #[must_use]
    pub fn new(
        operation: impl StageOperation + 'static,
        budget: Budget,
        policy: StallPolicy,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        let name = operation.name().to_string();
        let events: Arc<dyn EventSink> = Arc::new(LoggingEventSink::new());
        Self {
            scheduler: Scheduler::new(name.clone(), budget, policy, runner)
                .with_events(Arc::clone(&events)),
            operation: Box::new(operation),
            gate: None,
            events,
            forwarding: Forwarding::default(),
            state: StageState::Running,
            report: StageReport::new(name),
        }
    }

    /// Skips items whose expected output passes the gate.
    #[must_use]
    pub fn with_gate(mut self, gate: ResumabilityGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Sets the event sink, for the stage and its scheduler.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.scheduler = self.scheduler.with_events(Arc::clone(&events));
        self.events = events;
        self
    }

    /// Sets which completions are published.
    #[must_use]
    pub fn with_forwarding(mut self, forwarding: Forwarding) -> Self {
        self.forwarding = forwarding;
        self
    }

    /// The stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.operation.name()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> StageState {
        self.state
    }

    /// Runs until `input` ends and every operation has finished.
    ///
    /// The last stage of a pipeline passes `None` for `output`.
    pub async fn run(
        mut self,
        mut input: StageReceiver,
        mut output: Option<StageSender>,
    ) -> StageReport {
        let started = Instant::now();
        debug!(stage = %self.name(), budget = self.scheduler.budget().slots(), "Stage started");

        loop {
            let next = if self.scheduler.in_flight() > 0 {
                tokio::select! {
                    item = input.recv() => Some(item),
                    _ = self.scheduler.wait_one() => None,
                }
            } else {
                Some(input.recv().await)
            };

            match next {
                Some(Some(item)) => self.handle(item, &mut output).await,
                Some(None) => break,
                None => {}
            }
            self.publish(&mut output);
        }

        self.state = StageState::Draining;
        debug!(stage = %self.name(), in_flight = self.scheduler.in_flight(), "Input ended; draining");
        self.scheduler.drain().await;
        self.publish(&mut output);
        if let Some(output) = output {
            output.finish();
        }
        self.state = StageState::Done;

        self.finish_report(started)
    }

    async fn handle(&mut self, item: WorkItem, output: &mut Option<StageSender>) {
        self.report.received += 1;

        let Some(derived) = self.operation.derive(&item) else {
            self.drop_item(item, "no output can be derived".to_string());
            return;
        };

        if let Some(required) = self.operation.precondition(&item) {
            if !matches!(tokio::fs::try_exists(&required).await, Ok(true)) {
                self.drop_item(item, format!("{} does not exist", required.display()));
                return;
            }
        }

        if let Some(gate) = &self.gate {
            if let Some(expected) = self.operation.expected_output(&item, &derived) {
                if gate.exists_and_valid(&expected, &mut self.scheduler).await {
                    self.report.skipped += 1;
                    self.events.emit(&PipelineEvent::Skipped {
                        stage: self.report.stage.clone(),
                        item,
                    });
                    if self.operation.on_skip() == SkipAction::Forward {
                        self.forward(derived, output);
                    }
                    return;
                }
            }
        }

        let command = self.operation.command(&item, &derived);
        self.events.emit(&PipelineEvent::Dispatched {
            stage: self.report.stage.clone(),
            item,
            target: derived.clone(),
            verb: self.operation.verb().to_string(),
        });
        self.report.dispatched += 1;
        self.scheduler.submit(derived, command).await;
    }

    fn drop_item(&mut self, item: WorkItem, reason: String) {
        self.report.dropped += 1;
        self.events.emit(&PipelineEvent::Dropped {
            stage: self.report.stage.clone(),
            item,
            reason,
        });
    }

    fn publish(&mut self, output: &mut Option<StageSender>) {
        for done in self.scheduler.take_completed() {
            match done.outcome {
                Outcome::Exited(0) => {
                    self.report.succeeded += 1;
                    self.events.emit(&PipelineEvent::Completed {
                        stage: self.report.stage.clone(),
                        item: done.label.clone(),
                    });
                    self.forward(done.label, output);
                }
                outcome => {
                    if outcome == Outcome::Abandoned {
                        self.report.abandoned += 1;
                    } else {
                        self.report.failed += 1;
                        self.events.emit(&PipelineEvent::Failed {
                            stage: self.report.stage.clone(),
                            item: done.label.clone(),
                            outcome,
                        });
                    }
                    self.report.failures.push(FailureRecord::new(
                        self.report.stage.clone(),
                        done.label.clone(),
                        outcome,
                        done.attempt,
                    ));
                    if self.forwarding == Forwarding::AllCompleted && outcome != Outcome::Abandoned {
                        self.forward(done.label, output);
                    }
                }
            }
        }
    }

    fn forward(&mut self, item: WorkItem, output: &mut Option<StageSender>) {
        if let Some(output) = output {
            if output.send(item) {
                self.report.forwarded += 1;
            }
        }
    }

    fn finish_report(mut self, started: Instant) -> StageReport {
        let stats = self.scheduler.stats();
        self.report.restarted = stats.restarts;
        self.report.checks = stats.checks;
        self.report.launched = stats.launched;
        self.report.peak_in_flight = stats.peak_in_flight;
        self.report.duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.events.emit(&PipelineEvent::StageFinished {
            stage: self.report.stage.clone(),
            succeeded: self.report.succeeded,
            failed: self.report.failed + self.report.abandoned,
        });
        info!(
            stage = %self.report.stage,
            received = self.report.received,
            dispatched = self.report.dispatched,
            succeeded = self.report.succeeded,
            failed = self.report.failed,
            skipped = self.report.skipped,
            dropped = self.report.dropped,
            abandoned = self.report.abandoned,
            "Stage done"
        );
        self.report
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("operation", &self.operation)
            .field("scheduler", &self.scheduler)
            .field("gate", &self.gate.is_some())
            .field("forwarding", &self.forwarding)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
