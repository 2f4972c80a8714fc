//! Pipeline composer.

use super::queue::stage_queue;
use super::report::PipelineReport;
use super::stage::Stage;
use crate::core::WorkItem;
use crate::errors::{ClonefleetError, Result};
use crate::observability::{RunSpanAttributes, SpanTimer};
use futures::future::join_all;
use std::mem;
use tracing::{info, Instrument};

/// A chain of stages linked by queues.
///
/// All stages run concurrently on the calling task; no orchestration task
/// or thread is spawned. The run is over once the end-of-stream marker has
/// passed through every stage.
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Appends a stage fed by the previous one.
    #[must_use]
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// The pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage names in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if no stage was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Feeds `items` to the first stage and runs until every stage is done.
    pub async fn run<I>(self, items: I) -> Result<PipelineReport>
    where
        I: IntoIterator,
        I::Item: Into<WorkItem>,
    {
        let attrs = RunSpanAttributes::new(&self.name).with_stages(self.stage_names());
        let span = attrs.span();
        let Self { name, mut stages } = self;
        let Some(last) = stages.pop() else {
            return Err(ClonefleetError::EmptyPipeline(name));
        };

        async move {
            let timer = SpanTimer::start();

            let (mut source, mut input) = stage_queue();
            for item in items {
                source.send(item.into());
            }
            let total = source.sent();
            source.finish();
            info!(items = total, "Pipeline started");

            let mut runs = Vec::with_capacity(stages.len() + 1);
            for stage in stages {
                let (tx, rx) = stage_queue();
                let upstream = mem::replace(&mut input, rx);
                runs.push(stage.run(upstream, Some(tx)));
            }
            runs.push(last.run(input, None));

            let reports = join_all(runs).await;
            let report = PipelineReport {
                name,
                run_id: attrs.run_id,
                stages: reports,
                duration_ms: timer.elapsed_ms(),
            };
            info!(
                failures = report.failure_count(),
                duration_ms = report.duration_ms,
                "Pipeline finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CollectingEventSink, EventKind};
    use crate::pipeline::Stage;
    use crate::process::ExternalCommand;
    use crate::scheduler::{Budget, StallPolicy};
    use crate::stages::StageOperation;
    use crate::testing::{Behavior, ScriptedRunner};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug)]
    struct Tag(&'static str);

    impl StageOperation for Tag {
        fn name(&self) -> &str {
            self.0
        }

        fn verb(&self) -> &str {
            "Tagging"
        }

        fn derive(&self, item: &WorkItem) -> Option<WorkItem> {
            Some(WorkItem::new(format!("{item}+{}", self.0)))
        }

        fn command(&self, item: &WorkItem, _derived: &WorkItem) -> ExternalCommand {
            ExternalCommand::new(format!("{} {item}", self.0))
        }
    }

    fn tag_stage(name: &'static str, runner: &Arc<ScriptedRunner>, events: &Arc<CollectingEventSink>) -> Stage {
        Stage::new(
            Tag(name),
            Budget::new(2),
            StallPolicy::new(Duration::from_secs(30), 3, Duration::from_secs(300)),
            runner.clone(),
        )
        .with_events(events.clone())
    }

    #[tokio::test]
    async fn test_empty_pipeline_is_an_error() {
        let err = Pipeline::new("nothing").run(["a"]).await.unwrap_err();
        assert!(matches!(err, ClonefleetError::EmptyPipeline(name) if name == "nothing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_of_stream_passes_through_every_stage() {
        let runner = Arc::new(
            ScriptedRunner::new(Behavior::exit_after(0, Duration::from_secs(1)))
                .with_rule("first x", [Behavior::exit_after(0, Duration::from_secs(4))]),
        );
        let events = Arc::new(CollectingEventSink::new());
        let pipeline = Pipeline::new("chain")
            .stage(tag_stage("first", &runner, &events))
            .stage(tag_stage("second", &runner, &events))
            .stage(tag_stage("third", &runner, &events));
        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.stage_names(), vec!["first", "second", "third"]);

        let report = pipeline.run(["x", "y", "z"]).await.unwrap();

        assert_eq!(report.name, "chain");
        assert_eq!(report.stages.len(), 3);
        for stage in &report.stages {
            assert_eq!(stage.received, 3, "stage {}", stage.stage);
            assert_eq!(stage.succeeded, 3, "stage {}", stage.stage);
        }
        assert_eq!(report.stages[0].forwarded, 3);
        assert_eq!(report.stages[2].forwarded, 0);
        assert!(!report.has_failures());

        let finished = events.events_of_kind(EventKind::StageFinished);
        let order: Vec<&str> = finished.iter().map(|e| e.stage()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);

        // The slow item reaches the last stage after the others.
        let dispatched = events.events_of_kind(EventKind::Dispatched);
        let last_stage: Vec<String> = dispatched
            .iter()
            .filter(|e| e.stage() == "third")
            .filter_map(|e| e.item().map(ToString::to_string))
            .collect();
        assert_eq!(last_stage.last().map(String::as_str), Some("x+first+second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_counted_across_stages() {
        let runner = Arc::new(
            ScriptedRunner::new(Behavior::exit(0))
                .with_rule("first b", [Behavior::exit(1)])
                .with_rule("second c", [Behavior::exit(7)]),
        );
        let events = Arc::new(CollectingEventSink::new());
        let report = Pipeline::new("failing")
            .stage(tag_stage("first", &runner, &events))
            .stage(tag_stage("second", &runner, &events))
            .run(["a", "b", "c"])
            .await
            .unwrap();

        assert_eq!(report.failure_count(), 2);
        assert_eq!(report.stage("first").unwrap().failed, 1);
        assert_eq!(report.stage("second").unwrap().received, 2);
        assert_eq!(report.stage("second").unwrap().succeeded, 1);
        assert!(report.to_json().unwrap().contains("\"run_id\""));
    }
}
