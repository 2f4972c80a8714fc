//! The clone and rehydrate workflows.

use crate::commands::{CommandFactory, GitTarXz};
use crate::config::PipelineConfig;
use crate::core::WorkItem;
use crate::errors::Result;
use crate::events::{EventSink, LoggingEventSink};
use crate::gate::ResumabilityGate;
use crate::layout::Layout;
use crate::pipeline::{Pipeline, PipelineReport, Stage};
use crate::process::{ProcessRunner, ShellRunner};
use crate::stages::{CloneRepository, CompressDirectory, StageOperation, UnpackArchive, Unshallow};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Builds and runs the pipelines for one configuration.
///
/// # Example
///
/// ```no_run
/// use clonefleet::prelude::*;
///
/// # async fn run() -> clonefleet::Result<()> {
/// let config = PipelineConfig::new().with_compress(true).with_resume(true);
/// let report = Orchestrator::new(config)?
///     .clone_repositories(["https://github.com/tokio-rs/tokio"])
///     .await?;
/// println!("{} failures", report.failure_count());
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    config: PipelineConfig,
    layout: Layout,
    runner: Arc<dyn ProcessRunner>,
    commands: Arc<dyn CommandFactory>,
    events: Arc<dyn EventSink>,
}

impl Orchestrator {
    /// Creates an orchestrator running real `git`, `tar` and `xz` commands.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            layout: Layout::from_config(&config),
            config,
            runner: Arc::new(ShellRunner::new()),
            commands: Arc::new(GitTarXz::new()),
            events: Arc::new(LoggingEventSink::new()),
        })
    }

    /// Replaces the process runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replaces the command factory.
    #[must_use]
    pub fn with_commands(mut self, commands: Arc<dyn CommandFactory>) -> Self {
        self.commands = commands;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The filesystem layout.
    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// `clone`, then `compress` when enabled.
    #[must_use]
    pub fn clone_pipeline(&self) -> Pipeline {
        let clone = CloneRepository::new(self.layout.clone(), Arc::clone(&self.commands))
            .with_minimal_depth(self.config.minimal_depth);
        let mut stage = self.stage(clone);
        if self.config.resume {
            stage = stage.with_gate(ResumabilityGate::new(Arc::clone(&self.commands)));
        }
        self.with_compression(Pipeline::new("clone").stage(stage))
    }

    /// `unpack`, `unshallow`, then `compress` when enabled.
    #[must_use]
    pub fn rehydrate_pipeline(&self) -> Pipeline {
        let unpack = UnpackArchive::new(self.layout.clone(), Arc::clone(&self.commands));
        let unshallow = Unshallow::new(self.layout.clone(), Arc::clone(&self.commands));
        self.with_compression(
            Pipeline::new("rehydrate")
                .stage(self.stage(unpack))
                .stage(self.stage(unshallow)),
        )
    }

    /// Clones every locator.
    pub async fn clone_repositories<I>(&self, locators: I) -> Result<PipelineReport>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.prepare_output().await?;
        let items = locators.into_iter().map(WorkItem::new);
        let report = self.clone_pipeline().run(items).await?;
        summarize(&report);
        Ok(report)
    }

    /// Unpacks every archive and fetches its full history.
    pub async fn rehydrate_archives<I>(&self, archives: I) -> Result<PipelineReport>
    where
        I: IntoIterator,
        I::Item: Into<WorkItem>,
    {
        self.prepare_output().await?;
        let report = self.rehydrate_pipeline().run(archives).await?;
        summarize(&report);
        Ok(report)
    }

    fn stage(&self, operation: impl StageOperation + 'static) -> Stage {
        Stage::new(
            operation,
            self.config.budget(),
            self.config.stall_policy(),
            Arc::clone(&self.runner),
        )
        .with_events(Arc::clone(&self.events))
    }

    fn with_compression(&self, pipeline: Pipeline) -> Pipeline {
        if self.config.compress {
            let compress = CompressDirectory::new(self.layout.clone(), Arc::clone(&self.commands));
            pipeline.stage(self.stage(compress))
        } else {
            pipeline
        }
    }

    async fn prepare_output(&self) -> Result<()> {
        if let Some(dir) = self.layout.output_directory() {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("layout", &self.layout)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

fn summarize(report: &PipelineReport) {
    for failure in report.failures() {
        warn!(
            stage = %failure.stage,
            item = %failure.item,
            outcome = %failure.outcome,
            attempt = failure.attempt,
            "Item did not complete"
        );
    }
    info!(
        pipeline = %report.name,
        run_id = %report.run_id,
        failures = report.failure_count(),
        "Run complete"
    );
}
