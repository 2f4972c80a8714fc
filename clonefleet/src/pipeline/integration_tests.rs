//! End-to-end scenarios against real shell processes.
//!
//! The commands are stand-ins for git, tar and xz that only create, copy and
//! inspect small files, so every scenario runs in milliseconds.

#[cfg(all(test, unix))]
mod tests {
    use crate::commands::CommandFactory;
    use crate::config::PipelineConfig;
    use crate::core::WorkItem;
    use crate::events::{CollectingEventSink, EventKind};
    use crate::layout::ARCHIVE_SUFFIX;
    use crate::process::{shell_quote, ExternalCommand, ShellRunner};
    use crate::testing::RecordingRunner;
    use crate::workflow::Orchestrator;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Writes `archive` headers instead of real archives.
    #[derive(Debug)]
    struct FakeTools;

    impl CommandFactory for FakeTools {
        fn clone_repository(
            &self,
            locator: &str,
            directory: &Path,
            _minimal_depth: bool,
        ) -> ExternalCommand {
            if locator.contains("broken") {
                return ExternalCommand::new(": clone; exit 128");
            }
            ExternalCommand::new(format!(
                ": clone; mkdir -p {dir} && echo {locator} > {dir}/ORIGIN",
                dir = shell_quote(directory),
                locator = shell_quote(locator),
            ))
        }

        fn unpack_archive(&self, archive: &Path) -> ExternalCommand {
            let raw = archive.to_string_lossy();
            let dir = raw.strip_suffix(ARCHIVE_SUFFIX).unwrap_or(&*raw);
            ExternalCommand::new(format!(
                ": unpack; mkdir -p {dir} && cp {archive} {dir}/CONTENT",
                dir = shell_quote(dir),
                archive = shell_quote(archive),
            ))
        }

        fn unshallow(&self, directory: &Path) -> ExternalCommand {
            ExternalCommand::new(": unshallow; touch UNSHALLOWED").in_dir(directory)
        }

        fn compress_directory(&self, directory: &Path, archive: &Path) -> ExternalCommand {
            ExternalCommand::new(format!(
                ": compress; (echo archive; ls {dir}) > {archive} && rm -rf {dir}",
                dir = shell_quote(directory),
                archive = shell_quote(archive),
            ))
        }

        fn test_archive(&self, archive: &Path) -> ExternalCommand {
            ExternalCommand::new(format!(": test; grep -q '^archive' {}", shell_quote(archive)))
        }
    }

    struct Harness {
        dir: TempDir,
        runner: Arc<RecordingRunner<ShellRunner>>,
        events: Arc<CollectingEventSink>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                runner: Arc::new(RecordingRunner::new(ShellRunner::new())),
                events: Arc::new(CollectingEventSink::new()),
            }
        }

        fn path(&self, name: &str) -> std::path::PathBuf {
            self.dir.path().join(name)
        }

        fn config(&self) -> PipelineConfig {
            PipelineConfig::new()
                .with_budget(2)
                .with_working_directory(self.dir.path())
        }

        fn orchestrator(&self, config: PipelineConfig) -> Orchestrator {
            Orchestrator::new(config)
                .unwrap()
                .with_runner(self.runner.clone())
                .with_commands(Arc::new(FakeTools))
                .with_events(self.events.clone())
        }

        fn launches(&self, verb: &str) -> usize {
            self.runner.launches_matching(&format!(": {verb};"))
        }
    }

    #[tokio::test]
    async fn test_two_locators_are_cloned() {
        let h = Harness::new();
        let report = h
            .orchestrator(h.config())
            .clone_repositories(["host/a/b", "host/c/d"])
            .await
            .unwrap();

        assert!(h.path("a_b").is_dir());
        assert!(h.path("c_d").is_dir());
        assert_eq!(h.launches("clone"), 2);
        let clone = report.stage("clone").unwrap();
        assert_eq!(clone.dispatched, 2);
        assert_eq!(clone.succeeded, 2);
        assert!(!report.has_failures());
        assert!(h.runner.peak() <= 4);
    }

    #[tokio::test]
    async fn test_resume_skips_valid_archive() {
        let h = Harness::new();
        fs::write(h.path("a_b.tar.xz"), "archive\nORIGIN\n").unwrap();

        let report = h
            .orchestrator(h.config().with_resume(true))
            .clone_repositories(["host/a/b", "host/c/d"])
            .await
            .unwrap();

        assert!(!h.path("a_b").exists());
        assert!(h.path("c_d").is_dir());
        assert_eq!(h.launches("clone"), 1);
        assert_eq!(h.launches("test"), 1);
        assert_eq!(h.events.items_of_kind(EventKind::Skipped), vec![WorkItem::new("host/a/b")]);

        let clone = report.stage("clone").unwrap();
        assert_eq!(clone.received, 2);
        assert_eq!(clone.skipped, 1);
        assert_eq!(clone.dispatched, 1);
    }

    #[tokio::test]
    async fn test_second_resumed_run_only_checks_archives() {
        let h = Harness::new();
        let config = h.config().with_resume(true).with_compress(true);
        let locators = ["host/a/b", "host/c/d"];

        let first = h.orchestrator(config.clone()).clone_repositories(locators).await.unwrap();
        assert!(!first.has_failures());
        assert!(h.path("a_b.tar.xz").is_file());
        assert!(h.path("c_d.tar.xz").is_file());
        assert!(!h.path("a_b").exists());
        assert_eq!(h.launches("clone"), 2);
        assert_eq!(h.launches("compress"), 2);

        let second = h.orchestrator(config).clone_repositories(locators).await.unwrap();
        assert_eq!(h.launches("clone"), 2);
        assert_eq!(h.launches("compress"), 2);
        assert_eq!(h.launches("test"), 2);
        assert_eq!(second.stage("clone").unwrap().skipped, 2);
        assert_eq!(second.stage("compress").unwrap().received, 0);
    }

    #[tokio::test]
    async fn test_corrupt_and_empty_archives_are_redone() {
        let h = Harness::new();
        fs::write(h.path("a_b.tar.xz"), "garbage").unwrap();
        fs::write(h.path("c_d.tar.xz"), "").unwrap();

        let report = h
            .orchestrator(h.config().with_resume(true).with_compress(true))
            .clone_repositories(["host/a/b", "host/c/d"])
            .await
            .unwrap();

        assert_eq!(h.launches("clone"), 2);
        // The empty archive is rejected without running the test.
        assert_eq!(h.launches("test"), 1);
        assert_eq!(report.stage("compress").unwrap().succeeded, 2);
        let rewritten = fs::read_to_string(h.path("c_d.tar.xz")).unwrap();
        assert!(rewritten.starts_with("archive"));
    }

    #[tokio::test]
    async fn test_failed_clone_is_reported_and_not_compressed() {
        let h = Harness::new();
        let report = h
            .orchestrator(h.config().with_compress(true))
            .clone_repositories(["host/a/b", "host/broken/repo"])
            .await
            .unwrap();

        assert_eq!(report.failure_count(), 1);
        let failure = report.failures()[0];
        assert_eq!(failure.stage, "clone");
        assert_eq!(failure.outcome.status(), Some(128));
        assert_eq!(report.stage("compress").unwrap().received, 1);
        assert_eq!(h.launches("compress"), 1);
    }

    #[tokio::test]
    async fn test_missing_archive_is_dropped_before_unshallow() {
        let h = Harness::new();
        let report = h
            .orchestrator(h.config())
            .rehydrate_archives([WorkItem::new("x.tar.xz")])
            .await
            .unwrap();

        assert_eq!(h.launches("unpack"), 0);
        assert_eq!(h.launches("unshallow"), 0);
        assert_eq!(report.stage("unpack").unwrap().dropped, 1);
        assert_eq!(report.stage("unshallow").unwrap().received, 0);
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn test_rehydrate_into_output_directory() {
        let h = Harness::new();
        fs::write(h.path("a_b.tar.xz"), "archive\n").unwrap();
        fs::write(h.path("c_d.tar.xz"), "archive\n").unwrap();

        let report = h
            .orchestrator(h.config().with_compress(true).with_output_directory("out"))
            .rehydrate_archives([
                WorkItem::new("a_b.tar.xz"),
                WorkItem::from(h.path("c_d.tar.xz")),
                WorkItem::new("gone.tar.xz"),
            ])
            .await
            .unwrap();

        assert_eq!(h.launches("unpack"), 2);
        assert_eq!(h.launches("unshallow"), 2);
        assert_eq!(h.launches("compress"), 2);
        for name in ["a_b", "c_d"] {
            let archive = fs::read_to_string(h.path(&format!("out/{name}.tar.xz"))).unwrap();
            assert!(archive.contains("UNSHALLOWED"), "{name}: {archive}");
            assert!(!h.path(name).exists());
        }
        assert_eq!(report.stage("unpack").unwrap().dropped, 1);
        assert_eq!(report.stages.iter().map(|s| s.succeeded).sum::<usize>(), 6);
    }
}
