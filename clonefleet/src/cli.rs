//! Command-line interface.
//!
//! `clonefleet clone` fetches every locator listed in the given files and
//! `clonefleet unshallow` re-hydrates archives. A file argument of `-` reads
//! the list from stdin. Each list runs as its own pipeline, in order.

use crate::config::PipelineConfig;
use crate::errors::Result;
use crate::input::read_locators;
use crate::observability::LogFormat;
use crate::pipeline::PipelineReport;
use crate::workflow::Orchestrator;
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Clone, archive and re-hydrate git repositories in bulk.
#[derive(Debug, Clone, Parser)]
#[command(name = "clonefleet", version)]
pub struct Cli {
    /// What to do.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every command.
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Options shared by every command.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Concurrency budget per stage. Default: number of cores.
    #[arg(long, short = 'j', global = true)]
    pub budget: Option<usize>,

    /// Directory that relative paths are resolved against.
    #[arg(long, short = 'C', global = true, default_value = ".")]
    pub directory: PathBuf,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

/// The two workflows.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Clone every repository listed in the given files.
    Clone {
        /// Files with one clone locator per line (`-` for stdin).
        #[arg(value_name = "REPOFILE", required = true)]
        repofiles: Vec<PathBuf>,

        /// Save repositories with depth 1.
        #[arg(long, short = 'm')]
        minimal_depth: bool,

        /// Compress cloned repositories into `.tar.xz` archives.
        #[arg(long, short = 'z')]
        compress: bool,

        /// Skip repositories whose archive already exists and is valid.
        #[arg(long, short = 'r')]
        resume: bool,
    },
    /// Unpack archives and fetch their full history.
    Unshallow {
        /// Files with one archive path per line (`-` for stdin).
        #[arg(value_name = "REPOFILE", required = true)]
        repofiles: Vec<PathBuf>,

        /// Compress unshallowed repositories back into archives.
        #[arg(long, short = 'z')]
        compress: bool,

        /// Directory the re-compressed archives are written to.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Builds the pipeline configuration for the chosen command.
    pub fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new().with_working_directory(&self.common.directory);
        if let Some(budget) = self.common.budget {
            config = config.with_budget(budget);
        }
        match &self.command {
            Command::Clone {
                minimal_depth,
                compress,
                resume,
                ..
            } => config
                .with_minimal_depth(*minimal_depth)
                .with_compress(*compress)
                .with_resume(*resume),
            Command::Unshallow {
                compress, output, ..
            } => {
                let config = config.with_compress(*compress);
                match output {
                    Some(dir) => config.with_output_directory(dir),
                    None => config,
                }
            }
        }
    }

    /// The input list files, in the order given.
    pub fn repofiles(&self) -> &[PathBuf] {
        match &self.command {
            Command::Clone { repofiles, .. } | Command::Unshallow { repofiles, .. } => repofiles,
        }
    }
}

/// Reads one list; `-` means stdin.
pub fn read_repofile(path: &Path) -> Result<Vec<String>> {
    if path.as_os_str() == "-" {
        read_locators(io::stdin().lock())
    } else {
        read_locators(BufReader::new(File::open(path)?))
    }
}

/// Runs the chosen command over every list and returns one report per list.
pub async fn run(cli: &Cli) -> Result<Vec<PipelineReport>> {
    let orchestrator = Orchestrator::new(cli.config())?;
    run_with(cli, &orchestrator).await
}

/// Like [`run`], with a preconfigured orchestrator.
pub async fn run_with(cli: &Cli, orchestrator: &Orchestrator) -> Result<Vec<PipelineReport>> {
    let mut reports = Vec::with_capacity(cli.repofiles().len());
    for path in cli.repofiles() {
        let entries = read_repofile(path)?;
        let report = match cli.command {
            Command::Clone { .. } => orchestrator.clone_repositories(entries).await?,
            Command::Unshallow { .. } => orchestrator.rehydrate_archives(entries).await?,
        };
        reports.push(report);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use pretty_assertions::assert_eq;
    use std::ffi::OsStr;
    use std::sync::Arc;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_clone_flags() {
        let cli = parse(&["clonefleet", "clone", "-mzr", "a.txt", "b.txt", "-j", "3"]);
        let config = cli.config();
        assert!(config.minimal_depth);
        assert!(config.compress);
        assert!(config.resume);
        assert_eq!(config.budget, Some(3));
        assert_eq!(
            cli.repofiles(),
            &[PathBuf::from("a.txt"), PathBuf::from("b.txt")]
        );
    }

    #[test]
    fn test_unshallow_flags() {
        let cli = parse(&["clonefleet", "unshallow", "-z", "-o", "out", "-"]);
        let config = cli.config();
        assert!(config.compress);
        assert!(!config.resume);
        assert_eq!(config.output_directory, Some(PathBuf::from("out")));
        assert_eq!(cli.common.log_format, LogFormat::Text);
    }

    #[test]
    fn test_repofile_is_required() {
        assert!(Cli::try_parse_from(["clonefleet", "clone"]).is_err());
        assert!(Cli::try_parse_from(["clonefleet", "unshallow", "-z"]).is_err());
    }

    #[test]
    fn test_json_logging_flag() {
        let cli = parse(&["clonefleet", "--log-format", "json", "clone", "a.txt"]);
        assert_eq!(cli.common.log_format, LogFormat::Json);
    }

    #[test]
    fn test_read_repofile_trims_lines() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("repos.txt");
        std::fs::write(&list, "host/a/b\n\n  host/c/d  \n").unwrap();
        assert_eq!(read_repofile(&list).unwrap(), vec!["host/a/b", "host/c/d"]);
        assert!(read_repofile(&dir.path().join("missing.txt")).is_err());
    }

    #[tokio::test]
    async fn test_one_report_per_repofile() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        std::fs::write(&first, "host/a/b\nhost/c/d\n").unwrap();
        std::fs::write(&second, "host/e/f\n").unwrap();

        let cli = Cli::try_parse_from([
            OsStr::new("clonefleet"),
            OsStr::new("clone"),
            first.as_os_str(),
            second.as_os_str(),
        ])
        .unwrap();
        let runner = Arc::new(ScriptedRunner::succeeding());
        let orchestrator = Orchestrator::new(cli.config())
            .unwrap()
            .with_runner(runner.clone());

        let reports = run_with(&cli, &orchestrator).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].stage("clone").unwrap().dispatched, 2);
        assert_eq!(reports[1].stage("clone").unwrap().dispatched, 1);
        assert_eq!(runner.launches_matching("git clone"), 3);
    }
}
