//! Process runners.

use super::ExternalCommand;
use futures::future::{self, BoxFuture};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{trace, warn};

/// Status reported when no exit code is available (spawn failure, signal,
/// wait error).
pub const UNKNOWN_STATUS: i32 = -1;

/// Handle to a launched operation; resolves to its exit status.
///
/// Dropping the handle before it resolves must stop the underlying process.
pub type OperationFuture = BoxFuture<'static, i32>;

/// Launches one external operation.
///
/// Implementations never fail: anything that goes wrong is reported as a
/// non-zero status.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessRunner: Send + Sync {
    /// Starts `command` and returns a handle to its completion.
    fn launch(&self, command: &ExternalCommand) -> OperationFuture;
}

/// Runs commands through `sh -c`.
///
/// On unix each command gets its own process group. Dropping an unresolved
/// handle kills the whole group, so pipelines and `&&` chains spawned by the
/// shell die with it.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    inherit_output: bool,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            inherit_output: false,
        }
    }
}

impl ShellRunner {
    /// Creates a runner using `sh`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a different shell binary.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Lets child output through to this process's stdout/stderr.
    #[must_use]
    pub fn with_inherited_output(mut self, inherit: bool) -> Self {
        self.inherit_output = inherit;
        self
    }

    fn output(&self) -> Stdio {
        if self.inherit_output {
            Stdio::inherit()
        } else {
            Stdio::null()
        }
    }
}

impl ProcessRunner for ShellRunner {
    fn launch(&self, command: &ExternalCommand) -> OperationFuture {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(&command.script)
            .stdin(Stdio::null())
            .stdout(self.output())
            .stderr(self.output())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        trace!(script = %command.script, "spawn");
        match cmd.spawn() {
            Ok(mut child) => {
                let script = command.script.clone();
                let group = GroupKiller::new(child.id());
                Box::pin(async move {
                    let status = match child.wait().await {
                        Ok(status) => status.code().unwrap_or(UNKNOWN_STATUS),
                        Err(e) => {
                            warn!(%script, error = %e, "Failed waiting for process");
                            UNKNOWN_STATUS
                        }
                    };
                    group.disarm();
                    status
                })
            }
            Err(e) => {
                warn!(command = %command, error = %e, "Failed to spawn process");
                Box::pin(future::ready(UNKNOWN_STATUS))
            }
        }
    }
}

/// Kills a child's process group when dropped while still armed.
#[derive(Debug)]
struct GroupKiller {
    pgid: Option<u32>,
}

impl GroupKiller {
    const fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupKiller {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => trace!(pgid, "killed process group"),
        Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => warn!(pgid, error = %e, "Failed to kill process group"),
    }
}

// Without process groups only the direct child is stopped, by `kill_on_drop`.
#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_exit_status_is_reported() {
        let runner = ShellRunner::new();
        assert_eq!(runner.launch(&ExternalCommand::new("true")).await, 0);
        assert_eq!(runner.launch(&ExternalCommand::new("exit 3")).await, 3);
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), b"x").unwrap();

        let runner = ShellRunner::new();
        let found = ExternalCommand::new("test -f marker").in_dir(dir.path());
        assert_eq!(runner.launch(&found).await, 0);
        assert_ne!(runner.launch(&ExternalCommand::new("test -f marker")).await, 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_a_status() {
        let runner = ShellRunner::new();
        let cmd = ExternalCommand::new("true").in_dir("/definitely/not/here");
        assert_eq!(runner.launch(&cmd).await, UNKNOWN_STATUS);

        let missing_shell = ShellRunner::new().with_shell("/no/such/shell");
        assert_eq!(
            missing_shell.launch(&ExternalCommand::new("true")).await,
            UNKNOWN_STATUS
        );
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_process() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ShellRunner::new();
        let cmd = ExternalCommand::new("sleep 2 && touch late").in_dir(dir.path());

        let handle = runner.launch(&cmd);
        drop(handle);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert!(!dir.path().join("late").exists());
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_nested_commands() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ShellRunner::new();
        let cmd = ExternalCommand::new("sh -c 'sleep 1; touch leaked' && true").in_dir(dir.path());

        let mut handle = runner.launch(&cmd);
        let early = tokio::time::timeout(Duration::from_millis(200), &mut handle).await;
        assert!(early.is_err());
        drop(handle);
        tokio::time::sleep(Duration::from_millis(1800)).await;

        assert!(!dir.path().join("leaked").exists());
    }

    #[tokio::test]
    async fn test_finished_command_keeps_its_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ShellRunner::new();
        let cmd = ExternalCommand::new("sh -c 'touch done' && true").in_dir(dir.path());

        assert_eq!(runner.launch(&cmd).await, 0);
        assert!(dir.path().join("done").exists());
    }
}
