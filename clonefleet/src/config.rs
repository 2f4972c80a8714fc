//! Pipeline configuration.

use crate::errors::{ConfigError, Result};
use crate::scheduler::{Budget, StallPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a clone or rehydrate run.
///
/// Every field has a default, so a JSON document only needs to name the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Concurrency budget per stage. `None` uses the logical core count.
    pub budget: Option<usize>,
    /// How long a throttle wait may go without any completion.
    pub stall_timeout_secs: u64,
    /// Consecutive stall timeouts before the pending batch is restarted.
    pub stall_threshold: u32,
    /// Absolute deadline for restarted operations.
    pub restart_deadline_secs: u64,
    /// Clone with `--depth=1`.
    pub minimal_depth: bool,
    /// Append a compression stage.
    pub compress: bool,
    /// Skip items whose archive already exists and passes `xz -t`.
    pub resume: bool,
    /// Where archives are written. Created if absent.
    pub output_directory: Option<PathBuf>,
    /// Base directory for clones and for relative archive paths.
    pub working_directory: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            budget: None,
            stall_timeout_secs: 30 * 60,
            stall_threshold: 3,
            restart_deadline_secs: 6 * 60 * 60,
            minimal_depth: false,
            compress: false,
            resume: false,
            output_directory: None,
            working_directory: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON configuration and validates it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets an explicit budget.
    #[must_use]
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Sets the stall timeout.
    #[must_use]
    pub fn with_stall_timeout_secs(mut self, secs: u64) -> Self {
        self.stall_timeout_secs = secs;
        self
    }

    /// Sets the stall threshold.
    #[must_use]
    pub fn with_stall_threshold(mut self, threshold: u32) -> Self {
        self.stall_threshold = threshold;
        self
    }

    /// Sets the restart deadline.
    #[must_use]
    pub fn with_restart_deadline_secs(mut self, secs: u64) -> Self {
        self.restart_deadline_secs = secs;
        self
    }

    /// Enables shallow clones.
    #[must_use]
    pub fn with_minimal_depth(mut self, enabled: bool) -> Self {
        self.minimal_depth = enabled;
        self
    }

    /// Enables the compression stage.
    #[must_use]
    pub fn with_compress(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    /// Enables resumability checks.
    #[must_use]
    pub fn with_resume(mut self, enabled: bool) -> Self {
        self.resume = enabled;
        self
    }

    /// Sets the archive output directory.
    #[must_use]
    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(dir.into());
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.budget == Some(0) {
            return Err(ConfigError::new("budget", "must be at least 1"));
        }
        if self.stall_timeout_secs == 0 {
            return Err(ConfigError::new("stall_timeout_secs", "must be positive"));
        }
        if self.stall_threshold == 0 {
            return Err(ConfigError::new("stall_threshold", "must be at least 1"));
        }
        if self.restart_deadline_secs == 0 {
            return Err(ConfigError::new("restart_deadline_secs", "must be positive"));
        }
        Ok(())
    }

    /// The per-stage budget.
    #[must_use]
    pub fn budget(&self) -> Budget {
        self.budget.map_or_else(Budget::from_parallelism, Budget::new)
    }

    /// The stall policy derived from the timeout fields.
    #[must_use]
    pub fn stall_policy(&self) -> StallPolicy {
        StallPolicy::new(
            Duration::from_secs(self.stall_timeout_secs),
            self.stall_threshold,
            Duration::from_secs(self.restart_deadline_secs),
        )
    }
}
