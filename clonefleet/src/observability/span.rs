use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info_span, Span};

/// Attributes attached to the span of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpanAttributes {
    /// Pipeline name.
    pub pipeline_name: String,
    /// Run identifier.
    pub run_id: String,
    /// Stage names in order.
    pub stages: Vec<String>,
}

impl RunSpanAttributes {
    /// Creates attributes for `pipeline_name` with a fresh run id.
    #[must_use]
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            run_id: uuid::Uuid::new_v4().to_string(),
            stages: Vec::new(),
        }
    }

    /// Sets the stage names.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Opens the `pipeline` span.
    #[must_use]
    pub fn span(&self) -> Span {
        info_span!(
            "pipeline",
            name = %self.pipeline_name,
            run_id = %self.run_id,
            stages = %self.stages.join(" -> "),
        )
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_run_ids_are_unique() {
        let a = RunSpanAttributes::new("clone");
        let b = RunSpanAttributes::new("clone");
        assert_ne!(a.run_id, b.run_id);
        assert!(uuid::Uuid::parse_str(&a.run_id).is_ok());
    }

    #[test]
    fn test_span_can_be_entered() {
        let attrs = RunSpanAttributes::new("rehydrate")
            .with_stages(vec!["unpack".to_string(), "unshallow".to_string()]);
        let span = attrs.span();
        let _entered = span.enter();
        assert_eq!(attrs.stages.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_measures_elapsed() {
        let timer = SpanTimer::start();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(timer.elapsed_ms() >= 250.0);
    }
}
