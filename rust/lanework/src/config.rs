//! Executor configuration.

use std::{
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use lanework_common::{Result, error::Error, verify_arg};
use serde::{Deserialize, Serialize};

/// Lane count used when nothing else is configured.
pub const DEFAULT_LANE_COUNT: usize = 3;

/// Configures the process-wide default lane count.
///
/// The value is picked up by every [`ExecutorConfig::default()`] created
/// afterwards. Values less than 1 are clamped to 1.
pub fn configure_default_lane_count(lane_count: usize) {
    DEFAULT_LANES.store(lane_count.max(1), Ordering::SeqCst);
}

/// Returns the process-wide default lane count: the value set through
/// [`configure_default_lane_count`], or [`DEFAULT_LANE_COUNT`].
pub fn default_lane_count() -> usize {
    match DEFAULT_LANES.load(Ordering::SeqCst) {
        0 => DEFAULT_LANE_COUNT,
        n => n,
    }
}

/// Zero means "not configured".
static DEFAULT_LANES: AtomicUsize = AtomicUsize::new(0);

/// Parameters of a [`LaneExecutor`](crate::LaneExecutor).
///
/// Deserializable from JSON; missing fields take their defaults:
///
/// ```json
/// { "lane_count": 4, "thread_name_prefix": "fetch", "deadline_ms": 30000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Number of lanes, and so the maximum number of items in flight.
    pub lane_count: usize,
    /// Lane threads are named `<prefix>-<lane>`; an empty prefix leaves them
    /// unnamed.
    pub thread_name_prefix: String,
    /// Optional overall deadline. When it passes, the execution ends with
    /// [`Error::Cancelled`](crate::Error::Cancelled).
    pub deadline_ms: Option<u64>,
}

impl ExecutorConfig {
    pub fn new(lane_count: usize) -> Result<ExecutorConfig> {
        let config = ExecutorConfig {
            lane_count,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> ExecutorConfig {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> ExecutorConfig {
        self.deadline_ms = Some(u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(lane_count, self.lane_count >= 1);
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<ExecutorConfig> {
        let config: ExecutorConfig = serde_json::from_str(json)
            .map_err(|e| Error::invalid_format("executor config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<ExecutorConfig> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        Self::from_json_str(&json)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            lane_count: default_lane_count(),
            thread_name_prefix: "lanework".to_string(),
            deadline_ms: None,
        }
    }
}
