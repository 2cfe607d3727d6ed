//! Worker configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Polling settings for the extraction worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Seconds between polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Most requests handled per poll
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_batch_limit() -> usize {
    50
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            batch_limit: default_batch_limit(),
        }
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: WorkerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, WorkerConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.batch_limit, 50);
    }
}
