//! Store configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::retry::RetryPolicy;

/// Tuning knobs for a [`TrajectoryStore`](crate::TrajectoryStore).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Delay before retrying a write that hit a transient lock error.
    pub retry_delay_ms: u64,
    /// Retries after the first failed attempt. Zero disables retrying.
    pub retry_attempts: u32,
    /// Target size of one on-disk chunk for newly created datasets.
    pub chunk_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 500,
            retry_attempts: 1,
            chunk_bytes: crate::file::DEFAULT_CHUNK_BYTES,
        }
    }
}

impl StoreConfig {
    /// The retry policy this configuration describes.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retries_once_after_half_a_second() {
        let policy = StoreConfig::default().retry_policy();
        assert_eq!(policy.retries(), 1);
        assert_eq!(policy.delay(), Duration::from_millis(500));
    }

    #[test]
    fn partial_table_keeps_other_defaults() {
        let config: StoreConfig = toml::from_str("retry_delay_ms = 20").unwrap();
        assert_eq!(config.retry_delay_ms, 20);
        assert_eq!(config.retry_attempts, 1);
        assert_eq!(config.chunk_bytes, crate::file::DEFAULT_CHUNK_BYTES);
    }
}
