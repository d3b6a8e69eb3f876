//! Watch engine configuration.

use std::time::Duration;

/// Watch engine configuration.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Period of the scheduling timer
    pub tick_interval: Duration,
    /// Most jobs taken from the queue by one tick
    pub max_jobs_per_tick: usize,
    /// Most jobs being polled at once across overlapping ticks
    pub max_in_flight: usize,
    /// Consecutive transient failures tolerated before giving up on a job
    pub max_poll_failures: u32,
    /// Give up on jobs still running after this long (`None` polls forever)
    pub max_watch_duration: Option<Duration>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(250),
            max_jobs_per_tick: 4,
            max_in_flight: 16,
            max_poll_failures: 5,
            max_watch_duration: None,
        }
    }
}

impl WatchConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            tick_interval: std::env::var("ZENCODER_WATCH_TICK_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|ms: &u64| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            max_jobs_per_tick: std::env::var("ZENCODER_WATCH_JOBS_PER_TICK")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_jobs_per_tick)
                .max(1),
            max_in_flight: std::env::var("ZENCODER_WATCH_MAX_IN_FLIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_in_flight)
                .max(1),
            max_poll_failures: std::env::var("ZENCODER_WATCH_MAX_POLL_FAILURES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_poll_failures)
                .max(1),
            // Unset or 0 keeps polling forever.
            max_watch_duration: std::env::var("ZENCODER_WATCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}
