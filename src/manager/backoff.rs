//! Bounded exponential backoff with jitter for contended acquisition.

use crate::config::BackoffConfig;
use std::time::Duration;

/// Delay schedule for one `acquire` call.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    next: Duration,
    max: Duration,
    jitter: Duration,
}

impl Backoff {
    pub(crate) fn new(config: &BackoffConfig) -> Self {
        Self {
            next: config.initial.as_duration(),
            max: config.max.as_duration(),
            jitter: config.jitter.as_duration(),
        }
    }

    /// The delay before the next attempt; doubles each call up to `max`.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let base = self.next.min(self.max);
        self.next = self.next.saturating_mul(2).min(self.max);
        base + random_jitter(self.jitter)
    }
}

fn random_jitter(max: Duration) -> Duration {
    let max_millis = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_millis == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::random_range(0..=max_millis))
}
