//! Sleep-based backoff for callers that wait on an empty queue.

use std::time::Duration;

/// Exponential backoff settings for the waiting dequeue helpers.
///
/// Each failed attempt sleeps for the current delay, then doubles it up to
/// `max`.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use twinlock::BackoffConfig;
///
/// let config = BackoffConfig::new(Duration::from_micros(100), Duration::from_micros(100));
/// assert_eq!(config.initial(), Duration::from_micros(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    initial: Duration,
    max: Duration,
}

impl BackoffConfig {
    /// Delay before the second attempt
    pub const DEFAULT_INITIAL: Duration = Duration::from_nanos(50);
    /// Upper bound on a single sleep
    pub const DEFAULT_MAX: Duration = Duration::from_millis(1);

    /// Create a backoff policy. `initial` is clamped to `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial: initial.min(max),
            max,
        }
    }

    /// First sleep duration
    pub fn initial(&self) -> Duration {
        self.initial
    }

    /// Largest sleep duration
    pub fn max(&self) -> Duration {
        self.max
    }

    pub(crate) fn start(&self) -> Backoff {
        Backoff {
            current: self.initial,
            max: self.max,
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL, Self::DEFAULT_MAX)
    }
}

/// Running state of one wait loop.
#[derive(Debug)]
pub(crate) struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    /// Delay to sleep now; advances the schedule.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = core::cmp::min(self.current.saturating_mul(2), self.max);
        delay
    }
}
