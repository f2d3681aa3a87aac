use crate::error::{Error, Result};
use crate::probe::Readiness;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Blocks until a probe reports [`Readiness::Ready`] or a deadline passes.
///
/// Absent and pending results are retried; probe errors are returned as-is.
/// The interval never drops below [`MIN_POLL_INTERVAL`].
/// A timeout is never reported before the deadline: when less than one
/// interval remains, the waiter sleeps only until the deadline and probes one
/// last time.
#[derive(Debug, Clone, Copy)]
pub struct Waiter {
    interval: Duration,
}

impl Default for Waiter {
    fn default() -> Self {
        Waiter::new(DEFAULT_POLL_INTERVAL)
    }
}

impl Waiter {
    pub fn new(interval: Duration) -> Self {
        Waiter {
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn wait_for<F>(&self, description: &str, deadline: Instant, mut probe: F) -> Result<u32>
    where
        F: FnMut() -> Result<Readiness>,
    {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let readiness = probe()?;
            if readiness.is_ready() {
                debug!(description, attempts, "ready");
                return Ok(attempts);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout {
                    description: description.to_string(),
                    waited: started.elapsed(),
                });
            }

            debug!(description, attempts, %readiness, "waiting");
            std::thread::sleep(self.interval.min(remaining));
        }
    }
}
