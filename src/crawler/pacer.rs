//! Request pacing
//!
//! Runs are strictly sequential, so a single "last request" timestamp is enough to keep
//! every pair of consecutive outbound requests at least `delay` apart.

use std::time::{Duration, Instant};

/// Enforces a minimum spacing between consecutive requests
#[derive(Debug, Clone)]
pub struct Pacer {
    /// Minimum time between two requests
    delay: Duration,

    /// When the previous request was released
    last_request_time: Option<Instant>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request_time: None,
        }
    }

    /// Calculates the time until the next request may be sent
    ///
    /// Returns None if a request can be made now.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.duration_since(last);
        if elapsed < self.delay {
            Some(self.delay - elapsed)
        } else {
            None
        }
    }

    /// Waits until the next request may be sent and marks it as sent
    ///
    /// The first request of a run is never delayed.
    pub async fn wait(&mut self) {
        if let Some(wait) = self.time_until_next_request(Instant::now()) {
            tracing::trace!("Pacing: sleeping {:?} before next request", wait);
            tokio::time::sleep(wait).await;
        }
        self.last_request_time = Some(Instant::now());
    }
}
