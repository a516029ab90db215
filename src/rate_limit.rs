//! Sliding-window rate limiting for outbound remote calls.
//!
//! [`RateLimiter::acquire`] suspends the calling task (never a thread)
//! until one more request fits inside the trailing window. The limiter
//! cannot fail, only delay. Timestamps come from [`tokio::time::Instant`]
//! so paused-clock tests are deterministic.

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Bounds outbound request rate to `max_requests` occurrences within a
/// trailing `window`.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window`.
    ///
    /// A zero `max_requests` would never admit a caller, so it is
    /// clamped to 1.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until one more request is allowed, then record it.
    ///
    /// Prunes timestamps older than the window; if the remaining count
    /// is at the limit, sleeps until the oldest entry ages out and then
    /// re-evaluates. The re-check loop matters: after a sleep other
    /// callers may have refilled the window, so a single wait is never
    /// assumed to suffice.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.timestamps.lock().await;
                let now = Instant::now();
                while let Some(&oldest) = stamps.front() {
                    if now.duration_since(oldest) >= self.window {
                        stamps.pop_front();
                    } else {
                        break;
                    }
                }
                if stamps.len() < self.max_requests {
                    stamps.push_back(now);
                    return;
                }
                match stamps.front() {
                    Some(&oldest) => self.window.saturating_sub(now.duration_since(oldest)),
                    None => Duration::ZERO,
                }
            };
            // Lock released before sleeping so other callers can proceed.
            sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    /// Requests still admissible in the current window, for diagnostics.
    pub async fn remaining(&self) -> usize {
        let mut stamps = self.timestamps.lock().await;
        let now = Instant::now();
        while let Some(&oldest) = stamps.front() {
            if now.duration_since(oldest) >= self.window {
                stamps.pop_front();
            } else {
                break;
            }
        }
        self.max_requests.saturating_sub(stamps.len())
    }
}
