//! Sliding-window rate limiter shared by every outbound request.
//!
//! Uses `Mutex + Condvar` from std. Callers block until a slot frees up in
//! the window, bounded by a maximum queueing time.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::FetchError;

/// Grants at most `max_requests` slots in any sliding `window`.
///
/// Keeps the grant instants of the current window; a new grant is issued only
/// when fewer than `max_requests` grants are younger than `window`.
pub struct RateLimiter {
    grants: Mutex<VecDeque<Instant>>,
    cond: Condvar,
    max_requests: usize,
    window: Duration,
    max_wait: Duration,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .field("max_wait", &self.max_wait)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window`.
    ///
    /// `max_requests` must be non-zero and `window` non-empty; config
    /// validation guarantees both before construction.
    pub fn new(max_requests: usize, window: Duration, max_wait: Duration) -> Self {
        debug_assert!(max_requests > 0, "rate limit budget must be positive");
        Self {
            grants: Mutex::new(VecDeque::with_capacity(max_requests)),
            cond: Condvar::new(),
            max_requests: max_requests.max(1),
            window,
            max_wait,
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Block until a slot is available, then take it.
    ///
    /// Returns the instant the slot was granted, or
    /// [`FetchError::RateLimitTimeout`] if no slot frees up within `max_wait`.
    pub fn acquire(&self) -> Result<Instant, FetchError> {
        let start = Instant::now();
        let deadline = start + self.max_wait;
        let mut grants = self.grants.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            let now = Instant::now();
            while grants
                .front()
                .is_some_and(|t| now.duration_since(*t) >= self.window)
            {
                grants.pop_front();
            }
            if grants.len() < self.max_requests {
                grants.push_back(now);
                self.cond.notify_one();
                return Ok(now);
            }

            // Oldest grant leaves the window at `front + window`
            let frees_at = grants[0] + self.window;
            if frees_at > deadline {
                return Err(FetchError::RateLimitTimeout {
                    waited: now.duration_since(start),
                });
            }
            let (guard, _) = self
                .cond
                .wait_timeout(grants, frees_at.saturating_duration_since(now))
                .unwrap_or_else(|e| e.into_inner());
            grants = guard;
        }
    }
}
