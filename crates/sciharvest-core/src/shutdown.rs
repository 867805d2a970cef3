//! Graceful cancellation via a shared token

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    aborted: AtomicBool,
}

/// Cancellation signal shared between the signal handler and pipeline workers.
///
/// Two levels:
/// - **cancel**: stop dispatching new work; in-flight work finishes.
/// - **abort**: additionally abandon in-flight work at the next checkpoint.
///
/// An optional deadline acts as `cancel` once it has passed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same token, also cancelled once `deadline` passes
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn abort(&self) {
        self.state.cancelled.store(true, Ordering::Relaxed);
        self.state.aborted.store(true, Ordering::Relaxed);
    }

    /// First call cancels, any later call aborts (signal handlers).
    ///
    /// Only touches atomics, so it is async-signal-safe.
    pub fn escalate(&self) {
        if self.state.cancelled.swap(true, Ordering::Relaxed) {
            self.state.aborted.store(true, Ordering::Relaxed);
        }
    }

    /// Should no new work be started?
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Should in-flight work be abandoned?
    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fresh_token_is_live() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(!token.is_aborted());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
        assert!(!token.is_aborted());
    }

    #[test]
    fn abort_implies_cancel() {
        let token = CancelToken::new();
        token.abort();
        assert!(token.is_cancelled());
        assert!(token.is_aborted());
    }

    #[test]
    fn escalate_twice_aborts() {
        let token = CancelToken::new();
        token.escalate();
        assert!(token.is_cancelled());
        assert!(!token.is_aborted());
        token.escalate();
        assert!(token.is_aborted());
    }

    #[test]
    fn past_deadline_cancels_but_does_not_abort() {
        let token = CancelToken::new().with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(token.is_cancelled());
        assert!(!token.is_aborted());
    }

    #[test]
    fn future_deadline_is_live() {
        let token = CancelToken::new().with_deadline(Instant::now() + Duration::from_secs(60));
        assert!(!token.is_cancelled());
    }
}
