//! Retry policy: exponential backoff with jitter

use std::time::Duration;

use rand::Rng;

/// How many times, and how patiently, the fetcher retries transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = single attempt)
    pub retry_ceiling: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_ceiling: 3,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff: base * 2^(attempt-1), capped (attempt is 1-based)
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        self.base_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }

    /// Delay before retry number `attempt`: half the backoff plus a random
    /// share of the other half, never shorter than a server-sent `Retry-After`.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.backoff_duration(attempt);
        let half = backoff / 2;
        let jitter_ms = half.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        let delay = half + jitter;
        match retry_after {
            Some(server) => delay.max(server).min(self.max_backoff),
            None => delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            retry_ceiling: 5,
            base_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
        }
    }

    #[test]
    fn backoff_exponential() {
        let p = policy();
        assert_eq!(p.backoff_duration(1), Duration::from_secs(2));
        assert_eq!(p.backoff_duration(2), Duration::from_secs(4));
        assert_eq!(p.backoff_duration(3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_capped() {
        let p = policy();
        assert_eq!(p.backoff_duration(5), Duration::from_secs(30));
        assert_eq!(p.backoff_duration(40), Duration::from_secs(30));
    }

    #[test]
    fn jittered_delay_within_bounds() {
        let p = policy();
        for _ in 0..50 {
            let d = p.delay(3, None);
            assert!(d >= Duration::from_secs(4), "{d:?}");
            assert!(d <= Duration::from_secs(8), "{d:?}");
        }
    }

    #[test]
    fn retry_after_respected_but_capped() {
        let p = policy();
        assert!(p.delay(1, Some(Duration::from_secs(10))) >= Duration::from_secs(10));
        assert_eq!(
            p.delay(1, Some(Duration::from_secs(3600))),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn zero_base_never_sleeps() {
        let p = RetryPolicy {
            retry_ceiling: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        };
        assert_eq!(p.delay(1, None), Duration::ZERO);
    }
}
