//! Fetch-layer error type

use std::time::Duration;

/// Failure surfaced by the [`Fetcher`](crate::Fetcher) after its own retry policy ran.
#[derive(Debug, Clone)]
pub enum FetchError {
    /// Non-retryable client error (4xx other than 429) or unrecoverable transport error
    Rejected {
        status: Option<u16>,
        message: String,
    },
    /// Transient failures persisted past the retry ceiling
    Exhausted { attempts: u32, last: String },
    /// Rate limiter could not grant a slot within the maximum queueing time
    RateLimitTimeout { waited: Duration },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { message, .. } => write!(f, "rejected: {message}"),
            Self::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
            Self::RateLimitTimeout { waited } => {
                write!(f, "rate limit slot not granted within {:.1}s", waited.as_secs_f64())
            }
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404 | 410))
    }
}
