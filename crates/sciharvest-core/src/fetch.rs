//! Rate-limited fetcher: the single gateway for every outbound request.
//!
//! Every attempt (including retries) first takes a slot from the shared
//! [`RateLimiter`], then goes through the [`Transport`]. Transient failures
//! (timeouts, 429, 5xx) are retried with jittered exponential backoff up to the
//! configured ceiling; other 4xx responses surface immediately.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::stream::Transport;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Outbound request description.
#[derive(Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

// Header values may carry API keys; only names are printed.
impl std::fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("FetchRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &self.query)
            .field("headers", &header_names)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// URL with query parameters appended (unencoded, for matching and logs)
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let params: Vec<String> = self.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{sep}{}", self.url, params.join("&"))
    }
}

/// Response head plus a streaming body.
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub retry_after: Option<Duration>,
    pub body: Box<dyn Read + Send>,
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the whole body as UTF-8 text (lossy)
    pub fn text(mut self) -> std::io::Result<String> {
        let mut buf = Vec::new();
        self.body.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Shared, rate-limited, retrying HTTP gateway.
///
/// Cheap to share behind an `Arc`; the limiter inside is the only mutable state.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("limiter", &self.limiter)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self {
            transport,
            limiter,
            retry,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Perform a request, retrying transient failures.
    ///
    /// Returns only 2xx responses; the body is left unread for the caller.
    pub fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let max_retries = self.retry.retry_ceiling;
        let mut attempt = 0u32;
        loop {
            self.limiter.acquire()?;

            let (last, retry_after) = match self.transport.send(request) {
                Ok(resp) if resp.is_success() => return Ok(resp),
                Ok(resp) if resp.status == 429 || resp.status >= 500 => {
                    (format!("HTTP {}", resp.status), resp.retry_after)
                }
                Ok(resp) => {
                    return Err(FetchError::Rejected {
                        status: Some(resp.status),
                        message: format!("HTTP {}", resp.status),
                    });
                }
                Err(e) if e.is_retryable() => (e.to_string(), None),
                Err(e) => {
                    return Err(FetchError::Rejected {
                        status: None,
                        message: e.to_string(),
                    });
                }
            };

            if attempt >= max_retries {
                log::debug!("{}: giving up after {} attempts: {last}", request.url, attempt + 1);
                return Err(FetchError::Exhausted {
                    attempts: attempt + 1,
                    last,
                });
            }
            attempt += 1;
            let delay = self.retry.delay(attempt, retry_after);
            log::debug!(
                "{}: attempt {attempt}/{max_retries} failed: {last}, retrying in {delay:?}",
                request.url
            );
            std::thread::sleep(delay);
        }
    }

    /// GET and read the body as text.
    pub fn fetch_text(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let response = self.fetch(request)?;
        response.text().map_err(|e| FetchError::Exhausted {
            attempts: 1,
            last: format!("body read failed: {e}"),
        })
    }
}
