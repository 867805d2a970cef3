//! In-process [`Transport`] for tests: canned responses routed by URL prefix.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::Mutex;
use std::time::Duration;

use crate::fetch::{FetchRequest, FetchResponse};
use crate::stream::{StreamError, Transport};

/// Canned outcome of one exchange.
#[derive(Debug, Clone)]
pub struct StubResponse {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
    declared_length: Option<u64>,
    retry_after: Option<Duration>,
    stall_after: Option<usize>,
    delay: Duration,
    timed_out: bool,
}

impl StubResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: Vec<u8>) -> Self {
        let declared_length = Some(body.len() as u64);
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body,
            declared_length,
            retry_after: None,
            stall_after: None,
            delay: Duration::ZERO,
            timed_out: false,
        }
    }

    pub fn json(body: &str) -> Self {
        Self::new(200, Some("application/json"), body.as_bytes().to_vec())
    }

    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self::new(200, Some("application/pdf"), bytes)
    }

    pub fn html(body: &str) -> Self {
        Self::new(200, Some("text/html; charset=utf-8"), body.as_bytes().to_vec())
    }

    pub fn status(status: u16) -> Self {
        Self::new(status, Some("text/plain"), format!("HTTP {status}").into_bytes())
    }

    /// Transport-level timeout: no response at all
    pub fn timeout() -> Self {
        let mut resp = Self::new(0, None, Vec::new());
        resp.timed_out = true;
        resp
    }

    /// Override (or remove) the declared Content-Length
    pub fn with_content_length(mut self, length: Option<u64>) -> Self {
        self.declared_length = length;
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Body yields `bytes` bytes, then the next read times out
    pub fn stalled_after(mut self, bytes: usize) -> Self {
        self.stall_after = Some(bytes);
        self
    }

    /// Sleep before answering, to simulate a slow server
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn into_response(self) -> Result<FetchResponse, StreamError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.timed_out {
            return Err(StreamError::Timeout("stub timeout".to_string()));
        }
        let body: Box<dyn Read + Send> = match self.stall_after {
            Some(limit) => Box::new(StallingReader {
                inner: Cursor::new(self.body),
                remaining: limit,
            }),
            None => Box::new(Cursor::new(self.body)),
        };
        Ok(FetchResponse {
            status: self.status,
            content_type: self.content_type,
            content_length: self.declared_length,
            retry_after: self.retry_after,
            body,
        })
    }
}

/// Yields up to `remaining` bytes, then fails with `TimedOut`
struct StallingReader {
    inner: Cursor<Vec<u8>>,
    remaining: usize,
}

impl Read for StallingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "stub stall"));
        }
        let cap = buf.len().min(self.remaining);
        let n = self.inner.read(&mut buf[..cap])?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "stub stall"));
        }
        self.remaining -= n;
        Ok(n)
    }
}

#[derive(Debug)]
struct Route {
    prefix: String,
    responses: Vec<StubResponse>,
    served: usize,
}

/// Routes requests by longest matching URL prefix.
///
/// A route with several responses serves them in order and then repeats the
/// last one. Unmatched requests answer 404.
#[derive(Debug, Default)]
pub struct StubTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, prefix: &str, response: StubResponse) -> Self {
        self.route_sequence(prefix, vec![response])
    }

    pub fn route_sequence(self, prefix: &str, responses: Vec<StubResponse>) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            routes.retain(|r| r.prefix != prefix);
            routes.push(Route {
                prefix: prefix.to_string(),
                responses,
                served: 0,
            });
        }
        self
    }

    /// Number of requests whose full URL starts with `prefix`
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.starts_with(prefix))
            .count()
    }

    /// Every requested full URL, in arrival order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Requests per URL prefix, for assertions on fan-out
    pub fn call_histogram(&self) -> HashMap<String, usize> {
        let routes = self.routes.lock().unwrap();
        routes
            .iter()
            .map(|r| (r.prefix.clone(), self.call_count(&r.prefix)))
            .collect()
    }
}

impl Transport for StubTransport {
    fn send(&self, request: &FetchRequest) -> Result<FetchResponse, StreamError> {
        let url = request.full_url();
        self.calls.lock().unwrap().push(url.clone());

        let picked = {
            let mut routes = self.routes.lock().unwrap();
            routes
                .iter_mut()
                .filter(|r| url.starts_with(&r.prefix) && !r.responses.is_empty())
                .max_by_key(|r| r.prefix.len())
                .map(|route| {
                    let idx = route.served.min(route.responses.len() - 1);
                    route.served += 1;
                    route.responses[idx].clone()
                })
        };

        picked
            .unwrap_or_else(|| StubResponse::status(404))
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_wins() {
        let stub = StubTransport::new()
            .route("https://a.test/", StubResponse::status(500))
            .route("https://a.test/works/", StubResponse::json("{}"));
        let resp = stub.send(&FetchRequest::get("https://a.test/works/10.1/x")).unwrap();
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn unmatched_is_404() {
        let stub = StubTransport::new();
        let resp = stub.send(&FetchRequest::get("https://nowhere.test/")).unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(stub.call_count("https://nowhere.test/"), 1);
    }

    #[test]
    fn sequence_repeats_last() {
        let stub = StubTransport::new().route_sequence(
            "https://a.test/",
            vec![StubResponse::status(503), StubResponse::json("ok")],
        );
        let req = FetchRequest::get("https://a.test/x");
        assert_eq!(stub.send(&req).unwrap().status, 503);
        assert_eq!(stub.send(&req).unwrap().status, 200);
        assert_eq!(stub.send(&req).unwrap().status, 200);
    }

    #[test]
    fn stalled_body_times_out() {
        let stub = StubTransport::new().route(
            "https://a.test/",
            StubResponse::pdf(vec![b'x'; 100]).stalled_after(10),
        );
        let mut resp = stub.send(&FetchRequest::get("https://a.test/f.pdf")).unwrap();
        let mut buf = Vec::new();
        let err = resp.body.read_to_end(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(buf.len(), 10);
    }
}
