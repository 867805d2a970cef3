//! Pipeline configuration
//!
//! Every section deserializes with defaults, so an empty TOML document is a
//! valid configuration. [`PipelineConfig::validate`] is the only place a run
//! can be refused.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::relevance::RelevanceConfig;
use crate::resolver::BackendKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Items processed concurrently, each through its full pipeline
    pub worker_concurrency: usize,
    /// Last stage to run for every item
    pub stop_after: StopAfter,
    /// Stop dispatching new items once this many seconds have elapsed
    pub deadline_seconds: Option<f64>,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub http: HttpConfig,
    pub download: DownloadConfig,
    pub extract: ExtractConfig,
    pub resolver: ResolverConfig,
    pub credentials: Credentials,
    pub relevance: RelevanceConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: 4,
            stop_after: StopAfter::Extract,
            deadline_seconds: None,
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            http: HttpConfig::default(),
            download: DownloadConfig::default(),
            extract: ExtractConfig::default(),
            resolver: ResolverConfig::default(),
            credentials: Credentials::default(),
            relevance: RelevanceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopAfter {
    Resolve,
    Download,
    Extract,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests_per_window: usize,
    pub window_seconds: f64,
    /// Longest a request may queue for a slot before RATE_LIMIT_TIMEOUT
    pub max_queue_wait_seconds: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: 10,
            window_seconds: 1.0,
            max_queue_wait_seconds: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt; 0 disables retrying
    pub retry_ceiling: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_ceiling: 3,
            base_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_seconds: f64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 30.0,
            user_agent: concat!("sciharvest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub max_pdf_bytes: u64,
    pub download_timeout_seconds: f64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_pdf_bytes: 50 * 1024 * 1024,
            download_timeout_seconds: 120.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub extraction_timeout_seconds: f64,
    /// Size of the CPU pool running PDF extraction
    pub extraction_workers: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        Self {
            extraction_timeout_seconds: 60.0,
            extraction_workers: cpus.min(4),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Backends queried in order
    pub backends: Vec<BackendKind>,
    /// Minimum match score to accept a candidate
    pub confidence_threshold: f64,
    /// Results requested per text search
    pub max_candidates: usize,
    /// Fetch an APA citation for records with a DOI (one extra request each)
    pub fetch_citation: bool,
    pub endpoints: Endpoints,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            backends: vec![
                BackendKind::Crossref,
                BackendKind::SemanticScholar,
                BackendKind::OpenAlex,
            ],
            confidence_threshold: 0.75,
            max_candidates: 5,
            fetch_citation: false,
            endpoints: Endpoints::default(),
        }
    }
}

/// API base URLs (overridable for mirrors and tests)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub crossref: String,
    pub semantic_scholar: String,
    pub openalex: String,
    /// DOI resolver answering content negotiation (`{citation}/{doi}`)
    pub citation: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            crossref: "https://api.crossref.org".to_string(),
            semantic_scholar: "https://api.semanticscholar.org".to_string(),
            openalex: "https://api.openalex.org".to_string(),
            citation: "https://doi.org".to_string(),
        }
    }
}

impl Endpoints {
    pub fn base_url(&self, kind: BackendKind) -> &str {
        match kind {
            BackendKind::Crossref => &self.crossref,
            BackendKind::SemanticScholar => &self.semantic_scholar,
            BackendKind::OpenAlex => &self.openalex,
        }
    }
}

/// Opaque credentials; never interpreted, never logged.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub semantic_scholar_api_key: Option<String>,
    /// Sent to Crossref/OpenAlex as `mailto` (polite pool)
    pub contact_email: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "semantic_scholar_api_key",
                &self.semantic_scholar_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("contact_email", &self.contact_email)
            .finish()
    }
}

/// Upper bound for every duration setting (one year); larger values
/// overflow `Instant` arithmetic
const MAX_SECONDS: f64 = 365.0 * 24.0 * 3600.0;

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0).min(MAX_SECONDS))
}

fn ensure_seconds(name: &str, value: f64, allow_zero: bool) -> anyhow::Result<()> {
    anyhow::ensure!(
        value.is_finite() && (value > 0.0 || (allow_zero && value == 0.0)),
        "{name} must be {}, got {value}",
        if allow_zero { "non-negative" } else { "positive" }
    );
    anyhow::ensure!(
        value <= MAX_SECONDS,
        "{name} must be at most {MAX_SECONDS}s, got {value}"
    );
    Ok(())
}

impl PipelineConfig {
    /// Reject configurations that cannot run. Called before any work starts.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.worker_concurrency > 0, "worker_concurrency must be at least 1");
        anyhow::ensure!(
            self.rate_limit.max_requests_per_window > 0,
            "rate_limit.max_requests_per_window must be at least 1"
        );
        ensure_seconds("rate_limit.window_seconds", self.rate_limit.window_seconds, false)?;
        ensure_seconds(
            "rate_limit.max_queue_wait_seconds",
            self.rate_limit.max_queue_wait_seconds,
            true,
        )?;
        anyhow::ensure!(
            self.retry.base_backoff_ms <= self.retry.max_backoff_ms,
            "retry.base_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
            self.retry.base_backoff_ms,
            self.retry.max_backoff_ms
        );
        anyhow::ensure!(
            self.retry.max_backoff_ms as f64 / 1000.0 <= MAX_SECONDS,
            "retry.max_backoff_ms must be at most {MAX_SECONDS}s"
        );
        ensure_seconds("http.request_timeout_seconds", self.http.request_timeout_seconds, false)?;
        anyhow::ensure!(self.download.max_pdf_bytes > 0, "download.max_pdf_bytes must be positive");
        ensure_seconds(
            "download.download_timeout_seconds",
            self.download.download_timeout_seconds,
            false,
        )?;
        ensure_seconds(
            "extract.extraction_timeout_seconds",
            self.extract.extraction_timeout_seconds,
            false,
        )?;
        anyhow::ensure!(
            self.extract.extraction_workers > 0,
            "extract.extraction_workers must be at least 1"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.resolver.confidence_threshold),
            "resolver.confidence_threshold must be within [0, 1], got {}",
            self.resolver.confidence_threshold
        );
        anyhow::ensure!(!self.resolver.backends.is_empty(), "resolver.backends is empty");
        anyhow::ensure!(
            self.resolver.max_candidates > 0,
            "resolver.max_candidates must be at least 1"
        );
        if let Some(deadline) = self.deadline_seconds {
            ensure_seconds("deadline_seconds", deadline, true)?;
        }
        for (i, kind) in self.resolver.backends.iter().enumerate() {
            anyhow::ensure!(
                !self.resolver.backends[..i].contains(kind),
                "resolver.backends lists {kind} twice"
            );
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        secs(self.rate_limit.window_seconds)
    }

    pub fn max_queue_wait(&self) -> Duration {
        secs(self.rate_limit.max_queue_wait_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        secs(self.http.request_timeout_seconds)
    }

    pub fn download_timeout(&self) -> Duration {
        secs(self.download.download_timeout_seconds)
    }

    pub fn extraction_timeout(&self) -> Duration {
        secs(self.extract.extraction_timeout_seconds)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_seconds.map(secs)
    }

    pub fn retry_policy(&self) -> sciharvest_core::RetryPolicy {
        sciharvest_core::RetryPolicy {
            retry_ceiling: self.retry.retry_ceiling,
            base_backoff: Duration::from_millis(self.retry.base_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.worker_concurrency, 4);
        assert_eq!(config.rate_limit.max_requests_per_window, 10);
        assert_eq!(config.retry.retry_ceiling, 3);
        assert_eq!(config.download.max_pdf_bytes, 50 * 1024 * 1024);
        assert_eq!(config.resolver.confidence_threshold, 0.75);
        assert_eq!(config.stop_after, StopAfter::Extract);
        assert!(config.extract.extraction_workers >= 1);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = PipelineConfig {
            worker_concurrency: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("worker_concurrency"));
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let mut config = PipelineConfig::default();
        config.resolver.confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_backends_rejected() {
        let mut config = PipelineConfig::default();
        config.resolver.backends.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_backend_rejected() {
        let mut config = PipelineConfig::default();
        config.resolver.backends = vec![BackendKind::OpenAlex, BackendKind::OpenAlex];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn non_positive_window_rejected() {
        let mut config = PipelineConfig::default();
        config.rate_limit.window_seconds = 0.0;
        assert!(config.validate().is_err());
        config.rate_limit.window_seconds = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn huge_durations_rejected() {
        let mut config = PipelineConfig::default();
        config.rate_limit.max_queue_wait_seconds = 1e19;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_queue_wait_seconds"), "{err}");

        let mut config = PipelineConfig::default();
        config.rate_limit.window_seconds = 1e20;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.deadline_seconds = Some(1e30);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.retry.max_backoff_ms = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn one_year_is_accepted() {
        let mut config = PipelineConfig::default();
        config.extract.extraction_timeout_seconds = MAX_SECONDS;
        config.validate().unwrap();
        assert_eq!(config.extraction_timeout(), Duration::from_secs(365 * 24 * 3600));
    }

    #[test]
    fn parse_partial_json() {
        let json = r#"{
            "worker_concurrency": 8,
            "stop_after": "resolve",
            "rate_limit": {"max_requests_per_window": 3},
            "resolver": {"backends": ["openalex", "semantic_scholar"]}
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.worker_concurrency, 8);
        assert_eq!(config.stop_after, StopAfter::Resolve);
        assert_eq!(config.rate_limit.max_requests_per_window, 3);
        assert_eq!(config.rate_limit.window_seconds, 1.0);
        assert_eq!(
            config.resolver.backends,
            vec![BackendKind::OpenAlex, BackendKind::SemanticScholar]
        );
    }

    #[test]
    fn credentials_debug_redacts_key() {
        let creds = Credentials {
            semantic_scholar_api_key: Some("s3cret".into()),
            contact_email: None,
        };
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("s3cret"));
        assert!(dbg.contains("redacted"));
    }

    #[test]
    fn retry_policy_from_config() {
        let config = PipelineConfig::default();
        let policy = config.retry_policy();
        assert_eq!(policy.retry_ceiling, 3);
        assert_eq!(policy.base_backoff, Duration::from_millis(500));
    }
}
