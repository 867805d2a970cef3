//! Per-stage error types and the outcome error taxonomy.
//!
//! Each stage returns its own error enum; the Assembler only sees the
//! stage-independent [`Failure`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use sciharvest_core::FetchError;

use crate::resolver::{BackendKind, SearchError};

/// Closed set of per-item failure reasons recorded in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ResolutionNotFound,
    ResolutionAmbiguous,
    ResolutionBackendError,
    FetchRejected,
    FetchExhausted,
    RateLimitTimeout,
    NoPdfUrl,
    DownloadTooLarge,
    DownloadTimeout,
    DownloadInterrupted,
    InvalidContentType,
    CorruptPdf,
    EncryptedPdf,
    ExtractionTimeout,
    Cancelled,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 15] = [
        Self::ResolutionNotFound,
        Self::ResolutionAmbiguous,
        Self::ResolutionBackendError,
        Self::FetchRejected,
        Self::FetchExhausted,
        Self::RateLimitTimeout,
        Self::NoPdfUrl,
        Self::DownloadTooLarge,
        Self::DownloadTimeout,
        Self::DownloadInterrupted,
        Self::InvalidContentType,
        Self::CorruptPdf,
        Self::EncryptedPdf,
        Self::ExtractionTimeout,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResolutionNotFound => "RESOLUTION_NOT_FOUND",
            Self::ResolutionAmbiguous => "RESOLUTION_AMBIGUOUS",
            Self::ResolutionBackendError => "RESOLUTION_BACKEND_ERROR",
            Self::FetchRejected => "FETCH_REJECTED",
            Self::FetchExhausted => "FETCH_EXHAUSTED",
            Self::RateLimitTimeout => "RATE_LIMIT_TIMEOUT",
            Self::NoPdfUrl => "NO_PDF_URL",
            Self::DownloadTooLarge => "DOWNLOAD_TOO_LARGE",
            Self::DownloadTimeout => "DOWNLOAD_TIMEOUT",
            Self::DownloadInterrupted => "DOWNLOAD_INTERRUPTED",
            Self::InvalidContentType => "INVALID_CONTENT_TYPE",
            Self::CorruptPdf => "CORRUPT_PDF",
            Self::EncryptedPdf => "ENCRYPTED_PDF",
            Self::ExtractionTimeout => "EXTRACTION_TIMEOUT",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether re-running the item may succeed
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::ResolutionBackendError
                | Self::FetchExhausted
                | Self::RateLimitTimeout
                | Self::DownloadTimeout
                | Self::DownloadInterrupted
                | Self::ExtractionTimeout
                | Self::Cancelled
        )
    }

    /// Map a fetcher failure into the outcome taxonomy
    pub fn from_fetch(err: &FetchError) -> Self {
        match err {
            FetchError::Rejected { .. } => Self::FetchRejected,
            FetchError::Exhausted { .. } => Self::FetchExhausted,
            FetchError::RateLimitTimeout { .. } => Self::RateLimitTimeout,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage-independent failure handed to the Assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "cancelled before completion")
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

// =============================================================================
// Resolver
// =============================================================================

#[derive(Debug)]
pub enum ResolveError {
    /// No backend returned any candidate
    NotFound(String),
    /// Best candidate scored below the acceptance threshold
    Ambiguous {
        best_title: String,
        best_score: f64,
        threshold: f64,
    },
    /// Every configured backend failed
    Backend(Vec<(BackendKind, SearchError)>),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(query) => write!(f, "no candidates for {query:?}"),
            Self::Ambiguous {
                best_title,
                best_score,
                threshold,
            } => write!(
                f,
                "best match {best_title:?} scored {best_score:.3} (< {threshold:.2})"
            ),
            Self::Backend(errors) => {
                let parts: Vec<String> = errors
                    .iter()
                    .map(|(backend, e)| format!("{backend}: {e}"))
                    .collect();
                write!(f, "all backends failed: {}", parts.join("; "))
            }
        }
    }
}

impl std::error::Error for ResolveError {}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::ResolutionNotFound,
            Self::Ambiguous { .. } => ErrorKind::ResolutionAmbiguous,
            // Budget starvation is reported as such, not as a backend fault
            Self::Backend(errors)
                if !errors.is_empty()
                    && errors.iter().all(|(_, e)| {
                        matches!(e, SearchError::Fetch(FetchError::RateLimitTimeout { .. }))
                    }) =>
            {
                ErrorKind::RateLimitTimeout
            }
            Self::Backend(_) => ErrorKind::ResolutionBackendError,
        }
    }
}

// =============================================================================
// Retriever
// =============================================================================

#[derive(Debug)]
pub enum RetrieveError {
    NoPdfUrl,
    /// Declared (Content-Length) or observed body size over the cap
    TooLarge { limit: u64, size: u64, declared: bool },
    /// Body stalled or the download deadline passed
    Timeout(String),
    /// Body does not start with a PDF signature
    InvalidContentType { declared: Option<String> },
    /// Body stream broke for a reason other than a timeout
    Interrupted(String),
    Fetch(FetchError),
}

impl std::fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPdfUrl => write!(f, "record has no PDF URL"),
            Self::TooLarge {
                limit,
                size,
                declared: true,
            } => write!(f, "declared size {size} bytes exceeds cap of {limit}"),
            Self::TooLarge { limit, size, .. } => {
                write!(f, "body exceeded cap of {limit} bytes (read {size})")
            }
            Self::Timeout(msg) => write!(f, "download timed out: {msg}"),
            Self::InvalidContentType { declared } => write!(
                f,
                "body is not a PDF (declared content-type: {})",
                declared.as_deref().unwrap_or("none")
            ),
            Self::Interrupted(msg) => write!(f, "download interrupted: {msg}"),
            Self::Fetch(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RetrieveError {}

impl RetrieveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoPdfUrl => ErrorKind::NoPdfUrl,
            Self::TooLarge { .. } => ErrorKind::DownloadTooLarge,
            Self::Timeout(_) => ErrorKind::DownloadTimeout,
            Self::InvalidContentType { .. } => ErrorKind::InvalidContentType,
            Self::Interrupted(_) => ErrorKind::DownloadInterrupted,
            Self::Fetch(e) => ErrorKind::from_fetch(e),
        }
    }
}

impl From<FetchError> for RetrieveError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

// =============================================================================
// Extractor
// =============================================================================

#[derive(Debug)]
pub enum ExtractError {
    Corrupt(String),
    Encrypted,
    /// Deadline passed before any page was extracted
    Timeout { elapsed: Duration },
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Corrupt(msg) => write!(f, "cannot open PDF: {msg}"),
            Self::Encrypted => write!(f, "PDF is encrypted"),
            Self::Timeout { elapsed } => write!(
                f,
                "no page extracted within {:.1}s",
                elapsed.as_secs_f64()
            ),
        }
    }
}

impl std::error::Error for ExtractError {}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Corrupt(_) => ErrorKind::CorruptPdf,
            Self::Encrypted => ErrorKind::EncryptedPdf,
            Self::Timeout { .. } => ErrorKind::ExtractionTimeout,
        }
    }
}

macro_rules! impl_failure_from {
    ($($err:ty),*) => {
        $(
            impl From<$err> for Failure {
                fn from(e: $err) -> Self {
                    Failure::new(e.kind(), e.to_string())
                }
            }
        )*
    };
}

impl_failure_from!(ResolveError, RetrieveError, ExtractError);
