//! sciharvest core - shared infrastructure for the harvesting pipeline
//!
//! Rate-limited HTTP fetching, cancellation, work distribution, progress,
//! logging and parquet output. Domain logic lives in `sciharvest-pipeline`.

pub mod error;
pub mod fetch;
pub mod logging;
pub mod progress;
pub mod rate_limit;
pub mod retry;
pub mod shutdown;
pub mod sink;
pub mod stream;
#[cfg(any(test, feature = "stub"))]
pub mod stub;
pub mod work_queue;

// Re-exports for convenience
pub use error::FetchError;
pub use fetch::{FetchRequest, FetchResponse, Fetcher, Method};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{BarProgress, NoProgress, ProgressContext, ProgressSink, SharedProgress, fmt_num};
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use shutdown::CancelToken;
pub use sink::{ParquetSink, cleanup_tmp_files, is_valid_parquet};
pub use stream::{ReqwestTransport, SHARED_RUNTIME, StreamError, Transport};
pub use work_queue::WorkQueue;
