//! Text Extractor: PDF bytes → linear page texts
//!
//! Page-by-page and best-effort: a page that fails to decode becomes an
//! empty string. Only a document that cannot be opened at all is an error.
//!
//! Parsing runs as a job on the extraction pool while the calling worker
//! waits on a channel, so the time cap also bounds a single slow page. A job
//! that overruns is abandoned: it stops at its next page once nobody is
//! listening, but a page stuck inside lopdf keeps its pool thread until it
//! returns.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use anyhow::Context;
use lopdf::Document;

use crate::config::PipelineConfig;
use crate::error::ExtractError;
use crate::model::{ExtractedText, RawDocument};

#[derive(Debug)]
pub struct Extractor {
    timeout: Duration,
    pool: rayon::ThreadPool,
}

/// Progress reported by a parsing job
#[derive(Debug)]
pub(crate) enum PageEvent {
    Opened { page_count: usize },
    Page(String),
    Finished,
    Failed(ExtractError),
}

/// Pages received before the deadline, in document order
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct PageRun {
    pub page_count: usize,
    pub pages: Vec<String>,
    pub partial: bool,
}

impl Extractor {
    /// Extractor with its own CPU pool, separate from the I/O workers
    pub fn new(config: &PipelineConfig) -> anyhow::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.extract.extraction_workers)
            .thread_name(|i| format!("extract-{i}"))
            .build()
            .context("Failed to build extraction pool")?;
        Ok(Self::with_pool(pool, config.extraction_timeout()))
    }

    pub fn with_pool(pool: rayon::ThreadPool, timeout: Duration) -> Self {
        Self { timeout, pool }
    }

    /// Consumes the document; its bytes are dropped once parsing ends.
    pub fn extract(&self, doc: RawDocument) -> Result<ExtractedText, ExtractError> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let bytes = doc.bytes;

        let run = run_with_deadline(&self.pool, deadline, move |events| {
            parse_pages(&bytes, events)
        })?;

        if run.partial && run.pages.is_empty() {
            return Err(ExtractError::Timeout {
                elapsed: started.elapsed(),
            });
        }
        if run.partial {
            log::debug!(
                "{}: extraction deadline hit after {}/{} pages",
                doc.identifier,
                run.pages.len(),
                run.page_count
            );
        }

        Ok(ExtractedText {
            identifier: doc.identifier,
            pages: run.pages,
            page_count: run.page_count,
            partial: run.partial,
        })
    }
}

/// Parse the document structure. Encrypted files get one attempt with the
/// empty user password; owner-restricted PDFs open that way.
fn open(bytes: &[u8]) -> Result<Document, ExtractError> {
    let mut pdf = Document::load_mem(bytes).map_err(|e| ExtractError::Corrupt(e.to_string()))?;
    if pdf.trailer.has(b"Encrypt") {
        match panic::catch_unwind(AssertUnwindSafe(|| pdf.decrypt(""))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::debug!("empty user password refused: {e}");
                return Err(ExtractError::Encrypted);
            }
            Err(_) => return Err(ExtractError::Encrypted),
        }
    }
    Ok(pdf)
}

/// Job body: open the document, then send one event per page.
///
/// Returns early once the receiver is gone.
fn parse_pages(bytes: &[u8], events: &Sender<PageEvent>) {
    let pdf = match open(bytes) {
        Ok(pdf) => pdf,
        Err(e) => {
            let _ = events.send(PageEvent::Failed(e));
            return;
        }
    };
    let page_numbers: Vec<u32> = pdf.get_pages().keys().copied().collect();
    let opened = PageEvent::Opened {
        page_count: page_numbers.len(),
    };
    if events.send(opened).is_err() {
        return;
    }

    for n in page_numbers {
        // lopdf can panic on hostile content streams
        let text = match panic::catch_unwind(AssertUnwindSafe(|| pdf.extract_text(&[n]))) {
            Ok(Ok(text)) => text.trim_end().to_string(),
            Ok(Err(e)) => {
                log::debug!("page {n}: {e}");
                String::new()
            }
            Err(_) => {
                log::debug!("page {n}: parser panicked");
                String::new()
            }
        };
        if events.send(PageEvent::Page(text)).is_err() {
            return;
        }
    }
    let _ = events.send(PageEvent::Finished);
}

/// Spawn `job` on `pool` and collect its events until it finishes or
/// `deadline` passes. On timeout the pages received so far come back with
/// `partial` set.
pub(crate) fn run_with_deadline<F>(
    pool: &rayon::ThreadPool,
    deadline: Instant,
    job: F,
) -> Result<PageRun, ExtractError>
where
    F: FnOnce(&Sender<PageEvent>) + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    pool.spawn(move || {
        if panic::catch_unwind(AssertUnwindSafe(|| job(&tx))).is_err() {
            let _ = tx.send(PageEvent::Failed(ExtractError::Corrupt(
                "parser panicked".to_string(),
            )));
        }
    });

    let mut run = PageRun::default();
    loop {
        let now = Instant::now();
        if now >= deadline {
            run.partial = true;
            return Ok(run);
        }
        match rx.recv_timeout(deadline - now) {
            Ok(PageEvent::Opened { page_count }) => run.page_count = page_count,
            Ok(PageEvent::Page(text)) => run.pages.push(text),
            Ok(PageEvent::Finished) => return Ok(run),
            Ok(PageEvent::Failed(e)) => return Err(e),
            Err(RecvTimeoutError::Timeout) => {
                run.partial = true;
                return Ok(run);
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ExtractError::Corrupt(
                    "extraction job ended without a result".to_string(),
                ));
            }
        }
    }
}
