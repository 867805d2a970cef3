//! PDF Retriever: stream a record's PDF into memory under size and time caps

use std::io::{self, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sciharvest_core::{FetchRequest, Fetcher};

use crate::config::PipelineConfig;
use crate::error::RetrieveError;
use crate::model::{MetadataRecord, RawDocument};

const CHUNK_SIZE: usize = 64 * 1024;

/// Where a PDF signature may start (some servers prepend junk)
const SIGNATURE_WINDOW: usize = 1024;
const PDF_SIGNATURE: &[u8] = b"%PDF-";

#[derive(Debug)]
pub struct Retriever {
    fetcher: Arc<Fetcher>,
    max_bytes: u64,
    timeout: Duration,
}

impl Retriever {
    pub fn new(fetcher: Arc<Fetcher>, config: &PipelineConfig) -> Self {
        Self {
            fetcher,
            max_bytes: config.download.max_pdf_bytes,
            timeout: config.download_timeout(),
        }
    }

    /// Download the whole document, or fail. Partial bodies are never returned.
    pub fn retrieve(&self, record: &MetadataRecord) -> Result<RawDocument, RetrieveError> {
        let url = record.pdf_url.as_deref().ok_or(RetrieveError::NoPdfUrl)?;
        let request = FetchRequest::get(url)
            .header("accept", "application/pdf,*/*;q=0.8")
            .timeout(self.timeout);

        let started = Instant::now();
        let mut response = self.fetcher.fetch(&request)?;

        if let Some(declared) = response.content_length {
            if declared > self.max_bytes {
                return Err(RetrieveError::TooLarge {
                    limit: self.max_bytes,
                    size: declared,
                    declared: true,
                });
            }
        }

        let deadline = started + self.timeout;
        let content_type = response.content_type.take();
        let bytes = self.read_body(&mut response.body, deadline, content_type.as_deref())?;

        if !content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("pdf"))
        {
            log::debug!(
                "{}: PDF served as {:?}",
                record.identifier,
                content_type.as_deref().unwrap_or("no content-type")
            );
        }

        Ok(RawDocument {
            identifier: record.identifier.clone(),
            byte_length: bytes.len() as u64,
            bytes,
            content_type,
        })
    }

    fn read_body(
        &self,
        body: &mut dyn Read,
        deadline: Instant,
        content_type: Option<&str>,
    ) -> Result<Vec<u8>, RetrieveError> {
        let mut buf = Vec::new();
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut sniffed = false;
        loop {
            if Instant::now() >= deadline {
                return Err(RetrieveError::Timeout(format!(
                    "exceeded {:.0}s after {} bytes",
                    self.timeout.as_secs_f64(),
                    buf.len()
                )));
            }
            let n = match body.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return Err(RetrieveError::Timeout(e.to_string()));
                }
                Err(e) => return Err(RetrieveError::Interrupted(e.to_string())),
            };
            if (buf.len() + n) as u64 > self.max_bytes {
                return Err(RetrieveError::TooLarge {
                    limit: self.max_bytes,
                    size: (buf.len() + n) as u64,
                    declared: false,
                });
            }
            buf.extend_from_slice(&chunk[..n]);

            // Reject HTML error pages before pulling the rest of the body
            if !sniffed && buf.len() >= SIGNATURE_WINDOW {
                check_signature(&buf, content_type)?;
                sniffed = true;
            }
        }
        if !sniffed {
            check_signature(&buf, content_type)?;
        }
        Ok(buf)
    }
}

fn check_signature(buf: &[u8], content_type: Option<&str>) -> Result<(), RetrieveError> {
    if has_pdf_signature(buf) {
        Ok(())
    } else {
        Err(RetrieveError::InvalidContentType {
            declared: content_type.map(str::to_string),
        })
    }
}

/// `%PDF-` within the first KiB
pub fn has_pdf_signature(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(SIGNATURE_WINDOW)];
    window
        .windows(PDF_SIGNATURE.len())
        .any(|w| w == PDF_SIGNATURE)
}
