//! Records flowing through the pipeline stages

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::identifier::Identifier;
use crate::relevance::RelevanceScore;

/// Canonical bibliographic record produced by the Resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub identifier: Identifier,
    pub title: String,
    /// Author display names in byline order
    pub authors: Vec<String>,
    pub venue: Option<String>,
    pub publication_year: Option<i32>,
    pub pdf_url: Option<String>,
    /// Backend that produced the record, or `direct` for pass-through URLs
    pub source_backend: String,
    pub doi: Option<String>,
    pub abstract_text: Option<String>,
    pub times_cited: Option<u32>,
    pub keywords: Vec<String>,
    /// APA citation text, when citation lookup is enabled and succeeded
    pub biblio: Option<String>,
    /// Match confidence in [0, 1]; 1.0 for exact matches and pass-through
    pub match_score: f64,
}

impl MetadataRecord {
    /// Record for an identifier that already is a PDF location
    pub fn passthrough(identifier: &Identifier, url: &str) -> Self {
        Self {
            identifier: identifier.clone(),
            title: String::new(),
            authors: Vec::new(),
            venue: None,
            publication_year: None,
            pdf_url: Some(url.to_string()),
            source_backend: "direct".to_string(),
            doi: None,
            abstract_text: None,
            times_cited: None,
            keywords: Vec::new(),
            biblio: None,
            match_score: 1.0,
        }
    }
}

/// Downloaded PDF bytes. Never persisted; consumed by the Extractor.
#[derive(Debug)]
pub struct RawDocument {
    pub identifier: Identifier,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub byte_length: u64,
}

impl RawDocument {
    /// What survives of the document once its bytes are handed off
    pub fn receipt(&self) -> DocumentReceipt {
        DocumentReceipt {
            byte_length: self.byte_length,
            content_type: self.content_type.clone(),
        }
    }
}

/// Proof of a completed download, kept after the bytes are dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReceipt {
    pub byte_length: u64,
    pub content_type: Option<String>,
}

/// Linear page texts of one document.
///
/// `pages` may be empty (image-only PDF); that is distinct from the text
/// being absent on an [`OutcomeRecord`], which means extraction never ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub identifier: Identifier,
    pub pages: Vec<String>,
    /// Pages in the document; exceeds `pages.len()` only when `partial`
    pub page_count: usize,
    /// Extraction deadline hit before the last page
    pub partial: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageReached {
    Resolved,
    Downloaded,
    Extracted,
    Failed,
}

impl StageReached {
    pub const ALL: [StageReached; 4] = [
        Self::Resolved,
        Self::Downloaded,
        Self::Extracted,
        Self::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "RESOLVED",
            Self::Downloaded => "DOWNLOADED",
            Self::Extracted => "EXTRACTED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for StageReached {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result for one input position. Exactly one per input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub identifier: Identifier,
    pub stage_reached: StageReached,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub metadata: Option<MetadataRecord>,
    pub text: Option<ExtractedText>,
    /// Size of the downloaded PDF, when a download completed
    pub byte_length: Option<u64>,
    pub relevance: Option<RelevanceScore>,
}

impl OutcomeRecord {
    /// Outcome for an item abandoned or never dispatched
    pub fn cancelled(identifier: &Identifier) -> Self {
        Self {
            identifier: identifier.clone(),
            stage_reached: StageReached::Failed,
            error_kind: Some(ErrorKind::Cancelled),
            error_message: Some("cancelled before completion".to_string()),
            metadata: None,
            text: None,
            byte_length: None,
            relevance: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.stage_reached != StageReached::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_outcome() {
        let id = Identifier::new("10.1000/x");
        let out = OutcomeRecord::cancelled(&id);
        assert_eq!(out.stage_reached, StageReached::Failed);
        assert_eq!(out.error_kind, Some(ErrorKind::Cancelled));
        assert!(!out.is_success());
        assert!(out.metadata.is_none());
    }

    #[test]
    fn passthrough_record() {
        let id = Identifier::new("https://example.org/a.pdf");
        let rec = MetadataRecord::passthrough(&id, "https://example.org/a.pdf");
        assert_eq!(rec.pdf_url.as_deref(), Some("https://example.org/a.pdf"));
        assert_eq!(rec.source_backend, "direct");
        assert_eq!(rec.match_score, 1.0);
    }

    #[test]
    fn receipt_keeps_length() {
        let doc = RawDocument {
            identifier: Identifier::new("x"),
            bytes: b"%PDF-1.4".to_vec(),
            content_type: Some("application/pdf".into()),
            byte_length: 8,
        };
        let receipt = doc.receipt();
        assert_eq!(receipt.byte_length, 8);
        assert_eq!(receipt.content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn stage_serializes_screaming() {
        let json = serde_json::to_string(&StageReached::Extracted).unwrap();
        assert_eq!(json, "\"EXTRACTED\"");
    }
}
