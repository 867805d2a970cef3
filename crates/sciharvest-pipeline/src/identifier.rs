//! Caller-supplied identifiers and their classification

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// DOI body after any prefix is removed: registrant `10.NNNN` then suffix
static DOI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("invalid DOI regex"));

const DOI_PREFIXES: &[&str] = &[
    "doi:",
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];

/// Opaque input key: a search string, a DOI or a URL.
///
/// Stored verbatim; classification happens on demand via [`kind`](Self::kind).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

/// What an identifier refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierKind {
    /// Normalized (lower-cased, prefix-free) DOI
    Doi(String),
    /// Direct http(s) location, resolved by pass-through
    Url(String),
    /// Free-text search; empty when the input was blank
    Query(String),
}

impl Identifier {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> IdentifierKind {
        let trimmed = self.0.trim();
        if let Some(doi) = normalize_doi(trimmed) {
            return IdentifierKind::Doi(doi);
        }
        if let Ok(url) = url::Url::parse(trimmed) {
            if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() {
                return IdentifierKind::Url(trimmed.to_string());
            }
        }
        IdentifierKind::Query(trimmed.to_string())
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Strip known DOI prefixes and validate; returns the lower-cased DOI.
///
/// Also used on backend responses, which carry DOIs in varying forms.
pub fn normalize_doi(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    let body = DOI_PREFIXES
        .iter()
        .find_map(|p| lower.strip_prefix(p))
        .unwrap_or(&lower)
        .trim();
    DOI_RE.is_match(body).then(|| body.to_string())
}
