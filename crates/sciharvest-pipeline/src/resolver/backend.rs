//! Search backend capability: one interface, a fixed set of variants

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use sciharvest_core::{FetchError, FetchRequest, Fetcher};

use super::{crossref, openalex, semantic_scholar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    #[serde(rename = "crossref")]
    Crossref,
    #[serde(rename = "semantic_scholar")]
    SemanticScholar,
    #[serde(rename = "openalex")]
    OpenAlex,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crossref => "crossref",
            Self::SemanticScholar => "semantic_scholar",
            Self::OpenAlex => "openalex",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to look up
#[derive(Debug, Clone, Copy)]
pub enum SearchQuery<'a> {
    /// Normalized DOI: direct record lookup
    Doi(&'a str),
    /// Free text: bibliographic search
    Text(&'a str),
}

/// One search hit, normalized across backends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub authors: Vec<String>,
    pub venue: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub pdf_url: Option<String>,
    pub abstract_text: Option<String>,
    pub times_cited: Option<u32>,
    /// Subjects, fields of study or keywords, whichever the backend reports
    pub keywords: Vec<String>,
    /// Position in the backend's result list, 0-based
    pub rank: usize,
}

#[derive(Debug)]
pub enum SearchError {
    Fetch(FetchError),
    /// Response arrived but could not be decoded
    Malformed(String),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{e}"),
            Self::Malformed(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<FetchError> for SearchError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

/// A configured backend instance.
#[derive(Debug, Clone)]
pub struct Backend {
    pub kind: BackendKind,
    pub base_url: String,
    pub api_key: Option<String>,
    pub contact_email: Option<String>,
    pub max_candidates: usize,
    pub timeout: Duration,
}

impl Backend {
    pub fn search(
        &self,
        fetcher: &Fetcher,
        query: SearchQuery<'_>,
    ) -> Result<Vec<Candidate>, SearchError> {
        match self.kind {
            BackendKind::Crossref => crossref::search(self, fetcher, query),
            BackendKind::SemanticScholar => semantic_scholar::search(self, fetcher, query),
            BackendKind::OpenAlex => openalex::search(self, fetcher, query),
        }
    }

    /// `base_url` joined with `path` (no duplicate slash)
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    pub(crate) fn request(&self, path: &str) -> FetchRequest {
        FetchRequest::get(self.endpoint(path))
            .header("accept", "application/json")
            .timeout(self.timeout)
    }
}

/// Fetch and decode a JSON body. A 404/410 answer is `Ok(None)`.
pub(crate) fn get_json<T: DeserializeOwned>(
    fetcher: &Fetcher,
    request: &FetchRequest,
) -> Result<Option<T>, SearchError> {
    let body = match fetcher.fetch_text(request) {
        Ok(body) => body,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&body)
        .map(Some)
        .map_err(|e| SearchError::Malformed(e.to_string()))
}

/// Collapse whitespace and trim; empty strings become `None`
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    let s = value?;
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Clean each keyword, dropping blanks and repeats (order kept)
pub(crate) fn clean_keywords(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for k in values.into_iter().filter_map(|v| clean(Some(v))) {
        if !out.iter().any(|seen| seen.eq_ignore_ascii_case(&k)) {
            out.push(k);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> Backend {
        Backend {
            kind: BackendKind::Crossref,
            base_url: base.to_string(),
            api_key: None,
            contact_email: None,
            max_candidates: 5,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(backend("https://a.test/").endpoint("/works"), "https://a.test/works");
        assert_eq!(backend("https://a.test").endpoint("works"), "https://a.test/works");
    }

    #[test]
    fn clean_collapses_whitespace() {
        assert_eq!(clean(Some("  A \n  title ".into())), Some("A title".into()));
        assert_eq!(clean(Some("   ".into())), None);
        assert_eq!(clean(None), None);
    }

    #[test]
    fn keywords_deduplicated_case_insensitively() {
        let kw = clean_keywords(["Physics ".into(), "  ".into(), "physics".into(), "Optics".into()]);
        assert_eq!(kw, vec!["Physics".to_string(), "Optics".to_string()]);
    }

    #[test]
    fn kind_names_match_serde() {
        for kind in [
            BackendKind::Crossref,
            BackendKind::SemanticScholar,
            BackendKind::OpenAlex,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.as_str());
        }
    }
}
