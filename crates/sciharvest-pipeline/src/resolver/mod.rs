//! Identifier Resolver: identifier → canonical [`MetadataRecord`]
//!
//! DOIs are looked up directly, free text is searched; both go through the
//! configured backends in order. Direct URLs pass through untouched.

mod backend;
mod crossref;
mod openalex;
pub mod scoring;
mod semantic_scholar;

use std::sync::Arc;
use std::time::Duration;

use sciharvest_core::{FetchRequest, Fetcher};

pub use backend::{Backend, BackendKind, Candidate, SearchError, SearchQuery};

use crate::config::PipelineConfig;
use crate::error::ResolveError;
use crate::identifier::{Identifier, IdentifierKind};
use crate::model::MetadataRecord;
use backend::clean;
use scoring::{Scored, is_exact, normalize_title, pick_best, score_doi, score_text};

/// Escape characters that would end a URL path segment early.
///
/// DOIs keep their slashes; every backend accepts them unescaped.
pub(crate) fn path_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            '?' => out.push_str("%3F"),
            '#' => out.push_str("%23"),
            ' ' => out.push_str("%20"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug)]
pub struct Resolver {
    fetcher: Arc<Fetcher>,
    backends: Vec<Backend>,
    threshold: f64,
    /// Content-negotiation base for APA citations; `None` when disabled
    citation_base: Option<String>,
    timeout: Duration,
}

impl Resolver {
    pub fn new(fetcher: Arc<Fetcher>, config: &PipelineConfig) -> Self {
        let credentials = &config.credentials;
        let backends = config
            .resolver
            .backends
            .iter()
            .map(|&kind| Backend {
                kind,
                base_url: config.resolver.endpoints.base_url(kind).to_string(),
                api_key: match kind {
                    BackendKind::SemanticScholar => credentials.semantic_scholar_api_key.clone(),
                    _ => None,
                },
                contact_email: match kind {
                    BackendKind::SemanticScholar => None,
                    _ => credentials.contact_email.clone(),
                },
                max_candidates: config.resolver.max_candidates,
                timeout: config.request_timeout(),
            })
            .collect();
        Self {
            fetcher,
            backends,
            threshold: config.resolver.confidence_threshold,
            citation_base: config
                .resolver
                .fetch_citation
                .then(|| config.resolver.endpoints.citation.clone()),
            timeout: config.request_timeout(),
        }
    }

    pub fn backends(&self) -> impl Iterator<Item = BackendKind> + '_ {
        self.backends.iter().map(|b| b.kind)
    }

    pub fn resolve(&self, identifier: &Identifier) -> Result<MetadataRecord, ResolveError> {
        match identifier.kind() {
            IdentifierKind::Url(url) => Ok(MetadataRecord::passthrough(identifier, &url)),
            IdentifierKind::Query(q) if q.is_empty() => {
                Err(ResolveError::NotFound(identifier.to_string()))
            }
            IdentifierKind::Doi(doi) => {
                self.search_all(identifier, SearchQuery::Doi(&doi), |c| score_doi(&doi, c))
            }
            IdentifierKind::Query(q) => {
                self.search_all(identifier, SearchQuery::Text(&q), |c| score_text(&q, c))
            }
        }
    }

    fn search_all(
        &self,
        identifier: &Identifier,
        query: SearchQuery<'_>,
        score: impl Fn(&Candidate) -> f64,
    ) -> Result<MetadataRecord, ResolveError> {
        let mut scored: Vec<Scored<BackendKind>> = Vec::new();
        let mut errors = Vec::new();

        for (position, backend) in self.backends.iter().enumerate() {
            match backend.search(&self.fetcher, query) {
                Ok(candidates) => {
                    log::debug!(
                        "{identifier}: {} returned {} candidates",
                        backend.kind,
                        candidates.len()
                    );
                    scored.extend(candidates.into_iter().map(|candidate| Scored {
                        score: score(&candidate),
                        rank: (position, candidate.rank),
                        backend: backend.kind,
                        candidate,
                    }));
                }
                Err(e) => {
                    log::debug!("{identifier}: {} search failed: {e}", backend.kind);
                    errors.push((backend.kind, e));
                }
            }
            // An exact hit that also locates a PDF settles it
            if scored
                .iter()
                .any(|s| is_exact(s.score) && s.candidate.pdf_url.is_some())
            {
                break;
            }
        }

        let Some(best) = pick_best(&scored) else {
            return Err(if errors.len() == self.backends.len() {
                ResolveError::Backend(errors)
            } else {
                ResolveError::NotFound(identifier.to_string())
            });
        };
        if best.score < self.threshold {
            return Err(ResolveError::Ambiguous {
                best_title: best.candidate.title.clone(),
                best_score: best.score,
                threshold: self.threshold,
            });
        }
        let mut record = self.to_record(identifier, best, &scored);
        if let Some(doi) = record.doi.as_deref() {
            record.biblio = self.citation(identifier, doi);
        }
        Ok(record)
    }

    /// APA citation via DOI content negotiation. Optional: any failure is
    /// logged and leaves the field empty.
    fn citation(&self, identifier: &Identifier, doi: &str) -> Option<String> {
        let base = self.citation_base.as_deref()?;
        let request = FetchRequest::get(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path_escape(doi)
        ))
        .header("accept", "text/x-bibliography; style=apa")
        .timeout(self.timeout);
        match self.fetcher.fetch_text(&request) {
            Ok(text) => clean(Some(text)),
            Err(e) => {
                log::debug!("{identifier}: citation lookup failed: {e}");
                None
            }
        }
    }

    /// Build the record from the winner, borrowing what it lacks (PDF URL,
    /// abstract, citation count, keywords) from other hits on the same work.
    fn to_record(
        &self,
        identifier: &Identifier,
        best: &Scored<BackendKind>,
        scored: &[Scored<BackendKind>],
    ) -> MetadataRecord {
        let mut same_work: Vec<&Scored<BackendKind>> = scored
            .iter()
            .filter(|s| same_work(&s.candidate, &best.candidate))
            .collect();
        same_work.sort_by_key(|s| s.rank);

        let c = &best.candidate;
        let pdf_url = c
            .pdf_url
            .clone()
            .or_else(|| same_work.iter().find_map(|s| s.candidate.pdf_url.clone()));
        let abstract_text = c
            .abstract_text
            .clone()
            .or_else(|| same_work.iter().find_map(|s| s.candidate.abstract_text.clone()));
        let times_cited = c
            .times_cited
            .or_else(|| same_work.iter().find_map(|s| s.candidate.times_cited));
        let keywords = std::iter::once(&c.keywords)
            .chain(same_work.iter().map(|s| &s.candidate.keywords))
            .find(|k| !k.is_empty())
            .cloned()
            .unwrap_or_default();

        MetadataRecord {
            identifier: identifier.clone(),
            title: c.title.clone(),
            authors: c.authors.clone(),
            venue: c.venue.clone(),
            publication_year: c.year,
            pdf_url,
            source_backend: best.backend.to_string(),
            doi: c.doi.clone(),
            abstract_text,
            times_cited,
            keywords,
            biblio: None,
            match_score: best.score,
        }
    }
}

/// Two candidates describe the same work: same DOI, or same title when
/// either lacks one
fn same_work(a: &Candidate, b: &Candidate) -> bool {
    match (&a.doi, &b.doi) {
        (Some(x), Some(y)) => x == y,
        _ => {
            let ta = normalize_title(&a.title);
            !ta.is_empty() && ta == normalize_title(&b.title)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sciharvest_core::stub::{StubResponse, StubTransport};
    use sciharvest_core::{RateLimiter, RetryPolicy};

    use crate::config::Endpoints;
    use crate::error::ErrorKind;

    const CROSSREF: &str = "https://crossref.test";
    const S2: &str = "https://s2.test";
    const OPENALEX: &str = "https://openalex.test";
    const CITE: &str = "https://cite.test";

    fn resolver(stub: StubTransport, backends: Vec<BackendKind>) -> (Resolver, Arc<StubTransport>) {
        resolver_with(stub, backends, false)
    }

    fn resolver_with(
        stub: StubTransport,
        backends: Vec<BackendKind>,
        fetch_citation: bool,
    ) -> (Resolver, Arc<StubTransport>) {
        let stub = Arc::new(stub);
        let fetcher = Arc::new(Fetcher::new(
            stub.clone(),
            Arc::new(RateLimiter::new(1000, Duration::from_secs(1), Duration::from_secs(1))),
            RetryPolicy {
                retry_ceiling: 1,
                base_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(2),
            },
        ));
        let mut config = PipelineConfig::default();
        config.resolver.backends = backends;
        config.resolver.endpoints = Endpoints {
            crossref: CROSSREF.into(),
            semantic_scholar: S2.into(),
            openalex: OPENALEX.into(),
            citation: CITE.into(),
        };
        config.resolver.fetch_citation = fetch_citation;
        (Resolver::new(fetcher, &config), stub)
    }

    fn all_backends() -> Vec<BackendKind> {
        vec![
            BackendKind::Crossref,
            BackendKind::SemanticScholar,
            BackendKind::OpenAlex,
        ]
    }

    #[test]
    fn url_passes_through_without_requests() {
        let (r, stub) = resolver(StubTransport::new(), all_backends());
        let rec = r.resolve(&Identifier::new("https://example.org/p.pdf")).unwrap();
        assert_eq!(rec.pdf_url.as_deref(), Some("https://example.org/p.pdf"));
        assert!(stub.calls().is_empty());
    }

    #[test]
    fn blank_identifier_not_found_offline() {
        let (r, stub) = resolver(StubTransport::new(), all_backends());
        let err = r.resolve(&Identifier::new("  ")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResolutionNotFound);
        assert!(stub.calls().is_empty());
    }

    #[test]
    fn doi_exact_match_with_pdf_stops_early() {
        let stub = StubTransport::new().route(
            "https://crossref.test/works/10.1000/abc",
            StubResponse::json(
                r#"{"message": {"DOI": "10.1000/ABC", "title": ["A Paper"],
                    "link": [{"URL": "https://pub.test/abc.pdf", "content-type": "application/pdf"}]}}"#,
            ),
        );
        let (r, stub) = resolver(stub, all_backends());
        let rec = r.resolve(&Identifier::new("doi:10.1000/abc")).unwrap();
        assert_eq!(rec.title, "A Paper");
        assert_eq!(rec.source_backend, "crossref");
        assert_eq!(rec.match_score, 1.0);
        assert_eq!(rec.pdf_url.as_deref(), Some("https://pub.test/abc.pdf"));
        assert_eq!(stub.call_count(S2), 0);
        assert_eq!(stub.call_count(OPENALEX), 0);
    }

    #[test]
    fn pdf_url_borrowed_from_later_backend() {
        let stub = StubTransport::new()
            .route(
                "https://crossref.test/works/10.1000/abc",
                StubResponse::json(r#"{"message": {"DOI": "10.1000/abc", "title": ["A Paper"]}}"#),
            )
            .route(
                "https://openalex.test/works/doi:10.1000/abc",
                StubResponse::json(
                    r#"{"doi": "https://doi.org/10.1000/abc", "title": "A paper",
                        "best_oa_location": {"pdf_url": "https://oa.test/abc.pdf"}}"#,
                ),
            );
        let (r, stub) = resolver(stub, all_backends());
        let rec = r.resolve(&Identifier::new("10.1000/abc")).unwrap();
        assert_eq!(rec.source_backend, "crossref");
        assert_eq!(rec.pdf_url.as_deref(), Some("https://oa.test/abc.pdf"));
        // S2 is unrouted: 404 means no candidates, not an error
        assert_eq!(stub.call_count(S2), 1);
    }

    #[test]
    fn no_candidates_is_not_found() {
        let (r, _) = resolver(StubTransport::new(), all_backends());
        let err = r.resolve(&Identifier::new("10.9999/missing")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResolutionNotFound);
    }

    #[test]
    fn all_backends_failing_is_backend_error() {
        let stub = StubTransport::new()
            .route(CROSSREF, StubResponse::status(500))
            .route(OPENALEX, StubResponse::json("not json"));
        let (r, _) = resolver(stub, vec![BackendKind::Crossref, BackendKind::OpenAlex]);
        let err = r.resolve(&Identifier::new("some query")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResolutionBackendError);
    }

    #[test]
    fn one_backend_failing_is_still_not_found() {
        let stub = StubTransport::new()
            .route(CROSSREF, StubResponse::status(500))
            .route(OPENALEX, StubResponse::json(r#"{"results": []}"#));
        let (r, _) = resolver(stub, vec![BackendKind::Crossref, BackendKind::OpenAlex]);
        let err = r.resolve(&Identifier::new("some query")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResolutionNotFound);
    }

    #[test]
    fn weak_match_is_ambiguous() {
        let stub = StubTransport::new().route(
            "https://openalex.test/works?search=",
            StubResponse::json(r#"{"results": [{"title": "Protein folding in thermophiles"}]}"#),
        );
        let (r, _) = resolver(stub, vec![BackendKind::OpenAlex]);
        let err = r
            .resolve(&Identifier::new("loss aversion in retirement savings"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResolutionAmbiguous);
    }

    #[test]
    fn one_word_query_is_ambiguous() {
        let stub = StubTransport::new().route(
            "https://openalex.test/works?search=",
            StubResponse::json(
                r#"{"results": [{"title": "Behavior of granular materials under cyclic shear loading"}]}"#,
            ),
        );
        let (r, _) = resolver(stub, vec![BackendKind::OpenAlex]);
        let err = r.resolve(&Identifier::new("behavior")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResolutionAmbiguous);
    }

    #[test]
    fn text_search_prefers_exact_title() {
        let stub = StubTransport::new().route(
            "https://s2.test/graph/v1/paper/search",
            StubResponse::json(
                r#"{"data": [
                    {"title": "Nudges in practice: a review"},
                    {"title": "Nudge: Improving Decisions about Health",
                     "openAccessPdf": {"url": "https://s2.test/nudge.pdf"}}
                ]}"#,
            ),
        );
        let (r, _) = resolver(stub, vec![BackendKind::SemanticScholar]);
        let rec = r
            .resolve(&Identifier::new("nudge improving decisions about health"))
            .unwrap();
        assert_eq!(rec.title, "Nudge: Improving Decisions about Health");
        assert_eq!(rec.match_score, 1.0);
        assert_eq!(rec.source_backend, "semantic_scholar");
    }

    #[test]
    fn api_key_sent_only_to_semantic_scholar() {
        let mut config = PipelineConfig::default();
        config.credentials.semantic_scholar_api_key = Some("k".into());
        config.credentials.contact_email = Some("me@example.org".into());
        let fetcher = Arc::new(Fetcher::new(
            Arc::new(StubTransport::new()),
            Arc::new(RateLimiter::new(10, Duration::from_secs(1), Duration::from_secs(1))),
            RetryPolicy::default(),
        ));
        let r = Resolver::new(fetcher, &config);
        for b in &r.backends {
            match b.kind {
                BackendKind::SemanticScholar => {
                    assert_eq!(b.api_key.as_deref(), Some("k"));
                    assert!(b.contact_email.is_none());
                }
                _ => {
                    assert!(b.api_key.is_none());
                    assert_eq!(b.contact_email.as_deref(), Some("me@example.org"));
                }
            }
        }
    }

    const CITED_WORK: &str = r#"{"message": {"DOI": "10.1000/abc", "title": ["A Paper"],
        "is-referenced-by-count": 12, "subject": ["Ecology"],
        "link": [{"URL": "https://pub.test/abc.pdf", "content-type": "application/pdf"}]}}"#;

    #[test]
    fn citation_fetched_when_enabled() {
        let stub = StubTransport::new()
            .route("https://crossref.test/works/10.1000/abc", StubResponse::json(CITED_WORK))
            .route(
                "https://cite.test/10.1000/abc",
                StubResponse::new(
                    200,
                    Some("text/x-bibliography"),
                    b"Doe, J. (2020). A Paper. Journal, 1(2), 3-4.\n".to_vec(),
                ),
            );
        let (r, _) = resolver_with(stub, all_backends(), true);
        let rec = r.resolve(&Identifier::new("10.1000/abc")).unwrap();
        assert_eq!(
            rec.biblio.as_deref(),
            Some("Doe, J. (2020). A Paper. Journal, 1(2), 3-4.")
        );
        assert_eq!(rec.times_cited, Some(12));
        assert_eq!(rec.keywords, vec!["Ecology"]);
    }

    #[test]
    fn citation_failure_leaves_record_intact() {
        let stub = StubTransport::new()
            .route("https://crossref.test/works/10.1000/abc", StubResponse::json(CITED_WORK))
            .route(CITE, StubResponse::status(406));
        let (r, stub) = resolver_with(stub, all_backends(), true);
        let rec = r.resolve(&Identifier::new("10.1000/abc")).unwrap();
        assert_eq!(rec.biblio, None);
        assert_eq!(rec.title, "A Paper");
        assert_eq!(stub.call_count(CITE), 1);
    }

    #[test]
    fn citation_off_by_default() {
        let stub = StubTransport::new()
            .route("https://crossref.test/works/10.1000/abc", StubResponse::json(CITED_WORK));
        let (r, stub) = resolver(stub, all_backends());
        let rec = r.resolve(&Identifier::new("10.1000/abc")).unwrap();
        assert_eq!(rec.biblio, None);
        assert_eq!(stub.call_count(CITE), 0);
    }

    #[test]
    fn citation_count_borrowed_from_same_work() {
        let stub = StubTransport::new()
            .route(
                "https://crossref.test/works/10.1000/abc",
                StubResponse::json(r#"{"message": {"DOI": "10.1000/abc", "title": ["A Paper"]}}"#),
            )
            .route(
                "https://openalex.test/works/doi:10.1000/abc",
                StubResponse::json(
                    r#"{"doi": "https://doi.org/10.1000/abc", "title": "A paper",
                        "cited_by_count": 7, "keywords": [{"display_name": "Soil"}]}"#,
                ),
            );
        let (r, _) = resolver(stub, all_backends());
        let rec = r.resolve(&Identifier::new("10.1000/abc")).unwrap();
        assert_eq!(rec.source_backend, "crossref");
        assert_eq!(rec.times_cited, Some(7));
        assert_eq!(rec.keywords, vec!["Soil"]);
    }

    #[test]
    fn path_escape_keeps_slashes() {
        assert_eq!(path_escape("10.1000/a#b?c"), "10.1000/a%23b%3Fc");
    }
}
