//! OpenAlex works API

use serde::Deserialize;
use serde_json::Value;

use sciharvest_core::Fetcher;

use super::backend::{
    Backend, Candidate, SearchError, SearchQuery, clean, clean_keywords, get_json,
};
use super::path_escape;
use crate::abstract_decode::decode_abstract;
use crate::identifier::normalize_doi;

#[derive(Debug, Deserialize)]
struct ResultPage {
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Work {
    title: Option<String>,
    display_name: Option<String>,
    doi: Option<String>,
    publication_year: Option<i32>,
    authorships: Vec<Authorship>,
    primary_location: Option<Location>,
    best_oa_location: Option<Location>,
    open_access: Option<OpenAccess>,
    abstract_inverted_index: Option<Value>,
    cited_by_count: Option<u32>,
    keywords: Option<Vec<Keyword>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Keyword {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Authorship {
    author: Option<AuthorRef>,
    raw_author_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuthorRef {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Location {
    pdf_url: Option<String>,
    source: Option<Source>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Source {
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenAccess {
    oa_url: Option<String>,
}

impl Work {
    fn pdf_url(&self) -> Option<String> {
        let best = self
            .best_oa_location
            .as_ref()
            .and_then(|l| clean(l.pdf_url.clone()));
        // oa_url often points at a landing page; only trust it when it names a PDF
        best.or_else(|| {
            self.open_access
                .as_ref()
                .and_then(|oa| clean(oa.oa_url.clone()))
                .filter(|u| u.to_ascii_lowercase().ends_with(".pdf"))
        })
    }

    fn into_candidate(self, rank: usize) -> Candidate {
        let pdf_url = self.pdf_url();
        let venue = self
            .primary_location
            .and_then(|l| l.source)
            .and_then(|s| clean(s.display_name));
        Candidate {
            title: clean(self.title.or(self.display_name)).unwrap_or_default(),
            authors: self
                .authorships
                .into_iter()
                .filter_map(|a| clean(a.author.and_then(|r| r.display_name).or(a.raw_author_name)))
                .collect(),
            venue,
            year: self.publication_year,
            doi: self.doi.as_deref().and_then(normalize_doi),
            pdf_url,
            abstract_text: decode_abstract(self.abstract_inverted_index.as_ref()),
            times_cited: self.cited_by_count,
            keywords: clean_keywords(
                self.keywords
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|k| k.display_name),
            ),
            rank,
        }
    }
}

pub(super) fn search(
    backend: &Backend,
    fetcher: &Fetcher,
    query: SearchQuery<'_>,
) -> Result<Vec<Candidate>, SearchError> {
    let mut request = match query {
        SearchQuery::Doi(doi) => backend.request(&format!("works/doi:{}", path_escape(doi))),
        SearchQuery::Text(text) => backend
            .request("works")
            .query("search", text)
            .query("per-page", backend.max_candidates.to_string()),
    };
    if let Some(email) = &backend.contact_email {
        request = request.query("mailto", email.as_str());
    }

    let candidates = match query {
        SearchQuery::Doi(_) => get_json::<Work>(fetcher, &request)?
            .map(|w| vec![w.into_candidate(0)])
            .unwrap_or_default(),
        SearchQuery::Text(_) => get_json::<ResultPage>(fetcher, &request)?
            .map(|page| {
                page.results
                    .into_iter()
                    .enumerate()
                    .map(|(rank, w)| w.into_candidate(rank))
                    .collect()
            })
            .unwrap_or_default(),
    };
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORK: &str = r#"{
        "id": "https://openalex.org/W1",
        "doi": "https://doi.org/10.7717/PEERJ.4375",
        "title": "The state of OA",
        "publication_year": 2018,
        "authorships": [
            {"author": {"display_name": "Heather Piwowar"}},
            {"author": null, "raw_author_name": "J. Priem"}
        ],
        "primary_location": {"source": {"display_name": "PeerJ"}},
        "best_oa_location": {"pdf_url": "https://peerj.com/articles/4375.pdf"},
        "open_access": {"oa_url": "https://peerj.com/articles/4375"},
        "abstract_inverted_index": {"Despite": [0], "growing": [1], "interest": [2]},
        "cited_by_count": 1021,
        "keywords": [
            {"id": "https://openalex.org/keywords/open-access", "display_name": "Open Access", "score": 0.7},
            {"id": "https://openalex.org/keywords/x", "display_name": null, "score": 0.2}
        ]
    }"#;

    #[test]
    fn work_to_candidate() {
        let work: Work = serde_json::from_str(WORK).unwrap();
        let c = work.into_candidate(0);
        assert_eq!(c.title, "The state of OA");
        assert_eq!(c.authors, vec!["Heather Piwowar", "J. Priem"]);
        assert_eq!(c.venue.as_deref(), Some("PeerJ"));
        assert_eq!(c.year, Some(2018));
        assert_eq!(c.doi.as_deref(), Some("10.7717/peerj.4375"));
        assert_eq!(c.pdf_url.as_deref(), Some("https://peerj.com/articles/4375.pdf"));
        assert_eq!(c.abstract_text.as_deref(), Some("Despite growing interest"));
        assert_eq!(c.times_cited, Some(1021));
        assert_eq!(c.keywords, vec!["Open Access"]);
    }

    #[test]
    fn oa_url_used_only_when_pdf() {
        let landing: Work = serde_json::from_str(
            r#"{"best_oa_location": {"pdf_url": null}, "open_access": {"oa_url": "https://x.org/landing"}}"#,
        )
        .unwrap();
        assert_eq!(landing.pdf_url(), None);

        let pdf: Work = serde_json::from_str(
            r#"{"best_oa_location": null, "open_access": {"oa_url": "https://x.org/paper.PDF"}}"#,
        )
        .unwrap();
        assert_eq!(pdf.pdf_url().as_deref(), Some("https://x.org/paper.PDF"));
    }

    #[test]
    fn display_name_fallback() {
        let work: Work = serde_json::from_str(r#"{"title": null, "display_name": "Fallback"}"#).unwrap();
        assert_eq!(work.into_candidate(0).title, "Fallback");
    }
}
