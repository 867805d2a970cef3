//! Semantic Scholar Graph API (`/graph/v1/paper`)

use serde::Deserialize;

use sciharvest_core::Fetcher;

use super::backend::{
    Backend, Candidate, SearchError, SearchQuery, clean, clean_keywords, get_json,
};
use super::path_escape;
use crate::identifier::normalize_doi;

const FIELDS: &str = concat!(
    "title,authors,venue,year,externalIds,openAccessPdf,abstract,",
    "citationCount,fieldsOfStudy"
);

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<Paper>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Paper {
    title: Option<String>,
    authors: Vec<AuthorRef>,
    venue: Option<String>,
    year: Option<i32>,
    #[serde(rename = "externalIds")]
    external_ids: Option<ExternalIds>,
    #[serde(rename = "openAccessPdf")]
    open_access_pdf: Option<OpenAccessPdf>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "citationCount")]
    citation_count: Option<u32>,
    /// `null` when unclassified
    #[serde(rename = "fieldsOfStudy")]
    fields_of_study: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuthorRef {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpenAccessPdf {
    url: Option<String>,
}

impl Paper {
    fn into_candidate(self, rank: usize) -> Candidate {
        Candidate {
            title: clean(self.title).unwrap_or_default(),
            authors: self.authors.into_iter().filter_map(|a| clean(a.name)).collect(),
            venue: clean(self.venue),
            year: self.year,
            doi: self
                .external_ids
                .and_then(|ids| ids.doi)
                .as_deref()
                .and_then(normalize_doi),
            pdf_url: self
                .open_access_pdf
                .and_then(|p| clean(p.url)),
            abstract_text: clean(self.abstract_text),
            times_cited: self.citation_count,
            keywords: clean_keywords(self.fields_of_study.unwrap_or_default()),
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
        SearchQuery::Doi(doi) => {
            backend.request(&format!("graph/v1/paper/DOI:{}", path_escape(doi)))
        }
        SearchQuery::Text(text) => backend
            .request("graph/v1/paper/search")
            .query("query", text)
            .query("limit", backend.max_candidates.to_string()),
    };
    request = request.query("fields", FIELDS);
    if let Some(key) = &backend.api_key {
        request = request.header("x-api-key", key.as_str());
    }

    let candidates = match query {
        SearchQuery::Doi(_) => get_json::<Paper>(fetcher, &request)?
            .map(|p| vec![p.into_candidate(0)])
            .unwrap_or_default(),
        SearchQuery::Text(_) => get_json::<SearchPage>(fetcher, &request)?
            .map(|page| {
                page.data
                    .into_iter()
                    .enumerate()
                    .map(|(rank, p)| p.into_candidate(rank))
                    .collect()
            })
            .unwrap_or_default(),
    };
    Ok(candidates)
}
