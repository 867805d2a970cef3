//! Crossref REST API (`/works`)

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use sciharvest_core::Fetcher;

use super::backend::{
    Backend, Candidate, SearchError, SearchQuery, clean, clean_keywords, get_json,
};
use super::path_escape;
use crate::identifier::normalize_doi;

/// JATS markup wrapped around Crossref abstracts
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("invalid tag regex"));

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    message: T,
}

#[derive(Debug, Deserialize)]
struct ItemList {
    #[serde(default)]
    items: Vec<Work>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Work {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    title: Vec<String>,
    author: Vec<Author>,
    #[serde(rename = "container-title")]
    container_title: Vec<String>,
    issued: Option<DateParts>,
    #[serde(rename = "published-print")]
    published_print: Option<DateParts>,
    #[serde(rename = "published-online")]
    published_online: Option<DateParts>,
    link: Vec<Link>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "is-referenced-by-count")]
    referenced_by: Option<u32>,
    subject: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Author {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DateParts {
    #[serde(rename = "date-parts")]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl DateParts {
    fn year(&self) -> Option<i32> {
        self.date_parts.first()?.first().copied().flatten()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Link {
    #[serde(rename = "URL")]
    url: Option<String>,
    #[serde(rename = "content-type")]
    content_type: Option<String>,
}

impl Author {
    fn display_name(&self) -> Option<String> {
        match (&self.given, &self.family) {
            (Some(g), Some(f)) => clean(Some(format!("{g} {f}"))),
            (None, Some(f)) => clean(Some(f.clone())),
            _ => clean(self.name.clone()),
        }
    }
}

impl Work {
    fn into_candidate(self, rank: usize) -> Candidate {
        let year = [&self.issued, &self.published_print, &self.published_online]
            .into_iter()
            .flatten()
            .find_map(DateParts::year);
        let pdf_url = self
            .link
            .iter()
            .find(|l| {
                l.content_type
                    .as_deref()
                    .is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"))
            })
            .and_then(|l| l.url.clone());
        let abstract_text = clean(
            self.abstract_text
                .map(|a| TAG_RE.replace_all(&a, " ").into_owned()),
        );
        Candidate {
            title: clean(self.title.into_iter().next()).unwrap_or_default(),
            authors: self.author.iter().filter_map(Author::display_name).collect(),
            venue: clean(self.container_title.into_iter().next()),
            year,
            doi: self.doi.as_deref().and_then(normalize_doi),
            pdf_url,
            abstract_text,
            times_cited: self.referenced_by,
            keywords: clean_keywords(self.subject),
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
        SearchQuery::Doi(doi) => backend.request(&format!("works/{}", path_escape(doi))),
        SearchQuery::Text(text) => backend
            .request("works")
            .query("query.bibliographic", text)
            .query("rows", backend.max_candidates.to_string()),
    };
    if let Some(email) = &backend.contact_email {
        request = request.query("mailto", email.as_str());
    }

    let candidates = match query {
        SearchQuery::Doi(_) => get_json::<Envelope<Work>>(fetcher, &request)?
            .map(|env| vec![env.message.into_candidate(0)])
            .unwrap_or_default(),
        SearchQuery::Text(_) => get_json::<Envelope<ItemList>>(fetcher, &request)?
            .map(|env| {
                env.message
                    .items
                    .into_iter()
                    .enumerate()
                    .map(|(rank, w)| w.into_candidate(rank))
                    .collect()
            })
            .unwrap_or_default(),
    };
    Ok(candidates)
}
