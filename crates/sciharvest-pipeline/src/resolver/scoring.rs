//! Deterministic candidate scoring
//!
//! Exact matches (same DOI, or same normalized title) score 1.0. Fuzzy title
//! matches are capped just below that, so an exact hit always wins. Both
//! fuzzy measures are symmetric: a short query contained in a long title
//! scores as low as a long query against a short title.

use std::collections::HashSet;

use super::backend::Candidate;

/// Upper bound for any non-exact match
const FUZZY_CAP: f64 = 0.99;

/// Lower-cased alphanumeric tokens joined by single spaces
pub fn normalize_title(title: &str) -> String {
    tokens(title).collect::<Vec<_>>().join(" ")
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// 1.0 when the candidate carries the same (normalized) DOI, else 0.0
pub fn score_doi(doi: &str, candidate: &Candidate) -> f64 {
    match &candidate.doi {
        Some(c) if c.eq_ignore_ascii_case(doi) => 1.0,
        _ => 0.0,
    }
}

/// Title similarity of a free-text query, in [0, 1]
pub fn score_text(query: &str, candidate: &Candidate) -> f64 {
    let q = normalize_title(query);
    let t = normalize_title(&candidate.title);
    if q.is_empty() || t.is_empty() {
        return 0.0;
    }
    if q == t {
        return 1.0;
    }
    let edit = strsim::normalized_levenshtein(&q, &t);
    FUZZY_CAP * edit.max(token_overlap(&q, &t))
}

/// Sørensen-Dice coefficient over distinct tokens
fn token_overlap(query: &str, title: &str) -> f64 {
    let q: HashSet<&str> = query.split(' ').collect();
    let t: HashSet<&str> = title.split(' ').collect();
    let shared = q.intersection(&t).count();
    2.0 * shared as f64 / (q.len() + t.len()) as f64
}

pub fn is_exact(score: f64) -> bool {
    score >= 1.0
}

/// A scored candidate with its global rank `(backend position, result rank)`
#[derive(Debug, Clone)]
pub struct Scored<B> {
    pub score: f64,
    pub rank: (usize, usize),
    pub backend: B,
    pub candidate: Candidate,
}

/// Highest score wins; ties go to the earliest global rank.
pub fn pick_best<B>(scored: &[Scored<B>]) -> Option<&Scored<B>> {
    scored.iter().reduce(|best, s| {
        if s.score > best.score || (s.score == best.score && s.rank < best.rank) {
            s
        } else {
            best
        }
    })
}
