//! Word-list relevance scoring of extracted text
//!
//! Counts how often the most frequent target words (and bycatch words, i.e.
//! terms signalling an off-topic paper) occur in a document.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// How many of the most frequent matches are counted and reported
const TOP_N: usize = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    pub target_words: Vec<String>,
    pub bycatch_words: Vec<String>,
}

impl RelevanceConfig {
    pub fn is_empty(&self) -> bool {
        self.target_words.is_empty() && self.bycatch_words.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceScore {
    /// Occurrences of the top target words
    pub matching_terms: usize,
    /// Occurrences of the top bycatch words
    pub bycatch_terms: usize,
    pub total_words: usize,
    pub top_targets: Vec<(String, usize)>,
    pub top_bycatch: Vec<(String, usize)>,
    /// `(matching - bycatch) / total`, clamped to [0, 1]
    pub wordscore: f64,
}

#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    targets: HashSet<String>,
    bycatch: HashSet<String>,
}

impl RelevanceScorer {
    /// `None` when no word lists are configured
    pub fn from_config(config: &RelevanceConfig) -> Option<Self> {
        if config.is_empty() {
            return None;
        }
        let normalize = |words: &[String]| -> HashSet<String> {
            words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };
        Some(Self {
            targets: normalize(&config.target_words),
            bycatch: normalize(&config.bycatch_words),
        })
    }

    pub fn score<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> RelevanceScore {
        let mut target_counts: HashMap<String, usize> = HashMap::new();
        let mut bycatch_counts: HashMap<String, usize> = HashMap::new();
        let mut total_words = 0;

        for text in texts {
            for word in text
                .split(|c: char| !c.is_alphanumeric() && c != '_')
                .filter(|w| !w.is_empty())
            {
                total_words += 1;
                let word = word.to_lowercase();
                if self.targets.contains(&word) {
                    *target_counts.entry(word.clone()).or_default() += 1;
                }
                if self.bycatch.contains(&word) {
                    *bycatch_counts.entry(word).or_default() += 1;
                }
            }
        }

        let top_targets = most_common(target_counts);
        let top_bycatch = most_common(bycatch_counts);
        let matching_terms: usize = top_targets.iter().map(|(_, n)| n).sum();
        let bycatch_terms: usize = top_bycatch.iter().map(|(_, n)| n).sum();
        let wordscore = if total_words == 0 {
            0.0
        } else {
            ((matching_terms as f64 - bycatch_terms as f64) / total_words as f64).clamp(0.0, 1.0)
        };

        RelevanceScore {
            matching_terms,
            bycatch_terms,
            total_words,
            top_targets,
            top_bycatch,
            wordscore,
        }
    }
}

/// Top entries by count; ties in alphabetical order
fn most_common(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(TOP_N);
    entries
}
