//! Rebuild OpenAlex abstracts from their inverted index
//!
//! OpenAlex ships abstracts as `{"word": [positions...]}`:
//! ```json
//! {"Despite": [0], "growing": [1], "interest": [2, 50]}
//! ```

use serde_json::{Map, Value};

/// Words ordered by position, space-joined.
///
/// Positions that are missing from the index are skipped rather than padded.
pub fn decode_inverted_index(index: &Map<String, Value>) -> String {
    let mut pairs: Vec<(u64, &str)> = index
        .iter()
        .filter_map(|(word, positions)| Some((word, positions.as_array()?)))
        .flat_map(|(word, positions)| {
            positions
                .iter()
                .filter_map(Value::as_u64)
                .map(move |p| (p, word.as_str()))
        })
        .collect();
    pairs.sort_by_key(|(pos, _)| *pos);
    pairs.into_iter().map(|(_, w)| w).collect::<Vec<_>>().join(" ")
}

/// `None` for null, non-object or empty indexes
pub fn decode_abstract(value: Option<&Value>) -> Option<String> {
    let text = decode_inverted_index(value?.as_object()?);
    (!text.is_empty()).then_some(text)
}
