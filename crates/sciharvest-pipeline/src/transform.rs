//! OutcomeRecord to Arrow record batch accumulation

use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int32Array, ListBuilder, RecordBatch, StringArray,
    StringBuilder, UInt32Array, UInt32Builder, UInt64Array,
};
use arrow::datatypes::Schema;
use sciharvest_core::ParquetSink;

use crate::model::OutcomeRecord;
use crate::schema;

/// Batch size for creating `RecordBatch` from accumulated rows
pub const RECORD_BATCH_SIZE: usize = 8192;

/// Accumulator trait for batch processing
pub trait Accumulator {
    type Row;

    /// Push a row into the accumulator
    fn push(&mut self, row: Self::Row);

    /// Number of rows currently buffered
    fn len(&self) -> usize;

    /// Check if buffer is full and should be flushed
    fn is_full(&self) -> bool {
        self.len() >= RECORD_BATCH_SIZE
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take buffered rows as a RecordBatch, resetting internal state
    fn take_batch(&mut self) -> RecordBatch;
}

/// Columnar buffer for [`OutcomeRecord`]s
pub struct OutcomeAccumulator {
    schema: Arc<Schema>,
    identifier: Vec<String>,
    stage_reached: Vec<&'static str>,
    error_kind: Vec<Option<&'static str>>,
    error_message: Vec<Option<String>>,
    title: Vec<Option<String>>,
    authors: Vec<Option<Vec<String>>>,
    venue: Vec<Option<String>>,
    year: Vec<Option<i32>>,
    doi: Vec<Option<String>>,
    pdf_url: Vec<Option<String>>,
    source_backend: Vec<Option<String>>,
    match_score: Vec<Option<f64>>,
    abstract_text: Vec<Option<String>>,
    times_cited: Vec<Option<u32>>,
    keywords: Vec<Option<Vec<String>>>,
    biblio: Vec<Option<String>>,
    byte_length: Vec<Option<u64>>,
    page_count: Vec<Option<u32>>,
    partial: Vec<Option<bool>>,
    pages: Vec<Option<Vec<String>>>,
    matching_terms: Vec<Option<u32>>,
    bycatch_terms: Vec<Option<u32>>,
    total_words: Vec<Option<u32>>,
    wordscore: Vec<Option<f64>>,
    top_targets: Vec<Option<Vec<String>>>,
    top_target_counts: Vec<Option<Vec<u32>>>,
    top_bycatch: Vec<Option<Vec<String>>>,
    top_bycatch_counts: Vec<Option<Vec<u32>>>,
}

impl OutcomeAccumulator {
    pub fn new() -> Self {
        Self {
            schema: schema::outcomes().clone(),
            identifier: Vec::with_capacity(RECORD_BATCH_SIZE),
            stage_reached: Vec::with_capacity(RECORD_BATCH_SIZE),
            error_kind: Vec::with_capacity(RECORD_BATCH_SIZE),
            error_message: Vec::with_capacity(RECORD_BATCH_SIZE),
            title: Vec::with_capacity(RECORD_BATCH_SIZE),
            authors: Vec::with_capacity(RECORD_BATCH_SIZE),
            venue: Vec::with_capacity(RECORD_BATCH_SIZE),
            year: Vec::with_capacity(RECORD_BATCH_SIZE),
            doi: Vec::with_capacity(RECORD_BATCH_SIZE),
            pdf_url: Vec::with_capacity(RECORD_BATCH_SIZE),
            source_backend: Vec::with_capacity(RECORD_BATCH_SIZE),
            match_score: Vec::with_capacity(RECORD_BATCH_SIZE),
            abstract_text: Vec::with_capacity(RECORD_BATCH_SIZE),
            times_cited: Vec::with_capacity(RECORD_BATCH_SIZE),
            keywords: Vec::with_capacity(RECORD_BATCH_SIZE),
            biblio: Vec::with_capacity(RECORD_BATCH_SIZE),
            byte_length: Vec::with_capacity(RECORD_BATCH_SIZE),
            page_count: Vec::with_capacity(RECORD_BATCH_SIZE),
            partial: Vec::with_capacity(RECORD_BATCH_SIZE),
            pages: Vec::with_capacity(RECORD_BATCH_SIZE),
            matching_terms: Vec::with_capacity(RECORD_BATCH_SIZE),
            bycatch_terms: Vec::with_capacity(RECORD_BATCH_SIZE),
            total_words: Vec::with_capacity(RECORD_BATCH_SIZE),
            wordscore: Vec::with_capacity(RECORD_BATCH_SIZE),
            top_targets: Vec::with_capacity(RECORD_BATCH_SIZE),
            top_target_counts: Vec::with_capacity(RECORD_BATCH_SIZE),
            top_bycatch: Vec::with_capacity(RECORD_BATCH_SIZE),
            top_bycatch_counts: Vec::with_capacity(RECORD_BATCH_SIZE),
        }
    }
}

impl Default for OutcomeAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for OutcomeAccumulator {
    type Row = OutcomeRecord;

    fn push(&mut self, row: OutcomeRecord) {
        self.identifier.push(row.identifier.as_str().to_string());
        self.stage_reached.push(row.stage_reached.as_str());
        self.error_kind.push(row.error_kind.map(|k| k.as_str()));
        self.error_message.push(row.error_message);

        match row.metadata {
            Some(meta) => {
                self.title.push(Some(meta.title).filter(|t| !t.is_empty()));
                self.authors.push(Some(meta.authors));
                self.venue.push(meta.venue);
                self.year.push(meta.publication_year);
                self.doi.push(meta.doi);
                self.pdf_url.push(meta.pdf_url);
                self.source_backend.push(Some(meta.source_backend));
                self.match_score.push(Some(meta.match_score));
                self.abstract_text.push(meta.abstract_text);
                self.times_cited.push(meta.times_cited);
                self.keywords.push(Some(meta.keywords));
                self.biblio.push(meta.biblio);
            }
            None => {
                self.title.push(None);
                self.authors.push(None);
                self.venue.push(None);
                self.year.push(None);
                self.doi.push(None);
                self.pdf_url.push(None);
                self.source_backend.push(None);
                self.match_score.push(None);
                self.abstract_text.push(None);
                self.times_cited.push(None);
                self.keywords.push(None);
                self.biblio.push(None);
            }
        }

        self.byte_length.push(row.byte_length);

        match row.text {
            Some(text) => {
                self.page_count.push(Some(saturate(text.page_count)));
                self.partial.push(Some(text.partial));
                self.pages.push(Some(text.pages));
            }
            None => {
                self.page_count.push(None);
                self.partial.push(None);
                self.pages.push(None);
            }
        }

        match row.relevance {
            Some(rel) => {
                self.matching_terms.push(Some(saturate(rel.matching_terms)));
                self.bycatch_terms.push(Some(saturate(rel.bycatch_terms)));
                self.total_words.push(Some(saturate(rel.total_words)));
                self.wordscore.push(Some(rel.wordscore));
                let (words, counts) = split_frequencies(rel.top_targets);
                self.top_targets.push(Some(words));
                self.top_target_counts.push(Some(counts));
                let (words, counts) = split_frequencies(rel.top_bycatch);
                self.top_bycatch.push(Some(words));
                self.top_bycatch_counts.push(Some(counts));
            }
            None => {
                self.matching_terms.push(None);
                self.bycatch_terms.push(None);
                self.total_words.push(None);
                self.wordscore.push(None);
                self.top_targets.push(None);
                self.top_target_counts.push(None);
                self.top_bycatch.push(None);
                self.top_bycatch_counts.push(None);
            }
        }
    }

    fn len(&self) -> usize {
        self.identifier.len()
    }

    fn take_batch(&mut self) -> RecordBatch {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(std::mem::take(&mut self.identifier))),
            Arc::new(StringArray::from(std::mem::take(&mut self.stage_reached))),
            Arc::new(StringArray::from(std::mem::take(&mut self.error_kind))),
            Arc::new(StringArray::from(std::mem::take(&mut self.error_message))),
            Arc::new(StringArray::from(std::mem::take(&mut self.title))),
            build_list_string_array(std::mem::take(&mut self.authors)),
            Arc::new(StringArray::from(std::mem::take(&mut self.venue))),
            Arc::new(Int32Array::from(std::mem::take(&mut self.year))),
            Arc::new(StringArray::from(std::mem::take(&mut self.doi))),
            Arc::new(StringArray::from(std::mem::take(&mut self.pdf_url))),
            Arc::new(StringArray::from(std::mem::take(&mut self.source_backend))),
            Arc::new(Float64Array::from(std::mem::take(&mut self.match_score))),
            Arc::new(StringArray::from(std::mem::take(&mut self.abstract_text))),
            Arc::new(UInt32Array::from(std::mem::take(&mut self.times_cited))),
            build_list_string_array(std::mem::take(&mut self.keywords)),
            Arc::new(StringArray::from(std::mem::take(&mut self.biblio))),
            Arc::new(UInt64Array::from(std::mem::take(&mut self.byte_length))),
            Arc::new(UInt32Array::from(std::mem::take(&mut self.page_count))),
            Arc::new(BooleanArray::from(std::mem::take(&mut self.partial))),
            build_list_string_array(std::mem::take(&mut self.pages)),
            Arc::new(UInt32Array::from(std::mem::take(&mut self.matching_terms))),
            Arc::new(UInt32Array::from(std::mem::take(&mut self.bycatch_terms))),
            Arc::new(UInt32Array::from(std::mem::take(&mut self.total_words))),
            Arc::new(Float64Array::from(std::mem::take(&mut self.wordscore))),
            build_list_string_array(std::mem::take(&mut self.top_targets)),
            build_list_u32_array(std::mem::take(&mut self.top_target_counts)),
            build_list_string_array(std::mem::take(&mut self.top_bycatch)),
            build_list_u32_array(std::mem::take(&mut self.top_bycatch_counts)),
        ];
        RecordBatch::try_new(self.schema.clone(), arrays).expect("outcomes schema mismatch")
    }
}

fn saturate(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// `(word, count)` pairs as parallel word and count lists
fn split_frequencies(pairs: Vec<(String, usize)>) -> (Vec<String>, Vec<u32>) {
    pairs.into_iter().map(|(w, n)| (w, saturate(n))).unzip()
}

/// Build List<Utf8> array from Vec<Option<Vec<String>>>
fn build_list_string_array(data: Vec<Option<Vec<String>>>) -> ArrayRef {
    let mut builder = ListBuilder::new(StringBuilder::new());
    for row in &data {
        match row {
            Some(items) => {
                for item in items {
                    builder.values().append_value(item);
                }
                builder.append(true);
            }
            None => builder.append(false),
        }
    }
    Arc::new(builder.finish())
}

/// Build List<UInt32> array from Vec<Option<Vec<u32>>>
fn build_list_u32_array(data: Vec<Option<Vec<u32>>>) -> ArrayRef {
    let mut builder = ListBuilder::new(UInt32Builder::new());
    for row in &data {
        match row {
            Some(items) => {
                builder.values().append_slice(items);
                builder.append(true);
            }
            None => builder.append(false),
        }
    }
    Arc::new(builder.finish())
}

/// Write outcomes, in order, to a zstd-compressed parquet file.
///
/// Returns the number of rows written. The file appears atomically.
pub fn write_outcomes(
    path: &Path,
    records: &[OutcomeRecord],
    zstd_level: i32,
) -> std::io::Result<usize> {
    let mut sink = ParquetSink::new(path, schema::outcomes(), zstd_level)?;
    let mut acc = OutcomeAccumulator::new();
    for record in records {
        acc.push(record.clone());
        if acc.is_full() {
            sink.write_batch(&acc.take_batch())?;
        }
    }
    if !acc.is_empty() {
        sink.write_batch(&acc.take_batch())?;
    }
    sink.finalize()
}
