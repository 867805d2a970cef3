//! Arrow schema for the harvest output
//!
//! One row per input position. Metadata and text columns are null when the
//! item failed before producing them.

use std::sync::{Arc, LazyLock};

use arrow::datatypes::{DataType, Field, Schema};

fn list_of(name: &str, item: DataType) -> Field {
    Field::new(name, DataType::List(Arc::new(Field::new("item", item, true))), true)
}

fn list_utf8(name: &str) -> Field {
    list_of(name, DataType::Utf8)
}

/// outcomes.parquet
pub fn outcomes() -> &'static Arc<Schema> {
    static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
        Arc::new(Schema::new(vec![
            // Outcome
            Field::new("identifier", DataType::Utf8, false),
            Field::new("stage_reached", DataType::Utf8, false), // RESOLVED, DOWNLOADED, EXTRACTED, FAILED
            Field::new("error_kind", DataType::Utf8, true),
            Field::new("error_message", DataType::Utf8, true),
            // Metadata
            Field::new("title", DataType::Utf8, true),
            list_utf8("authors"),
            Field::new("venue", DataType::Utf8, true),
            Field::new("year", DataType::Int32, true),
            Field::new("doi", DataType::Utf8, true),
            Field::new("pdf_url", DataType::Utf8, true),
            Field::new("source_backend", DataType::Utf8, true),
            Field::new("match_score", DataType::Float64, true),
            Field::new("abstract", DataType::Utf8, true),
            Field::new("times_cited", DataType::UInt32, true),
            list_utf8("keywords"),
            Field::new("biblio", DataType::Utf8, true),
            // Download
            Field::new("byte_length", DataType::UInt64, true),
            // Text
            Field::new("page_count", DataType::UInt32, true),
            Field::new("partial", DataType::Boolean, true),
            list_utf8("pages"),
            // Relevance
            Field::new("matching_terms", DataType::UInt32, true),
            Field::new("bycatch_terms", DataType::UInt32, true),
            Field::new("total_words", DataType::UInt32, true),
            Field::new("wordscore", DataType::Float64, true),
            // Most frequent words, counts at the same list positions
            list_utf8("top_targets"),
            list_of("top_target_counts", DataType::UInt32),
            list_utf8("top_bycatch"),
            list_of("top_bycatch_counts", DataType::UInt32),
        ]))
    });
    &SCHEMA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_columns() {
        let schema = outcomes();
        assert_eq!(schema.fields().len(), 28);
        assert!(!schema.field_with_name("identifier").unwrap().is_nullable());
        assert!(schema.field_with_name("error_kind").unwrap().is_nullable());
        assert!(matches!(
            schema.field_with_name("pages").unwrap().data_type(),
            DataType::List(_)
        ));
    }

    #[test]
    fn frequency_counts_are_unsigned_lists() {
        let schema = outcomes();
        let field = schema.field_with_name("top_target_counts").unwrap();
        let DataType::List(item) = field.data_type() else {
            panic!("top_target_counts is not a list");
        };
        assert_eq!(item.data_type(), &DataType::UInt32);
        assert!(schema.field_with_name("biblio").unwrap().is_nullable());
    }
}
