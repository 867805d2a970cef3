//! sciharvest pipeline - bulk metadata and full-text harvesting
//!
//! Turns a list of paper identifiers (DOIs, titles, free-text queries, direct
//! PDF URLs) into one [`OutcomeRecord`] per input: resolved metadata, the
//! downloaded PDF's size, and its page texts, or the reason the item failed.
//!
//! # Example
//!
//! ```no_run
//! use sciharvest_core::CancelToken;
//! use sciharvest_pipeline::{Identifier, PipelineConfig, run};
//!
//! let ids: Vec<Identifier> = ["10.1038/nature12373", "nudge units in government"]
//!     .into_iter()
//!     .map(Identifier::from)
//!     .collect();
//!
//! let report = run(&ids, PipelineConfig::default(), &CancelToken::new()).expect("invalid config");
//! println!("{} extracted", report.summary.succeeded());
//! ```

pub mod abstract_decode;
pub mod assembler;
pub mod config;
pub mod error;
pub mod extractor;
pub mod identifier;
pub mod lifecycle;
pub mod manifest;
pub mod model;
pub mod relevance;
pub mod resolver;
pub mod retriever;
pub mod runner;
pub mod schema;
pub mod stats;
pub mod transform;
pub mod worker;

// Re-exports for convenience
pub use config::{PipelineConfig, StopAfter};
pub use error::{ErrorKind, Failure};
pub use identifier::{Identifier, IdentifierKind};
pub use manifest::RunManifest;
pub use model::{ExtractedText, MetadataRecord, OutcomeRecord, StageReached};
pub use relevance::{RelevanceConfig, RelevanceScore};
pub use runner::{HarvestReport, Harvester, run};
pub use stats::RunSummary;
pub use transform::write_outcomes;
