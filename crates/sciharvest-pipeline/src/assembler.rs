//! Record Assembler: stage results → one [`OutcomeRecord`]
//!
//! Pure and deterministic. The first failing stage decides the error; the
//! results of earlier successful stages stay attached.

use crate::error::Failure;
use crate::identifier::Identifier;
use crate::model::{DocumentReceipt, ExtractedText, MetadataRecord, OutcomeRecord, StageReached};

/// `document` / `text` are `None` when the stage was never attempted.
pub fn assemble(
    identifier: &Identifier,
    metadata: Result<MetadataRecord, Failure>,
    document: Option<Result<DocumentReceipt, Failure>>,
    text: Option<Result<ExtractedText, Failure>>,
) -> OutcomeRecord {
    let mut out = OutcomeRecord {
        identifier: identifier.clone(),
        stage_reached: StageReached::Failed,
        error_kind: None,
        error_message: None,
        metadata: None,
        text: None,
        byte_length: None,
        relevance: None,
    };

    let fail = |mut out: OutcomeRecord, failure: Failure| {
        out.stage_reached = StageReached::Failed;
        out.error_kind = Some(failure.kind);
        out.error_message = Some(failure.message);
        out
    };

    match metadata {
        Ok(m) => out.metadata = Some(m),
        Err(f) => return fail(out, f),
    }
    out.stage_reached = StageReached::Resolved;

    match document {
        None => return out,
        Some(Ok(receipt)) => out.byte_length = Some(receipt.byte_length),
        Some(Err(f)) => return fail(out, f),
    }
    out.stage_reached = StageReached::Downloaded;

    match text {
        None => out,
        Some(Ok(t)) => {
            out.text = Some(t);
            out.stage_reached = StageReached::Extracted;
            out
        }
        Some(Err(f)) => fail(out, f),
    }
}
