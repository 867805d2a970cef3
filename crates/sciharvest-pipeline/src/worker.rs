//! One item through resolve → retrieve → extract → assemble

use sciharvest_core::CancelToken;

use crate::assembler::assemble;
use crate::config::StopAfter;
use crate::error::Failure;
use crate::extractor::Extractor;
use crate::identifier::Identifier;
use crate::lifecycle::ItemState;
use crate::model::OutcomeRecord;
use crate::relevance::RelevanceScorer;
use crate::resolver::Resolver;
use crate::retriever::Retriever;

/// Stage instances shared by every worker
#[derive(Debug)]
pub struct Stages {
    pub resolver: Resolver,
    pub retriever: Retriever,
    pub extractor: Extractor,
    pub stop_after: StopAfter,
    pub relevance: Option<RelevanceScorer>,
}

fn enter(state: &mut ItemState, next: ItemState, identifier: &Identifier) {
    if let Err(e) = state.advance(next) {
        if cfg!(debug_assertions) {
            panic!("{identifier}: {e}");
        }
        log::error!("{identifier}: {e}");
    }
}

fn abandon(identifier: &Identifier, state: ItemState) -> OutcomeRecord {
    log::debug!("{identifier}: abandoned after {state:?}");
    OutcomeRecord::cancelled(identifier)
}

/// Drive one identifier to its terminal outcome. Never fails: every stage
/// error ends up in the returned record.
///
/// An aborted token is honoured at stage boundaries; the item then reports
/// CANCELLED without any partial results.
pub fn process_item(stages: &Stages, identifier: &Identifier, token: &CancelToken) -> OutcomeRecord {
    let mut state = ItemState::Pending;
    let outcome = run_stages(stages, identifier, token, &mut state);
    enter(&mut state, ItemState::Done, identifier);

    match (&outcome.error_kind, &outcome.error_message) {
        (Some(kind), Some(msg)) => log::debug!("{identifier}: {kind}: {msg}"),
        _ => log::debug!("{identifier}: {}", outcome.stage_reached),
    }
    outcome
}

fn run_stages(
    stages: &Stages,
    identifier: &Identifier,
    token: &CancelToken,
    state: &mut ItemState,
) -> OutcomeRecord {
    if token.is_aborted() {
        return abandon(identifier, *state);
    }
    enter(state, ItemState::Resolving, identifier);
    let metadata = stages.resolver.resolve(identifier).map_err(Failure::from);
    let record = match metadata {
        Ok(record) if stages.stop_after != StopAfter::Resolve => record,
        other => return with_relevance(stages, assemble(identifier, other, None, None)),
    };

    if token.is_aborted() {
        return abandon(identifier, *state);
    }
    enter(state, ItemState::Downloading, identifier);
    let document = match stages.retriever.retrieve(&record) {
        Ok(doc) => doc,
        Err(e) => {
            let outcome = assemble(identifier, Ok(record), Some(Err(e.into())), None);
            return with_relevance(stages, outcome);
        }
    };
    let receipt = document.receipt();
    if stages.stop_after == StopAfter::Download {
        drop(document);
        return with_relevance(stages, assemble(identifier, Ok(record), Some(Ok(receipt)), None));
    }

    if token.is_aborted() {
        return abandon(identifier, *state);
    }
    enter(state, ItemState::Extracting, identifier);
    let text = stages.extractor.extract(document).map_err(Failure::from);
    with_relevance(
        stages,
        assemble(identifier, Ok(record), Some(Ok(receipt)), Some(text)),
    )
}

/// Score the extracted text, or the abstract when no text was extracted
fn with_relevance(stages: &Stages, mut outcome: OutcomeRecord) -> OutcomeRecord {
    let Some(scorer) = &stages.relevance else {
        return outcome;
    };
    if let Some(text) = &outcome.text {
        outcome.relevance = Some(scorer.score(text.pages.iter().map(String::as_str)));
    } else if let Some(abstract_text) = outcome
        .metadata
        .as_ref()
        .and_then(|m| m.abstract_text.as_deref())
    {
        outcome.relevance = Some(scorer.score([abstract_text]));
    }
    outcome
}
