//! Pipeline orchestration: fan a batch of identifiers out over a bounded
//! worker pool and collect exactly one outcome per input position.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use anyhow::Context;
use sciharvest_core::{
    CancelToken, Fetcher, NoProgress, ProgressSink, RateLimiter, ReqwestTransport, Transport,
    WorkQueue,
};

use crate::config::PipelineConfig;
use crate::error::ErrorKind;
use crate::extractor::Extractor;
use crate::identifier::Identifier;
use crate::model::OutcomeRecord;
use crate::relevance::RelevanceScorer;
use crate::resolver::Resolver;
use crate::retriever::Retriever;
use crate::stats::RunSummary;
use crate::worker::{Stages, process_item};

/// Ordered outcomes plus run statistics
#[derive(Debug)]
pub struct HarvestReport {
    /// One record per input, in input order
    pub records: Vec<OutcomeRecord>,
    pub summary: RunSummary,
}

/// A configured pipeline, reusable across batches.
#[derive(Debug)]
pub struct Harvester {
    config: PipelineConfig,
    stages: Stages,
    io_pool: rayon::ThreadPool,
}

impl Harvester {
    /// Validate `config` and build every stage on top of `transport`.
    ///
    /// This is the only fallible step; once built, runs never fail.
    pub fn new(config: PipelineConfig, transport: Arc<dyn Transport>) -> anyhow::Result<Self> {
        config.validate()?;

        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.max_requests_per_window,
            config.window(),
            config.max_queue_wait(),
        ));
        let fetcher = Arc::new(Fetcher::new(transport, limiter, config.retry_policy()));

        let io_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_concurrency)
            .thread_name(|i| format!("harvest-{i}"))
            .build()
            .context("Failed to build worker pool")?;

        let stages = Stages {
            resolver: Resolver::new(fetcher.clone(), &config),
            retriever: Retriever::new(fetcher, &config),
            extractor: Extractor::new(&config)?,
            stop_after: config.stop_after,
            relevance: RelevanceScorer::from_config(&config.relevance),
        };

        Ok(Self {
            config,
            stages,
            io_pool,
        })
    }

    /// Build with the reqwest transport
    pub fn with_http(config: PipelineConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(&config.http.user_agent, config.request_timeout())
            .context("Failed to build HTTP client")?;
        Self::new(config, Arc::new(transport))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every identifier; returns once each has an outcome.
    ///
    /// `token` stops dispatch (cancel) or abandons in-flight work at the next
    /// stage boundary (abort). Items left behind report CANCELLED.
    pub fn run(
        &self,
        identifiers: &[Identifier],
        token: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> HarvestReport {
        let start = Instant::now();
        let token = match self.config.deadline() {
            Some(d) => token.clone().with_deadline(start + d),
            None => token.clone(),
        };
        let total = identifiers.len();
        let workers = self.config.worker_concurrency.min(total).max(1);
        log::info!(
            "Harvesting {} identifiers with {} workers ({} req / {:.1}s)",
            total,
            workers,
            self.config.rate_limit.max_requests_per_window,
            self.config.rate_limit.window_seconds
        );

        let queue = WorkQueue::new(identifiers.to_vec());
        let slots: Mutex<Vec<Option<OutcomeRecord>>> = Mutex::new(vec![None; total]);
        let completed = AtomicUsize::new(0);

        self.io_pool.scope(|s| {
            for _ in 0..workers {
                s.spawn(|_| {
                    loop {
                        if token.is_cancelled() {
                            break;
                        }
                        let Some((idx, identifier)) = queue.next() else {
                            break;
                        };
                        let outcome = process_item(&self.stages, identifier, &token);
                        slots.lock().unwrap_or_else(PoisonError::into_inner)[idx] = Some(outcome);
                        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        progress.on_progress(done, total);
                    }
                });
            }
        });

        let undispatched = total - queue.dispatched();
        let records: Vec<OutcomeRecord> = slots
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .zip(identifiers)
            .map(|(slot, identifier)| slot.unwrap_or_else(|| OutcomeRecord::cancelled(identifier)))
            .collect();
        if undispatched > 0 {
            progress.on_progress(total, total);
        }

        let mut summary = RunSummary::from_records(&records);
        summary.undispatched = undispatched;
        summary.cancelled = undispatched > 0 || summary.error_count(ErrorKind::Cancelled) > 0;
        summary.elapsed = start.elapsed();
        summary.log();

        HarvestReport { records, summary }
    }
}

/// One-shot convenience: build a [`Harvester`] over HTTP and run it.
pub fn run(
    identifiers: &[Identifier],
    config: PipelineConfig,
    token: &CancelToken,
) -> anyhow::Result<HarvestReport> {
    let harvester = Harvester::with_http(config)?;
    Ok(harvester.run(identifiers, token, &NoProgress))
}
