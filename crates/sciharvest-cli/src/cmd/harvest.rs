//! Harvest subcommand - resolve, download and extract a list of identifiers

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use sciharvest_core::{CancelToken, SharedProgress, cleanup_tmp_files};
use sciharvest_pipeline::resolver::BackendKind;
use sciharvest_pipeline::{Harvester, PipelineConfig, RunManifest, StopAfter, write_outcomes};

use crate::config::Config;
use crate::{input, signal};

pub const OUTCOMES_FILE: &str = "outcomes.parquet";

#[derive(Args, Debug)]
pub struct HarvestArgs {
    /// Identifier list: one per line, `.csv` (first column), or `-` for stdin
    pub input: PathBuf,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Items processed concurrently
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Last stage to run
    #[arg(long, value_enum)]
    pub stop_after: Option<StopAfterArg>,

    /// Stop dispatching after this many seconds
    #[arg(long)]
    pub deadline: Option<f64>,

    /// Resolver backends in query order (comma-separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub backends: Option<Vec<BackendArg>>,

    /// Refuse PDFs larger than this many MiB
    #[arg(long)]
    pub max_pdf_mb: Option<u64>,

    /// Relevance target words, one per line
    #[arg(long)]
    pub target_words: Option<PathBuf>,

    /// Relevance bycatch words, one per line
    #[arg(long)]
    pub bycatch_words: Option<PathBuf>,

    /// Zstd compression level (1-22)
    #[arg(short, long)]
    pub zstd_level: Option<i32>,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum StopAfterArg {
    Resolve,
    Download,
    Extract,
}

impl From<StopAfterArg> for StopAfter {
    fn from(s: StopAfterArg) -> Self {
        match s {
            StopAfterArg::Resolve => StopAfter::Resolve,
            StopAfterArg::Download => StopAfter::Download,
            StopAfterArg::Extract => StopAfter::Extract,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum BackendArg {
    Crossref,
    SemanticScholar,
    Openalex,
}

impl From<BackendArg> for BackendKind {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Crossref => BackendKind::Crossref,
            BackendArg::SemanticScholar => BackendKind::SemanticScholar,
            BackendArg::Openalex => BackendKind::OpenAlex,
        }
    }
}

/// Apply command-line overrides on top of the file configuration
fn pipeline_config(args: &HarvestArgs, config: &Config) -> Result<PipelineConfig> {
    let mut pipeline = config.pipeline.clone();
    if let Some(workers) = args.workers {
        pipeline.worker_concurrency = workers;
    }
    if let Some(stop_after) = args.stop_after {
        pipeline.stop_after = stop_after.into();
    }
    if let Some(deadline) = args.deadline {
        pipeline.deadline_seconds = Some(deadline);
    }
    if let Some(backends) = &args.backends {
        pipeline.resolver.backends = backends.iter().copied().map(BackendKind::from).collect();
    }
    if let Some(mb) = args.max_pdf_mb {
        pipeline.download.max_pdf_bytes = mb.saturating_mul(1024 * 1024);
    }
    if let Some(path) = &args.target_words {
        pipeline.relevance.target_words = read_word_list(path)?;
    }
    if let Some(path) = &args.bycatch_words {
        pipeline.relevance.bycatch_words = read_word_list(path)?;
    }
    pipeline.validate().context("Invalid configuration")?;
    Ok(pipeline)
}

fn read_word_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read word list: {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|w| !w.is_empty() && !w.starts_with('#'))
        .map(str::to_string)
        .collect())
}

pub fn run(args: HarvestArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let pipeline = pipeline_config(&args, config)?;
    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| config.output.default_dir.clone());
    let zstd_level = args.zstd_level.unwrap_or(config.output.compression_level);

    let identifiers = input::load(&args.input)?;
    if identifiers.is_empty() {
        log::warn!("No identifiers in {}", args.input.display());
    }

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output dir: {}", output_dir.display()))?;
    cleanup_tmp_files(&output_dir)
        .with_context(|| format!("Failed to clean {}", output_dir.display()))?;

    log::info!("Harvesting {} identifiers", identifiers.len());
    log::info!("  Output: {}", output_dir.display());
    log::info!("  Stop after: {:?}", pipeline.stop_after);

    let token = CancelToken::new();
    signal::install(&token)?;

    let harvester = Harvester::with_http(pipeline)?;
    let bar = progress.batch_bar("harvest", identifiers.len());
    let report = harvester.run(&identifiers, &token, &bar);
    bar.finish();

    let outcomes_path = output_dir.join(OUTCOMES_FILE);
    let rows = write_outcomes(&outcomes_path, &report.records, zstd_level)
        .with_context(|| format!("Failed to write {}", outcomes_path.display()))?;
    RunManifest::new(&identifiers, harvester.config(), &report).write_to(&output_dir)?;
    log::info!("Wrote {rows} rows to {}", outcomes_path.display());

    if progress.is_tty() {
        eprintln!("{}", report.summary.format_table());
    }

    if report.summary.cancelled {
        log::warn!("Harvest cancelled; unfinished items recorded as CANCELLED");
        return Ok(ExitCode::from(130));
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: &str) -> HarvestArgs {
        HarvestArgs {
            input: PathBuf::from(input),
            output: None,
            workers: None,
            stop_after: None,
            deadline: None,
            backends: None,
            max_pdf_mb: None,
            target_words: None,
            bycatch_words: None,
            zstd_level: None,
        }
    }

    #[test]
    fn flags_override_file_config() {
        let mut a = args("ids.txt");
        a.workers = Some(2);
        a.stop_after = Some(StopAfterArg::Resolve);
        a.backends = Some(vec![BackendArg::Openalex]);
        a.max_pdf_mb = Some(5);
        let p = pipeline_config(&a, &Config::default()).unwrap();
        assert_eq!(p.worker_concurrency, 2);
        assert_eq!(p.stop_after, StopAfter::Resolve);
        assert_eq!(p.resolver.backends, vec![BackendKind::OpenAlex]);
        assert_eq!(p.download.max_pdf_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn invalid_override_rejected() {
        let mut a = args("ids.txt");
        a.workers = Some(0);
        assert!(pipeline_config(&a, &Config::default()).is_err());
    }

    #[test]
    fn word_lists_loaded_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets.txt");
        std::fs::write(&path, "nudge\n\n# comment\n  default \n").unwrap();
        let mut a = args("ids.txt");
        a.target_words = Some(path);
        let p = pipeline_config(&a, &Config::default()).unwrap();
        assert_eq!(p.relevance.target_words, ["nudge", "default"]);
        assert!(p.relevance.bycatch_words.is_empty());
    }
}
