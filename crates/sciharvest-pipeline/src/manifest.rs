//! Run manifest: how a harvest was produced and what happened to each item

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{PipelineConfig, StopAfter};
use crate::error::ErrorKind;
use crate::identifier::Identifier;
use crate::model::StageReached;
use crate::resolver::BackendKind;
use crate::runner::HarvestReport;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Blake3 hash of the identifier list, order-sensitive.
pub fn input_hash(identifiers: &[Identifier]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for id in identifiers {
        hasher.update(id.as_str().as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize()
}

/// Outcome-affecting settings. Credentials are never recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub stop_after: StopAfter,
    pub worker_concurrency: usize,
    pub backends: Vec<BackendKind>,
    pub confidence_threshold: f64,
    pub max_pdf_bytes: u64,
    pub max_requests_per_window: usize,
    pub window_seconds: f64,
    pub retry_ceiling: u32,
}

impl From<&PipelineConfig> for RunSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            stop_after: config.stop_after,
            worker_concurrency: config.worker_concurrency,
            backends: config.resolver.backends.clone(),
            confidence_threshold: config.resolver.confidence_threshold,
            max_pdf_bytes: config.download.max_pdf_bytes,
            max_requests_per_window: config.rate_limit.max_requests_per_window,
            window_seconds: config.rate_limit.window_seconds,
            retry_ceiling: config.retry.retry_ceiling,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestItem {
    pub index: usize,
    pub identifier: Identifier,
    pub stage_reached: StageReached,
    pub error_kind: Option<ErrorKind>,
}

/// Written next to `outcomes.parquet`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Blake3 of the identifier list (full hex)
    pub input_hash: String,
    pub settings: RunSettings,
    pub total: usize,
    pub cancelled: bool,
    pub elapsed_seconds: f64,
    pub by_stage: BTreeMap<StageReached, usize>,
    pub by_error: BTreeMap<ErrorKind, usize>,
    pub items: Vec<ManifestItem>,
}

impl RunManifest {
    pub fn new(identifiers: &[Identifier], config: &PipelineConfig, report: &HarvestReport) -> Self {
        let items = report
            .records
            .iter()
            .enumerate()
            .map(|(index, r)| ManifestItem {
                index,
                identifier: r.identifier.clone(),
                stage_reached: r.stage_reached,
                error_kind: r.error_kind,
            })
            .collect();
        Self {
            created_at: chrono::Utc::now(),
            input_hash: input_hash(identifiers).to_hex().to_string(),
            settings: RunSettings::from(config),
            total: report.summary.total,
            cancelled: report.summary.cancelled,
            elapsed_seconds: report.summary.elapsed.as_secs_f64(),
            by_stage: report.summary.by_stage.clone(),
            by_error: report.summary.by_error.clone(),
            items,
        }
    }

    /// Write manifest to dir/manifest.json
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).context("failed to serialize manifest")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Read manifest from dir/manifest.json
    pub fn read_from(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("failed to parse {MANIFEST_FILE}"))
    }
}
