//! Run statistics and the end-of-run summary table

use std::collections::BTreeMap;
use std::time::Duration;

use comfy_table::{Attribute, Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use sciharvest_core::fmt_num;

use crate::error::ErrorKind;
use crate::model::{OutcomeRecord, StageReached};

/// Counts per terminal stage and per error kind
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub by_stage: BTreeMap<StageReached, usize>,
    pub by_error: BTreeMap<ErrorKind, usize>,
    /// Items never handed to a worker
    pub undispatched: usize,
    /// Cancellation (signal or deadline) was observed during the run
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn from_records(records: &[OutcomeRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Default::default()
        };
        for r in records {
            *summary.by_stage.entry(r.stage_reached).or_default() += 1;
            if let Some(kind) = r.error_kind {
                *summary.by_error.entry(kind).or_default() += 1;
            }
        }
        summary
    }

    pub fn stage_count(&self, stage: StageReached) -> usize {
        self.by_stage.get(&stage).copied().unwrap_or(0)
    }

    pub fn error_count(&self, kind: ErrorKind) -> usize {
        self.by_error.get(&kind).copied().unwrap_or(0)
    }

    pub fn succeeded(&self) -> usize {
        self.total - self.stage_count(StageReached::Failed)
    }

    /// Format summary table as a string.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Harvest")
                    .fg(Color::Cyan)
                    .add_attribute(Attribute::Bold),
                Cell::new("Items").fg(Color::Cyan),
                Cell::new("%").fg(Color::Cyan),
            ]);

        table.add_row(vec![
            Cell::new("Input"),
            Cell::new(fmt_num(self.total)),
            Cell::new(""),
        ]);
        for stage in StageReached::ALL {
            let n = self.stage_count(stage);
            let color = match stage {
                StageReached::Failed if n > 0 => Color::Red,
                StageReached::Extracted => Color::Green,
                _ => Color::Reset,
            };
            table.add_row(vec![
                Cell::new(stage.as_str()).fg(color),
                Cell::new(fmt_num(n)).fg(color),
                Cell::new(format!("{:.1}", pct(n, self.total))).fg(color),
            ]);
        }
        for (kind, n) in &self.by_error {
            table.add_row(vec![
                Cell::new(format!("  {kind}")).fg(Color::DarkGrey),
                Cell::new(fmt_num(*n)).fg(Color::DarkGrey),
                Cell::new(format!("{:.1}", pct(*n, self.total))).fg(Color::DarkGrey),
            ]);
        }
        table.add_row(vec![
            Cell::new("Time"),
            Cell::new(format!("{:.1}s", self.elapsed.as_secs_f64())),
            Cell::new(""),
        ]);

        format!("\n{table}")
    }

    /// Log minimal summary (non-TTY mode).
    pub fn log(&self) {
        log::info!(
            "Harvest complete: {}/{} items succeeded ({} extracted) in {:.1}s",
            fmt_num(self.succeeded()),
            fmt_num(self.total),
            fmt_num(self.stage_count(StageReached::Extracted)),
            self.elapsed.as_secs_f64()
        );
        for (kind, n) in &self.by_error {
            log::info!("  {kind}: {}", fmt_num(*n));
        }
        if self.cancelled {
            log::warn!(
                "Run was cancelled; {} items never dispatched",
                fmt_num(self.undispatched)
            );
        }
    }
}

fn pct(n: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        n as f64 / total as f64 * 100.0
    }
}
