//! Slice merge strategy.
//!
//! The ingest pipeline writes merged price+sentiment tables in time
//! partitions. This step unions every slice overlapping the requested
//! window and backtests the result: inline when the merge is small,
//! as a background job when it crosses the configured row threshold.

use super::{parquet_files, Resolution, ResolveError, SourceStrategy};
use crate::jobs::JobRegistry;
use crate::request::ChartRequest;
use sentilab_core::data::{load_merged_rows, save_backtest_frame, MergedRow};
use sentilab_core::{
    BacktestEngine, BacktestFrame, EngineConfig, PriceBar, SentimentPoint, StrategyParams,
};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub struct SliceMerge {
    slices_dir: PathBuf,
    jobs_dir: PathBuf,
    sync_row_threshold: usize,
    jobs: JobRegistry,
}

impl SliceMerge {
    pub fn new(
        slices_dir: PathBuf,
        jobs_dir: PathBuf,
        sync_row_threshold: usize,
        jobs: JobRegistry,
    ) -> Self {
        Self {
            slices_dir,
            jobs_dir,
            sync_row_threshold,
            jobs,
        }
    }

    fn overlapping_rows(&self, req: &ChartRequest) -> Vec<MergedRow> {
        let mut merged: Vec<MergedRow> = Vec::new();
        for path in parquet_files(&self.slices_dir) {
            let rows = match load_merged_rows(&path, &req.price_column) {
                Ok(rows) => rows,
                Err(e) => {
                    log::warn!("skipping unreadable slice {}: {e}", path.display());
                    continue;
                }
            };
            // Loader guarantees non-empty and sorted.
            let first = rows[0].timestamp;
            let last = rows[rows.len() - 1].timestamp;
            if overlaps(first, last, req.start, req.end) {
                merged.extend(rows);
            }
        }
        merged.sort_by_key(|r| r.timestamp);
        merged.dedup_by(|a, b| a.timestamp == b.timestamp);
        merged
    }
}

impl SourceStrategy for SliceMerge {
    fn name(&self) -> &'static str {
        "slice-merge"
    }

    fn resolve(&self, req: &ChartRequest) -> Result<Resolution, ResolveError> {
        if !self.slices_dir.is_dir() {
            return Ok(Resolution::NotApplicable);
        }
        let rows = self.overlapping_rows(req);
        if rows.is_empty() {
            return Ok(Resolution::NotApplicable);
        }

        if rows.len() < self.sync_row_threshold {
            let frame = backtest_rows(&rows, req.initial_capital)?;
            return Ok(Resolution::Found {
                label: "merged-sync",
                resolved_source: self.slices_dir.display().to_string(),
                frame,
            });
        }

        // Too big to hold up the request: compute off-thread into a
        // file owned by the job id.
        let capital = req.initial_capital;
        let jobs_dir = self.jobs_dir.clone();
        let id = self
            .jobs
            .enqueue_with(|id| jobs_dir.join(format!("{id}.parquet")));
        let output = self.jobs_dir.join(format!("{id}.parquet"));
        let job_output = output.clone();
        self.jobs.run_detached(id.clone(), move || {
            let frame = backtest_rows(&rows, capital)?;
            save_backtest_frame(&frame, &job_output)?;
            Ok::<(), ResolveError>(())
        });

        Ok(Resolution::Queued {
            job_id: id,
            output_location: output,
        })
    }
}

/// Inclusive interval overlap; an unbounded request side always overlaps.
fn overlaps(
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    start.map_or(true, |s| last >= s) && end.map_or(true, |e| first <= e)
}

/// Backtest pre-merged rows with the default strategy tuning.
///
/// Merged rows carry one sentiment value per bar, so alignment reduces
/// to a same-timestamp match.
pub(crate) fn backtest_rows(
    rows: &[MergedRow],
    initial_capital: f64,
) -> Result<BacktestFrame, ResolveError> {
    let prices: Vec<PriceBar> = rows
        .iter()
        .map(|r| PriceBar {
            timestamp: r.timestamp,
            open: r.price,
            high: r.price,
            low: r.price,
            close: r.price,
            volume: 0.0,
        })
        .collect();
    let sentiment: Vec<SentimentPoint> = rows
        .iter()
        .map(|r| SentimentPoint::new(r.timestamp, r.sentiment))
        .collect();

    let cfg = EngineConfig {
        initial_capital,
        ..Default::default()
    };
    let report = BacktestEngine::run(&prices, &sentiment, &StrategyParams::default(), &cfg)?;
    Ok(report.frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn overlap_is_inclusive() {
        assert!(overlaps(ts(1), ts(15), Some(ts(15)), Some(ts(20))));
        assert!(overlaps(ts(16), ts(31), Some(ts(10)), Some(ts(16))));
        assert!(!overlaps(ts(1), ts(9), Some(ts(10)), Some(ts(20))));
    }

    #[test]
    fn unbounded_sides_always_overlap() {
        assert!(overlaps(ts(1), ts(2), None, None));
        assert!(overlaps(ts(1), ts(2), Some(ts(2)), None));
        assert!(overlaps(ts(5), ts(9), None, Some(ts(5))));
    }

    #[test]
    fn backtest_rows_produces_parallel_frame() {
        let rows: Vec<MergedRow> = (1..=5)
            .map(|d| MergedRow {
                timestamp: ts(d),
                price: 100.0 + d as f64,
                sentiment: 0.3,
            })
            .collect();
        let frame = backtest_rows(&rows, 100_000.0).unwrap();
        assert_eq!(frame.len(), 5);
        assert_eq!(frame.equity[0], 1.0);
    }
}
