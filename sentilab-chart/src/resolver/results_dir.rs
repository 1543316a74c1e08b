//! Precomputed-results scan strategy.
//!
//! The batch exporter drops finished backtest frames into a results
//! directory. Candidate selection prefers a frame whose coverage
//! contains the requested window, then one from the same month as the
//! window start, then simply the most recently modified file.
//! Unreadable candidates are skipped with a warning.

use super::{parquet_files, Resolution, ResolveError, SourceStrategy};
use crate::request::ChartRequest;
use chrono::{DateTime, Datelike, Utc};
use sentilab_core::data::load_backtest_frame;
use sentilab_core::BacktestFrame;
use std::path::PathBuf;
use std::time::SystemTime;

pub struct ResultsDirScan {
    results_dir: PathBuf,
}

struct Candidate {
    path: PathBuf,
    frame: BacktestFrame,
    modified: SystemTime,
}

impl ResultsDirScan {
    pub fn new(results_dir: PathBuf) -> Self {
        Self { results_dir }
    }

    fn candidates(&self) -> Vec<Candidate> {
        let mut out = Vec::new();
        for path in parquet_files(&self.results_dir) {
            let frame = match load_backtest_frame(&path) {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("skipping unreadable result {}: {e}", path.display());
                    continue;
                }
            };
            let modified = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            out.push(Candidate {
                path,
                frame,
                modified,
            });
        }
        out
    }
}

impl SourceStrategy for ResultsDirScan {
    fn name(&self) -> &'static str {
        "results-scan"
    }

    fn resolve(&self, req: &ChartRequest) -> Result<Resolution, ResolveError> {
        if !self.results_dir.is_dir() {
            return Ok(Resolution::NotApplicable);
        }
        let mut candidates = self.candidates();
        if candidates.is_empty() {
            return Ok(Resolution::NotApplicable);
        }

        // Newest first, so the first tier match wins within each tier.
        candidates.sort_by(|a, b| b.modified.cmp(&a.modified));

        let chosen = candidates
            .iter()
            .position(|c| covers_window(&c.frame, req.start, req.end))
            .or_else(|| {
                req.start.and_then(|start| {
                    candidates
                        .iter()
                        .position(|c| same_month(&c.frame, start))
                })
            })
            .unwrap_or(0);

        let candidate = candidates.swap_remove(chosen);
        Ok(Resolution::Found {
            label: "explicit",
            resolved_source: candidate.path.display().to_string(),
            frame: candidate.frame,
        })
    }
}

fn covers_window(
    frame: &BacktestFrame,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    let (Some(&first), Some(&last)) = (frame.timestamp.first(), frame.timestamp.last()) else {
        return false;
    };
    match (start, end) {
        (None, None) => false,
        (s, e) => {
            s.map_or(true, |s| first <= s) && e.map_or(true, |e| last >= e)
        }
    }
}

fn same_month(frame: &BacktestFrame, start: DateTime<Utc>) -> bool {
    frame
        .timestamp
        .iter()
        .any(|t| t.year() == start.year() && t.month() == start.month())
}
