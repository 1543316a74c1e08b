//! Chart data resolution.
//!
//! An ordered chain of source strategies, each answering one question:
//! can I produce a backtest frame for this request? The chain is tried
//! in a fixed order:
//!
//! 1. Explicit file named in the request
//! 2. Merge of time-partitioned slices (inline or background)
//! 3. Scan of precomputed result frames
//! 4. Fixed demo dataset
//! 5. Full pipeline from raw sentiment + klines
//!
//! A step that fails logs a warning and yields to the next; only full
//! exhaustion of the chain surfaces an error to the caller.

mod pipeline;
mod results_dir;
mod slices;

pub use pipeline::AutoPipeline;
pub use results_dir::ResultsDirScan;
pub use slices::SliceMerge;

use crate::config::ResolverConfig;
use crate::jobs::{JobId, JobRegistry};
use crate::record::{build_points, render_records};
use crate::request::{ChartRequest, ChartResponse};
use crate::shape::{adaptive_budget, downsample, effective_span, filter_window, rebase};
use sentilab_core::data::{SentimentCsvError, TableError};
use sentilab_core::engine::EngineError;
use sentilab_core::BacktestFrame;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no chart data source available: {0}")]
    MissingSource(String),

    #[error("upstream unavailable: {0}")]
    Upstream(String),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    SentimentCsv(#[from] SentimentCsvError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// What one chain step produced.
pub enum Resolution {
    /// A frame, ready to shape.
    Found {
        label: &'static str,
        resolved_source: String,
        frame: BacktestFrame,
    },
    /// Work went to a background job; the caller polls.
    Queued {
        job_id: JobId,
        output_location: PathBuf,
    },
    /// This step has nothing for this request.
    NotApplicable,
}

/// One step of the source chain.
pub trait SourceStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, req: &ChartRequest) -> Result<Resolution, ResolveError>;
}

/// Loads the file the request named, when it named one.
struct ExplicitSource;

impl SourceStrategy for ExplicitSource {
    fn name(&self) -> &'static str {
        "explicit"
    }

    fn resolve(&self, req: &ChartRequest) -> Result<Resolution, ResolveError> {
        let Some(path) = &req.source else {
            return Ok(Resolution::NotApplicable);
        };
        let frame = sentilab_core::data::load_backtest_frame(path)?;
        Ok(Resolution::Found {
            label: "explicit",
            resolved_source: path.display().to_string(),
            frame,
        })
    }
}

/// The resolver: a configured chain plus the shared job registry.
pub struct ChartResolver {
    strategies: Vec<Box<dyn SourceStrategy>>,
    jobs: JobRegistry,
}

impl ChartResolver {
    pub fn new(config: ResolverConfig) -> Self {
        let jobs = JobRegistry::new();
        let strategies: Vec<Box<dyn SourceStrategy>> = vec![
            Box::new(ExplicitSource),
            Box::new(SliceMerge::new(
                config.slices_dir.clone(),
                config.jobs_dir.clone(),
                config.sync_row_threshold,
                jobs.clone(),
            )),
            Box::new(ResultsDirScan::new(config.results_dir.clone())),
            Box::new(DemoDataset::new(config.demo_path.clone())),
            Box::new(AutoPipeline::new(
                config.sentiment_csv.clone(),
                config.price_parquet.clone(),
            )),
        ];
        Self { strategies, jobs }
    }

    /// Registry for polling queued jobs.
    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    /// Walk the chain, then shape whatever it found.
    pub fn resolve(&self, req: &ChartRequest) -> Result<ChartResponse, ResolveError> {
        req.validate()?;

        let mut last_err: Option<ResolveError> = None;
        for strategy in &self.strategies {
            match strategy.resolve(req) {
                Ok(Resolution::Found {
                    label,
                    resolved_source,
                    frame,
                }) => {
                    log::info!("chart source resolved by {}: {resolved_source}", strategy.name());
                    return Ok(self.shape(req, label, resolved_source, &frame));
                }
                Ok(Resolution::Queued {
                    job_id,
                    output_location,
                }) => {
                    return Ok(ChartResponse::Queued {
                        status: "queued",
                        job_id: job_id.to_string(),
                        output_location: output_location.display().to_string(),
                    });
                }
                Ok(Resolution::NotApplicable) => continue,
                Err(e) => {
                    log::warn!("chart source {} failed, trying next: {e}", strategy.name());
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ResolveError::MissingSource("every chart data source was exhausted".into())
        }))
    }

    fn shape(
        &self,
        req: &ChartRequest,
        label: &'static str,
        resolved_source: String,
        frame: &BacktestFrame,
    ) -> ChartResponse {
        let points = build_points(frame, req.initial_capital);
        let span = effective_span(&points, req.start, req.end);
        let points = filter_window(points, req.start, req.end);

        let budget = req.points.unwrap_or_else(|| adaptive_budget(span));
        let mut points = downsample(points, budget);

        if let Some(start) = req.start {
            rebase(&mut points, start, req.initial_capital);
        }

        ChartResponse::Records {
            source: label,
            resolved_source,
            records: render_records(&points, &req.time_format),
        }
    }
}

/// Serves the fixed demo dataset when it exists on disk.
pub struct DemoDataset {
    path: PathBuf,
}

impl DemoDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceStrategy for DemoDataset {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn resolve(&self, _req: &ChartRequest) -> Result<Resolution, ResolveError> {
        if !self.path.exists() {
            return Ok(Resolution::NotApplicable);
        }
        let frame = sentilab_core::data::load_backtest_frame(&self.path)?;
        Ok(Resolution::Found {
            label: "demo",
            resolved_source: self.path.display().to_string(),
            frame,
        })
    }
}

pub(crate) fn parquet_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("parquet"))
        .collect();
    files.sort();
    files
}
