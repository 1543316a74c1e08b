//! Last-resort pipeline: build the backtest from raw inputs.
//!
//! Reads the sentiment CSV and the raw kline parquet named in the
//! resolver config, clamps scores to the scoring convention, and runs
//! the full engine with time decay. As the final chain step its errors
//! are the ones the caller sees when everything else passed.

use super::{Resolution, ResolveError, SourceStrategy};
use crate::request::ChartRequest;
use sentilab_core::data::{load_price_bars, load_sentiment_csv};
use sentilab_core::{
    BacktestEngine, DecayParams, EngineConfig, SentimentPoint, StrategyParams,
};
use std::path::PathBuf;

pub struct AutoPipeline {
    sentiment_csv: PathBuf,
    price_parquet: PathBuf,
}

impl AutoPipeline {
    pub fn new(sentiment_csv: PathBuf, price_parquet: PathBuf) -> Self {
        Self {
            sentiment_csv,
            price_parquet,
        }
    }
}

impl SourceStrategy for AutoPipeline {
    fn name(&self) -> &'static str {
        "auto-pipeline"
    }

    fn resolve(&self, req: &ChartRequest) -> Result<Resolution, ResolveError> {
        if !self.sentiment_csv.exists() {
            return Err(ResolveError::MissingSource(format!(
                "sentiment csv not found: {}",
                self.sentiment_csv.display()
            )));
        }
        if !self.price_parquet.exists() {
            return Err(ResolveError::Upstream(format!(
                "kline parquet not found: {}",
                self.price_parquet.display()
            )));
        }

        let bars = load_price_bars(&self.price_parquet)?;
        let points: Vec<SentimentPoint> = load_sentiment_csv(&self.sentiment_csv)?
            .into_iter()
            .map(|mut p| {
                p.score = p.score.clamp(-1.0, 1.0);
                p
            })
            .collect();

        let cfg = EngineConfig {
            initial_capital: req.initial_capital,
            decay: Some(DecayParams::default()),
            ..Default::default()
        };
        let report = BacktestEngine::run(&bars, &points, &StrategyParams::default(), &cfg)?;

        Ok(Resolution::Found {
            label: "auto-pipeline",
            resolved_source: self.price_parquet.display().to_string(),
            frame: report.frame,
        })
    }
}
