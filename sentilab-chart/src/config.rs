//! Resolver configuration, loadable from TOML.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Row count at or above which a slice merge runs as a background job.
pub const DEFAULT_SYNC_ROW_THRESHOLD: usize = 50_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config is not valid toml: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Where the resolver looks for data, and when it goes asynchronous.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Directory of time-partitioned merged price+sentiment slices.
    pub slices_dir: PathBuf,
    /// Directory of precomputed backtest frames.
    pub results_dir: PathBuf,
    /// Fixed demo dataset, the last resort before the auto pipeline.
    pub demo_path: PathBuf,
    /// Sentiment CSV consumed by the auto pipeline.
    pub sentiment_csv: PathBuf,
    /// Raw kline parquet consumed by the auto pipeline.
    pub price_parquet: PathBuf,
    /// Output directory for background job results.
    pub jobs_dir: PathBuf,
    /// Merged row count at which slice merges stop running inline.
    pub sync_row_threshold: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            slices_dir: PathBuf::from("data/slices"),
            results_dir: PathBuf::from("data/results"),
            demo_path: PathBuf::from("data/demo/backtest.parquet"),
            sentiment_csv: PathBuf::from("data/sentiment.csv"),
            price_parquet: PathBuf::from("data/klines.parquet"),
            jobs_dir: PathBuf::from("data/jobs"),
            sync_row_threshold: DEFAULT_SYNC_ROW_THRESHOLD,
        }
    }
}

impl ResolverConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(toml::from_str(&raw)?)
    }
}
