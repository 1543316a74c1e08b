//! Price data source seam.
//!
//! The engine only needs OHLCV bars; where they come from is behind
//! `PriceSource`. The bundled implementation reads standardized kline
//! parquet files. Exchange-specific errors map onto `SourceError` so
//! callers can distinguish a rate limit from an outage without knowing
//! the upstream.

use crate::data::table::{load_price_bars, TableError};
use crate::domain::PriceBar;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("no bars for {symbol} {timeframe} in the requested range")]
    EmptyRange { symbol: String, timeframe: String },
}

/// Source of OHLCV bars for a symbol and timeframe.
pub trait PriceSource: Send + Sync {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, SourceError>;
}

/// Reads standardized kline parquet files named
/// `{symbol}_{timeframe}.parquet` under a root directory.
pub struct ParquetPriceSource {
    root: PathBuf,
}

impl ParquetPriceSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.root.join(format!("{symbol}_{timeframe}.parquet"))
    }
}

impl PriceSource for ParquetPriceSource {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, SourceError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Err(SourceError::Unavailable(format!(
                "kline file not found: {}",
                path.display()
            )));
        }

        let bars: Vec<PriceBar> = load_price_bars(&path)?
            .into_iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .collect();

        if bars.is_empty() {
            return Err(SourceError::EmptyRange {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            });
        }
        Ok(bars)
    }
}
