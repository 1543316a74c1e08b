//! Sentilab Core — sentiment-driven backtest engine.
//!
//! This crate contains the heart of the system:
//! - Domain types (price bars, sentiment points, strategy params, trades)
//! - Backward time-series alignment with optional exponential decay
//! - Sentiment signal generation (rolling trend + momentum blend)
//! - Position smoothing (first-order IIR) and drawdown risk control
//! - Backtest engine composing the above into equity, trades, and stats
//! - Columnar table I/O for UTC-timestamp-indexed parquet artifacts
//! - External collaborator seams (price source, sentiment scorer + cache)

pub mod align;
pub mod data;
pub mod domain;
pub mod engine;
pub mod provider;
pub mod risk;
pub mod scorer;
pub mod signal;
pub mod smooth;
pub mod stats;

pub use align::{align_price_and_sentiment, AlignError, AlignedRow, DecayParams};
pub use domain::{PriceBar, SentimentPoint, StrategyParams, TradeDirection, TradeRecord};
pub use engine::{BacktestEngine, BacktestFrame, BacktestReport, EngineConfig, EngineError};
pub use stats::BacktestStats;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the types that cross the background-job thread
    /// boundary are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<PriceBar>();
        require_sync::<PriceBar>();
        require_send::<SentimentPoint>();
        require_sync::<SentimentPoint>();
        require_send::<StrategyParams>();
        require_sync::<StrategyParams>();
        require_send::<TradeRecord>();
        require_sync::<TradeRecord>();
        require_send::<BacktestFrame>();
        require_sync::<BacktestFrame>();
        require_send::<BacktestReport>();
        require_sync::<BacktestReport>();
        require_send::<BacktestStats>();
        require_sync::<BacktestStats>();
        require_send::<EngineConfig>();
        require_sync::<EngineConfig>();
    }
}
