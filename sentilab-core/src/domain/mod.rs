//! Domain types shared across the pipeline.

pub mod bar;
pub mod params;
pub mod sentiment;
pub mod trade;

pub use bar::PriceBar;
pub use params::{ParamsError, StrategyParams};
pub use sentiment::SentimentPoint;
pub use trade::{TradeDirection, TradeRecord};
