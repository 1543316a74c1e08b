//! Persistence boundary: parquet tables and sentiment CSV files.
//!
//! Everything here converts between on-disk columnar formats and the
//! plain in-memory row types the rest of the crate computes on.

pub mod demo;
pub mod sentiment;
pub mod table;

pub use demo::generate_sparse_sentiment;
pub use sentiment::{load_sentiment_csv, SentimentCsvError};
pub use table::{
    load_backtest_frame, load_merged_rows, load_price_bars, save_backtest_frame,
    save_merged_rows, MergedRow, TableError,
};
