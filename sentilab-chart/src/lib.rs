//! Sentilab Chart — turns backtest output into chart-ready records and
//! resolves where that output comes from.
//!
//! The two halves:
//! - `record` / `shape`: build hold/strategy value curves with trade
//!   event markers, then window, downsample, and rebase them.
//! - `resolver` / `jobs` / `config`: an ordered source chain that finds
//!   or produces backtest data for a chart request, falling back from
//!   explicit files through slice merges and cached results down to a
//!   demo dataset, with large merges pushed to background jobs.

pub mod config;
pub mod jobs;
pub mod record;
pub mod request;
pub mod resolver;
pub mod shape;

pub use config::ResolverConfig;
pub use jobs::{JobId, JobRegistry, JobState};
pub use record::{build_points, render_records, ChartEvent, ChartPoint, ChartRecord, EventAction, TimeFormat};
pub use request::{ChartRequest, ChartResponse};
pub use resolver::{ChartResolver, ResolveError};
