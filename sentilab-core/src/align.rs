//! Backward time-series alignment.
//!
//! Joins a sparse sentiment series onto a dense price series using only
//! same-or-earlier sentiment points — the no-look-ahead invariant. With
//! decay enabled, a point's influence halves every `half_life_hours`.

use crate::domain::{PriceBar, SentimentPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exponential time-decay configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DecayParams {
    /// Hours after which a sentiment value's influence is halved (> 0).
    pub half_life_hours: f64,
}

impl Default for DecayParams {
    fn default() -> Self {
        Self {
            half_life_hours: 6.0,
        }
    }
}

/// One price bar with its backward-matched sentiment.
///
/// Exists only for the duration of one backtest computation.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    /// Sentiment as matched, before decay. 0.0 when no prior point exists.
    pub raw_sentiment: f64,
    /// Sentiment after optional decay; equals `raw_sentiment` without decay.
    pub sentiment: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum AlignError {
    #[error("price series is empty")]
    EmptyPriceSeries,

    #[error("{series} timestamps must be strictly increasing")]
    UnsortedTimestamps { series: &'static str },

    #[error("decay half-life must be > 0 hours, got {0}")]
    NonPositiveHalfLife(f64),
}

/// Exponential decay factor: `0.5 ^ (dt_hours / half_life_hours)`.
///
/// 1.0 at dt = 0 and strictly decreasing in dt.
pub fn decay_factor(dt_hours: f64, half_life_hours: f64) -> f64 {
    0.5_f64.powf(dt_hours / half_life_hours)
}

/// Align sentiment onto price bars by backward matching.
///
/// For each bar, the most recent sentiment point at or before the bar's
/// timestamp is used; bars before the first point get sentiment 0. With
/// `decay`, the matched score is multiplied by the decay factor for the
/// elapsed time since the point.
pub fn align_price_and_sentiment(
    prices: &[PriceBar],
    points: &[SentimentPoint],
    decay: Option<DecayParams>,
) -> Result<Vec<AlignedRow>, AlignError> {
    if prices.is_empty() {
        return Err(AlignError::EmptyPriceSeries);
    }
    ensure_sorted(prices.iter().map(|b| b.timestamp), "price")?;
    ensure_sorted(points.iter().map(|p| p.timestamp), "sentiment")?;

    if let Some(d) = decay {
        if !(d.half_life_hours > 0.0) {
            return Err(AlignError::NonPositiveHalfLife(d.half_life_hours));
        }
    }

    let mut rows = Vec::with_capacity(prices.len());
    // Index of the most recent sentiment point at or before the current bar.
    // Both series are sorted, so a single forward cursor suffices.
    let mut cursor: Option<usize> = None;
    let mut next = 0usize;

    for bar in prices {
        while next < points.len() && points[next].timestamp <= bar.timestamp {
            cursor = Some(next);
            next += 1;
        }

        let (raw, decayed) = match cursor {
            None => (0.0, 0.0),
            Some(i) => {
                let point = &points[i];
                let raw = point.score;
                let decayed = match decay {
                    None => raw,
                    Some(d) => {
                        let dt = bar.timestamp - point.timestamp;
                        let dt_hours = dt.num_milliseconds() as f64 / 3_600_000.0;
                        raw * decay_factor(dt_hours, d.half_life_hours)
                    }
                };
                (raw, decayed)
            }
        };

        rows.push(AlignedRow {
            timestamp: bar.timestamp,
            price: bar.close,
            raw_sentiment: raw,
            sentiment: decayed,
        });
    }

    Ok(rows)
}

fn ensure_sorted(
    timestamps: impl Iterator<Item = DateTime<Utc>>,
    series: &'static str,
) -> Result<(), AlignError> {
    let mut prev: Option<DateTime<Utc>> = None;
    for ts in timestamps {
        if let Some(p) = prev {
            if ts <= p {
                return Err(AlignError::UnsortedTimestamps { series });
            }
        }
        prev = Some(ts);
    }
    Ok(())
}
