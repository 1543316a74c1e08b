//! SentimentPoint — one scored text item on the timeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single sentiment observation produced by the external scorer.
///
/// Sparse relative to price bars: a few points per hour at most, while
/// bars arrive every few minutes. Score is conventionally in [-1, 1]
/// but the pipeline does not reject out-of-range values — the signal
/// generator's `max_strength` normalizer absorbs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl SentimentPoint {
    pub fn new(timestamp: DateTime<Utc>, score: f64) -> Self {
        Self {
            timestamp,
            score,
            symbol: None,
        }
    }
}

/// Keep points tagged with `symbol`. Untagged points are kept too: a
/// missing tag means the point applies to whichever symbol was
/// requested.
pub fn filter_by_symbol(points: &[SentimentPoint], symbol: &str) -> Vec<SentimentPoint> {
    points
        .iter()
        .filter(|p| p.symbol.as_deref().map(|s| s == symbol).unwrap_or(true))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, h, 0, 0).unwrap()
    }

    #[test]
    fn filter_keeps_matching_and_untagged() {
        let points = vec![
            SentimentPoint {
                timestamp: at(1),
                score: 0.5,
                symbol: Some("BTC/USDT".into()),
            },
            SentimentPoint {
                timestamp: at(2),
                score: -0.3,
                symbol: Some("ETH/USDT".into()),
            },
            SentimentPoint::new(at(3), 0.1),
        ];

        let kept = filter_by_symbol(&points, "BTC/USDT");
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.5);
        assert_eq!(kept[1].score, 0.1);
    }
}
