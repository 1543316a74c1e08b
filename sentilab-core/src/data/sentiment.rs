//! Sentiment CSV loading.
//!
//! The scoring pipeline emits CSV files with at least `timestamp` and
//! `score` columns (often also `headline` and `reason`, which this
//! loader ignores). Rows whose timestamp or score does not parse are
//! dropped with a warning rather than failing the whole file.

use crate::domain::SentimentPoint;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentimentCsvError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(String),
}

/// Load sentiment points from a CSV file, sorted ascending.
pub fn load_sentiment_csv(path: &Path) -> Result<Vec<SentimentPoint>, SentimentCsvError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| match e.kind() {
        csv::ErrorKind::Io(_) => SentimentCsvError::Io {
            path: path.display().to_string(),
            source: std::io::Error::other(e.to_string()),
        },
        _ => SentimentCsvError::Csv(e),
    })?;

    let headers = reader.headers()?.clone();
    let ts_idx = column_index(&headers, "timestamp")?;
    let score_idx = column_index(&headers, "score")?;

    let mut points = Vec::new();
    let mut dropped = 0usize;

    for record in reader.records() {
        let record = record?;
        let ts = record.get(ts_idx).and_then(parse_timestamp);
        let score = record.get(score_idx).and_then(|s| s.trim().parse::<f64>().ok());
        match (ts, score) {
            (Some(ts), Some(score)) => points.push(SentimentPoint::new(ts, score)),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        log::warn!(
            "dropped {dropped} unparseable sentiment rows from {}",
            path.display()
        );
    }

    points.sort_by_key(|p| p.timestamp);
    points.dedup_by(|a, b| a.timestamp == b.timestamp);
    Ok(points)
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, SentimentCsvError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| SentimentCsvError::MissingColumn(name.to_string()))
}

/// Accept RFC 3339 or a naive `YYYY-MM-DD HH:MM:SS` (treated as UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}
