//! Chart request and response wire shapes.

use crate::record::{ChartRecord, TimeFormat};
use crate::resolver::ResolveError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_price_column() -> String {
    "close".to_string()
}

fn default_capital() -> f64 {
    100_000.0
}

/// What the caller wants charted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartRequest {
    /// Explicit backtest frame to chart; skips the source chain.
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default = "default_price_column")]
    pub price_column: String,
    #[serde(default = "default_capital")]
    pub initial_capital: f64,
    /// Maximum records to return; adaptive when absent.
    #[serde(default)]
    pub points: Option<usize>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_format: TimeFormat,
}

impl Default for ChartRequest {
    fn default() -> Self {
        Self {
            source: None,
            price_column: default_price_column(),
            initial_capital: default_capital(),
            points: None,
            start: None,
            end: None,
            time_format: TimeFormat::default(),
        }
    }
}

impl ChartRequest {
    pub fn validate(&self) -> Result<(), ResolveError> {
        if self.price_column.trim().is_empty() {
            return Err(ResolveError::InvalidRequest(
                "price_column must not be empty".into(),
            ));
        }
        if !(self.initial_capital > 0.0) {
            return Err(ResolveError::InvalidRequest(format!(
                "initial_capital must be > 0, got {}",
                self.initial_capital
            )));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end < start {
                return Err(ResolveError::InvalidRequest(format!(
                    "end ({end}) precedes start ({start})"
                )));
            }
        }
        Ok(())
    }
}

/// Either the chart data itself or a pointer to a background job.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChartResponse {
    Records {
        source: &'static str,
        resolved_source: String,
        records: Vec<ChartRecord>,
    },
    Queued {
        status: &'static str,
        job_id: String,
        output_location: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn defaults_validate() {
        assert!(ChartRequest::default().validate().is_ok());
    }

    #[test]
    fn inverted_window_rejected() {
        let req = ChartRequest {
            start: Some(Utc.with_ymd_and_hms(2025, 1, 20, 0, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(matches!(
            req.validate(),
            Err(ResolveError::InvalidRequest(_))
        ));
    }

    #[test]
    fn non_positive_capital_rejected() {
        let req = ChartRequest {
            initial_capital: 0.0,
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn queued_response_shape() {
        let response = ChartResponse::Queued {
            status: "queued",
            job_id: "ab12".into(),
            output_location: "/jobs/ab12.parquet".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["job_id"], "ab12");
    }

    #[test]
    fn records_response_shape() {
        let response = ChartResponse::Records {
            source: "merged-sync",
            resolved_source: "/slices".into(),
            records: vec![],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["source"], "merged-sync");
        assert!(json["records"].as_array().unwrap().is_empty());
    }
}
