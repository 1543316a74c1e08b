//! Timestamp-indexed parquet table I/O.
//!
//! All persisted tables share one contract: a `timestamp` column (or a
//! pandas index column named `__index_level_0__`) holding UTC instants,
//! plus float data columns. Timestamps are normalized to epoch
//! milliseconds on load regardless of the stored unit, rows are sorted
//! ascending, and duplicate timestamps keep the first occurrence.
//!
//! Writes are atomic: write to a `.tmp` sibling, then rename into place.

use crate::domain::PriceBar;
use crate::engine::BacktestFrame;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Names accepted for the time index, in lookup order.
const TIME_COLUMNS: [&str; 2] = ["timestamp", "__index_level_0__"];

#[derive(Debug, Error)]
pub enum TableError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parquet error on {path}: {source}")]
    Parquet {
        path: String,
        #[source]
        source: PolarsError,
    },

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("column '{column}' has unsupported type {dtype}")]
    TypeMismatch { column: String, dtype: String },

    #[error("table has no rows")]
    EmptyTable,

    #[error("timestamp out of representable range: {0} ms")]
    TimestampOutOfRange(i64),
}

/// One row of a merged price+sentiment table, the engine's raw input.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub sentiment: f64,
}

// ─── Loading ────────────────────────────────────────────────────────

/// Load a merged price+sentiment table.
///
/// `price_column` names the price column ("close" for raw merges,
/// "price" for persisted frames). A `sentiment` column is required.
pub fn load_merged_rows(path: &Path, price_column: &str) -> Result<Vec<MergedRow>, TableError> {
    let df = read_parquet(path)?;
    let timestamps = time_column_millis(&df)?;
    let price = f64_column(&df, price_column)?;
    let sentiment = f64_column(&df, "sentiment")?;

    let mut rows = Vec::with_capacity(timestamps.len());
    for i in 0..timestamps.len() {
        rows.push(MergedRow {
            timestamp: millis_to_datetime(timestamps[i])?,
            price: price[i],
            sentiment: sentiment[i],
        });
    }
    sort_dedup_by_time(&mut rows, |r| r.timestamp);
    if rows.is_empty() {
        return Err(TableError::EmptyTable);
    }
    Ok(rows)
}

/// Load standardized OHLCV bars from a kline parquet file.
pub fn load_price_bars(path: &Path) -> Result<Vec<PriceBar>, TableError> {
    let df = read_parquet(path)?;
    let timestamps = time_column_millis(&df)?;
    let open = f64_column(&df, "open")?;
    let high = f64_column(&df, "high")?;
    let low = f64_column(&df, "low")?;
    let close = f64_column(&df, "close")?;
    let volume = f64_column(&df, "volume")?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for i in 0..timestamps.len() {
        bars.push(PriceBar {
            timestamp: millis_to_datetime(timestamps[i])?,
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
            volume: volume[i],
        });
    }
    sort_dedup_by_time(&mut bars, |b| b.timestamp);
    if bars.is_empty() {
        return Err(TableError::EmptyTable);
    }
    Ok(bars)
}

/// Load a persisted backtest frame (`timestamp, price, sentiment,
/// position, equity`).
pub fn load_backtest_frame(path: &Path) -> Result<BacktestFrame, TableError> {
    let df = read_parquet(path)?;
    let timestamps = time_column_millis(&df)?;
    let price = f64_column(&df, "price")?;
    let sentiment = f64_column(&df, "sentiment")?;
    let position = f64_column(&df, "position")?;
    let equity = f64_column(&df, "equity")?;

    // Build row tuples so the sort keeps columns parallel.
    let mut rows: Vec<(DateTime<Utc>, f64, f64, f64, f64)> = Vec::with_capacity(timestamps.len());
    for i in 0..timestamps.len() {
        rows.push((
            millis_to_datetime(timestamps[i])?,
            price[i],
            sentiment[i],
            position[i],
            equity[i],
        ));
    }
    sort_dedup_by_time(&mut rows, |r| r.0);
    if rows.is_empty() {
        return Err(TableError::EmptyTable);
    }

    let mut frame = BacktestFrame::default();
    for (ts, p, s, pos, eq) in rows {
        frame.timestamp.push(ts);
        frame.price.push(p);
        frame.sentiment.push(s);
        frame.position.push(pos);
        frame.equity.push(eq);
    }
    Ok(frame)
}

// ─── Saving ─────────────────────────────────────────────────────────

/// Persist a backtest frame to parquet, atomically.
pub fn save_backtest_frame(frame: &BacktestFrame, path: &Path) -> Result<(), TableError> {
    let millis: Vec<i64> = frame
        .timestamp
        .iter()
        .map(|t| t.timestamp_millis())
        .collect();

    let timestamp = Column::new("timestamp".into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .map_err(|e| parquet_err(path, e))?;

    let df = DataFrame::new(vec![
        timestamp,
        Column::new("price".into(), frame.price.clone()),
        Column::new("sentiment".into(), frame.sentiment.clone()),
        Column::new("position".into(), frame.position.clone()),
        Column::new("equity".into(), frame.equity.clone()),
    ])
    .map_err(|e| parquet_err(path, e))?;

    write_parquet_atomic(&df, path)
}

/// Persist merged price+sentiment rows (slice format) to parquet.
pub fn save_merged_rows(rows: &[MergedRow], path: &Path) -> Result<(), TableError> {
    let millis: Vec<i64> = rows.iter().map(|r| r.timestamp.timestamp_millis()).collect();
    let price: Vec<f64> = rows.iter().map(|r| r.price).collect();
    let sentiment: Vec<f64> = rows.iter().map(|r| r.sentiment).collect();

    let timestamp = Column::new("timestamp".into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .map_err(|e| parquet_err(path, e))?;

    let df = DataFrame::new(vec![
        timestamp,
        Column::new("close".into(), price),
        Column::new("sentiment".into(), sentiment),
    ])
    .map_err(|e| parquet_err(path, e))?;

    write_parquet_atomic(&df, path)
}

// ─── Helpers ────────────────────────────────────────────────────────

fn read_parquet(path: &Path) -> Result<DataFrame, TableError> {
    let file = fs::File::open(path).map_err(|e| TableError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| parquet_err(path, e))
}

fn write_parquet_atomic(df: &DataFrame, path: &Path) -> Result<(), TableError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TableError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    let tmp = path.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp).map_err(|e| TableError::Io {
        path: tmp.display().to_string(),
        source: e,
    })?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| parquet_err(path, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        TableError::Io {
            path: path.display().to_string(),
            source: e,
        }
    })
}

fn parquet_err(path: &Path, e: PolarsError) -> TableError {
    TableError::Parquet {
        path: path.display().to_string(),
        source: e,
    }
}

/// Extract the time index as epoch milliseconds, whatever the stored
/// column name and datetime unit.
fn time_column_millis(df: &DataFrame) -> Result<Vec<i64>, TableError> {
    let col = TIME_COLUMNS
        .iter()
        .find_map(|name| df.column(name).ok())
        .ok_or_else(|| TableError::MissingColumn("timestamp".into()))?;

    let divisor = match col.dtype() {
        DataType::Datetime(TimeUnit::Nanoseconds, _) => 1_000_000,
        DataType::Datetime(TimeUnit::Microseconds, _) => 1_000,
        DataType::Datetime(TimeUnit::Milliseconds, _) | DataType::Int64 => 1,
        other => {
            return Err(TableError::TypeMismatch {
                column: col.name().to_string(),
                dtype: other.to_string(),
            })
        }
    };

    let ints = col
        .cast(&DataType::Int64)
        .map_err(|_| TableError::TypeMismatch {
            column: col.name().to_string(),
            dtype: col.dtype().to_string(),
        })?;
    let ca = ints.i64().map_err(|_| TableError::TypeMismatch {
        column: col.name().to_string(),
        dtype: col.dtype().to_string(),
    })?;

    let mut out = Vec::with_capacity(ca.len());
    for v in ca {
        match v {
            Some(raw) => out.push(raw / divisor),
            None => {
                return Err(TableError::TypeMismatch {
                    column: col.name().to_string(),
                    dtype: "null timestamp".into(),
                })
            }
        }
    }
    Ok(out)
}

/// Read a float column, accepting any numeric storage type.
fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>, TableError> {
    let col = df
        .column(name)
        .map_err(|_| TableError::MissingColumn(name.to_string()))?;
    let floats = col
        .cast(&DataType::Float64)
        .map_err(|_| TableError::TypeMismatch {
            column: name.to_string(),
            dtype: col.dtype().to_string(),
        })?;
    let ca = floats.f64().map_err(|_| TableError::TypeMismatch {
        column: name.to_string(),
        dtype: col.dtype().to_string(),
    })?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, TableError> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or(TableError::TimestampOutOfRange(ms))
}

fn sort_dedup_by_time<T, F>(rows: &mut Vec<T>, key: F)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by_key(|r| key(r));
    rows.dedup_by(|a, b| key(a) == key(b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, h, 0, 0).unwrap()
    }

    fn sample_frame() -> BacktestFrame {
        BacktestFrame {
            timestamp: vec![ts(10), ts(11), ts(12)],
            price: vec![100.0, 110.0, 99.0],
            sentiment: vec![0.0, 0.6, 0.3],
            position: vec![0.0, 0.6, 0.6],
            equity: vec![1.0, 1.0, 0.94],
        }
    }

    #[test]
    fn frame_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.parquet");

        let frame = sample_frame();
        save_backtest_frame(&frame, &path).unwrap();
        let loaded = load_backtest_frame(&path).unwrap();

        assert_eq!(loaded, frame);
    }

    #[test]
    fn merged_rows_roundtrip_and_sorting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.parquet");

        // Written out of order; loader must sort ascending.
        let rows = vec![
            MergedRow {
                timestamp: ts(12),
                price: 99.0,
                sentiment: 0.3,
            },
            MergedRow {
                timestamp: ts(10),
                price: 100.0,
                sentiment: 0.0,
            },
        ];
        save_merged_rows(&rows, &path).unwrap();
        let loaded = load_merged_rows(&path, "close").unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].timestamp, ts(10));
        assert_eq!(loaded[1].timestamp, ts(12));
    }

    #[test]
    fn missing_column_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.parquet");
        save_merged_rows(
            &[MergedRow {
                timestamp: ts(10),
                price: 100.0,
                sentiment: 0.1,
            }],
            &path,
        )
        .unwrap();

        // The slice stores "close", so asking for "price" must fail.
        let err = load_merged_rows(&path, "price").unwrap_err();
        assert!(matches!(err, TableError::MissingColumn(name) if name == "price"));
    }

    #[test]
    fn pandas_index_column_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pandas.parquet");

        // Simulate a pandas export: datetime index under __index_level_0__.
        let timestamp = Column::new(
            "__index_level_0__".into(),
            vec![ts(10).timestamp_millis(), ts(11).timestamp_millis()],
        )
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .unwrap();
        let df = DataFrame::new(vec![
            timestamp,
            Column::new("close".into(), vec![100.0, 101.0]),
            Column::new("sentiment".into(), vec![0.1, 0.2]),
        ])
        .unwrap();
        write_parquet_atomic(&df, &path).unwrap();

        let rows = load_merged_rows(&path, "close").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, ts(10));
    }

    #[test]
    fn nanosecond_timestamps_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nanos.parquet");

        let nanos: Vec<i64> = vec![ts(10), ts(11)]
            .iter()
            .map(|t| t.timestamp_millis() * 1_000_000)
            .collect();
        let timestamp = Column::new("timestamp".into(), nanos)
            .cast(&DataType::Datetime(TimeUnit::Nanoseconds, None))
            .unwrap();
        let df = DataFrame::new(vec![
            timestamp,
            Column::new("close".into(), vec![100.0, 101.0]),
            Column::new("sentiment".into(), vec![0.1, 0.2]),
        ])
        .unwrap();
        write_parquet_atomic(&df, &path).unwrap();

        let rows = load_merged_rows(&path, "close").unwrap();
        assert_eq!(rows[1].timestamp, ts(11));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = load_backtest_frame(Path::new("/nonexistent/frame.parquet")).unwrap_err();
        assert!(matches!(err, TableError::Io { .. }));
    }

    #[test]
    fn duplicate_timestamps_keep_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dups.parquet");

        let rows = vec![
            MergedRow {
                timestamp: ts(10),
                price: 100.0,
                sentiment: 0.1,
            },
            MergedRow {
                timestamp: ts(10),
                price: 200.0,
                sentiment: 0.9,
            },
        ];
        save_merged_rows(&rows, &path).unwrap();
        let loaded = load_merged_rows(&path, "close").unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].price, 100.0);
    }
}
