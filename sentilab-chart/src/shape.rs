//! Shaping of chart points: window filtering, downsampling, rebasing.
//!
//! Order matters and is fixed by the resolver: filter to the requested
//! window, pick a point budget, thin by even stride, then rebase to the
//! requested capital when a start was given.

use crate::record::ChartPoint;
use chrono::{DateTime, Duration, Utc};

/// Keep points inside `[start, end]`, both bounds inclusive.
pub fn filter_window(
    points: Vec<ChartPoint>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<ChartPoint> {
    points
        .into_iter()
        .filter(|p| start.map_or(true, |s| p.timestamp >= s))
        .filter(|p| end.map_or(true, |e| p.timestamp <= e))
        .collect()
}

/// Point budget for an unspecified `points` parameter, keyed on the
/// window span: short windows keep fewer points, long windows more.
pub fn adaptive_budget(span: Duration) -> usize {
    if span < Duration::days(1) {
        500
    } else if span < Duration::days(7) {
        1000
    } else if span < Duration::days(30) {
        2000
    } else {
        3000
    }
}

/// Span used for the adaptive budget: the requested window when both
/// ends were given, otherwise the span of the points themselves.
pub fn effective_span(
    points: &[ChartPoint],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Duration {
    match (start, end) {
        (Some(s), Some(e)) if e > s => e - s,
        _ => match (points.first(), points.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => Duration::zero(),
        },
    }
}

/// Thin points to at most `budget` by even stride, always keeping the
/// final point.
pub fn downsample(points: Vec<ChartPoint>, budget: usize) -> Vec<ChartPoint> {
    if budget == 0 || points.len() <= budget {
        return points;
    }
    let stride = points.len().div_ceil(budget);
    let last_idx = points.len() - 1;
    let mut out: Vec<ChartPoint> = Vec::with_capacity(budget + 1);
    for (i, p) in points.into_iter().enumerate() {
        if i % stride == 0 || i == last_idx {
            out.push(p);
        }
    }
    out
}

/// Rescale both curves so the first point at or after `start` equals
/// `initial_capital`. Zero baselines leave that curve untouched.
pub fn rebase(points: &mut [ChartPoint], start: DateTime<Utc>, initial_capital: f64) {
    let Some(base) = points.iter().find(|p| p.timestamp >= start) else {
        return;
    };
    let hold_base = base.hold_value;
    let strategy_base = base.strategy_value;

    for p in points.iter_mut() {
        if hold_base != 0.0 {
            p.hold_value = p.hold_value / hold_base * initial_capital;
        }
        if strategy_base != 0.0 {
            p.strategy_value = p.strategy_value / strategy_base * initial_capital;
        }
    }
}
