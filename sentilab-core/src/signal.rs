//! Sentiment signal generation.
//!
//! Turns aligned sentiment into a directional target position by
//! blending a rolling-mean trend signal with a first-difference
//! momentum signal. Every value at index `i` uses only rows `0..=i`.

use crate::align::AlignedRow;
use crate::domain::StrategyParams;

/// Derived signal columns, parallel to the aligned rows.
#[derive(Debug, Clone)]
pub struct SignalFrame {
    /// Rolling mean of sentiment over `params.window` bars (partial
    /// windows use whatever history exists).
    pub sent_mean: Vec<f64>,
    /// First difference of `sent_mean`; 0 at index 0.
    pub sent_diff: Vec<f64>,
    /// Blended direction in {-1, 0, 1} (sign of the weighted signals).
    pub direction: Vec<f64>,
    /// Target position in [-1, 1].
    pub target_position: Vec<f64>,
}

/// Compute the signal frame from aligned rows.
///
/// Callers validate `params` before this point; the computation itself
/// is total for any finite inputs.
pub fn build_signals(rows: &[AlignedRow], params: &StrategyParams) -> SignalFrame {
    let n = rows.len();
    let mut sent_mean = Vec::with_capacity(n);
    let mut sent_diff = Vec::with_capacity(n);
    let mut direction = Vec::with_capacity(n);
    let mut target_position = Vec::with_capacity(n);

    // Running sum over the trailing window keeps the rolling mean O(n).
    let mut window_sum = 0.0;

    for i in 0..n {
        window_sum += rows[i].sentiment;
        if i >= params.window {
            window_sum -= rows[i - params.window].sentiment;
        }
        let len = (i + 1).min(params.window) as f64;
        let mean = window_sum / len;
        sent_mean.push(mean);

        let diff = if i == 0 {
            0.0
        } else {
            mean - sent_mean[i - 1]
        };
        sent_diff.push(diff);

        let trend = ternary(mean, params.upper_th, params.lower_th);
        let momentum = ternary(diff, params.delta_th, -params.delta_th);

        let raw = params.w_trend * trend + params.w_mom * momentum;
        let dir = sign(raw);
        direction.push(dir);

        let strength = (mean.abs() / params.max_strength).min(1.0);
        target_position.push((dir * strength).clamp(-1.0, 1.0));
    }

    SignalFrame {
        sent_mean,
        sent_diff,
        direction,
        target_position,
    }
}

/// +1 above `upper`, -1 below `lower`, else 0.
fn ternary(value: f64, upper: f64, lower: f64) -> f64 {
    if value > upper {
        1.0
    } else if value < lower {
        -1.0
    } else {
        0.0
    }
}

fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn rows_from_scores(scores: &[f64]) -> Vec<AlignedRow> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &s)| AlignedRow {
                timestamp: Utc
                    .with_ymd_and_hms(2025, 1, 2, 0, 0, 0)
                    .unwrap()
                    + chrono::Duration::minutes(5 * i as i64),
                price: 100.0,
                raw_sentiment: s,
                sentiment: s,
            })
            .collect()
    }

    fn params() -> StrategyParams {
        StrategyParams {
            window: 2,
            upper_th: 0.2,
            lower_th: -0.2,
            delta_th: 0.1,
            w_trend: 0.7,
            w_mom: 0.3,
            max_strength: 0.5,
            alpha: 1.0,
            max_drawdown: 0.5,
        }
    }

    #[test]
    fn partial_window_uses_available_history() {
        let rows = rows_from_scores(&[0.4, 0.8, 0.0]);
        let frame = build_signals(&rows, &params());

        assert!((frame.sent_mean[0] - 0.4).abs() < 1e-12); // only one value yet
        assert!((frame.sent_mean[1] - 0.6).abs() < 1e-12);
        assert!((frame.sent_mean[2] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn diff_is_zero_at_first_bar() {
        let rows = rows_from_scores(&[0.4, 0.8]);
        let frame = build_signals(&rows, &params());
        assert_eq!(frame.sent_diff[0], 0.0);
        assert!((frame.sent_diff[1] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn positive_swing_yields_fractional_target() {
        // sentiment [0, 0.6]: sent_mean[1] = 0.3, trend +1, momentum +1,
        // strength = 0.3/0.5 = 0.6.
        let rows = rows_from_scores(&[0.0, 0.6]);
        let frame = build_signals(&rows, &params());

        assert!((frame.sent_mean[1] - 0.3).abs() < 1e-12);
        assert_eq!(frame.direction[1], 1.0);
        assert!((frame.target_position[1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn bearish_sentiment_produces_short_target() {
        let rows = rows_from_scores(&[-0.6, -0.6, -0.6]);
        let frame = build_signals(&rows, &params());

        assert_eq!(frame.direction[2], -1.0);
        assert_eq!(frame.target_position[2], -1.0); // |mean|/max_strength capped at 1
    }

    #[test]
    fn neutral_sentiment_stays_flat() {
        let rows = rows_from_scores(&[0.0, 0.1, 0.05]);
        let frame = build_signals(&rows, &params());
        assert!(frame.target_position.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn targets_always_in_unit_interval() {
        // Out-of-convention scores should still produce bounded targets.
        let rows = rows_from_scores(&[3.0, -4.0, 2.5, -2.5]);
        let frame = build_signals(&rows, &params());
        for &t in &frame.target_position {
            assert!((-1.0..=1.0).contains(&t));
        }
    }
}
