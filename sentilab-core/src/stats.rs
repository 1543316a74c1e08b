//! Summary statistics over a finished equity curve.
//!
//! Annualization infers the bar frequency from the index span and bar
//! count rather than assuming a fixed interval. When the frequency
//! cannot be inferred (fewer than two bars), 252 periods per year is
//! used.

use crate::domain::TradeRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trading days per year, the fallback annualization basis.
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Performance summary for one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestStats {
    /// Final equity over initial equity, minus one.
    pub total_return: f64,
    /// Geometric annualization of the mean per-bar return.
    pub annualized_return: f64,
    /// Annualized standard deviation of per-bar returns.
    pub volatility: f64,
    /// Annualized mean return over per-bar volatility; 0 when volatility is 0.
    pub sharpe_ratio: f64,
    /// Worst peak-to-trough equity loss, as a positive fraction.
    pub max_drawdown: f64,
    /// Fraction of closed trades with positive pnl; 0 with no trades.
    pub win_rate: f64,
    pub num_trades: usize,
}

/// Estimate bars per year from the index span and bar count.
///
/// Bars per day is the bar count over the covered days, scaled by 252
/// trading days. Falls back to 252 when the span cannot be measured
/// (fewer than two bars, or a zero-length span).
pub fn bars_per_year(timestamps: &[DateTime<Utc>]) -> f64 {
    if timestamps.len() < 2 {
        return TRADING_DAYS_PER_YEAR;
    }
    let span = timestamps[timestamps.len() - 1] - timestamps[0];
    let total_days = span.num_seconds() as f64 / 86_400.0;
    if total_days <= 0.0 {
        return TRADING_DAYS_PER_YEAR;
    }
    let bars_per_day = timestamps.len() as f64 / total_days;
    bars_per_day * TRADING_DAYS_PER_YEAR
}

/// Compute summary stats from the equity curve and closed trades.
pub fn compute_stats(
    timestamps: &[DateTime<Utc>],
    equity: &[f64],
    trades: &[TradeRecord],
) -> BacktestStats {
    let num_trades = trades.len();
    let win_rate = if num_trades == 0 {
        0.0
    } else {
        trades.iter().filter(|t| t.is_winner()).count() as f64 / num_trades as f64
    };

    if equity.len() < 2 {
        return BacktestStats {
            total_return: 0.0,
            annualized_return: 0.0,
            volatility: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown: 0.0,
            win_rate,
            num_trades,
        };
    }

    let returns: Vec<f64> = equity
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect();

    let avg = returns.iter().sum::<f64>() / returns.len() as f64;
    let vol = sample_std(&returns, avg);

    let bpy = bars_per_year(timestamps);
    let sqrt_bpy = bpy.sqrt();

    let total_return = equity[equity.len() - 1] / equity[0] - 1.0;
    let annualized_return = (1.0 + avg).powf(bpy) - 1.0;
    let volatility = vol * sqrt_bpy;
    let sharpe_ratio = if vol == 0.0 {
        0.0
    } else {
        avg * sqrt_bpy / vol
    };

    BacktestStats {
        total_return,
        annualized_return,
        volatility,
        sharpe_ratio,
        max_drawdown: max_drawdown(equity),
        win_rate,
        num_trades,
    }
}

/// Worst peak-to-trough loss of the equity curve, as a positive fraction.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &e in equity {
        if e > peak {
            peak = e;
        }
        if peak > 0.0 {
            let dd = 1.0 - e / peak;
            if dd > worst {
                worst = dd;
            }
        }
    }
    worst
}

fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values
        .iter()
        .map(|v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / (values.len() - 1) as f64;
    var.sqrt()
}
