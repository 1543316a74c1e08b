//! Backtest engine.
//!
//! Composes alignment, signal generation, smoothing, and risk control
//! into a single run producing the backtest frame, the closed-trade
//! ledger, and summary stats.

use crate::align::{align_price_and_sentiment, AlignError, DecayParams};
use crate::domain::{ParamsError, PriceBar, SentimentPoint, StrategyParams, TradeDirection, TradeRecord};
use crate::risk::apply_risk_control;
use crate::signal::build_signals;
use crate::smooth::smooth_positions;
use crate::stats::{compute_stats, BacktestStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Run-level configuration, distinct from the strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Proportional fee charged on each side of a trade.
    pub fee_rate: f64,
    /// Starting capital for pnl accounting and chart scaling.
    pub initial_capital: f64,
    /// Optional sentiment time decay applied during alignment.
    pub decay: Option<DecayParams>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_rate: 0.001,
            initial_capital: 100_000.0,
            decay: None,
        }
    }
}

/// Columnar result of one backtest run. All columns are parallel and
/// the timestamps are strictly increasing; this is the shape persisted
/// to parquet and consumed by the chart builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestFrame {
    pub timestamp: Vec<DateTime<Utc>>,
    pub price: Vec<f64>,
    pub sentiment: Vec<f64>,
    pub position: Vec<f64>,
    pub equity: Vec<f64>,
}

impl BacktestFrame {
    pub fn len(&self) -> usize {
        self.timestamp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamp.is_empty()
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub frame: BacktestFrame,
    pub trades: Vec<TradeRecord>,
    pub stats: BacktestStats,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Params(#[from] ParamsError),

    #[error(transparent)]
    Align(#[from] AlignError),

    #[error("fee_rate must be >= 0, got {0}")]
    NegativeFeeRate(f64),

    #[error("initial_capital must be > 0, got {0}")]
    NonPositiveCapital(f64),
}

/// The engine itself is stateless; it exists as a type so call sites
/// read as `BacktestEngine::run(...)` and config can grow without
/// touching every caller.
pub struct BacktestEngine;

impl BacktestEngine {
    /// Run the full pipeline over a price series and sparse sentiment.
    pub fn run(
        prices: &[PriceBar],
        sentiment: &[SentimentPoint],
        params: &StrategyParams,
        cfg: &EngineConfig,
    ) -> Result<BacktestReport, EngineError> {
        params.validate()?;
        if !(cfg.fee_rate >= 0.0) {
            return Err(EngineError::NegativeFeeRate(cfg.fee_rate));
        }
        if !(cfg.initial_capital > 0.0) {
            return Err(EngineError::NonPositiveCapital(cfg.initial_capital));
        }

        let rows = align_price_and_sentiment(prices, sentiment, cfg.decay)?;
        let signals = build_signals(&rows, params);
        let smoothed = smooth_positions(&signals.target_position, params.alpha);

        let price: Vec<f64> = rows.iter().map(|r| r.price).collect();
        let outcome = apply_risk_control(&price, &smoothed, params.max_drawdown);

        let timestamp: Vec<DateTime<Utc>> = rows.iter().map(|r| r.timestamp).collect();
        let trades = cut_trades(&timestamp, &price, &outcome.positions, cfg);
        let stats = compute_stats(&timestamp, &outcome.equity, &trades);

        let frame = BacktestFrame {
            timestamp,
            price,
            sentiment: rows.iter().map(|r| r.sentiment).collect(),
            position: outcome.positions,
            equity: outcome.equity,
        };

        Ok(BacktestReport {
            frame,
            trades,
            stats,
        })
    }
}

/// Cut the position series into closed trades at sign transitions.
///
/// A trade opens when the position sign becomes nonzero and closes when
/// it changes (to zero or the opposite sign). A position still open at
/// the last bar never closed, so it stays out of the ledger. Each side
/// of a round trip pays the proportional fee on the traded notional.
fn cut_trades(
    timestamp: &[DateTime<Utc>],
    price: &[f64],
    position: &[f64],
    cfg: &EngineConfig,
) -> Vec<TradeRecord> {
    let n = position.len();
    let mut trades = Vec::new();
    let mut open: Option<(usize, TradeDirection)> = None;

    for i in 0..n {
        let sign = signum(position[i]);
        match open {
            None => {
                if let Some(dir) = TradeDirection::from_sign(sign) {
                    open = Some((i, dir));
                }
            }
            Some((entry, dir)) => {
                if sign != dir.sign() {
                    trades.push(close_trade(timestamp, price, entry, i, dir, cfg));
                    open = TradeDirection::from_sign(sign).map(|d| (i, d));
                }
            }
        }
    }

    trades
}

fn close_trade(
    timestamp: &[DateTime<Utc>],
    price: &[f64],
    entry: usize,
    exit: usize,
    direction: TradeDirection,
    cfg: &EngineConfig,
) -> TradeRecord {
    let entry_price = price[entry];
    let exit_price = price[exit];
    let gross = if entry_price != 0.0 {
        direction.sign() * (exit_price / entry_price - 1.0)
    } else {
        0.0
    };
    let return_pct = gross - 2.0 * cfg.fee_rate;
    TradeRecord {
        entry_time: timestamp[entry],
        exit_time: timestamp[exit],
        direction,
        entry_price,
        exit_price,
        pnl: return_pct * cfg.initial_capital,
        return_pct,
    }
}

fn signum(value: f64) -> f64 {
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
    use chrono::TimeZone;

    fn bar(h: u32, close: f64) -> PriceBar {
        PriceBar {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 2, h, 0, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    fn point(h: u32, score: f64) -> SentimentPoint {
        SentimentPoint::new(Utc.with_ymd_and_hms(2025, 1, 2, h, 0, 0).unwrap(), score)
    }

    fn responsive_params() -> StrategyParams {
        StrategyParams {
            window: 2,
            alpha: 1.0,
            max_drawdown: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn frame_columns_are_parallel() {
        let prices = vec![bar(10, 100.0), bar(11, 110.0), bar(12, 99.0)];
        let sentiment = vec![point(10, 0.6)];
        let report = BacktestEngine::run(
            &prices,
            &sentiment,
            &responsive_params(),
            &EngineConfig::default(),
        )
        .unwrap();

        let n = report.frame.len();
        assert_eq!(n, 3);
        assert_eq!(report.frame.price.len(), n);
        assert_eq!(report.frame.sentiment.len(), n);
        assert_eq!(report.frame.position.len(), n);
        assert_eq!(report.frame.equity.len(), n);
        assert_eq!(report.frame.equity[0], 1.0);
    }

    #[test]
    fn invalid_params_refused_before_any_work() {
        let params = StrategyParams {
            window: 0,
            ..Default::default()
        };
        let err = BacktestEngine::run(
            &[bar(10, 100.0)],
            &[],
            &params,
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Params(_)));
    }

    #[test]
    fn negative_fee_refused() {
        let cfg = EngineConfig {
            fee_rate: -0.001,
            ..Default::default()
        };
        let err =
            BacktestEngine::run(&[bar(10, 100.0)], &[], &StrategyParams::default(), &cfg)
                .unwrap_err();
        assert!(matches!(err, EngineError::NegativeFeeRate(_)));
    }

    #[test]
    fn long_round_trip_produces_one_trade() {
        // Position goes 0 → long → flat.
        let timestamp: Vec<_> = (0..4)
            .map(|h| Utc.with_ymd_and_hms(2025, 1, 2, h, 0, 0).unwrap())
            .collect();
        let price = vec![100.0, 100.0, 110.0, 110.0];
        let position = vec![0.0, 0.6, 0.6, 0.0];
        let cfg = EngineConfig::default();

        let trades = cut_trades(&timestamp, &price, &position, &cfg);

        assert_eq!(trades.len(), 1);
        let t = &trades[0];
        assert_eq!(t.direction, TradeDirection::Long);
        assert_eq!(t.entry_price, 100.0);
        assert_eq!(t.exit_price, 110.0);
        assert!((t.return_pct - (0.1 - 0.002)).abs() < 1e-12);
        assert!(t.is_winner());
    }

    #[test]
    fn reversal_closes_and_reopens() {
        let timestamp: Vec<_> = (0..3)
            .map(|h| Utc.with_ymd_and_hms(2025, 1, 2, h, 0, 0).unwrap())
            .collect();
        let price = vec![100.0, 110.0, 100.0];
        let position = vec![0.5, -0.5, 0.0];
        let cfg = EngineConfig::default();

        let trades = cut_trades(&timestamp, &price, &position, &cfg);

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].direction, TradeDirection::Long);
        assert_eq!(trades[1].direction, TradeDirection::Short);
        // Short from 110 to 100 gains 1/11 gross.
        assert!((trades[1].return_pct - (10.0 / 110.0 - 0.002)).abs() < 1e-12);
    }

    #[test]
    fn still_open_position_stays_out_of_the_ledger() {
        // The position never closes, so nothing is booked and the
        // win rate is not diluted by a synthetic final trade.
        let timestamp: Vec<_> = (0..3)
            .map(|h| Utc.with_ymd_and_hms(2025, 1, 2, h, 0, 0).unwrap())
            .collect();
        let price = vec![100.0, 105.0, 108.0];
        let position = vec![0.0, 0.4, 0.4];
        let cfg = EngineConfig::default();

        let trades = cut_trades(&timestamp, &price, &position, &cfg);

        assert!(trades.is_empty());
    }

    #[test]
    fn flat_run_has_no_trades() {
        let timestamp: Vec<_> = (0..3)
            .map(|h| Utc.with_ymd_and_hms(2025, 1, 2, h, 0, 0).unwrap())
            .collect();
        let trades = cut_trades(
            &timestamp,
            &[100.0, 101.0, 102.0],
            &[0.0, 0.0, 0.0],
            &EngineConfig::default(),
        );
        assert!(trades.is_empty());
    }
}
