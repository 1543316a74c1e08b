//! Strategy parameters — immutable configuration for one backtest run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentiment strategy parameters.
///
/// Constructed once per backtest run and validated before use. Defaults
/// match the production tuning of the sentiment strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyParams {
    /// Rolling window for the sentiment mean, in bars (>= 1).
    pub window: usize,
    /// Trend threshold: sent_mean above this is bullish.
    pub upper_th: f64,
    /// Trend threshold: sent_mean below this is bearish.
    pub lower_th: f64,
    /// Momentum threshold on the first difference of sent_mean.
    pub delta_th: f64,
    /// Blend weight for the trend signal.
    pub w_trend: f64,
    /// Blend weight for the momentum signal.
    pub w_mom: f64,
    /// Normalizer for position strength (> 0).
    pub max_strength: f64,
    /// Position smoothing factor in [0, 1]; 1 tracks the target exactly.
    pub alpha: f64,
    /// Drawdown kill-switch threshold, fraction in (0, 1].
    pub max_drawdown: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            window: 12,
            upper_th: 0.2,
            lower_th: -0.2,
            delta_th: 0.1,
            w_trend: 0.7,
            w_mom: 0.3,
            max_strength: 0.5,
            alpha: 0.3,
            max_drawdown: 0.2,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("window must be >= 1, got {0}")]
    WindowTooSmall(usize),

    #[error("max_strength must be > 0, got {0}")]
    NonPositiveMaxStrength(f64),

    #[error("alpha must be in [0, 1], got {0}")]
    AlphaOutOfRange(f64),

    #[error("max_drawdown must be in (0, 1], got {0}")]
    MaxDrawdownOutOfRange(f64),

    #[error("upper_th ({upper}) must be >= lower_th ({lower})")]
    InvertedThresholds { upper: f64, lower: f64 },
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.window < 1 {
            return Err(ParamsError::WindowTooSmall(self.window));
        }
        if !(self.max_strength > 0.0) {
            return Err(ParamsError::NonPositiveMaxStrength(self.max_strength));
        }
        if !(0.0..=1.0).contains(&self.alpha) || self.alpha.is_nan() {
            return Err(ParamsError::AlphaOutOfRange(self.alpha));
        }
        if !(self.max_drawdown > 0.0 && self.max_drawdown <= 1.0) {
            return Err(ParamsError::MaxDrawdownOutOfRange(self.max_drawdown));
        }
        if self.upper_th < self.lower_th {
            return Err(ParamsError::InvertedThresholds {
                upper: self.upper_th,
                lower: self.lower_th,
            });
        }
        Ok(())
    }
}
