//! Trade records produced by the signal-transition simulator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            TradeDirection::Long => 1.0,
            TradeDirection::Short => -1.0,
        }
    }

    pub fn from_sign(sign: f64) -> Option<Self> {
        if sign > 0.0 {
            Some(TradeDirection::Long)
        } else if sign < 0.0 {
            Some(TradeDirection::Short)
        } else {
            None
        }
    }
}

/// A closed round-trip trade.
///
/// Created when an active position closes: the position sign reverses
/// to zero or flips. `return_pct` is the price return in the trade's
/// direction net of the round-trip fee; `pnl` is that return applied
/// to the configured capital.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub direction: TradeDirection,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub return_pct: f64,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
