//! Sequential equity simulation with a drawdown kill-switch.
//!
//! A single forward pass carrying `(position, equity, peak)`. The
//! previous bar's position is applied to the current bar's return, so a
//! position taken at bar `i` first earns (or loses) at bar `i+1`.
//!
//! The kill-switch zeroes the position only for the bar where the
//! breach is detected. Re-entry is permitted on the next bar if the
//! smoother still outputs a nonzero position: a momentary circuit
//! breaker, not a persistent lockout.

/// Result of the risk-control pass.
#[derive(Debug, Clone)]
pub struct RiskOutcome {
    /// Final per-bar positions, post-override.
    pub positions: Vec<f64>,
    /// Equity multiples, starting at 1.0.
    pub equity: Vec<f64>,
}

/// Run the equity simulation over smoothed positions and prices.
///
/// `prices` and `smoothed` must be the same length; callers guarantee
/// this since both derive from the same aligned rows.
pub fn apply_risk_control(prices: &[f64], smoothed: &[f64], max_drawdown: f64) -> RiskOutcome {
    let n = prices.len();
    debug_assert_eq!(n, smoothed.len());

    let mut positions = vec![0.0; n];
    let mut equity = vec![1.0; n];
    if n == 0 {
        return RiskOutcome { positions, equity };
    }

    positions[0] = smoothed[0];
    let mut peak = equity[0];

    for i in 1..n {
        positions[i] = smoothed[i];

        let ret = if prices[i - 1] != 0.0 {
            prices[i] / prices[i - 1] - 1.0
        } else {
            0.0
        };
        equity[i] = equity[i - 1] * (1.0 + positions[i - 1] * ret);

        if equity[i] > peak {
            peak = equity[i];
        }
        let dd = if peak > 0.0 {
            1.0 - equity[i] / peak
        } else {
            0.0
        };
        if dd > max_drawdown {
            // Override for this bar only.
            positions[i] = 0.0;
        }
    }

    RiskOutcome { positions, equity }
}
