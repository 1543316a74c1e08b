//! Position smoothing — first-order IIR filter over the target position.
//!
//! The smoothed position trades responsiveness for stability: alpha near
//! 1 tracks the target closely, alpha near 0 is sluggish. The recurrence
//! is inherently sequential; it is written as an explicit loop rather
//! than a vectorized form because each step depends on the previous one.

/// `position[0] = 0`; `position[i] = alpha * target[i] + (1 - alpha) * position[i-1]`.
pub fn smooth_positions(target: &[f64], alpha: f64) -> Vec<f64> {
    let mut position = vec![0.0; target.len()];
    for i in 1..target.len() {
        position[i] = alpha * target[i] + (1.0 - alpha) * position[i - 1];
    }
    position
}
