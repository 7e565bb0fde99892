//! Same-day NAV forecast from a historical series.
//!
//! The model is a recency-weighted average of the last few day-over-day
//! percent changes, applied to the latest official NAV. It is a heuristic,
//! not a guarantee; the weights are a tunable constant.

use crate::core::error::EstimateError;
use crate::core::history::HistoricalPoint;

/// Weights over trailing daily changes, most recent first.
pub const RECENCY_WEIGHTS: [f64; 5] = [0.4, 0.3, 0.2, 0.07, 0.03];

/// Minimum points required: one change per weight, plus the base NAV.
pub const MIN_POINTS: usize = RECENCY_WEIGHTS.len() + 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimationResult {
    /// Projected NAV for the next observation, rounded to 4 decimals.
    pub estimate: f64,
    /// Projected signed percent change against the last NAV.
    pub est_rate_pct: f64,
    /// Number of trailing daily changes that fed the forecast.
    pub basis_points: usize,
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Forecasts the next NAV from an ascending historical series.
///
/// Returns `InsufficientHistory` when fewer than [`MIN_POINTS`] points
/// are available; callers surface that as "no forecast", not as an
/// estimate of zero.
pub fn estimate(history: &[HistoricalPoint]) -> Result<EstimationResult, EstimateError> {
    if history.len() < MIN_POINTS {
        return Err(EstimateError::InsufficientHistory {
            have: history.len(),
            need: MIN_POINTS,
        });
    }

    let n = RECENCY_WEIGHTS.len();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (i, weight) in RECENCY_WEIGHTS.iter().enumerate() {
        let current = history[history.len() - 1 - i].nav;
        let previous = history[history.len() - 2 - i].nav;
        let change = (current - previous) / previous * 100.0;
        weighted_sum += change * weight;
        weight_total += weight;
    }
    let weighted_change = weighted_sum / weight_total;

    let last_nav = history[history.len() - 1].nav;
    Ok(EstimationResult {
        estimate: round_to(last_nav * (1.0 + weighted_change / 100.0), 4),
        est_rate_pct: round_to(weighted_change, 2),
        basis_points: n,
    })
}
