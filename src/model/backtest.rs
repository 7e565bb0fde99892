//! Walk-forward replay of the estimation model over a historical window.

use chrono::NaiveDate;

use crate::core::error::EstimateError;
use crate::core::history::HistoricalPoint;
use crate::model::estimate::{self, MIN_POINTS};

/// One replayed day: the model trained on everything strictly before
/// `date`, predicting that day's NAV.
#[derive(Debug, Clone, Copy)]
pub struct BacktestDay {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
    /// Signed percent error of the prediction against the actual NAV.
    pub error_rate_pct: f64,
    /// Whether the predicted rate sign matched the actual day-over-day
    /// change. A flat day counts as correct only for a predicted rate of
    /// exactly zero.
    pub direction_correct: bool,
}

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub days: Vec<BacktestDay>,
    pub mean_abs_error_pct: f64,
    pub median_abs_error_pct: f64,
    pub max_abs_error_pct: f64,
    pub min_abs_error_pct: f64,
    /// Share of days (0-100) with absolute error within each band.
    pub within_half_pct: f64,
    pub within_one_pct: f64,
    pub within_two_pct: f64,
    /// Share of days (0-100) where the predicted direction was right.
    pub direction_hit_rate_pct: f64,
}

/// Replays the model over the last `window_days` days of `history`.
///
/// Fails fast with `InsufficientHistory` when the series cannot cover the
/// window plus the model's minimum training size; it never silently
/// truncates the window.
pub fn backtest(
    history: &[HistoricalPoint],
    window_days: usize,
) -> Result<BacktestReport, EstimateError> {
    let need = window_days + MIN_POINTS;
    if window_days == 0 || history.len() < need {
        return Err(EstimateError::InsufficientHistory {
            have: history.len(),
            need,
        });
    }

    let mut days = Vec::with_capacity(window_days);
    for i in (history.len() - window_days)..history.len() {
        let train = &history[..i];
        let forecast = estimate::estimate(train)?;

        let actual = history[i].nav;
        let previous = train[train.len() - 1].nav;
        let actual_change = actual - previous;

        let direction_correct = if actual_change == 0.0 {
            forecast.est_rate_pct == 0.0
        } else {
            (forecast.est_rate_pct > 0.0) == (actual_change > 0.0)
                && forecast.est_rate_pct != 0.0
        };

        days.push(BacktestDay {
            date: history[i].date,
            actual,
            predicted: forecast.estimate,
            error_rate_pct: (forecast.estimate - actual) / actual * 100.0,
            direction_correct,
        });
    }

    let mut abs_errors: Vec<f64> = days.iter().map(|d| d.error_rate_pct.abs()).collect();
    abs_errors.sort_by(|a, b| a.total_cmp(b));

    let count = abs_errors.len() as f64;
    let mean = abs_errors.iter().sum::<f64>() / count;
    let median = if abs_errors.len() % 2 == 0 {
        (abs_errors[abs_errors.len() / 2 - 1] + abs_errors[abs_errors.len() / 2]) / 2.0
    } else {
        abs_errors[abs_errors.len() / 2]
    };

    let within = |band: f64| abs_errors.iter().filter(|e| **e <= band).count() as f64 / count * 100.0;
    let hits = days.iter().filter(|d| d.direction_correct).count() as f64;

    Ok(BacktestReport {
        mean_abs_error_pct: mean,
        median_abs_error_pct: median,
        max_abs_error_pct: *abs_errors.last().unwrap_or(&0.0),
        min_abs_error_pct: *abs_errors.first().unwrap_or(&0.0),
        within_half_pct: within(0.5),
        within_one_pct: within(1.0),
        within_two_pct: within(2.0),
        direction_hit_rate_pct: hits / count * 100.0,
        days,
    })
}
