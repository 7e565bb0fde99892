//! Forecasting and backtesting over historical NAV series.

pub mod backtest;
pub mod estimate;

pub use backtest::{BacktestDay, BacktestReport, backtest};
pub use estimate::{EstimationResult, MIN_POINTS, RECENCY_WEIGHTS, estimate};
