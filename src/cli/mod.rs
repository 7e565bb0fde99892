pub mod backtest;
pub mod ui;
