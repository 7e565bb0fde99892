//! Historical NAV series abstractions.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One `(date, nav)` observation. Series are ordered ascending by date,
/// one point per trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub nav: f64,
}

/// Supplies the historical NAV series behind estimation and backtesting.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_history(&self, code: &str) -> Result<Vec<HistoricalPoint>>;
}
