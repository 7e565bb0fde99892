//! Resolved real-time valuation state for a single fund.

use std::fmt::Display;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::SourceError;

/// Which upstream adapter supplied the primary fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceId {
    Eastmoney,
    Sina,
}

impl Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SourceId::Eastmoney => "eastmoney",
                SourceId::Sina => "sina",
            }
        )
    }
}

/// One fund's resolved intraday state.
///
/// `nav` is the last official net asset value, `estimate` the intraday
/// projection and `est_rate_pct` the signed percent change of the estimate
/// against the nav. `as_of` is the provider's own time string, passed
/// through verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationRecord {
    pub code: String,
    pub name: Option<String>,
    pub nav: f64,
    pub estimate: f64,
    pub est_rate_pct: f64,
    pub as_of: Option<String>,
    pub source: SourceId,
}

impl ValuationRecord {
    /// A record carries a signal only when its estimate is non-zero.
    /// A zero estimate means the provider had nothing for this fund
    /// and fallback should be attempted.
    pub fn is_usable(&self) -> bool {
        self.estimate != 0.0
    }

    /// Overlays `other`'s fields onto this record, but only where this
    /// record left them empty or zero. Used when the primary source
    /// returned a partial record and the secondary filled the gaps.
    pub fn fill_missing_from(&mut self, other: &ValuationRecord) {
        if self.name.is_none() {
            self.name = other.name.clone();
        }
        if self.nav == 0.0 {
            self.nav = other.nav;
        }
        if self.estimate == 0.0 {
            self.estimate = other.estimate;
            self.est_rate_pct = other.est_rate_pct;
            self.source = other.source;
        }
        if self.as_of.is_none() {
            self.as_of = other.as_of.clone();
        }
    }
}

/// One upstream valuation provider.
#[async_trait]
pub trait ValuationSource: Send + Sync {
    fn id(&self) -> SourceId;

    async fn fetch(&self, code: &str) -> Result<ValuationRecord, SourceError>;
}
