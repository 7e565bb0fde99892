//! Multi-source valuation resolution: primary first, secondary as
//! fallback, with field-level overlay when the primary was partial.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::core::valuation::{ValuationRecord, ValuationSource};

pub struct ValuationResolver {
    primary: Arc<dyn ValuationSource>,
    secondary: Arc<dyn ValuationSource>,
}

impl ValuationResolver {
    pub fn new(primary: Arc<dyn ValuationSource>, secondary: Arc<dyn ValuationSource>) -> Self {
        Self { primary, secondary }
    }

    /// Returns one canonical record for `code`, or `None` when no source
    /// had a usable signal. Adapter failures are absorbed here; callers
    /// must treat `None` as "skip this fund this tick", never as zero
    /// valuation data. There are no retries within a single call.
    #[instrument(name = "Resolve", skip(self), fields(code = %code))]
    pub async fn resolve(&self, code: &str) -> Option<ValuationRecord> {
        let primary = match self.primary.fetch(code).await {
            Ok(record) if record.is_usable() => {
                debug!(source = %record.source, "Primary source usable");
                return Some(record);
            }
            Ok(record) => {
                debug!(source = %record.source, "Primary source returned no signal");
                Some(record)
            }
            Err(e) => {
                warn!("{e}");
                None
            }
        };

        match self.secondary.fetch(code).await {
            Ok(secondary) => {
                let merged = match primary {
                    Some(mut partial) => {
                        partial.fill_missing_from(&secondary);
                        partial
                    }
                    None => secondary,
                };
                merged.is_usable().then_some(merged)
            }
            Err(e) => {
                warn!("{e}");
                // Never hand a zero-estimate record to the caller.
                primary.filter(|r| r.is_usable())
            }
        }
    }
}
