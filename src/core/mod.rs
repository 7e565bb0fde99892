//! Core business logic abstractions

pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod log;
pub mod notify;
pub mod subscription;
pub mod valuation;

// Re-export main types for cleaner imports
pub use clock::{Clock, SystemClock};
pub use error::{EstimateError, SourceError};
pub use history::{HistoricalPoint, HistorySource};
pub use notify::NotificationSink;
pub use subscription::{Subscription, SubscriptionStore};
pub use valuation::{SourceId, ValuationRecord, ValuationSource};
