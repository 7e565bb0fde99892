//! Notification delivery abstractions.

use async_trait::async_trait;
use tracing::info;

/// Delivers a formatted alert to a recipient.
///
/// Delivery is best-effort: implementations must not panic or error on
/// transient failure, they return `false` and the scheduler retries on a
/// later tick.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> bool;
}

/// Sink that only logs. Used when no delivery channel is configured, so
/// the scheduler can run (and be observed) without a mail relay.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, recipient: &str, subject: &str, _html_body: &str) -> bool {
        info!(%recipient, %subject, "Notification (log only)");
        true
    }
}
