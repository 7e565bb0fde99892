use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::subscription::{Subscription, SubscriptionStore};

/// In-memory subscription store. Used in tests and by hosts that manage
/// persistence themselves.
pub struct MemorySubscriptionStore {
    inner: Mutex<BTreeMap<String, Subscription>>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    /// Inserts or replaces a subscription by id.
    pub async fn upsert(&self, subscription: Subscription) {
        let mut subs = self.inner.lock().await;
        debug!(id = %subscription.id, code = %subscription.code, "Subscription upserted");
        subs.insert(subscription.id.clone(), subscription);
    }
}

impl Default for MemorySubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn list_active(&self) -> Result<Vec<Subscription>> {
        Ok(self.inner.lock().await.values().cloned().collect())
    }

    async fn mark_volatility_fired(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut subs = self.inner.lock().await;
        if let Some(sub) = subs.get_mut(id) {
            sub.last_volatility_fired_at = Some(at);
        }
        Ok(())
    }

    async fn mark_digest_fired(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut subs = self.inner.lock().await;
        if let Some(sub) = subs.get_mut(id) {
            sub.last_digest_fired_at = Some(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn subscription(id: &str) -> Subscription {
        Subscription {
            id: id.to_string(),
            code: "005827".to_string(),
            recipient: "user@example.com".to_string(),
            threshold_up: 2.0,
            threshold_down: -2.0,
            volatility_enabled: true,
            digest_enabled: false,
            digest_time: NaiveTime::from_hms_opt(14, 45, 0).unwrap(),
            last_volatility_fired_at: None,
            last_digest_fired_at: None,
        }
    }

    #[tokio::test]
    async fn upsert_and_list() {
        let store = MemorySubscriptionStore::new();
        assert!(store.list_active().await.unwrap().is_empty());

        store.upsert(subscription("a")).await;
        store.upsert(subscription("b")).await;
        assert_eq!(store.list_active().await.unwrap().len(), 2);

        // Upsert by id replaces.
        let mut replacement = subscription("a");
        replacement.threshold_up = 3.0;
        store.upsert(replacement).await;
        let subs = store.list_active().await.unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs.iter().find(|s| s.id == "a").unwrap().threshold_up, 3.0);
    }

    #[tokio::test]
    async fn marks_update_only_the_target_row() {
        let store = MemorySubscriptionStore::new();
        store.upsert(subscription("a")).await;
        store.upsert(subscription("b")).await;

        let at = Utc::now();
        store.mark_volatility_fired("a", at).await.unwrap();
        store.mark_digest_fired("b", at).await.unwrap();

        let subs = store.list_active().await.unwrap();
        let a = subs.iter().find(|s| s.id == "a").unwrap();
        let b = subs.iter().find(|s| s.id == "b").unwrap();
        assert_eq!(a.last_volatility_fired_at, Some(at));
        assert!(a.last_digest_fired_at.is_none());
        assert_eq!(b.last_digest_fired_at, Some(at));
        assert!(b.last_volatility_fired_at.is_none());
    }

    #[tokio::test]
    async fn marking_unknown_id_is_a_no_op() {
        let store = MemorySubscriptionStore::new();
        store
            .mark_volatility_fired("missing", Utc::now())
            .await
            .unwrap();
        assert!(store.list_active().await.unwrap().is_empty());
    }
}
