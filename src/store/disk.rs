use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use std::path::Path;
use tracing::debug;

use crate::core::subscription::{Subscription, SubscriptionStore};

/// Subscription store backed by an embedded fjall keyspace. Rows are
/// serde_json-encoded, keyed by subscription id; `mark_*` is a
/// read-modify-write on a single key.
pub struct FjallSubscriptionStore {
    _keyspace: Keyspace,
    partition: PartitionHandle,
}

impl FjallSubscriptionStore {
    pub fn new(db_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(db_path)?;

        let keyspace = fjall::Config::new(db_path.join("subscriptions"))
            .open()
            .context("Failed to open subscription keyspace")?;
        let partition = keyspace
            .open_partition("subscriptions", PartitionCreateOptions::default())
            .context("Failed to open subscription partition")?;

        Ok(Self {
            _keyspace: keyspace,
            partition,
        })
    }

    /// Inserts or replaces a subscription by id.
    pub fn upsert(&self, subscription: &Subscription) -> Result<()> {
        self.partition.insert(
            subscription.id.as_bytes(),
            serde_json::to_vec(subscription)?,
        )?;
        debug!(id = %subscription.id, "Subscription row written");
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        self.partition.remove(id.as_bytes())?;
        Ok(())
    }

    fn update_row(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut Subscription),
    ) -> Result<()> {
        let Some(raw) = self.partition.get(id.as_bytes())? else {
            debug!(%id, "Subscription row missing, mark skipped");
            return Ok(());
        };
        let mut subscription: Subscription =
            serde_json::from_slice(&raw).context("Corrupt subscription row")?;
        mutate(&mut subscription);
        self.partition
            .insert(id.as_bytes(), serde_json::to_vec(&subscription)?)?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for FjallSubscriptionStore {
    async fn list_active(&self) -> Result<Vec<Subscription>> {
        let mut subscriptions = Vec::new();
        for entry in self.partition.iter() {
            let (_, value) = entry?;
            let subscription: Subscription =
                serde_json::from_slice(&value).context("Corrupt subscription row")?;
            subscriptions.push(subscription);
        }
        Ok(subscriptions)
    }

    async fn mark_volatility_fired(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.update_row(id, |s| s.last_volatility_fired_at = Some(at))
    }

    async fn mark_digest_fired(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        self.update_row(id, |s| s.last_digest_fired_at = Some(at))
    }
}
