//! The alert scheduling loop.
//!
//! One background task re-evaluates every active subscription on a fixed
//! cadence. Each subscription may fire its volatility alert and its daily
//! digest at most once per civil day (reference offset, UTC+8); the state
//! behind that guarantee is nothing more than the two persisted
//! "last fired" timestamps, re-read fresh every tick.

pub mod message;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::core::clock::{Clock, reference_offset};
use crate::core::notify::NotificationSink;
use crate::core::subscription::{Subscription, SubscriptionStore};
use crate::core::valuation::ValuationRecord;
use crate::providers::ValuationResolver;
use message::TriggerReason;

pub struct AlertScheduler {
    resolver: Arc<ValuationResolver>,
    store: Arc<dyn SubscriptionStore>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

/// True when `at` falls on `today` in the reference offset.
fn fired_on(at: Option<DateTime<Utc>>, today: NaiveDate) -> bool {
    at.is_some_and(|t| t.with_timezone(&reference_offset()).date_naive() == today)
}

impl AlertScheduler {
    pub fn new(
        resolver: Arc<ValuationResolver>,
        store: Arc<dyn SubscriptionStore>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            resolver,
            store,
            sink,
            clock,
            interval,
        }
    }

    /// Runs tick cycles until `shutdown` flips to true. Ticks are serial:
    /// a slow tick delays the next one, it is never run concurrently with
    /// it. The in-flight tick finishes before this returns.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "Alert scheduler started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    match result {
                        Ok(()) if !*shutdown.borrow() => continue,
                        _ => {
                            info!("Shutdown signal received");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "Scheduler tick failed");
                    }
                }
            }
        }

        info!("Alert scheduler stopped");
    }

    /// One evaluation cycle over all active subscriptions.
    #[instrument(name = "SchedulerTick", skip(self))]
    pub async fn tick(&self) -> Result<()> {
        let subscriptions = self.store.list_active().await?;
        if subscriptions.is_empty() {
            debug!("No active subscriptions");
            return Ok(());
        }

        let valuations = self.resolve_distinct_codes(&subscriptions).await;

        let now = self.clock.now();
        let today = now.date_naive();

        for subscription in &subscriptions {
            let Some(Some(record)) = valuations.get(&subscription.code) else {
                debug!(code = %subscription.code, "No usable valuation, skipping this tick");
                continue;
            };
            // One subscription's failure must not abort the rest of the
            // tick.
            self.evaluate(subscription, record, now, today).await;
        }

        Ok(())
    }

    /// Resolves each distinct fund code at most once, concurrently. The
    /// resulting map is the per-tick cache shared by every subscription
    /// on the same code; it dies with the tick.
    async fn resolve_distinct_codes(
        &self,
        subscriptions: &[Subscription],
    ) -> HashMap<String, Option<ValuationRecord>> {
        let codes: BTreeSet<&str> = subscriptions.iter().map(|s| s.code.as_str()).collect();

        let futures = codes.into_iter().map(|code| async move {
            (code.to_string(), self.resolver.resolve(code).await)
        });

        join_all(futures).await.into_iter().collect()
    }

    async fn evaluate(
        &self,
        subscription: &Subscription,
        record: &ValuationRecord,
        now: DateTime<FixedOffset>,
        today: NaiveDate,
    ) {
        if subscription.volatility_enabled
            && !fired_on(subscription.last_volatility_fired_at, today)
        {
            self.evaluate_volatility(subscription, record, now).await;
        }

        if subscription.digest_enabled
            && !fired_on(subscription.last_digest_fired_at, today)
            && now.time() >= subscription.digest_time
        {
            self.send_digest(subscription, record, now).await;
        }
    }

    async fn evaluate_volatility(
        &self,
        subscription: &Subscription,
        record: &ValuationRecord,
        now: DateTime<FixedOffset>,
    ) {
        let reason = if subscription.threshold_up > 0.0
            && record.est_rate_pct >= subscription.threshold_up
        {
            TriggerReason::Upside {
                threshold: subscription.threshold_up,
            }
        } else if subscription.threshold_down < 0.0
            && record.est_rate_pct <= subscription.threshold_down
        {
            TriggerReason::Downside {
                threshold: subscription.threshold_down,
            }
        } else {
            return;
        };

        let msg = message::volatility(record, reason);
        if self
            .sink
            .send(&subscription.recipient, &msg.subject, &msg.html_body)
            .await
        {
            info!(
                subscription = %subscription.id,
                code = %record.code,
                rate = record.est_rate_pct,
                "Volatility alert delivered"
            );
            if let Err(e) = self
                .store
                .mark_volatility_fired(&subscription.id, now.with_timezone(&Utc))
                .await
            {
                warn!(subscription = %subscription.id, error = %e, "Failed to persist volatility fire");
            }
        } else {
            // Fire-state untouched: the next tick retries.
            warn!(
                subscription = %subscription.id,
                code = %record.code,
                "Volatility alert delivery failed, will retry next tick"
            );
        }
    }

    async fn send_digest(
        &self,
        subscription: &Subscription,
        record: &ValuationRecord,
        now: DateTime<FixedOffset>,
    ) {
        let msg = message::digest(record, now);
        if self
            .sink
            .send(&subscription.recipient, &msg.subject, &msg.html_body)
            .await
        {
            info!(
                subscription = %subscription.id,
                code = %record.code,
                "Daily digest delivered"
            );
            if let Err(e) = self
                .store
                .mark_digest_fired(&subscription.id, now.with_timezone(&Utc))
                .await
            {
                warn!(subscription = %subscription.id, error = %e, "Failed to persist digest fire");
            }
        } else {
            warn!(
                subscription = %subscription.id,
                code = %record.code,
                "Digest delivery failed, will retry next tick"
            );
        }
    }
}
