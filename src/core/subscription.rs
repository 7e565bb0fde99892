//! Alert subscriptions and the persistence contract behind them.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

fn default_digest_time() -> NaiveTime {
    NaiveTime::from_hms_opt(14, 45, 0).unwrap()
}

/// Digest times are stored as "HH:MM" strings; seconds are tolerated on
/// input.
mod digest_time_format {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

/// One alert configuration: a fund code, a recipient and the conditions
/// under which they are notified.
///
/// The scheduler mutates only the two `last_*_fired_at` timestamps, and
/// only through [`SubscriptionStore`]. Everything else belongs to the
/// hosting application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub code: String,
    pub recipient: String,
    /// Fires when the estimated rate rises to this or above. Ignored
    /// unless positive.
    #[serde(default)]
    pub threshold_up: f64,
    /// Fires when the estimated rate falls to this or below. Ignored
    /// unless negative.
    #[serde(default)]
    pub threshold_down: f64,
    #[serde(default)]
    pub volatility_enabled: bool,
    #[serde(default)]
    pub digest_enabled: bool,
    /// Local civil time of day after which the daily digest may fire.
    #[serde(default = "default_digest_time", with = "digest_time_format")]
    pub digest_time: NaiveTime,
    #[serde(default)]
    pub last_volatility_fired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_digest_fired_at: Option<DateTime<Utc>>,
}

/// Persistence contract the scheduler needs from the hosting application.
///
/// `mark_*` updates must be atomic per subscription id; the core does no
/// locking of its own around persisted state.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn list_active(&self) -> Result<Vec<Subscription>>;

    async fn mark_volatility_fired(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    async fn mark_digest_fired(&self, id: &str, at: DateTime<Utc>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let yaml = r#"
id: "sub-1"
code: "005827"
recipient: "user@example.com"
threshold_up: 2.0
volatility_enabled: true
"#;
        let sub: Subscription = serde_yaml::from_str(yaml).expect("Failed to deserialize");
        assert_eq!(sub.id, "sub-1");
        assert_eq!(sub.threshold_up, 2.0);
        assert_eq!(sub.threshold_down, 0.0);
        assert!(sub.volatility_enabled);
        assert!(!sub.digest_enabled);
        assert_eq!(sub.digest_time, NaiveTime::from_hms_opt(14, 45, 0).unwrap());
        assert!(sub.last_volatility_fired_at.is_none());
        assert!(sub.last_digest_fired_at.is_none());
    }

    #[test]
    fn digest_time_accepts_hh_mm() {
        let yaml = r#"
id: "sub-1"
code: "005827"
recipient: "user@example.com"
digest_enabled: true
digest_time: "09:30"
"#;
        let sub: Subscription = serde_yaml::from_str(yaml).expect("Failed to deserialize");
        assert_eq!(sub.digest_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());

        let round_trip = serde_yaml::to_string(&sub).unwrap();
        assert!(round_trip.contains("09:30"));
    }
}
