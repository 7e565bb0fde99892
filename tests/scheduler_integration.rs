use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveTime};
use tokio::sync::Mutex;
use tracing::info;

use fundwatch::core::clock::Clock;
use fundwatch::core::notify::NotificationSink;
use fundwatch::core::subscription::{Subscription, SubscriptionStore};
use fundwatch::providers::ValuationResolver;
use fundwatch::providers::eastmoney::EastmoneyProvider;
use fundwatch::providers::sina::SinaProvider;
use fundwatch::scheduler::AlertScheduler;
use fundwatch::store::MemorySubscriptionStore;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn eastmoney_server(code: &str, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/js/{code}.js")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    pub async fn failing_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        server
    }

    pub async fn sina_server(code: &str, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/list=fu_{code}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }
}

struct RecordingSink {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> bool {
        info!(%recipient, %subject, "Recording delivery");
        self.sent.lock().await.push((
            recipient.to_string(),
            subject.to_string(),
            html_body.to_string(),
        ));
        true
    }
}

struct FixedClock(DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

fn fixed_clock(rfc3339: &str) -> Arc<FixedClock> {
    Arc::new(FixedClock(DateTime::parse_from_rfc3339(rfc3339).unwrap()))
}

fn subscription(id: &str, code: &str) -> Subscription {
    Subscription {
        id: id.to_string(),
        code: code.to_string(),
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

fn resolver(eastmoney_uri: &str, sina_uri: &str) -> Arc<ValuationResolver> {
    let client = reqwest::Client::new();
    Arc::new(ValuationResolver::new(
        Arc::new(EastmoneyProvider::new(eastmoney_uri, client.clone())),
        Arc::new(SinaProvider::new(sina_uri, client)),
    ))
}

const GZ_UP_BODY: &str = r#"jsonpgz({"fundcode":"005827","name":"Blue Chip Select","jzrq":"2025-03-13","dwjz":"2.3170","gsz":"2.3749","gszzl":"2.50","gztime":"2025-03-14 14:30"});"#;
const GZ_NO_SIGNAL_BODY: &str = r#"jsonpgz({"fundcode":"005827","name":"Blue Chip Select","jzrq":"2025-03-13","dwjz":"2.3170","gsz":"0.0000","gszzl":"0.00","gztime":"2025-03-14 14:30"});"#;
const HQ_UP_BODY: &str =
    "var hq_str_fu_005827=\"X,14:30:00,2.3866,2.3170,2.3170,0,3.00,2025-03-14\";";

#[test_log::test(tokio::test)]
async fn tick_fires_volatility_alert_from_primary_source() {
    let eastmoney = test_utils::eastmoney_server("005827", GZ_UP_BODY).await;
    let sina = test_utils::failing_server().await;

    let store = Arc::new(MemorySubscriptionStore::new());
    store.upsert(subscription("sub-1", "005827")).await;
    let sink = RecordingSink::new();

    let scheduler = AlertScheduler::new(
        resolver(&eastmoney.uri(), &sina.uri()),
        store.clone(),
        sink.clone(),
        fixed_clock("2025-03-14T14:35:00+08:00"),
        Duration::from_secs(300),
    );

    scheduler.tick().await.unwrap();

    let sent = sink.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "user@example.com");
    assert_eq!(
        sent[0].1,
        "[Volatility] Blue Chip Select (005827) estimated 2.5%"
    );
    assert!(sent[0].2.contains("upside threshold crossed (2%)"));
    drop(sent);

    let subs = store.list_active().await.unwrap();
    assert!(subs[0].last_volatility_fired_at.is_some());

    // A second tick the same day stays quiet.
    scheduler.tick().await.unwrap();
    assert_eq!(sink.sent.lock().await.len(), 1);
}

#[test_log::test(tokio::test)]
async fn tick_falls_back_to_sina_when_primary_has_no_signal() {
    let eastmoney = test_utils::eastmoney_server("005827", GZ_NO_SIGNAL_BODY).await;
    let sina = test_utils::sina_server("005827", HQ_UP_BODY).await;

    let store = Arc::new(MemorySubscriptionStore::new());
    store.upsert(subscription("sub-1", "005827")).await;
    let sink = RecordingSink::new();

    let scheduler = AlertScheduler::new(
        resolver(&eastmoney.uri(), &sina.uri()),
        store,
        sink.clone(),
        fixed_clock("2025-03-14T14:35:00+08:00"),
        Duration::from_secs(300),
    );

    scheduler.tick().await.unwrap();

    let sent = sink.sent.lock().await;
    assert_eq!(sent.len(), 1);
    // Rate comes from Sina, the name survives from the partial primary
    // record.
    assert_eq!(sent[0].1, "[Volatility] Blue Chip Select (005827) estimated 3%");
}

#[test_log::test(tokio::test)]
async fn tick_skips_fund_when_all_sources_fail() {
    let eastmoney = test_utils::failing_server().await;
    let sina = test_utils::failing_server().await;

    let store = Arc::new(MemorySubscriptionStore::new());
    store.upsert(subscription("sub-1", "005827")).await;
    let sink = RecordingSink::new();

    let scheduler = AlertScheduler::new(
        resolver(&eastmoney.uri(), &sina.uri()),
        store.clone(),
        sink.clone(),
        fixed_clock("2025-03-14T14:35:00+08:00"),
        Duration::from_secs(300),
    );

    scheduler.tick().await.unwrap();

    assert!(sink.sent.lock().await.is_empty());
    let subs = store.list_active().await.unwrap();
    assert!(subs[0].last_volatility_fired_at.is_none());
}

#[test_log::test(tokio::test)]
async fn digest_and_volatility_fire_independently() {
    let eastmoney = test_utils::eastmoney_server("005827", GZ_UP_BODY).await;
    let sina = test_utils::failing_server().await;

    let mut sub = subscription("sub-1", "005827");
    sub.digest_enabled = true;
    let store = Arc::new(MemorySubscriptionStore::new());
    store.upsert(sub).await;
    let sink = RecordingSink::new();

    let scheduler = AlertScheduler::new(
        resolver(&eastmoney.uri(), &sina.uri()),
        store.clone(),
        sink.clone(),
        fixed_clock("2025-03-14T14:50:00+08:00"),
        Duration::from_secs(300),
    );

    scheduler.tick().await.unwrap();

    let sent = sink.sent.lock().await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|(_, s, _)| s.starts_with("[Volatility]")));
    assert!(sent.iter().any(|(_, s, _)| s.starts_with("[Daily digest]")));
    drop(sent);

    let subs = store.list_active().await.unwrap();
    assert!(subs[0].last_volatility_fired_at.is_some());
    assert!(subs[0].last_digest_fired_at.is_some());
}
