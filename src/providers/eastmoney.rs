//! Eastmoney (Tiantian Jijin) adapters: the primary real-time valuation
//! source, plus the `pingzhongdata` bundle used for historical NAV
//! series.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::clock::reference_offset;
use crate::core::error::SourceError;
use crate::core::history::{HistoricalPoint, HistorySource};
use crate::core::valuation::{SourceId, ValuationRecord, ValuationSource};
use crate::providers::util::lenient_f64;

pub struct EastmoneyProvider {
    base_url: String,
    client: reqwest::Client,
}

/// Payload inside the `jsonpgz(...)` wrapper. All numerics arrive as
/// strings.
#[derive(Debug, Deserialize)]
struct GzResponse {
    name: Option<String>,
    /// Last official NAV.
    dwjz: Option<String>,
    /// Intraday estimate.
    gsz: Option<String>,
    /// Estimate rate, signed percent.
    gszzl: Option<String>,
    /// Provider's valuation time string.
    gztime: Option<String>,
}

impl EastmoneyProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            client,
        }
    }

    /// Extracts the JSON argument of the `jsonpgz(...)` callback. The
    /// trailing semicolon is optional in practice.
    fn unwrap_jsonp(body: &str) -> Option<&str> {
        let start = body.find("jsonpgz(")? + "jsonpgz(".len();
        let end = body.rfind(')')?;
        if end <= start {
            return None;
        }
        let inner = body[start..end].trim();
        (!inner.is_empty()).then_some(inner)
    }

    fn parse_valuation(code: &str, body: &str) -> Result<ValuationRecord, SourceError> {
        let inner = Self::unwrap_jsonp(body)
            .ok_or_else(|| SourceError::parse(code, "no jsonpgz payload in body"))?;

        let gz: GzResponse = serde_json::from_str(inner)
            .map_err(|e| SourceError::parse(code, format!("bad jsonpgz JSON: {e}")))?;

        Ok(ValuationRecord {
            code: code.to_string(),
            name: gz.name,
            nav: lenient_f64(gz.dwjz.as_deref()),
            estimate: lenient_f64(gz.gsz.as_deref()),
            est_rate_pct: lenient_f64(gz.gszzl.as_deref()),
            as_of: gz.gztime,
            source: SourceId::Eastmoney,
        })
    }
}

#[async_trait]
impl ValuationSource for EastmoneyProvider {
    fn id(&self) -> SourceId {
        SourceId::Eastmoney
    }

    #[instrument(name = "EastmoneyFetch", skip(self), fields(code = %code))]
    async fn fetch(&self, code: &str) -> Result<ValuationRecord, SourceError> {
        let url = format!(
            "{}/js/{}.js?rt={}",
            self.base_url,
            code,
            Utc::now().timestamp_millis()
        );
        debug!("Requesting valuation from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::unavailable(code, e))?;

        if !response.status().is_success() {
            return Err(SourceError::unavailable(
                code,
                format!("HTTP {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::unavailable(code, e))?;

        Self::parse_valuation(code, &body)
    }
}

/// Historical NAV series from the Eastmoney `pingzhongdata` JS bundle.
/// The bundle is a pile of `var` assignments; only `Data_netWorthTrend`
/// is of interest here.
pub struct PingzhongHistoryProvider {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TrendPoint {
    /// Millisecond timestamp.
    x: i64,
    /// NAV for that day.
    y: f64,
}

impl PingzhongHistoryProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            client,
        }
    }

    fn parse_trend(body: &str) -> Result<Vec<HistoricalPoint>> {
        let marker = body
            .find("Data_netWorthTrend")
            .ok_or_else(|| anyhow!("Data_netWorthTrend not found in bundle"))?;
        let rest = &body[marker..];
        let start = rest
            .find('[')
            .ok_or_else(|| anyhow!("Data_netWorthTrend has no array start"))?;
        let end = rest
            .find("];")
            .ok_or_else(|| anyhow!("Data_netWorthTrend has no array end"))?;
        if end < start {
            return Err(anyhow!("Data_netWorthTrend array is malformed"));
        }

        let raw: Vec<TrendPoint> = serde_json::from_str(&rest[start..=end])?;

        let offset = reference_offset();
        let mut points: Vec<HistoricalPoint> = raw
            .into_iter()
            .filter_map(|p| {
                let date = chrono::DateTime::from_timestamp_millis(p.x)?
                    .with_timezone(&offset)
                    .date_naive();
                Some(HistoricalPoint { date, nav: p.y })
            })
            .collect();

        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Ok(points)
    }
}

#[async_trait]
impl HistorySource for PingzhongHistoryProvider {
    #[instrument(name = "PingzhongHistoryFetch", skip(self), fields(code = %code))]
    async fn fetch_history(&self, code: &str) -> Result<Vec<HistoricalPoint>> {
        let url = format!("{}/pingzhongdata/{}.js", self.base_url, code);
        debug!("Requesting history from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for fund: {}", response.status(), code));
        }

        let body = response.text().await?;
        Self::parse_trend(&body)
    }
}
