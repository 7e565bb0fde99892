//! Sina fund quote adapter, the secondary valuation source.
//!
//! The response is a single JS assignment:
//! `var hq_str_fu_005827="Name,15:00:00,1.234,1.230,...,0.33,2025-03-14";`
//! Fields: 0 name (GBK, ignored), 1 time, 2 estimate, 3 nav, 6 rate,
//! 7 date.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::core::error::SourceError;
use crate::core::valuation::{SourceId, ValuationRecord, ValuationSource};
use crate::providers::util::lenient_f64;

pub struct SinaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl SinaProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.to_string(),
            client,
        }
    }

    fn parse_valuation(code: &str, body: &str) -> Result<ValuationRecord, SourceError> {
        let payload = body
            .split('"')
            .nth(1)
            .ok_or_else(|| SourceError::parse(code, "no quoted payload in body"))?;

        let parts: Vec<&str> = payload.split(',').collect();
        if parts.len() < 8 {
            return Err(SourceError::parse(
                code,
                format!("expected at least 8 fields, got {}", parts.len()),
            ));
        }

        Ok(ValuationRecord {
            code: code.to_string(),
            // parts[0] is the fund name in GBK, often garbled; ignore it.
            name: None,
            nav: lenient_f64(parts.get(3).copied()),
            estimate: lenient_f64(parts.get(2).copied()),
            est_rate_pct: lenient_f64(parts.get(6).copied()),
            as_of: Some(format!("{} {}", parts[7], parts[1])),
            source: SourceId::Sina,
        })
    }
}

#[async_trait]
impl ValuationSource for SinaProvider {
    fn id(&self) -> SourceId {
        SourceId::Sina
    }

    #[instrument(name = "SinaFetch", skip(self), fields(code = %code))]
    async fn fetch(&self, code: &str) -> Result<ValuationRecord, SourceError> {
        let url = format!("{}/list=fu_{}", self.base_url, code);
        debug!("Requesting valuation from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Referer", "http://finance.sina.com.cn")
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

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HQ_BODY: &str =
        "var hq_str_fu_005827=\"某基金,15:00:00,2.3401,2.3170,2.3170,0,1.00,2025-03-14\";";

    #[test]
    fn test_parse_valuation() {
        let record = SinaProvider::parse_valuation("005827", HQ_BODY).unwrap();
        assert_eq!(record.estimate, 2.3401);
        assert_eq!(record.nav, 2.3170);
        assert_eq!(record.est_rate_pct, 1.00);
        assert_eq!(record.as_of.as_deref(), Some("2025-03-14 15:00:00"));
        assert_eq!(record.source, SourceId::Sina);
        assert!(record.name.is_none());
    }

    #[test]
    fn test_parse_too_few_fields() {
        let body = "var hq_str_fu_005827=\"a,b,c\";";
        let err = SinaProvider::parse_valuation("005827", body).unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[test]
    fn test_parse_empty_body() {
        let err = SinaProvider::parse_valuation("005827", "").unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_fetch_sends_referer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list=fu_005827"))
            .and(header("Referer", "http://finance.sina.com.cn"))
            .respond_with(ResponseTemplate::new(200).set_body_string(HQ_BODY))
            .mount(&server)
            .await;

        let provider = SinaProvider::new(&server.uri(), reqwest::Client::new());
        let record = provider.fetch("005827").await.unwrap();
        assert!(record.is_usable());
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list=fu_005827"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = SinaProvider::new(&server.uri(), reqwest::Client::new());
        let err = provider.fetch("005827").await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }
}
