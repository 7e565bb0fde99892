use anyhow::Result;
use std::time::Duration;

/// Upstream fetch timeout. A single unresponsive provider must not be
/// able to stall a scheduler tick beyond this.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the shared HTTP client used by all providers. Connection
/// pooling lives here; providers themselves stay stateless.
pub fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent("fundwatch/0.2")
        .timeout(FETCH_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Parses provider numerics leniently: these arrive as JSON strings or
/// bare CSV fields, and an unparsable or absent value means "no data",
/// not a hard failure.
pub fn lenient_f64(value: Option<&str>) -> f64 {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(0.0)
}
