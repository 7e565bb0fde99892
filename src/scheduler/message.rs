//! Alert message formatting.

use chrono::{DateTime, FixedOffset};

use crate::core::valuation::ValuationRecord;

/// Why a volatility alert fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerReason {
    /// `est_rate_pct` rose to or above the configured threshold.
    Upside { threshold: f64 },
    /// `est_rate_pct` fell to or below the configured threshold.
    Downside { threshold: f64 },
}

#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub subject: String,
    pub html_body: String,
}

fn display_name(record: &ValuationRecord) -> &str {
    record.name.as_deref().unwrap_or(&record.code)
}

pub fn volatility(record: &ValuationRecord, reason: TriggerReason) -> AlertMessage {
    let name = display_name(record);
    let reason_text = match reason {
        TriggerReason::Upside { threshold } => format!(
            "up {}%, upside threshold crossed ({}%)",
            record.est_rate_pct, threshold
        ),
        TriggerReason::Downside { threshold } => format!(
            "down {}%, downside threshold crossed ({}%)",
            record.est_rate_pct, threshold
        ),
    };

    AlertMessage {
        subject: format!(
            "[Volatility] {} ({}) estimated {}%",
            name, record.code, record.est_rate_pct
        ),
        html_body: format!(
            "<h3>Fund volatility alert</h3>\
             <p>Fund: {} ({})</p>\
             <p>Current estimated change: <b>{}%</b></p>\
             <p>Trigger: {}</p>\
             <p>Valuation time: {}</p>\
             <hr/>\
             <p>Sent automatically by fundwatch.</p>",
            name,
            record.code,
            record.est_rate_pct,
            reason_text,
            record.as_of.as_deref().unwrap_or("n/a"),
        ),
    }
}

pub fn digest(record: &ValuationRecord, now: DateTime<FixedOffset>) -> AlertMessage {
    let name = display_name(record);
    AlertMessage {
        subject: format!("[Daily digest] {} ({})", name, record.code),
        html_body: format!(
            "<h3>Daily fund digest</h3>\
             <p>Fund: {} ({})</p>\
             <p>Latest estimate: {}</p>\
             <p>Estimated change today: <b>{}%</b></p>\
             <p>Digest time: {}</p>\
             <hr/>\
             <p>Sent automatically by fundwatch.</p>",
            name,
            record.code,
            record.estimate,
            record.est_rate_pct,
            now.format("%Y-%m-%d %H:%M:%S"),
        ),
    }
}
