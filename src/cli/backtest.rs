//! `backtest` subcommand: replay the estimation model over a fund's
//! history and print error statistics.

use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::ui;
use crate::core::history::HistorySource;
use crate::model;

pub async fn run(history_source: &dyn HistorySource, code: &str, window_days: usize) -> Result<()> {
    let history = history_source
        .fetch_history(code)
        .await
        .with_context(|| format!("Failed to fetch history for {code}"))?;
    debug!(points = history.len(), "Fetched history");

    let report = model::backtest(&history, window_days)
        .with_context(|| format!("Backtest failed for {code}"))?;

    println!(
        "\n{}",
        ui::style_text(
            &format!("Backtest: {code}, last {window_days} trading days"),
            ui::StyleType::Title
        )
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Actual"),
        ui::header_cell("Predicted"),
        ui::header_cell("Error"),
        ui::header_cell("Direction"),
    ]);
    for day in &report.days {
        table.add_row(vec![
            ui::value_cell(day.date.to_string()),
            ui::value_cell(format!("{:.4}", day.actual)),
            ui::value_cell(format!("{:.4}", day.predicted)),
            ui::change_cell(day.error_rate_pct),
            ui::marker_cell(day.direction_correct),
        ]);
    }
    println!("{table}");

    println!(
        "{} mean {:.2}%  median {:.2}%  max {:.2}%  min {:.2}%",
        ui::style_text("Absolute error:", ui::StyleType::TotalLabel),
        report.mean_abs_error_pct,
        report.median_abs_error_pct,
        report.max_abs_error_pct,
        report.min_abs_error_pct,
    );
    println!(
        "{} ≤0.5%: {:.0}%  ≤1.0%: {:.0}%  ≤2.0%: {:.0}%",
        ui::style_text("Within band:", ui::StyleType::TotalLabel),
        report.within_half_pct,
        report.within_one_pct,
        report.within_two_pct,
    );
    println!(
        "{} {}",
        ui::style_text("Direction hit rate:", ui::StyleType::TotalLabel),
        ui::style_text(
            &format!("{:.0}%", report.direction_hit_rate_pct),
            ui::StyleType::TotalValue
        ),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::HistoricalPoint;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct FixedHistory(Vec<HistoricalPoint>);

    #[async_trait]
    impl HistorySource for FixedHistory {
        async fn fetch_history(&self, _code: &str) -> Result<Vec<HistoricalPoint>> {
            Ok(self.0.clone())
        }
    }

    fn series(len: usize) -> Vec<HistoricalPoint> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        (0..len)
            .map(|i| HistoricalPoint {
                date: start + chrono::Duration::days(i as i64),
                nav: 1.0 + i as f64 * 0.01,
            })
            .collect()
    }

    #[tokio::test]
    async fn renders_report_for_sufficient_history() {
        let source = FixedHistory(series(40));
        run(&source, "005827", 10).await.unwrap();
    }

    #[tokio::test]
    async fn insufficient_history_is_an_error() {
        let source = FixedHistory(series(5));
        let err = run(&source, "005827", 30).await.unwrap_err();
        assert!(err.to_string().contains("Backtest failed"));
    }
}
