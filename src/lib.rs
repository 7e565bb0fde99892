pub mod cli;
pub mod core;
pub mod model;
pub mod providers;
pub mod scheduler;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::core::clock::SystemClock;
use crate::core::config::AppConfig;
use crate::core::notify::LogSink;
use crate::providers::eastmoney::{EastmoneyProvider, PingzhongHistoryProvider};
use crate::providers::sina::SinaProvider;
use crate::scheduler::AlertScheduler;
use crate::store::FjallSubscriptionStore;

const EASTMONEY_DEFAULT_BASE: &str = "http://fundgz.1234567.com.cn";
const EASTMONEY_DETAIL_DEFAULT_BASE: &str = "http://fund.eastmoney.com";
const SINA_DEFAULT_BASE: &str = "http://hq.sinajs.cn";

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    }
}

/// Builds the multi-source resolver from configuration: Eastmoney as the
/// primary, Sina as the fallback.
pub fn build_resolver(config: &AppConfig) -> Result<Arc<providers::ValuationResolver>> {
    let client = providers::util::http_client()?;

    let eastmoney_base = config
        .providers
        .eastmoney
        .as_ref()
        .map_or(EASTMONEY_DEFAULT_BASE, |p| &p.base_url);
    let primary = Arc::new(EastmoneyProvider::new(eastmoney_base, client.clone()));

    let sina_base = config
        .providers
        .sina
        .as_ref()
        .map_or(SINA_DEFAULT_BASE, |p| &p.base_url);
    let secondary = Arc::new(SinaProvider::new(sina_base, client));

    Ok(Arc::new(providers::ValuationResolver::new(
        primary, secondary,
    )))
}

/// Starts the alert scheduling loop and runs it until Ctrl-C. The
/// in-flight tick finishes before shutdown completes.
pub async fn run_watch(config_path: Option<&str>) -> Result<()> {
    info!("fundwatch starting...");

    let config = load_config(config_path)?;
    debug!("Loaded config: {config:#?}");

    let resolver = build_resolver(&config)?;
    let store = Arc::new(FjallSubscriptionStore::new(&config.default_data_path()?)?);
    let sink = Arc::new(LogSink);
    let clock = Arc::new(SystemClock);

    let scheduler = Arc::new(AlertScheduler::new(
        resolver,
        store,
        sink,
        clock,
        Duration::from_secs(config.scheduler.interval_secs),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_handle = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        async move { scheduler.run(shutdown_rx).await }
    });

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");
    let _ = shutdown_tx.send(true);
    loop_handle.await?;

    Ok(())
}

/// Runs a backtest of the estimation model for one fund and prints the
/// report.
pub async fn run_backtest(config_path: Option<&str>, code: &str, window_days: usize) -> Result<()> {
    let config = load_config(config_path)?;
    debug!("Loaded config: {config:#?}");

    let client = providers::util::http_client()?;
    let detail_base = config
        .providers
        .eastmoney
        .as_ref()
        .and_then(|p| p.detail_base_url.as_deref())
        .unwrap_or(EASTMONEY_DETAIL_DEFAULT_BASE);
    let history_source = PingzhongHistoryProvider::new(detail_base, client);

    cli::backtest::run(&history_source, code, window_days).await
}
