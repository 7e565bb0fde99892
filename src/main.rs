use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fundwatch::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the alert scheduling loop until interrupted
    Run,
    /// Replay the estimation model over a fund's NAV history
    Backtest {
        /// Exchange fund code, e.g. 005827
        code: String,
        /// Number of trailing trading days to replay
        #[arg(short, long, default_value_t = 30)]
        window: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(Commands::Run) => fundwatch::run_watch(cli.config_path.as_deref()).await,
        Some(Commands::Backtest { code, window }) => {
            fundwatch::run_backtest(cli.config_path.as_deref(), &code, window).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = fundwatch::core::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
providers:
  eastmoney:
    base_url: "http://fundgz.1234567.com.cn"
    detail_base_url: "http://fund.eastmoney.com"
  sina:
    base_url: "http://hq.sinajs.cn"

scheduler:
  interval_secs: 300
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
