//! Chart trading terminal entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Chart trading terminal
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via TAPE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tape_app::init_logging();
    info!("Starting tape v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .or_else(|| std::env::var("TAPE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());
    info!(config_path = %config_path, "Loading configuration");

    let config = tape_app::AppConfig::from_file(&config_path)?;
    info!(
        accounts = config.accounts.len(),
        chart_symbol = %config.chart_symbol,
        "Configuration loaded"
    );

    let app = tape_app::Application::new(config)?;

    let shutdown = app.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    app.run().await?;
    Ok(())
}
