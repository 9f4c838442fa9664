//! DTC broker event pipeline - entry point.

use anyhow::Result;
use clap::Parser;
use dtc_telemetry::LogFormat;
use tracing::info;

/// DTC broker event pipeline client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DTC_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    dtc_telemetry::init_logging(LogFormat::from_env(), None)?;

    info!("Starting dtc-client v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > DTC_CONFIG env var > default
    let config = match args.config {
        Some(path) => dtc_client::AppConfig::from_file(&path)?,
        None => dtc_client::AppConfig::load()?,
    };
    info!(
        host = %config.connection.host,
        port = config.connection.port,
        "Configuration loaded"
    );

    let mut app = dtc_client::Application::new(config)?;
    app.run().await?;

    Ok(())
}
