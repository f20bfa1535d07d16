//! termrd - Terminal Routing Daemon.

use termrd::config::{Config, LogFormat};
use termrd::{Daemon, metrics};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "termrd.toml".to_string());

    // Parse before logging exists so the log format can come from the file
    let config = Config::load(&config_path);
    let log_format = config
        .as_ref()
        .map(|c| c.server.log_format)
        .unwrap_or_default();
    init_tracing(log_format);

    let config = config.map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;
    if let Err(errors) = termrd::config::validate(&config) {
        for e in &errors {
            error!(error = %e, "invalid_configuration");
        }
        anyhow::bail!("refusing to start with {} configuration error(s)", errors.len());
    }

    info!(
        server = %config.server.name,
        application_id = %config.server.application_id,
        "Starting termrd"
    );

    metrics::init();

    let shutdown = CancellationToken::new();
    let daemon = Daemon::start(&config, shutdown.clone()).await?;

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => error!(error = %e, "Failed to listen for ctrl-c, shutting down"),
    }
    daemon.shutdown().await;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}
