//! media-dl server
//!
//! Environment:
//! - `MEDIA_DL_CONFIG`: optional path to a JSON config file
//! - `PORT`: overrides the port of the configured bind address
//! - `RUST_LOG`: log filter (default `media_dl=info,tower_http=info`)

use media_dl::{Config, JobManager, run_with_shutdown};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn load_config() -> media_dl::Result<Config> {
    let mut config = match std::env::var("MEDIA_DL_CONFIG").ok().map(PathBuf::from) {
        Some(path) => Config::from_json_file(&path)?,
        None => Config::default(),
    };

    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
        config.api.bind_address.set_port(port);
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("media_dl=info,tower_http=info")),
        )
        .init();

    let config = load_config()?;
    let manager = JobManager::new(config).await?;

    tracing::info!(
        extractor = manager.extractor_name(),
        address = %manager.get_config().api.bind_address,
        "media-dl starting"
    );

    let api = manager.spawn_api_server();

    run_with_shutdown(manager).await?;

    match api.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "API server exited with error"),
        Err(e) => tracing::error!(error = %e, "API server task panicked"),
    }

    Ok(())
}
