//! filebrowser server
//!
//! Serves the directory named by `BASEPATH` (default: the working directory)
//! on `0.0.0.0:8080`. See [`filebrowser::config`] for the other environment
//! variables.

use std::sync::Arc;

use filebrowser::{Config, FileManager, run_with_shutdown};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let config = Config::from_env()?;
    let manager = Arc::new(FileManager::new(config).await?);

    let api_handle = manager.spawn_api_server();

    tokio::select! {
        result = run_with_shutdown(&manager) => result?,
        joined = api_handle => {
            // The server only returns on failure (e.g. address in use)
            joined??;
            manager.shutdown().await?;
        }
    }

    Ok(())
}
