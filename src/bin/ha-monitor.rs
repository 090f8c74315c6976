//! HA monitor node.
//!
//! Loads configuration, bootstraps the HA system and runs the control loop
//! until Ctrl-C.

use anyhow::Context;
use ha_core::config::ConfigLoader;
use ha_core::logging::init_structured_logging;
use ha_core::orchestration::HaSystem;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let config_path = ConfigLoader::config_path();
    let config = ConfigLoader::load_from_path(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    let system = HaSystem::bootstrap(config)
        .await
        .context("bootstrapping HA system")?;
    let mut handle = system.start();
    info!(status = ?handle.status(), "🚀 HA monitor running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutdown signal received");

    handle.stop().await.context("stopping HA system")?;
    Ok(())
}
