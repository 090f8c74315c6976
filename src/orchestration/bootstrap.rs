//! # HA System Bootstrap
//!
//! Builds a running HA node from an [`HaConfig`]:
//!
//! - **Store selection**: PostgreSQL when `database.url` is set, otherwise the
//!   in-process store
//! - **Provider installation**: the simulator provider, with its tunables
//!   taken from `[providers.SimulatorHaProvider]`
//! - **Lifecycle**: `start()` spawns the control loop and returns a handle
//!   that stops it

use crate::config::HaConfig;
use crate::database::{InMemoryHaStore, PgHaStore};
use crate::error::{HaError, HaResult};
use crate::orchestration::manager::{HaManager, HaManagerConfig};
use crate::provider::simulator::SIMULATOR_PROVIDER_NAME;
use crate::provider::SimulatorHaProvider;
use crate::registry::ProviderRegistry;
use crate::state_machine::HaRecordStore;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

/// A bootstrapped, not yet running, HA node
#[derive(Debug)]
pub struct HaSystem {
    config: HaConfig,
    backend: StoreBackend,
    manager: Arc<HaManager>,
    simulator: Arc<SimulatorHaProvider>,
}

impl HaSystem {
    pub async fn bootstrap(config: HaConfig) -> HaResult<Self> {
        config.validate()?;
        config.validate_provider(SIMULATOR_PROVIDER_NAME)?;

        let (store, backend): (Arc<dyn HaRecordStore>, StoreBackend) = match &config.database.url
        {
            Some(url) => {
                let store = PgHaStore::connect(url, config.database.max_connections).await?;
                store.ensure_schema().await?;
                (Arc::new(store), StoreBackend::Postgres)
            }
            None => {
                warn!("No database url configured, HA state is held in memory");
                (Arc::new(InMemoryHaStore::new()), StoreBackend::Memory)
            }
        };

        let manager = HaManager::new(
            HaManagerConfig::from(&config.orchestrator),
            store,
            Arc::new(ProviderRegistry::new()),
        )?;
        let simulator = Arc::new(SimulatorHaProvider::new(
            config.provider_tunables(SIMULATOR_PROVIDER_NAME),
        ));
        manager.register_simulator(simulator.clone())?;

        info!(
            management_server_id = config.orchestrator.management_server_id,
            backend = ?backend,
            providers = manager.registry().len(),
            "✅ HA system bootstrapped"
        );

        Ok(Self {
            config,
            backend,
            manager: Arc::new(manager),
            simulator,
        })
    }

    pub fn manager(&self) -> &Arc<HaManager> {
        &self.manager
    }

    pub fn simulator(&self) -> &Arc<SimulatorHaProvider> {
        &self.simulator
    }

    pub fn config(&self) -> &HaConfig {
        &self.config
    }

    pub fn backend(&self) -> StoreBackend {
        self.backend
    }

    /// Spawn the control loop on the current runtime
    pub fn start(&self) -> HaSystemHandle {
        let (shutdown_sender, shutdown_receiver) = broadcast::channel(1);
        let join = tokio::spawn(self.manager.clone().run(shutdown_receiver));
        HaSystemHandle {
            manager: self.manager.clone(),
            backend: self.backend,
            shutdown_sender: Some(shutdown_sender),
            join: Some(join),
        }
    }
}

/// System status information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemStatus {
    pub running: bool,
    pub management_server_id: i64,
    pub backend: StoreBackend,
    pub providers: usize,
    pub tracked_counters: usize,
}

/// Handle to a running control loop
#[derive(Debug)]
pub struct HaSystemHandle {
    manager: Arc<HaManager>,
    backend: StoreBackend,
    shutdown_sender: Option<broadcast::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl HaSystemHandle {
    pub fn is_running(&self) -> bool {
        self.shutdown_sender.is_some()
    }

    pub fn status(&self) -> SystemStatus {
        SystemStatus {
            running: self.is_running(),
            management_server_id: self.manager.management_server_id().0,
            backend: self.backend,
            providers: self.manager.registry().len(),
            tracked_counters: self.manager.counters().len(),
        }
    }

    /// Signal the loop and wait for the in-flight cycle to finish
    pub async fn stop(&mut self) -> HaResult<()> {
        let Some(sender) = self.shutdown_sender.take() else {
            warn!("HA system already stopped");
            return Ok(());
        };
        // the loop may already be gone; its receiver closing is fine
        let _ = sender.send(());
        if let Some(join) = self.join.take() {
            join.await.map_err(|e| HaError::TaskJoin(e.to_string()))?;
        }
        info!("🛑 HA system stopped");
        Ok(())
    }
}
