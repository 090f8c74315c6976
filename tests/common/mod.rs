//! Shared fixtures for integration tests
#![allow(dead_code)]

use ha_core::database::InMemoryHaStore;
use ha_core::models::{HaRecord, HaResource, ManagementServerId, ResourceType};
use ha_core::orchestration::{HaManager, HaManagerConfig, ProcessOutcome};
use ha_core::provider::{
    ProviderTunables, SimulatorHaProvider, SIMULATOR_PROVIDER_NAME, SIMULATOR_SUB_TYPE,
};
use ha_core::registry::ProviderRegistry;
use ha_core::state_machine::HaRecordStore;
use std::sync::Arc;
use std::time::Duration;

pub const HOST: ResourceType = ResourceType::Host;

/// Tunables with every cooldown at zero so each poll advances the state
pub fn fast_tunables() -> ProviderTunables {
    ProviderTunables {
        health_check_timeout_ms: 500,
        activity_check_timeout_ms: 500,
        recovery_timeout_ms: 500,
        fence_timeout_ms: 500,
        max_activity_check_interval_ms: 0,
        max_activity_checks: 3,
        activity_check_failure_ratio: 0.5,
        max_degraded_wait_timeout_ms: 0,
        max_recovery_attempts: 2,
        recovery_wait_timeout_ms: 0,
    }
}

pub struct TestNode {
    pub manager: Arc<HaManager>,
    pub simulator: Arc<SimulatorHaProvider>,
}

impl TestNode {
    pub fn new(node_id: i64, store: Arc<dyn HaRecordStore>, tunables: ProviderTunables) -> Self {
        let manager = HaManager::new(
            HaManagerConfig {
                management_server_id: ManagementServerId(node_id),
                poll_interval: Duration::from_millis(10),
                max_concurrent_checks: 4,
                activity_sample_window: 16,
            },
            store,
            Arc::new(ProviderRegistry::new()),
        )
        .expect("manager builds");
        let simulator = Arc::new(SimulatorHaProvider::new(tunables));
        manager
            .register_simulator(simulator.clone())
            .expect("simulator registers");
        Self {
            manager: Arc::new(manager),
            simulator,
        }
    }

    pub fn single(tunables: ProviderTunables) -> Self {
        Self::new(1, Arc::new(InMemoryHaStore::new()), tunables)
    }

    /// Configure and enable a simulator host, returning its `Available` record
    pub async fn enabled_host(&self, resource_id: i64) -> HaRecord {
        let resource = HaResource::new(resource_id, HOST, SIMULATOR_SUB_TYPE);
        self.manager
            .configure(&resource, SIMULATOR_PROVIDER_NAME)
            .await
            .expect("configure");
        assert!(self.manager.enable(resource_id, HOST).await.expect("enable"));
        self.record(resource_id).await
    }

    pub async fn record(&self, resource_id: i64) -> HaRecord {
        self.manager
            .find_record(resource_id, HOST)
            .await
            .expect("record exists")
    }

    /// Process the current stored record once
    pub async fn step(&self, resource_id: i64) -> ProcessOutcome {
        let record = self.record(resource_id).await;
        self.manager
            .process_record(record)
            .await
            .expect("process record")
    }
}
