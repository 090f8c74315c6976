//! # Simulator Provider
//!
//! Provider for `Host` resources of sub-type `"Simulator"`. Probe outcomes
//! come from a per-resource [`SimulatorHaState`] that callers override at
//! runtime; resources without an override behave as a healthy, active host.
//!
//! The provider also keeps a per-resource history of every committed
//! transition on records it governs, fed by its transition listener.

use super::config::{HaConfigKey, HaConfigValue, ProviderTunables};
use super::errors::{ProviderError, ProviderResult};
use super::{HaListener, HaProvider};
use crate::models::{HaRecord, HaResource, ResourceKey, ResourceType};
use crate::state_machine::errors::ListenerResult;
use crate::state_machine::{HaEvent, HaState, TransitionListener};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

pub const SIMULATOR_PROVIDER_NAME: &str = "SimulatorHaProvider";
pub const SIMULATOR_SUB_TYPE: &str = "Simulator";

/// Scripted probe outcomes for one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorHaState {
    pub healthy: bool,
    pub has_activity: bool,
    pub recoverable: bool,
    pub fenceable: bool,
    pub eligible: bool,
    /// Every probe returns a provider error instead of an outcome
    #[serde(default)]
    pub probes_error: bool,
    /// Sleep before answering a probe
    #[serde(default)]
    pub probe_delay_ms: Option<u64>,
}

impl Default for SimulatorHaState {
    fn default() -> Self {
        Self {
            healthy: true,
            has_activity: true,
            recoverable: true,
            fenceable: true,
            eligible: true,
            probes_error: false,
            probe_delay_ms: None,
        }
    }
}

impl SimulatorHaState {
    /// A host that stopped answering health checks but is still running workloads
    pub fn unhealthy_but_active() -> Self {
        Self {
            healthy: false,
            ..Default::default()
        }
    }

    /// A host that is down: no health, no activity, and recovery does not help
    pub fn dead() -> Self {
        Self {
            healthy: false,
            has_activity: false,
            recoverable: false,
            ..Default::default()
        }
    }
}

/// One committed transition observed by the simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorTransition {
    pub from: Option<HaState>,
    pub to: HaState,
    pub event: HaEvent,
    pub update_count: i64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ProbeCounts {
    health: AtomicU64,
    activity: AtomicU64,
    recover: AtomicU64,
    fence: AtomicU64,
}

/// Snapshot of how often each probe ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbeCallCounts {
    pub health: u64,
    pub activity: u64,
    pub recover: u64,
    pub fence: u64,
}

/// Transition history keyed by resource, shared with the state machine as a listener
#[derive(Debug, Default)]
pub struct TransitionHistory {
    provider_name: String,
    entries: Mutex<HashMap<ResourceKey, Vec<SimulatorTransition>>>,
}

impl TransitionHistory {
    fn new(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn for_resource(&self, key: ResourceKey) -> Vec<SimulatorTransition> {
        self.entries.lock().get(&key).cloned().unwrap_or_default()
    }
}

impl TransitionListener<HaState, HaEvent, HaRecord> for TransitionHistory {
    fn name(&self) -> &str {
        "simulator_transition_history"
    }

    fn post_transition(
        &self,
        from: Option<HaState>,
        to: HaState,
        event: HaEvent,
        record: &HaRecord,
        success: bool,
    ) -> ListenerResult<()> {
        if !success || record.provider_name != self.provider_name {
            return Ok(());
        }
        trace!(
            resource_id = record.resource_id,
            from = ?from,
            to = %to,
            event = %event,
            "Recording simulator transition"
        );
        self.entries
            .lock()
            .entry(record.key())
            .or_default()
            .push(SimulatorTransition {
                from,
                to,
                event,
                update_count: record.update_count + 1,
                observed_at: Utc::now(),
            });
        Ok(())
    }
}

pub struct SimulatorHaProvider {
    tunables: ProviderTunables,
    states: DashMap<ResourceKey, SimulatorHaState>,
    history: Arc<TransitionHistory>,
    calls: ProbeCounts,
}

impl SimulatorHaProvider {
    pub fn new(tunables: ProviderTunables) -> Self {
        Self {
            tunables,
            states: DashMap::new(),
            history: Arc::new(TransitionHistory::new(SIMULATOR_PROVIDER_NAME)),
            calls: ProbeCounts::default(),
        }
    }

    pub fn tunables(&self) -> &ProviderTunables {
        &self.tunables
    }

    /// Replace the scripted outcomes for a resource
    pub fn set_state(&self, key: ResourceKey, state: SimulatorHaState) {
        debug!(resource_id = key.0, resource_type = %key.1, state = ?state, "Simulator state overridden");
        self.states.insert(key, state);
    }

    pub fn state(&self, key: ResourceKey) -> SimulatorHaState {
        self.states
            .get(&key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn history(&self, key: ResourceKey) -> Vec<SimulatorTransition> {
        self.history.for_resource(key)
    }

    pub fn probe_calls(&self) -> ProbeCallCounts {
        ProbeCallCounts {
            health: self.calls.health.load(Ordering::Relaxed),
            activity: self.calls.activity.load(Ordering::Relaxed),
            recover: self.calls.recover.load(Ordering::Relaxed),
            fence: self.calls.fence.load(Ordering::Relaxed),
        }
    }

    async fn scripted(&self, resource: &HaResource, counter: &AtomicU64) -> SimulatorHaState {
        counter.fetch_add(1, Ordering::Relaxed);
        let state = self.state(resource.key());
        if let Some(delay) = state.probe_delay_ms {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        state
    }
}

impl Default for SimulatorHaProvider {
    fn default() -> Self {
        Self::new(ProviderTunables::default())
    }
}

impl std::fmt::Debug for SimulatorHaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatorHaProvider")
            .field("tunables", &self.tunables)
            .field("overridden_resources", &self.states.len())
            .finish()
    }
}

fn probe_failure(resource: &HaResource) -> (String, String) {
    (
        resource.to_string(),
        "simulated probe failure".to_string(),
    )
}

#[async_trait]
impl HaProvider for SimulatorHaProvider {
    fn name(&self) -> &str {
        SIMULATOR_PROVIDER_NAME
    }

    fn resource_type(&self) -> ResourceType {
        ResourceType::Host
    }

    fn resource_sub_type(&self) -> &str {
        SIMULATOR_SUB_TYPE
    }

    async fn is_eligible(&self, resource: &HaResource) -> bool {
        self.state(resource.key()).eligible
    }

    async fn is_healthy(&self, resource: &HaResource) -> ProviderResult<bool> {
        let state = self.scripted(resource, &self.calls.health).await;
        if state.probes_error {
            let (resource, reason) = probe_failure(resource);
            return Err(ProviderError::HealthCheck { resource, reason });
        }
        Ok(state.healthy)
    }

    async fn has_activity(
        &self,
        resource: &HaResource,
        _since: DateTime<Utc>,
    ) -> ProviderResult<bool> {
        let state = self.scripted(resource, &self.calls.activity).await;
        if state.probes_error {
            let (resource, reason) = probe_failure(resource);
            return Err(ProviderError::ActivityCheck { resource, reason });
        }
        Ok(state.has_activity)
    }

    async fn recover(&self, resource: &HaResource) -> ProviderResult<bool> {
        let state = self.scripted(resource, &self.calls.recover).await;
        if state.probes_error {
            let (resource, reason) = probe_failure(resource);
            return Err(ProviderError::Recovery { resource, reason });
        }
        Ok(state.recoverable)
    }

    async fn fence(&self, resource: &HaResource) -> ProviderResult<bool> {
        let state = self.scripted(resource, &self.calls.fence).await;
        if state.probes_error {
            let (resource, reason) = probe_failure(resource);
            return Err(ProviderError::Fence { resource, reason });
        }
        Ok(state.fenceable)
    }

    fn config_value(
        &self,
        key: HaConfigKey,
        _resource: &HaResource,
    ) -> ProviderResult<HaConfigValue> {
        Ok(self.tunables.value(key))
    }

    fn transition_listener(&self) -> Option<HaListener> {
        Some(self.history.clone() as HaListener)
    }
}
