//! # HA Manager
//!
//! The per-node control loop. Each cycle reads every HA record, probes the
//! resources this node may act on through their providers, and commits the
//! resulting events through the versioned store write.
//!
//! ## Coordination
//!
//! Nodes never talk to each other. Two nodes computing a transition from the
//! same `(state, update_count)` race on the conditional write; exactly one
//! lands and the other sees `Ok(false)` and moves on. A record claimed by a
//! different node is left alone until that claim is released or expired.
//!
//! ## Counters
//!
//! Activity samples, recovery attempts and cooldown timestamps live in a
//! node-local [`CounterArena`]. Counter updates that follow a decision are
//! applied only after its commit lands; observations (activity samples,
//! probe errors) are recorded as they are made.

use super::probes::{run_probe, ProbeKind, ProbeOutcome};
use super::resource_counter::CounterArena;
use crate::config::OrchestratorConfig;
use crate::error::{HaError, HaResult};
use crate::models::{
    HaRecord, HaResource, ManagementServerId, NewHaRecord, ResourceKey, ResourceType,
};
use crate::provider::{HaConfigKey, HaProvider, SimulatorHaProvider, SimulatorHaState};
use crate::registry::{ProviderRegistry, RegistryError};
use crate::state_machine::{
    build_ha_state_machine, HaEvent, HaRecordStore, HaState, HaStateMachine, TransitionPayload,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, trace, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct HaManagerConfig {
    pub management_server_id: ManagementServerId,
    pub poll_interval: Duration,
    pub max_concurrent_checks: usize,
    pub activity_sample_window: usize,
}

impl Default for HaManagerConfig {
    fn default() -> Self {
        Self::from(&OrchestratorConfig::default())
    }
}

impl From<&OrchestratorConfig> for HaManagerConfig {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            management_server_id: config.management_server_id(),
            poll_interval: config.poll_interval(),
            max_concurrent_checks: config.max_concurrent_checks.max(1),
            activity_sample_window: config.activity_sample_window,
        }
    }
}

/// Result of examining one record in a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Not this node's to act on (foreign owner, unknown provider, disabled)
    Skipped,
    /// Examined, nothing committed
    NoChange,
    Transitioned(HaEvent, HaState),
    /// Another writer moved the record first
    LostRace(HaEvent),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub examined: usize,
    pub transitioned: usize,
    pub lost_races: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl CycleSummary {
    fn record(&mut self, outcome: ProcessOutcome) {
        match outcome {
            ProcessOutcome::Transitioned(..) => self.transitioned += 1,
            ProcessOutcome::LostRace(_) => self.lost_races += 1,
            ProcessOutcome::Skipped => self.skipped += 1,
            ProcessOutcome::NoChange => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitOutcome {
    Committed(HaState),
    Vetoed,
    LostRace,
}

/// Counter bookkeeping applied once a decision's commit lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CounterEffect {
    Keep,
    Reset,
    MarkSuspected,
    /// Back to `Suspect` for a fresh round of activity checks
    Resuspect,
    MarkDegraded,
    MarkRecovering,
    IncrementRecoveryAttempts,
    ResetRecoveryAttempts,
    MarkRecovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decision {
    event: HaEvent,
    effect: CounterEffect,
}

impl Decision {
    fn new(event: HaEvent, effect: CounterEffect) -> Option<Self> {
        Some(Self { event, effect })
    }
}

pub struct HaManager {
    config: HaManagerConfig,
    store: Arc<dyn HaRecordStore>,
    registry: Arc<ProviderRegistry>,
    state_machine: HaStateMachine,
    counters: CounterArena,
    check_permits: Arc<Semaphore>,
    simulator: RwLock<Option<Arc<SimulatorHaProvider>>>,
}

impl HaManager {
    pub fn new(
        config: HaManagerConfig,
        store: Arc<dyn HaRecordStore>,
        registry: Arc<ProviderRegistry>,
    ) -> HaResult<Self> {
        let state_machine = build_ha_state_machine()?;
        Ok(Self {
            counters: CounterArena::new(config.activity_sample_window),
            check_permits: Arc::new(Semaphore::new(config.max_concurrent_checks.max(1))),
            config,
            store,
            registry,
            state_machine,
            simulator: RwLock::new(None),
        })
    }

    pub fn management_server_id(&self) -> ManagementServerId {
        self.config.management_server_id
    }

    pub fn config(&self) -> &HaManagerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn HaRecordStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn state_machine(&self) -> &HaStateMachine {
        &self.state_machine
    }

    pub fn counters(&self) -> &CounterArena {
        &self.counters
    }

    /// Register a provider and attach its transition listener, if it has one
    pub fn register_provider(&self, provider: Arc<dyn HaProvider>) -> HaResult<()> {
        let listener = provider.transition_listener();
        self.registry.register(provider)?;
        if let Some(listener) = listener {
            self.state_machine.register_listener(listener);
        }
        Ok(())
    }

    pub fn register_simulator(&self, simulator: Arc<SimulatorHaProvider>) -> HaResult<()> {
        self.register_provider(simulator.clone())?;
        *self.simulator.write() = Some(simulator);
        Ok(())
    }

    /// Create the HA record for a resource, or repoint an existing one at `provider_name`
    pub async fn configure(&self, resource: &HaResource, provider_name: &str) -> HaResult<HaRecord> {
        let provider = self.registry.require(&resource.resource_sub_type)?;
        if provider.resource_type() != resource.resource_type {
            return Err(HaError::UnsupportedResourceType {
                provider: provider.name().to_string(),
                resource_type: resource.resource_type,
            });
        }
        if provider.name() != provider_name {
            return Err(HaError::ProviderMismatch {
                sub_type: resource.resource_sub_type.clone(),
                registered: provider.name().to_string(),
                requested: provider_name.to_string(),
            });
        }

        if let Some(existing) = self
            .store
            .find_by_resource(resource.resource_id, resource.resource_type)
            .await?
        {
            debug!(
                resource_id = resource.resource_id,
                resource_type = %resource.resource_type,
                provider = provider_name,
                "Updating HA provider for existing record"
            );
            return Ok(self
                .store
                .update_settings(
                    resource.resource_id,
                    resource.resource_type,
                    existing.enabled,
                    provider_name,
                )
                .await?);
        }

        let state = self.state_machine.initial_transition(HaEvent::Disabled)?;
        let record = self
            .store
            .create(NewHaRecord {
                resource_id: resource.resource_id,
                resource_type: resource.resource_type,
                resource_sub_type: resource.resource_sub_type.clone(),
                enabled: false,
                state,
                provider_name: provider_name.to_string(),
                management_server_id: None,
            })
            .await?;
        info!(
            resource_id = record.resource_id,
            resource_type = %record.resource_type,
            provider = provider_name,
            state = %record.state,
            "Configured resource for HA"
        );
        Ok(record)
    }

    pub async fn find_record(
        &self,
        resource_id: i64,
        resource_type: ResourceType,
    ) -> HaResult<HaRecord> {
        self.store
            .find_by_resource(resource_id, resource_type)
            .await?
            .ok_or(HaError::RecordNotFound {
                resource_id,
                resource_type,
            })
    }

    /// Turn HA on for a resource. Returns whether `Enabled` was committed.
    pub async fn enable(&self, resource_id: i64, resource_type: ResourceType) -> HaResult<bool> {
        let record = self.find_record(resource_id, resource_type).await?;
        let record = self
            .store
            .update_settings(resource_id, resource_type, true, &record.provider_name)
            .await?;
        if record.state != HaState::Disabled {
            return Ok(false);
        }
        self.transition(&record, HaEvent::Enabled).await
    }

    /// Turn HA off for a resource. Returns whether `Disabled` was committed.
    pub async fn disable(&self, resource_id: i64, resource_type: ResourceType) -> HaResult<bool> {
        let record = self.find_record(resource_id, resource_type).await?;
        let record = self
            .store
            .update_settings(resource_id, resource_type, false, &record.provider_name)
            .await?;
        self.counters.purge(record.key());
        if record.state == HaState::Disabled {
            return Ok(false);
        }
        if record.state.is_active_investigation() {
            warn!(
                resource_id,
                resource_type = %resource_type,
                state = %record.state,
                "Disabling HA while the resource is under investigation"
            );
        }
        self.transition(&record, HaEvent::Disabled).await
    }

    /// Apply `event` to `record` and commit it.
    ///
    /// `Ok(false)` means a listener vetoed or another writer won the race.
    /// An event with no edge from the record's state is an error.
    pub async fn transition(&self, record: &HaRecord, event: HaEvent) -> HaResult<bool> {
        Ok(matches!(
            self.commit(record, event).await?,
            CommitOutcome::Committed(_)
        ))
    }

    async fn commit(&self, record: &HaRecord, event: HaEvent) -> HaResult<CommitOutcome> {
        let from = record.state;
        let to = self.state_machine.transition(from, event)?;

        if !self.state_machine.notify_pre(Some(from), event, to, record) {
            return Ok(CommitOutcome::Vetoed);
        }

        let metadata = json!({
            "from": from,
            "event": event,
            "management_server_id": self.config.management_server_id.0,
        });
        let payload = TransitionPayload::new(self.config.management_server_id).with_metadata(metadata);
        let committed = self
            .store
            .update_state(from, event, to, record, &payload)
            .await?;

        if !committed {
            debug!(
                resource_id = record.resource_id,
                resource_type = %record.resource_type,
                from = %from,
                event = %event,
                update_count = record.update_count,
                "Lost transition race"
            );
            return Ok(CommitOutcome::LostRace);
        }

        info!(
            resource_id = record.resource_id,
            resource_type = %record.resource_type,
            from = %from,
            to = %to,
            event = %event,
            management_server_id = %self.config.management_server_id,
            "HA state transition"
        );
        self.state_machine.notify_post(Some(from), to, event, record, true);
        Ok(CommitOutcome::Committed(to))
    }

    pub async fn is_eligible(&self, record: &HaRecord) -> HaResult<bool> {
        let provider = self.registry.require(&record.resource_sub_type)?;
        Ok(provider.is_eligible(&record.resource()).await)
    }

    /// Forget the node-local counter for a resource. Never changes `state`.
    pub fn purge_counter(&self, resource_id: i64, resource_type: ResourceType) -> bool {
        self.counters.purge((resource_id, resource_type))
    }

    /// Script the simulator's probe outcomes for a resource and start its counter afresh
    pub fn override_simulator_state(
        &self,
        resource_id: i64,
        resource_type: ResourceType,
        state: SimulatorHaState,
    ) -> HaResult<()> {
        let simulator = self.simulator.read().clone().ok_or_else(|| {
            RegistryError::ProviderNotFound {
                sub_type: crate::provider::simulator::SIMULATOR_SUB_TYPE.to_string(),
            }
        })?;
        simulator.set_state((resource_id, resource_type), state);
        self.purge_counter(resource_id, resource_type);
        Ok(())
    }

    /// Release every claim held by `management_server_id`, e.g. after that node died
    pub async fn expire_ownership(
        &self,
        management_server_id: ManagementServerId,
    ) -> HaResult<u64> {
        let released = self.store.expire_ownership(management_server_id).await?;
        info!(
            management_server_id = %management_server_id,
            released = released,
            "Expired HA ownership"
        );
        Ok(released)
    }

    /// One poll over every record, probing concurrently up to `max_concurrent_checks`
    #[instrument(skip(self), fields(management_server_id = %self.config.management_server_id))]
    pub async fn run_cycle(self: &Arc<Self>) -> HaResult<CycleSummary> {
        let records = self.store.list_by_resource(None).await?;
        let mut summary = CycleSummary {
            examined: records.len(),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();
        for record in records {
            let manager = Arc::clone(self);
            let permits = Arc::clone(&self.check_permits);
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| HaError::ShuttingDown)?;
                manager.process_record(record).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(outcome)) => summary.record(outcome),
                Ok(Err(e)) => {
                    summary.errors += 1;
                    warn!(error = %e, "HA record processing failed");
                }
                Err(e) => {
                    summary.errors += 1;
                    error!(error = %e, "HA record task aborted");
                }
            }
        }

        debug!(
            examined = summary.examined,
            transitioned = summary.transitioned,
            lost_races = summary.lost_races,
            skipped = summary.skipped,
            errors = summary.errors,
            "HA cycle complete"
        );
        Ok(summary)
    }

    /// Poll until `shutdown` fires or its sender is dropped
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            management_server_id = %self.config.management_server_id,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "🔄 HA monitor loop started"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("HA monitor loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!(error = %e, "HA cycle failed");
                    }
                }
            }
        }
    }

    #[instrument(
        skip_all,
        fields(
            resource_id = record.resource_id,
            resource_type = %record.resource_type,
            state = %record.state
        )
    )]
    pub async fn process_record(&self, record: HaRecord) -> HaResult<ProcessOutcome> {
        if !record.is_claimable_by(self.config.management_server_id) {
            trace!(owner = ?record.management_server_id, "Record owned by another node");
            return Ok(ProcessOutcome::Skipped);
        }

        let Some(provider) = self.registry.get(&record.resource_sub_type) else {
            warn!(sub_type = %record.resource_sub_type, "No HA provider for sub-type");
            return Ok(ProcessOutcome::Skipped);
        };
        if provider.name() != record.provider_name {
            warn!(
                configured = %record.provider_name,
                registered = provider.name(),
                "HA provider mismatch"
            );
            return Ok(ProcessOutcome::Skipped);
        }

        if !record.enabled {
            if record.state == HaState::Disabled {
                return Ok(ProcessOutcome::Skipped);
            }
            return self
                .apply(&record, Decision::new(HaEvent::Disabled, CounterEffect::Reset))
                .await;
        }
        if record.state == HaState::Disabled {
            return Ok(ProcessOutcome::NoChange);
        }

        let resource = record.resource();
        let eligible = provider.is_eligible(&resource).await;
        match (record.state, eligible) {
            (HaState::Ineligible, true) => {
                return self
                    .apply(&record, Decision::new(HaEvent::Eligible, CounterEffect::Reset))
                    .await;
            }
            (HaState::Ineligible, false) | (HaState::Fenced, false) => {
                return Ok(ProcessOutcome::NoChange);
            }
            (_, false) => {
                return self
                    .apply(&record, Decision::new(HaEvent::Ineligible, CounterEffect::Reset))
                    .await;
            }
            _ => {}
        }

        let decision = self
            .decide(&record, provider.as_ref(), &resource, Utc::now())
            .await?;
        self.apply(&record, decision).await
    }

    async fn apply(&self, record: &HaRecord, decision: Option<Decision>) -> HaResult<ProcessOutcome> {
        let Some(decision) = decision else {
            return Ok(ProcessOutcome::NoChange);
        };
        match self.commit(record, decision.event).await? {
            CommitOutcome::Committed(to) => {
                self.apply_effect(record.key(), decision.effect, Utc::now());
                Ok(ProcessOutcome::Transitioned(decision.event, to))
            }
            CommitOutcome::Vetoed => Ok(ProcessOutcome::NoChange),
            CommitOutcome::LostRace => Ok(ProcessOutcome::LostRace(decision.event)),
        }
    }

    fn apply_effect(&self, key: ResourceKey, effect: CounterEffect, now: DateTime<Utc>) {
        self.counters.with_counter(key, |counter| match effect {
            CounterEffect::Keep => {}
            CounterEffect::Reset => counter.reset(),
            CounterEffect::MarkSuspected => counter.mark_suspected(now),
            CounterEffect::Resuspect => {
                counter.reset_activity_samples();
                counter.mark_suspected(now);
            }
            CounterEffect::MarkDegraded => {
                counter.reset_activity_samples();
                counter.mark_degraded(now);
            }
            CounterEffect::MarkRecovering => {
                counter.reset_activity_samples();
                counter.mark_recovering();
            }
            CounterEffect::IncrementRecoveryAttempts => {
                counter.increment_recovery_attempts();
            }
            CounterEffect::ResetRecoveryAttempts => counter.reset_recovery_attempts(),
            CounterEffect::MarkRecovered => counter.mark_recovered(now),
        });
    }

    async fn probe<F>(
        &self,
        kind: ProbeKind,
        provider: &dyn HaProvider,
        resource: &HaResource,
        probe: F,
    ) -> HaResult<ProbeOutcome>
    where
        F: std::future::Future<Output = crate::provider::ProviderResult<bool>>,
    {
        let timeout = provider.duration_value(kind.timeout_key(), resource)?;
        Ok(run_probe(kind, resource.key(), timeout, &self.counters, probe).await)
    }

    async fn health(&self, provider: &dyn HaProvider, resource: &HaResource) -> HaResult<ProbeOutcome> {
        self.probe(ProbeKind::Health, provider, resource, provider.is_healthy(resource))
            .await
    }

    /// The event, if any, the record's current state calls for
    async fn decide(
        &self,
        record: &HaRecord,
        provider: &dyn HaProvider,
        resource: &HaResource,
        now: DateTime<Utc>,
    ) -> HaResult<Option<Decision>> {
        use CounterEffect as Fx;
        use HaEvent as E;
        use ProbeOutcome::{Failed, Inconclusive, Passed};

        let key = record.key();
        let decision = match record.state {
            HaState::Available => match self.health(provider, resource).await? {
                Passed => Decision::new(E::HealthCheckPassed, Fx::Keep),
                Failed => Decision::new(E::HealthCheckFailed, Fx::MarkSuspected),
                Inconclusive => None,
            },

            HaState::Suspect => match self.health(provider, resource).await? {
                Passed => Decision::new(E::HealthCheckPassed, Fx::Reset),
                Failed => {
                    let interval =
                        provider.duration_value(HaConfigKey::MaxActivityCheckInterval, resource)?;
                    let due = self
                        .counters
                        .with_counter(key, |c| c.can_perform_activity_check(interval, now));
                    if due {
                        Decision::new(E::PerformActivityCheck, Fx::Keep)
                    } else {
                        Decision::new(E::HealthCheckFailed, Fx::Keep)
                    }
                }
                Inconclusive => None,
            },

            HaState::Checking => {
                let min_samples = provider.count_value(HaConfigKey::MaxActivityChecks, resource)?;
                let ratio = provider.ratio_value(HaConfigKey::ActivityCheckFailureRatio, resource)?;
                let since = self
                    .counters
                    .with_counter(key, |c| c.suspected_at())
                    .unwrap_or(now);
                let outcome = self
                    .probe(
                        ProbeKind::Activity,
                        provider,
                        resource,
                        provider.has_activity(resource, since),
                    )
                    .await?;
                if outcome == Inconclusive {
                    return Ok(None);
                }
                let event = self.counters.with_counter(key, |c| {
                    c.add_activity_check(outcome == Failed, now);
                    c.classify_activity(min_samples, ratio)
                });
                let effect = match event {
                    E::ActivityCheckFailureUnderThresholdRatio => Fx::MarkDegraded,
                    E::ActivityCheckFailureOverThresholdRatio => Fx::MarkRecovering,
                    _ => Fx::Keep,
                };
                Decision::new(event, effect)
            }

            HaState::Degraded => {
                // counters are node-local; start the wait when this node first sees it
                self.counters.with_counter(key, |c| {
                    if c.degraded_at().is_none() {
                        c.mark_degraded(now);
                    }
                });
                match self.health(provider, resource).await? {
                    Passed => Decision::new(E::HealthCheckPassed, Fx::Reset),
                    Failed => {
                        let wait =
                            provider.duration_value(HaConfigKey::MaxDegradedWaitTimeout, resource)?;
                        if self
                            .counters
                            .with_counter(key, |c| c.can_recheck_activity(wait, now))
                        {
                            Decision::new(E::PeriodicRecheckResourceActivity, Fx::Resuspect)
                        } else {
                            Decision::new(E::HealthCheckFailed, Fx::Keep)
                        }
                    }
                    Inconclusive => None,
                }
            }

            HaState::Recovering => {
                let outcome = self
                    .probe(ProbeKind::Recovery, provider, resource, provider.recover(resource))
                    .await?;
                match outcome {
                    Passed => Decision::new(E::Recovered, Fx::MarkRecovered),
                    Failed => {
                        let max_attempts =
                            provider.count_value(HaConfigKey::MaxRecoveryAttempts, resource)?;
                        let exceeded = self
                            .counters
                            .with_counter(key, |c| c.recovery_threshold_exceeded(max_attempts));
                        if exceeded {
                            Decision::new(
                                E::RecoveryOperationThresholdExceeded,
                                Fx::ResetRecoveryAttempts,
                            )
                        } else {
                            Decision::new(E::RetryRecovery, Fx::IncrementRecoveryAttempts)
                        }
                    }
                    Inconclusive => None,
                }
            }

            HaState::Recovered => {
                let wait = provider.duration_value(HaConfigKey::RecoveryWaitTimeout, resource)?;
                let done = self.counters.with_counter(key, |c| {
                    if c.recovered_at().is_none() {
                        c.mark_recovered(now);
                    }
                    c.can_exit_recovery(wait, now)
                });
                if done {
                    Decision::new(E::RecoveryWaitPeriodTimeout, Fx::Reset)
                } else {
                    None
                }
            }

            HaState::Fencing => {
                let outcome = self
                    .probe(ProbeKind::Fence, provider, resource, provider.fence(resource))
                    .await?;
                match outcome {
                    Passed => Decision::new(E::Fenced, Fx::Keep),
                    Failed => Decision::new(E::RetryFencing, Fx::Keep),
                    Inconclusive => None,
                }
            }

            HaState::Fenced => match self.health(provider, resource).await? {
                Passed => Decision::new(E::HealthCheckPassed, Fx::Reset),
                Failed => Decision::new(E::HealthCheckFailed, Fx::Keep),
                Inconclusive => None,
            },

            HaState::Disabled | HaState::Ineligible => None,
        };
        Ok(decision)
    }
}

impl std::fmt::Debug for HaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaManager")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("counters", &self.counters.len())
            .finish()
    }
}
