//! # HA Providers
//!
//! A provider knows how to probe and remediate one family of resources
//! (`resource_type` + `resource_sub_type`). The orchestrator only ever talks
//! to resources through this trait.
//!
//! - [`config`] - config keys, typed values and per-provider tunables
//! - [`errors`] - probe and lookup failures
//! - [`simulator`] - scriptable provider used by development and tests

pub mod config;
pub mod errors;
pub mod simulator;

pub use config::{HaConfigKey, HaConfigValue, ProviderTunables};
pub use errors::{ProviderError, ProviderResult};
pub use simulator::{
    SimulatorHaProvider, SimulatorHaState, SimulatorTransition, SIMULATOR_PROVIDER_NAME,
    SIMULATOR_SUB_TYPE,
};

use crate::models::{HaRecord, HaResource, ResourceType};
use crate::state_machine::{HaEvent, HaState, TransitionListener};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

pub type HaListener = Arc<dyn TransitionListener<HaState, HaEvent, HaRecord>>;

#[async_trait]
pub trait HaProvider: Send + Sync {
    /// Name stored in `ha_config.provider_name`
    fn name(&self) -> &str;

    fn resource_type(&self) -> ResourceType;

    fn resource_sub_type(&self) -> &str;

    async fn is_eligible(&self, resource: &HaResource) -> bool;

    async fn is_healthy(&self, resource: &HaResource) -> ProviderResult<bool>;

    /// Whether the resource showed signs of life since `since`
    async fn has_activity(&self, resource: &HaResource, since: DateTime<Utc>)
        -> ProviderResult<bool>;

    /// `Ok(false)` is a recovery attempt that ran and did not succeed
    async fn recover(&self, resource: &HaResource) -> ProviderResult<bool>;

    async fn fence(&self, resource: &HaResource) -> ProviderResult<bool>;

    fn config_value(&self, key: HaConfigKey, resource: &HaResource)
        -> ProviderResult<HaConfigValue>;

    /// Listener attached to the state machine when the provider is registered
    fn transition_listener(&self) -> Option<HaListener> {
        None
    }

    fn duration_value(&self, key: HaConfigKey, resource: &HaResource) -> ProviderResult<Duration> {
        self.config_value(key, resource)?.as_duration(key)
    }

    fn count_value(&self, key: HaConfigKey, resource: &HaResource) -> ProviderResult<u32> {
        self.config_value(key, resource)?.as_count(key)
    }

    fn ratio_value(&self, key: HaConfigKey, resource: &HaResource) -> ProviderResult<f64> {
        self.config_value(key, resource)?.as_ratio(key)
    }
}
