//! # Configuration
//!
//! Typed configuration for the HA monitor.
//!
//! ## Sources
//!
//! - An optional TOML file (`HA_CONFIG_PATH`, default `config/ha.toml`)
//! - Environment overrides with the `HA` prefix and `__` separator, e.g.
//!   `HA__ORCHESTRATOR__POLL_INTERVAL_MS=500`
//!
//! Missing sections fall back to defaults, so an empty file is a valid
//! single-node, in-memory configuration.
//!
//! ```rust,no_run
//! use ha_core::config::ConfigLoader;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load()?;
//! println!("polling every {}ms", config.orchestrator.poll_interval_ms);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

use crate::models::ManagementServerId;
use crate::provider::ProviderTunables;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaConfig {
    pub orchestrator: OrchestratorConfig,
    pub database: DatabaseConfig,
    /// Tunables keyed by provider name
    pub providers: HashMap<String, ProviderTunables>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub management_server_id: i64,
    pub poll_interval_ms: u64,
    pub max_concurrent_checks: usize,
    /// Capacity of each resource's rolling activity-sample window
    pub activity_sample_window: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            management_server_id: 1,
            poll_interval_ms: 10_000,
            max_concurrent_checks: 16,
            activity_sample_window: 32,
        }
    }
}

impl OrchestratorConfig {
    pub fn management_server_id(&self) -> ManagementServerId {
        ManagementServerId(self.management_server_id)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; the in-memory store is used when unset
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl HaConfig {
    /// Tunables for a provider, or the defaults when none are configured.
    ///
    /// Matching ignores ASCII case: environment overrides arrive lowercased.
    pub fn provider_tunables(&self, provider_name: &str) -> ProviderTunables {
        self.providers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(provider_name))
            .map(|(_, tunables)| tunables.clone())
            .unwrap_or_default()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let orchestrator = &self.orchestrator;
        if orchestrator.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestrator.poll_interval_ms",
                orchestrator.poll_interval_ms,
                "must be greater than zero",
            ));
        }
        if orchestrator.max_concurrent_checks == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestrator.max_concurrent_checks",
                orchestrator.max_concurrent_checks,
                "must be greater than zero",
            ));
        }
        if orchestrator.activity_sample_window == 0 {
            return Err(ConfigurationError::invalid_value(
                "orchestrator.activity_sample_window",
                orchestrator.activity_sample_window,
                "must be greater than zero",
            ));
        }
        if self.database.url.is_some() && self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                self.database.max_connections,
                "must be greater than zero when a database url is set",
            ));
        }

        for provider in self.providers.keys() {
            self.validate_provider(provider)?;
        }
        Ok(())
    }

    /// Check the tunables `provider_name` will run with, including the defaults
    /// it falls back to when it has no `[providers.*]` section
    pub fn validate_provider(&self, provider_name: &str) -> ConfigResult<()> {
        let tunables = self.provider_tunables(provider_name);
        tunables
            .validate()
            .map_err(|error| ConfigurationError::InvalidProviderTunables {
                provider: provider_name.to_string(),
                error,
            })?;
        // a window smaller than the minimum sample count can never classify
        let window = self.orchestrator.activity_sample_window;
        if tunables.max_activity_checks as usize > window {
            return Err(ConfigurationError::InvalidProviderTunables {
                provider: provider_name.to_string(),
                error: format!(
                    "max_activity_checks ({}) exceeds orchestrator.activity_sample_window ({window})",
                    tunables.max_activity_checks
                ),
            });
        }
        Ok(())
    }
}
