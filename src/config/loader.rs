//! Configuration Loader
//!
//! Layers an optional TOML file under `HA__`-prefixed environment overrides
//! and validates the merged result.

use super::error::{ConfigResult, ConfigurationError};
use super::HaConfig;
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/ha.toml";
pub const CONFIG_PATH_ENV: &str = "HA_CONFIG_PATH";
const ENV_PREFIX: &str = "HA";
const ENV_SEPARATOR: &str = "__";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from `HA_CONFIG_PATH` (or the default path) plus the process environment
    pub fn load() -> ConfigResult<HaConfig> {
        Self::load_from_path(&Self::config_path())
    }

    pub fn config_path() -> PathBuf {
        env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load_from_path(path: &Path) -> ConfigResult<HaConfig> {
        Self::build(path, None)
    }

    /// Load with an explicit override map in place of the process environment
    pub fn load_with_overrides(
        path: &Path,
        overrides: HashMap<String, String>,
    ) -> ConfigResult<HaConfig> {
        Self::build(path, Some(overrides))
    }

    fn build(path: &Path, env_source: Option<HashMap<String, String>>) -> ConfigResult<HaConfig> {
        let path_str = path.to_string_lossy();
        debug!(path = %path_str, present = path.exists(), "Loading HA configuration");

        let environment = Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(env_source);

        let config: HaConfig = Config::builder()
            .add_source(File::new(&path_str, FileFormat::Toml).required(false))
            .add_source(environment)
            .build()
            .map_err(|e| ConfigurationError::load_error(path_str.as_ref(), e))?
            .try_deserialize()
            .map_err(|e| ConfigurationError::load_error(path_str.as_ref(), e))?;

        config.validate()?;

        info!(
            management_server_id = config.orchestrator.management_server_id,
            poll_interval_ms = config.orchestrator.poll_interval_ms,
            max_concurrent_checks = config.orchestrator.max_concurrent_checks,
            database = if config.database.url.is_some() { "postgres" } else { "memory" },
            providers = config.providers.len(),
            "Configuration loaded successfully"
        );
        Ok(config)
    }
}
