//! Configuration Error Types
//!
//! Errors raised while loading and validating `HaConfig`. Every variant
//! aborts startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Source could not be read or did not deserialize into `HaConfig`
    #[error("Failed to load configuration from '{source_name}': {error}")]
    LoadError { source_name: String, error: String },

    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    #[error("Invalid tunables for provider '{provider}': {error}")]
    InvalidProviderTunables { provider: String, error: String },
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;

impl ConfigurationError {
    pub fn load_error(source_name: impl Into<String>, error: impl ToString) -> Self {
        Self::LoadError {
            source_name: source_name.into(),
            error: error.to_string(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl ToString,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            context: context.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(error: config::ConfigError) -> Self {
        Self::load_error("configuration sources", error)
    }
}
