use thiserror::Error;

/// Failures of a provider to run a probe or answer a config lookup.
///
/// A probe that ran and reported a bad outcome is not an error: `is_healthy`
/// returning `Ok(false)` or `recover` returning `Ok(false)` are normal results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Health check could not run for {resource}: {reason}")]
    HealthCheck { resource: String, reason: String },

    #[error("Activity check could not run for {resource}: {reason}")]
    ActivityCheck { resource: String, reason: String },

    #[error("Recovery could not be attempted for {resource}: {reason}")]
    Recovery { resource: String, reason: String },

    #[error("Fence could not be attempted for {resource}: {reason}")]
    Fence { resource: String, reason: String },

    #[error("Unsupported config key: {key}")]
    UnsupportedConfigKey { key: String },

    #[error("Invalid value for config key {key}: expected {expected}")]
    InvalidConfigValue { key: String, expected: String },
}

pub type ProviderResult<T> = Result<T, ProviderError>;

pub fn unsupported_key(key: impl ToString) -> ProviderError {
    ProviderError::UnsupportedConfigKey {
        key: key.to_string(),
    }
}
