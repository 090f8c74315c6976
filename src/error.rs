use crate::config::ConfigurationError;
use crate::models::ResourceType;
use crate::provider::ProviderError;
use crate::registry::RegistryError;
use crate::state_machine::{PersistenceError, StateMachineError};
use thiserror::Error;

/// Crate-level error
#[derive(Error, Debug)]
pub enum HaError {
    #[error("State machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Provider {provider} does not handle resource type {resource_type}")]
    UnsupportedResourceType {
        provider: String,
        resource_type: ResourceType,
    },

    #[error("Provider {registered} governs sub-type {sub_type}, not {requested}")]
    ProviderMismatch {
        sub_type: String,
        registered: String,
        requested: String,
    },

    #[error("No HA record for {resource_type} {resource_id}")]
    RecordNotFound {
        resource_id: i64,
        resource_type: ResourceType,
    },

    #[error("Background task failed: {0}")]
    TaskJoin(String),

    #[error("HA manager is shutting down")]
    ShuttingDown,
}

pub type HaResult<T> = Result<T, HaError>;
