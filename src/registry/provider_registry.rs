//! # Provider Registry
//!
//! Maps a resource sub-type to the [`HaProvider`] that governs it. Exactly one
//! provider may claim a sub-type; a second registration is a configuration
//! error and leaves the first in place.
//!
//! ## Usage
//!
//! ```rust
//! use ha_core::provider::SimulatorHaProvider;
//! use ha_core::registry::ProviderRegistry;
//! use std::sync::Arc;
//!
//! let registry = ProviderRegistry::new();
//! registry.register(Arc::new(SimulatorHaProvider::default())).unwrap();
//! assert!(registry.get("Simulator").is_some());
//! ```

use crate::provider::HaProvider;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Provider {existing} already registered for sub-type {sub_type}")]
    DuplicateProvider { sub_type: String, existing: String },

    #[error("No provider registered for sub-type {sub_type}")]
    ProviderNotFound { sub_type: String },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Summary of one registered provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub name: String,
    pub resource_type: String,
    pub resource_sub_type: String,
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn HaProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, provider: Arc<dyn HaProvider>) -> RegistryResult<()> {
        let sub_type = provider.resource_sub_type().to_string();
        let mut providers = self.providers.write();
        if let Some(existing) = providers.get(&sub_type) {
            return Err(RegistryError::DuplicateProvider {
                sub_type,
                existing: existing.name().to_string(),
            });
        }
        info!(
            provider = provider.name(),
            resource_type = %provider.resource_type(),
            resource_sub_type = %sub_type,
            "Registered HA provider"
        );
        providers.insert(sub_type, provider);
        Ok(())
    }

    pub fn get(&self, sub_type: &str) -> Option<Arc<dyn HaProvider>> {
        self.providers.read().get(sub_type).cloned()
    }

    pub fn require(&self, sub_type: &str) -> RegistryResult<Arc<dyn HaProvider>> {
        self.get(sub_type)
            .ok_or_else(|| RegistryError::ProviderNotFound {
                sub_type: sub_type.to_string(),
            })
    }

    /// Registered providers ordered by sub-type
    pub fn list(&self) -> Vec<ProviderDescriptor> {
        let mut descriptors: Vec<_> = self
            .providers
            .read()
            .values()
            .map(|p| ProviderDescriptor {
                name: p.name().to_string(),
                resource_type: p.resource_type().to_string(),
                resource_sub_type: p.resource_sub_type().to_string(),
            })
            .collect();
        descriptors.sort_by(|a, b| a.resource_sub_type.cmp(&b.resource_sub_type));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list())
            .finish()
    }
}
