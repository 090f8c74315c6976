//! # Registry Infrastructure
//!
//! Lookup of HA providers by resource sub-type, shared by the orchestrator
//! and the bootstrap code that installs providers at startup.

pub mod provider_registry;

pub use provider_registry::{ProviderDescriptor, ProviderRegistry, RegistryError, RegistryResult};
