#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # HA Core
//!
//! High-availability health monitoring, recovery and fencing for the managed
//! resources of a multi-node control plane.
//!
//! ## Overview
//!
//! Every control-plane node runs the same polling loop. For each resource
//! enrolled in HA the loop asks the resource's provider whether it is
//! healthy, whether it still shows activity, and, when it does not, tries to
//! recover and finally fence it. Progress is recorded as a versioned state in
//! a shared store; nodes coordinate only through conditional writes on that
//! state, so two nodes never both act on the same observation.
//!
//! ## Module Organization
//!
//! - [`state_machine`] - generic transition engine, HA states/events/table, store contract
//! - [`models`] - HA records and resource identities
//! - [`database`] - in-memory and PostgreSQL record stores
//! - [`provider`] - provider trait, tunables and the simulator provider
//! - [`registry`] - provider lookup by resource sub-type
//! - [`orchestration`] - resource counters, the HA manager loop, bootstrap
//! - [`config`] - TOML + environment configuration
//! - [`logging`] - structured logging setup
//! - [`error`] - crate-level error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ha_core::config::HaConfig;
//! use ha_core::models::{HaResource, ResourceType};
//! use ha_core::orchestration::HaSystem;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let system = HaSystem::bootstrap(HaConfig::default()).await?;
//! let manager = system.manager();
//!
//! let host = HaResource::new(42, ResourceType::Host, "Simulator");
//! manager.configure(&host, "SimulatorHaProvider").await?;
//! manager.enable(42, ResourceType::Host).await?;
//!
//! let summary = manager.run_cycle().await?;
//! println!("examined {} records", summary.examined);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod provider;
pub mod registry;
pub mod state_machine;

pub use config::{ConfigLoader, HaConfig};
pub use error::{HaError, HaResult};
pub use models::{HaRecord, HaResource, ManagementServerId, ResourceType};
pub use orchestration::{CycleSummary, HaManager, HaSystem, ProcessOutcome};
pub use provider::{HaProvider, SimulatorHaProvider};
pub use state_machine::{HaEvent, HaState};
