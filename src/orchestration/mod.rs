//! # Orchestration
//!
//! The HA control loop and the node-local state it keeps.
//!
//! ## Core Components
//!
//! - **HaManager**: polls records, runs provider probes and commits transitions
//! - **HaResourceCounter / CounterArena**: activity samples, recovery attempts, cooldowns
//! - **Probes**: timeout-bounded provider calls with probe-error tracking
//! - **HaSystem**: bootstrap from configuration and lifecycle handle

pub mod bootstrap;
pub mod manager;
pub mod probes;
pub mod resource_counter;

pub use bootstrap::{HaSystem, HaSystemHandle, StoreBackend, SystemStatus};
pub use manager::{CycleSummary, HaManager, HaManagerConfig, ProcessOutcome};
pub use probes::{ProbeKind, ProbeOutcome};
pub use resource_counter::{CounterArena, HaResourceCounter};
