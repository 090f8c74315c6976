//! # Database Operations
//!
//! Concrete [`HaRecordStore`](crate::state_machine::HaRecordStore)
//! implementations.
//!
//! - [`memory`] - in-process store for single-node deployments and tests
//! - [`postgres`] - shared PostgreSQL store used by multi-node deployments
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ha_core::database::PgHaStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PgHaStore::connect("postgresql://ha:ha@localhost/ha", 10).await?;
//! store.ensure_schema().await?;
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod postgres;

pub use memory::InMemoryHaStore;
pub use postgres::PgHaStore;
