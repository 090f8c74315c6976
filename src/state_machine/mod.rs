// State machine module for HA resource lifecycle
//
// A generic transition-table engine plus the HA states, events and edge table
// built on top of it, and the persistence contract used to commit transitions.

pub mod engine;
pub mod errors;
pub mod events;
pub mod ha_state_machine;
pub mod persistence;
pub mod states;

// Re-export main types for convenient access
pub use engine::{StateMachine, TransitionListener};
pub use errors::{ListenerError, PersistenceError, StateMachineError};
pub use events::HaEvent;
pub use ha_state_machine::{build_ha_state_machine, HaStateMachine};
pub use persistence::{HaRecordStore, TransitionPayload};
pub use states::HaState;
