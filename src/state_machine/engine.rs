//! # Transition Engine
//!
//! Generic transition-table state machine. Holds the legal
//! `(from_state, event) -> to_state` edges, the "initial" edges usable when no
//! prior state exists, and an ordered list of listeners notified before and
//! after each transition.
//!
//! Lookups are pure: computing a transition never performs I/O, so concurrent
//! callers share one table freely. Persisting the result is the caller's job.

use super::errors::{duplicate_transition, no_transition, ListenerResult, StateMachineResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::Arc;
use tracing::warn;

/// Bounds shared by engine states and events
pub trait MachineSymbol: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> MachineSymbol for T where T: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static {}

/// Observer of state transitions.
///
/// `pre_transition` may veto by returning `Ok(false)`; the transition is then
/// abandoned before anything is persisted. `post_transition` runs once the
/// change has been applied and cannot undo it.
pub trait TransitionListener<S, E, C: ?Sized>: Send + Sync {
    /// Listener name for logging
    fn name(&self) -> &str;

    fn pre_transition(&self, _from: Option<S>, _event: E, _to: S, _context: &C) -> ListenerResult<bool> {
        Ok(true)
    }

    fn post_transition(
        &self,
        _from: Option<S>,
        _to: S,
        _event: E,
        _context: &C,
        _success: bool,
    ) -> ListenerResult<()> {
        Ok(())
    }
}

type SharedListener<S, E, C> = Arc<dyn TransitionListener<S, E, C>>;

/// Transition table plus listener registry
pub struct StateMachine<S, E, C: ?Sized> {
    initial: HashMap<E, S>,
    edges: HashMap<(S, E), S>,
    listeners: RwLock<Vec<SharedListener<S, E, C>>>,
}

impl<S: MachineSymbol, E: MachineSymbol, C: ?Sized> StateMachine<S, E, C> {
    pub fn new() -> Self {
        Self {
            initial: HashMap::new(),
            edges: HashMap::new(),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register an edge usable when no prior state exists
    pub fn add_initial_transition(&mut self, event: E, to_state: S) -> StateMachineResult<()> {
        if self.initial.contains_key(&event) {
            return Err(duplicate_transition(None::<S>, event));
        }
        self.initial.insert(event, to_state);
        Ok(())
    }

    /// Register one legal edge. Each `(from_state, event)` pair may appear once.
    pub fn add_transition(&mut self, from_state: S, event: E, to_state: S) -> StateMachineResult<()> {
        if self.edges.contains_key(&(from_state, event)) {
            return Err(duplicate_transition(Some(from_state), event));
        }
        self.edges.insert((from_state, event), to_state);
        Ok(())
    }

    /// Look up the target of `(from_state, event)`
    pub fn transition(&self, from_state: S, event: E) -> StateMachineResult<S> {
        self.edges
            .get(&(from_state, event))
            .copied()
            .ok_or_else(|| no_transition(Some(from_state), event))
    }

    /// Look up the target of an initial edge
    pub fn initial_transition(&self, event: E) -> StateMachineResult<S> {
        self.initial
            .get(&event)
            .copied()
            .ok_or_else(|| no_transition(None::<S>, event))
    }

    /// Resolve either an initial or a regular edge depending on `from_state`
    pub fn next_state(&self, from_state: Option<S>, event: E) -> StateMachineResult<S> {
        match from_state {
            Some(from) => self.transition(from, event),
            None => self.initial_transition(event),
        }
    }

    /// Events accepted from `from_state`
    pub fn next_events(&self, from_state: S) -> Vec<E> {
        self.edges
            .keys()
            .filter(|(from, _)| *from == from_state)
            .map(|(_, event)| *event)
            .collect()
    }

    /// Every registered `(from, event, to)` edge, in no particular order
    pub fn edges(&self) -> impl Iterator<Item = (S, E, S)> + '_ {
        self.edges.iter().map(|((from, event), to)| (*from, *event, *to))
    }

    pub fn initial_edges(&self) -> impl Iterator<Item = (E, S)> + '_ {
        self.initial.iter().map(|(event, to)| (*event, *to))
    }

    pub fn register_listener(&self, listener: SharedListener<S, E, C>) {
        self.listeners.write().push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn snapshot_listeners(&self) -> Vec<SharedListener<S, E, C>> {
        self.listeners.read().clone()
    }

    /// Run every pre-transition callback. Returns `false` when any listener
    /// vetoes. A listener that errors is logged and treated as a non-veto.
    pub fn notify_pre(&self, from: Option<S>, event: E, to: S, context: &C) -> bool {
        let mut allowed = true;
        for listener in self.snapshot_listeners() {
            match listener.pre_transition(from, event, to, context) {
                Ok(true) => {}
                Ok(false) => {
                    warn!(
                        listener = listener.name(),
                        from = ?from,
                        event = %event,
                        to = %to,
                        "Transition vetoed by listener"
                    );
                    allowed = false;
                }
                Err(e) => {
                    warn!(
                        listener = listener.name(),
                        error = %e,
                        event = %event,
                        "Pre-transition listener failed"
                    );
                }
            }
        }
        allowed
    }

    /// Run every post-transition callback; failures are logged and skipped
    pub fn notify_post(&self, from: Option<S>, to: S, event: E, context: &C, success: bool) {
        for listener in self.snapshot_listeners() {
            if let Err(e) = listener.post_transition(from, to, event, context, success) {
                warn!(
                    listener = listener.name(),
                    error = %e,
                    event = %event,
                    to = %to,
                    "Post-transition listener failed"
                );
            }
        }
    }
}

impl<S: MachineSymbol, E: MachineSymbol, C: ?Sized> Default for StateMachine<S, E, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MachineSymbol, E: MachineSymbol, C: ?Sized> Debug for StateMachine<S, E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("initial", &self.initial.len())
            .field("edges", &self.edges.len())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
