//! The HA edge table, checked exhaustively against an independent listing.

use ha_core::state_machine::{build_ha_state_machine, HaEvent, HaState, StateMachineError};
use proptest::prelude::*;
use std::collections::HashMap;

fn expected_edges() -> HashMap<(HaState, HaEvent), HaState> {
    use HaEvent as E;
    use HaState as S;
    [
        (S::Disabled, E::Enabled, S::Available),
        (S::Ineligible, E::Disabled, S::Disabled),
        (S::Ineligible, E::Ineligible, S::Ineligible),
        (S::Ineligible, E::Eligible, S::Available),
        (S::Available, E::Disabled, S::Disabled),
        (S::Available, E::Ineligible, S::Ineligible),
        (S::Available, E::HealthCheckPassed, S::Available),
        (S::Available, E::HealthCheckFailed, S::Suspect),
        (S::Suspect, E::Disabled, S::Disabled),
        (S::Suspect, E::Ineligible, S::Ineligible),
        (S::Suspect, E::HealthCheckFailed, S::Suspect),
        (S::Suspect, E::PerformActivityCheck, S::Checking),
        (S::Suspect, E::HealthCheckPassed, S::Available),
        (S::Checking, E::Disabled, S::Disabled),
        (S::Checking, E::Ineligible, S::Ineligible),
        (S::Checking, E::TooFewActivityCheckSamples, S::Suspect),
        (S::Checking, E::ActivityCheckFailureUnderThresholdRatio, S::Degraded),
        (S::Checking, E::ActivityCheckFailureOverThresholdRatio, S::Recovering),
        (S::Degraded, E::Disabled, S::Disabled),
        (S::Degraded, E::Ineligible, S::Ineligible),
        (S::Degraded, E::HealthCheckFailed, S::Degraded),
        (S::Degraded, E::HealthCheckPassed, S::Available),
        (S::Degraded, E::PeriodicRecheckResourceActivity, S::Suspect),
        (S::Recovering, E::Disabled, S::Disabled),
        (S::Recovering, E::Ineligible, S::Ineligible),
        (S::Recovering, E::RetryRecovery, S::Recovering),
        (S::Recovering, E::Recovered, S::Recovered),
        (S::Recovering, E::RecoveryOperationThresholdExceeded, S::Fencing),
        (S::Recovered, E::Disabled, S::Disabled),
        (S::Recovered, E::Ineligible, S::Ineligible),
        (S::Recovered, E::RecoveryWaitPeriodTimeout, S::Available),
        (S::Fencing, E::Disabled, S::Disabled),
        (S::Fencing, E::Ineligible, S::Ineligible),
        (S::Fencing, E::RetryFencing, S::Fencing),
        (S::Fencing, E::Fenced, S::Fenced),
        (S::Fenced, E::Disabled, S::Disabled),
        (S::Fenced, E::HealthCheckPassed, S::Ineligible),
        (S::Fenced, E::HealthCheckFailed, S::Fenced),
    ]
    .into_iter()
    .map(|(from, event, to)| ((from, event), to))
    .collect()
}

fn state_strategy() -> impl Strategy<Value = HaState> {
    proptest::sample::select(HaState::ALL.to_vec())
}

fn event_strategy() -> impl Strategy<Value = HaEvent> {
    proptest::sample::select(HaEvent::ALL.to_vec())
}

proptest! {
    /// Property: a pair resolves exactly when it is a listed edge, to the listed target
    #[test]
    fn every_pair_matches_the_table(from in state_strategy(), event in event_strategy()) {
        let machine = build_ha_state_machine().unwrap();
        match expected_edges().get(&(from, event)) {
            Some(to) => prop_assert_eq!(machine.transition(from, event).unwrap(), *to),
            None => {
                let is_no_transition = matches!(
                    machine.transition(from, event),
                    Err(StateMachineError::NoTransition { .. })
                );
                prop_assert!(is_no_transition, "{from} + {event} should have no edge");
            }
        }
    }
}

#[test]
fn full_grid_matches_the_table() {
    let machine = build_ha_state_machine().unwrap();
    let expected = expected_edges();
    let mut legal = 0;
    for from in HaState::ALL {
        for event in HaEvent::ALL {
            let actual = machine.transition(from, event).ok();
            assert_eq!(actual, expected.get(&(from, event)).copied(), "{from} + {event}");
            legal += usize::from(actual.is_some());
        }
    }
    assert_eq!(legal, 38);
    assert_eq!(machine.edges().count(), 38);
}

#[test]
fn power_cycle_is_never_accepted() {
    let machine = build_ha_state_machine().unwrap();
    for from in HaState::ALL {
        assert!(machine.transition(from, HaEvent::PowerCycle).is_err());
    }
    assert!(machine.initial_transition(HaEvent::PowerCycle).is_err());
}

#[test]
fn initial_edges() {
    let machine = build_ha_state_machine().unwrap();
    assert_eq!(
        machine.initial_transition(HaEvent::Disabled).unwrap(),
        HaState::Disabled
    );
    assert_eq!(
        machine.initial_transition(HaEvent::Enabled).unwrap(),
        HaState::Available
    );
    assert_eq!(
        machine.initial_transition(HaEvent::Ineligible).unwrap(),
        HaState::Ineligible
    );
    assert!(machine
        .initial_transition(HaEvent::HealthCheckFailed)
        .is_err());
}
