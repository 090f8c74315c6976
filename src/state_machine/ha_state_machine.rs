//! HA transition table.
//!
//! Self-loops (`Suspect` on repeated failure, `Fencing` on retry) mean "still
//! trying, nothing decided yet". `Checking` falls back to `Suspect` when an
//! activity round has too few samples.

use super::engine::StateMachine;
use super::errors::StateMachineResult;
use super::events::HaEvent;
use super::states::HaState;
use crate::models::HaRecord;

/// The HA state machine; listeners observe the record being transitioned
pub type HaStateMachine = StateMachine<HaState, HaEvent, HaRecord>;

/// Build the HA transition table
pub fn build_ha_state_machine() -> StateMachineResult<HaStateMachine> {
    use HaEvent as E;
    use HaState as S;

    let mut sm = HaStateMachine::new();

    sm.add_initial_transition(E::Disabled, S::Disabled)?;
    sm.add_initial_transition(E::Enabled, S::Available)?;
    sm.add_initial_transition(E::Ineligible, S::Ineligible)?;

    sm.add_transition(S::Disabled, E::Enabled, S::Available)?;

    sm.add_transition(S::Ineligible, E::Disabled, S::Disabled)?;
    sm.add_transition(S::Ineligible, E::Ineligible, S::Ineligible)?;
    sm.add_transition(S::Ineligible, E::Eligible, S::Available)?;

    sm.add_transition(S::Available, E::Disabled, S::Disabled)?;
    sm.add_transition(S::Available, E::Ineligible, S::Ineligible)?;
    sm.add_transition(S::Available, E::HealthCheckPassed, S::Available)?;
    sm.add_transition(S::Available, E::HealthCheckFailed, S::Suspect)?;

    sm.add_transition(S::Suspect, E::Disabled, S::Disabled)?;
    sm.add_transition(S::Suspect, E::Ineligible, S::Ineligible)?;
    sm.add_transition(S::Suspect, E::HealthCheckFailed, S::Suspect)?;
    sm.add_transition(S::Suspect, E::PerformActivityCheck, S::Checking)?;
    sm.add_transition(S::Suspect, E::HealthCheckPassed, S::Available)?;

    sm.add_transition(S::Checking, E::Disabled, S::Disabled)?;
    sm.add_transition(S::Checking, E::Ineligible, S::Ineligible)?;
    sm.add_transition(S::Checking, E::TooFewActivityCheckSamples, S::Suspect)?;
    sm.add_transition(
        S::Checking,
        E::ActivityCheckFailureUnderThresholdRatio,
        S::Degraded,
    )?;
    sm.add_transition(
        S::Checking,
        E::ActivityCheckFailureOverThresholdRatio,
        S::Recovering,
    )?;

    sm.add_transition(S::Degraded, E::Disabled, S::Disabled)?;
    sm.add_transition(S::Degraded, E::Ineligible, S::Ineligible)?;
    sm.add_transition(S::Degraded, E::HealthCheckFailed, S::Degraded)?;
    sm.add_transition(S::Degraded, E::HealthCheckPassed, S::Available)?;
    sm.add_transition(S::Degraded, E::PeriodicRecheckResourceActivity, S::Suspect)?;

    sm.add_transition(S::Recovering, E::Disabled, S::Disabled)?;
    sm.add_transition(S::Recovering, E::Ineligible, S::Ineligible)?;
    sm.add_transition(S::Recovering, E::RetryRecovery, S::Recovering)?;
    sm.add_transition(S::Recovering, E::Recovered, S::Recovered)?;
    sm.add_transition(
        S::Recovering,
        E::RecoveryOperationThresholdExceeded,
        S::Fencing,
    )?;

    sm.add_transition(S::Recovered, E::Disabled, S::Disabled)?;
    sm.add_transition(S::Recovered, E::Ineligible, S::Ineligible)?;
    sm.add_transition(S::Recovered, E::RecoveryWaitPeriodTimeout, S::Available)?;

    sm.add_transition(S::Fencing, E::Disabled, S::Disabled)?;
    sm.add_transition(S::Fencing, E::Ineligible, S::Ineligible)?;
    sm.add_transition(S::Fencing, E::RetryFencing, S::Fencing)?;
    sm.add_transition(S::Fencing, E::Fenced, S::Fenced)?;

    sm.add_transition(S::Fenced, E::Disabled, S::Disabled)?;
    sm.add_transition(S::Fenced, E::HealthCheckPassed, S::Ineligible)?;
    sm.add_transition(S::Fenced, E::HealthCheckFailed, S::Fenced)?;

    Ok(sm)
}
