//! Single-node lifecycle paths driven through the manager.

use crate::common::{fast_tunables, TestNode, HOST};
use ha_core::orchestration::ProcessOutcome;
use ha_core::provider::{ProviderTunables, SimulatorHaState};
use ha_core::state_machine::{HaEvent, HaState};

fn transitioned(event: HaEvent, state: HaState) -> ProcessOutcome {
    ProcessOutcome::Transitioned(event, state)
}

async fn expect_path(node: &TestNode, id: i64, path: &[(HaEvent, HaState)]) {
    for (event, state) in path {
        assert_eq!(node.step(id).await, transitioned(*event, *state));
    }
}

#[tokio::test]
async fn dead_host_escalates_to_fenced_and_back() {
    let node = TestNode::single(fast_tunables());
    node.enabled_host(1).await;
    node.manager
        .override_simulator_state(
            1,
            HOST,
            SimulatorHaState {
                healthy: false,
                has_activity: false,
                recoverable: false,
                fenceable: true,
                ..Default::default()
            },
        )
        .unwrap();

    use HaEvent as E;
    use HaState as S;
    expect_path(
        &node,
        1,
        &[
            (E::HealthCheckFailed, S::Suspect),
            (E::PerformActivityCheck, S::Checking),
            (E::TooFewActivityCheckSamples, S::Suspect),
            (E::PerformActivityCheck, S::Checking),
            (E::TooFewActivityCheckSamples, S::Suspect),
            (E::PerformActivityCheck, S::Checking),
            (E::ActivityCheckFailureOverThresholdRatio, S::Recovering),
            (E::RetryRecovery, S::Recovering),
            (E::RetryRecovery, S::Recovering),
            (E::RecoveryOperationThresholdExceeded, S::Fencing),
            (E::Fenced, S::Fenced),
            (E::HealthCheckFailed, S::Fenced),
        ],
    )
    .await;

    // the host comes back after being fenced: it must be re-admitted explicitly
    node.manager
        .override_simulator_state(1, HOST, SimulatorHaState::default())
        .unwrap();
    expect_path(
        &node,
        1,
        &[
            (E::HealthCheckPassed, S::Ineligible),
            (E::Eligible, S::Available),
        ],
    )
    .await;

    let history = node.simulator.history((1, HOST));
    // Enabled plus the fourteen transitions above
    assert_eq!(history.len(), 15);
    assert_eq!(history[0].event, HaEvent::Enabled);
    assert_eq!(history.last().map(|t| t.to), Some(HaState::Available));
    assert_eq!(node.record(1).await.update_count, 15);
}

#[tokio::test]
async fn recovery_threshold_allows_exactly_max_retries() {
    let node = TestNode::single(ProviderTunables {
        max_recovery_attempts: 3,
        max_activity_checks: 1,
        ..fast_tunables()
    });
    node.enabled_host(1).await;
    node.manager
        .override_simulator_state(1, HOST, SimulatorHaState::dead())
        .unwrap();

    use HaEvent as E;
    use HaState as S;
    expect_path(
        &node,
        1,
        &[
            (E::HealthCheckFailed, S::Suspect),
            (E::PerformActivityCheck, S::Checking),
            (E::ActivityCheckFailureOverThresholdRatio, S::Recovering),
        ],
    )
    .await;

    let mut retries = 0;
    loop {
        match node.step(1).await {
            ProcessOutcome::Transitioned(E::RetryRecovery, S::Recovering) => retries += 1,
            ProcessOutcome::Transitioned(E::RecoveryOperationThresholdExceeded, S::Fencing) => {
                break
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(retries, 3);
    assert_eq!(node.simulator.probe_calls().recover, 4);
}

#[tokio::test]
async fn failed_fence_is_retried() {
    let node = TestNode::single(ProviderTunables {
        max_recovery_attempts: 0,
        max_activity_checks: 1,
        ..fast_tunables()
    });
    node.enabled_host(1).await;
    node.manager
        .override_simulator_state(
            1,
            HOST,
            SimulatorHaState {
                fenceable: false,
                ..SimulatorHaState::dead()
            },
        )
        .unwrap();

    use HaEvent as E;
    use HaState as S;
    expect_path(
        &node,
        1,
        &[
            (E::HealthCheckFailed, S::Suspect),
            (E::PerformActivityCheck, S::Checking),
            (E::ActivityCheckFailureOverThresholdRatio, S::Recovering),
            (E::RecoveryOperationThresholdExceeded, S::Fencing),
            (E::RetryFencing, S::Fencing),
            (E::RetryFencing, S::Fencing),
        ],
    )
    .await;
}

#[tokio::test]
async fn degraded_host_is_rechecked_once_wait_elapses() {
    let node = TestNode::single(ProviderTunables {
        max_activity_checks: 1,
        max_degraded_wait_timeout_ms: 0,
        ..fast_tunables()
    });
    node.enabled_host(1).await;
    node.manager
        .override_simulator_state(1, HOST, SimulatorHaState::unhealthy_but_active())
        .unwrap();

    use HaEvent as E;
    use HaState as S;
    expect_path(
        &node,
        1,
        &[
            (E::HealthCheckFailed, S::Suspect),
            (E::PerformActivityCheck, S::Checking),
            (E::ActivityCheckFailureUnderThresholdRatio, S::Degraded),
            (E::PeriodicRecheckResourceActivity, S::Suspect),
            (E::PerformActivityCheck, S::Checking),
            (E::ActivityCheckFailureUnderThresholdRatio, S::Degraded),
        ],
    )
    .await;
    assert_eq!(node.simulator.probe_calls().activity, 2);
}

#[tokio::test]
async fn degraded_host_waits_before_recheck() {
    let node = TestNode::single(ProviderTunables {
        max_activity_checks: 1,
        max_degraded_wait_timeout_ms: 60_000,
        ..fast_tunables()
    });
    node.enabled_host(1).await;
    node.manager
        .override_simulator_state(1, HOST, SimulatorHaState::unhealthy_but_active())
        .unwrap();

    use HaEvent as E;
    use HaState as S;
    expect_path(
        &node,
        1,
        &[
            (E::HealthCheckFailed, S::Suspect),
            (E::PerformActivityCheck, S::Checking),
            (E::ActivityCheckFailureUnderThresholdRatio, S::Degraded),
            (E::HealthCheckFailed, S::Degraded),
            (E::HealthCheckFailed, S::Degraded),
        ],
    )
    .await;
    assert_eq!(node.simulator.probe_calls().activity, 1);

    node.manager
        .override_simulator_state(1, HOST, SimulatorHaState::default())
        .unwrap();
    expect_path(&node, 1, &[(E::HealthCheckPassed, S::Available)]).await;
}

#[tokio::test]
async fn slow_health_check_counts_as_failure() {
    let node = TestNode::single(ProviderTunables {
        health_check_timeout_ms: 20,
        ..fast_tunables()
    });
    node.enabled_host(1).await;
    node.manager
        .override_simulator_state(
            1,
            HOST,
            SimulatorHaState {
                probe_delay_ms: Some(500),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(
        node.step(1).await,
        transitioned(HaEvent::HealthCheckFailed, HaState::Suspect)
    );
}

#[tokio::test]
async fn purging_a_counter_keeps_the_state() {
    let node = TestNode::single(fast_tunables());
    node.enabled_host(1).await;
    node.manager
        .override_simulator_state(1, HOST, SimulatorHaState::dead())
        .unwrap();
    node.step(1).await;
    node.step(1).await;
    node.step(1).await;
    assert!(node.manager.counters().contains((1, HOST)));
    let before = node.record(1).await;
    assert_eq!(before.state, HaState::Suspect);

    assert!(node.manager.purge_counter(1, HOST));
    assert!(!node.manager.counters().contains((1, HOST)));
    assert_eq!(node.record(1).await, before);
}

#[tokio::test]
async fn disabling_mid_investigation_returns_to_disabled() {
    let node = TestNode::single(fast_tunables());
    node.enabled_host(1).await;
    node.manager
        .override_simulator_state(1, HOST, SimulatorHaState::dead())
        .unwrap();
    node.step(1).await;
    node.step(1).await;
    assert_eq!(node.record(1).await.state, HaState::Checking);

    assert!(node.manager.disable(1, HOST).await.unwrap());
    let record = node.record(1).await;
    assert_eq!(record.state, HaState::Disabled);
    assert!(!record.enabled);
    assert_eq!(record.management_server_id, None);

    assert!(node.manager.enable(1, HOST).await.unwrap());
    assert_eq!(node.record(1).await.state, HaState::Available);
}

#[tokio::test]
async fn cycle_covers_every_record() {
    let node = TestNode::single(fast_tunables());
    for id in 1..=10 {
        node.enabled_host(id).await;
    }
    for id in 1..=5 {
        node.manager
            .override_simulator_state(id, HOST, SimulatorHaState::dead())
            .unwrap();
    }

    let summary = node.manager.run_cycle().await.unwrap();
    assert_eq!(summary.examined, 10);
    assert_eq!(summary.transitioned, 10);
    assert_eq!(summary.errors, 0);

    for id in 1..=5 {
        assert_eq!(node.record(id).await.state, HaState::Suspect);
    }
    for id in 6..=10 {
        assert_eq!(node.record(id).await.state, HaState::Available);
    }
}
