//! Several nodes sharing one store.

use crate::common::{fast_tunables, TestNode, HOST};
use ha_core::database::InMemoryHaStore;
use ha_core::models::{ManagementServerId, NewHaRecord};
use ha_core::orchestration::ProcessOutcome;
use ha_core::provider::{SimulatorHaState, SIMULATOR_PROVIDER_NAME, SIMULATOR_SUB_TYPE};
use ha_core::state_machine::{HaEvent, HaRecordStore, HaState};
use std::sync::Arc;

fn unowned_available(resource_id: i64) -> NewHaRecord {
    NewHaRecord {
        resource_id,
        resource_type: HOST,
        resource_sub_type: SIMULATOR_SUB_TYPE.to_string(),
        enabled: true,
        state: HaState::Available,
        provider_name: SIMULATOR_PROVIDER_NAME.to_string(),
        management_server_id: None,
    }
}

fn cluster(size: i64, store: &Arc<InMemoryHaStore>) -> Vec<TestNode> {
    (1..=size)
        .map(|id| TestNode::new(id, store.clone(), fast_tunables()))
        .collect()
}

#[tokio::test]
async fn two_nodes_on_one_observation_single_winner() {
    let store = Arc::new(InMemoryHaStore::new());
    let nodes = cluster(2, &store);
    let snapshot = store.create(unowned_available(1)).await.unwrap();
    for node in &nodes {
        node.simulator
            .set_state((1, HOST), SimulatorHaState::dead());
    }

    let (a, b) = tokio::join!(
        nodes[0].manager.process_record(snapshot.clone()),
        nodes[1].manager.process_record(snapshot.clone()),
    );
    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, ProcessOutcome::LostRace(_)));
    assert_eq!(
        outcomes,
        vec![
            ProcessOutcome::Transitioned(HaEvent::HealthCheckFailed, HaState::Suspect),
            ProcessOutcome::LostRace(HaEvent::HealthCheckFailed),
        ]
    );

    let stored = store.find_by_resource(1, HOST).await.unwrap().unwrap();
    assert_eq!(stored.update_count, 1);
    assert_eq!(stored.state, HaState::Suspect);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_nodes_racing_commit_once() {
    let store = Arc::new(InMemoryHaStore::new());
    let nodes = cluster(8, &store);
    let snapshot = store.create(unowned_available(1)).await.unwrap();

    let mut handles = Vec::new();
    for node in &nodes {
        let manager = node.manager.clone();
        let snapshot = snapshot.clone();
        handles.push(tokio::spawn(async move {
            manager.process_record(snapshot).await.unwrap()
        }));
    }

    let mut committed = 0;
    let mut lost = 0;
    for handle in handles {
        match handle.await.unwrap() {
            ProcessOutcome::Transitioned(..) => committed += 1,
            ProcessOutcome::LostRace(_) => lost += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(committed, 1);
    assert_eq!(lost, 7);
    let stored = store.find_by_resource(1, HOST).await.unwrap().unwrap();
    assert_eq!(stored.update_count, 1);
}

#[tokio::test]
async fn owner_failover_after_expiry() {
    let store = Arc::new(InMemoryHaStore::new());
    let nodes = cluster(2, &store);
    store.create(unowned_available(1)).await.unwrap();

    // node 1 claims the record with its first commit
    let summary = nodes[0].manager.run_cycle().await.unwrap();
    assert_eq!(summary.transitioned, 1);
    assert_eq!(
        nodes[0].record(1).await.management_server_id,
        Some(ManagementServerId(1))
    );

    let summary = nodes[1].manager.run_cycle().await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.transitioned, 0);

    // node 1 goes away; its claims are released
    assert_eq!(
        nodes[1]
            .manager
            .expire_ownership(ManagementServerId(1))
            .await
            .unwrap(),
        1
    );
    let summary = nodes[1].manager.run_cycle().await.unwrap();
    assert_eq!(summary.transitioned, 1);
    assert_eq!(
        nodes[1].record(1).await.management_server_id,
        Some(ManagementServerId(2))
    );
}
