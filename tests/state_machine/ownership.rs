//! Ownership and versioning guarantees of committed transitions.

use crate::common::{fast_tunables, TestNode, HOST};
use ha_core::database::InMemoryHaStore;
use ha_core::models::{ManagementServerId, NewHaRecord};
use ha_core::provider::{SIMULATOR_PROVIDER_NAME, SIMULATOR_SUB_TYPE};
use ha_core::state_machine::{HaEvent, HaRecordStore, HaState, TransitionPayload};
use std::sync::Arc;

fn owned_record(resource_id: i64, state: HaState, owner: i64) -> NewHaRecord {
    NewHaRecord {
        resource_id,
        resource_type: HOST,
        resource_sub_type: SIMULATOR_SUB_TYPE.to_string(),
        enabled: true,
        state,
        provider_name: SIMULATOR_PROVIDER_NAME.to_string(),
        management_server_id: Some(ManagementServerId(owner)),
    }
}

#[tokio::test]
async fn disabled_clears_owner_from_every_state() {
    let store = Arc::new(InMemoryHaStore::new());
    let node = TestNode::new(1, store.clone(), fast_tunables());

    let sources: Vec<HaState> = HaState::ALL
        .into_iter()
        .filter(|s| *s != HaState::Disabled)
        .collect();
    for (i, state) in sources.iter().enumerate() {
        let id = i as i64 + 1;
        // owned by some other node; Disabled must clear the claim regardless
        let record = store.create(owned_record(id, *state, 9)).await.unwrap();
        assert!(node
            .manager
            .transition(&record, HaEvent::Disabled)
            .await
            .unwrap());

        let stored = node.record(id).await;
        assert_eq!(stored.state, HaState::Disabled, "from {state}");
        assert_eq!(stored.management_server_id, None, "from {state}");
        assert_eq!(stored.update_count, record.update_count + 1);
    }
}

#[tokio::test]
async fn other_events_claim_ownership_for_the_writer() {
    let node = TestNode::single(fast_tunables());
    let record = node.enabled_host(1).await;
    assert!(node
        .manager
        .transition(&record, HaEvent::HealthCheckFailed)
        .await
        .unwrap());
    assert_eq!(
        node.record(1).await.management_server_id,
        Some(ManagementServerId(1))
    );
}

#[tokio::test]
async fn replaying_a_committed_event_is_rejected() {
    let store = Arc::new(InMemoryHaStore::new());
    let record = store
        .create(owned_record(1, HaState::Available, 1))
        .await
        .unwrap();
    let payload = TransitionPayload::new(ManagementServerId(1));

    let first = store
        .update_state(
            HaState::Available,
            HaEvent::HealthCheckFailed,
            HaState::Suspect,
            &record,
            &payload,
        )
        .await
        .unwrap();
    let replay = store
        .update_state(
            HaState::Available,
            HaEvent::HealthCheckFailed,
            HaState::Suspect,
            &record,
            &payload,
        )
        .await
        .unwrap();
    assert!(first);
    assert!(!replay);

    let stored = store.find_by_resource(1, HOST).await.unwrap().unwrap();
    assert_eq!(stored.update_count, 1);
    assert_eq!(stored.state, HaState::Suspect);
}

#[tokio::test]
async fn settings_changes_do_not_bump_the_version() {
    let node = TestNode::single(fast_tunables());
    let record = node.enabled_host(1).await;
    node.manager
        .configure(&record.resource(), SIMULATOR_PROVIDER_NAME)
        .await
        .unwrap();
    assert_eq!(node.record(1).await.update_count, record.update_count);
}
