//! # State Machine Persistence Layer
//!
//! The HA record store contract. Cross-node coordination happens entirely
//! through this store: every node polls it, and the only write path for
//! `state` is the conditional [`HaRecordStore::update_state`], which lands
//! only when the stored `(state, update_count)` still matches the caller's
//! read. A `false` return is an expected race outcome, not an error.
//!
//! Implementations live in [`crate::database`].

use super::errors::PersistenceResult;
use super::events::HaEvent;
use super::states::HaState;
use crate::models::{HaRecord, ManagementServerId, NewHaRecord, ResourceType};
use async_trait::async_trait;
use serde_json::Value;

/// Extra data accompanying a state commit
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPayload {
    /// Node originating the event; becomes the owner unless the event clears ownership
    pub management_server_id: ManagementServerId,
    pub metadata: Option<Value>,
}

impl TransitionPayload {
    pub fn new(management_server_id: ManagementServerId) -> Self {
        Self {
            management_server_id,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Owner claim stored after committing `event`
    pub fn owner_after(&self, event: HaEvent) -> Option<ManagementServerId> {
        if event.clears_ownership() {
            None
        } else {
            Some(self.management_server_id)
        }
    }
}

/// Persistence collaborator for HA records
#[async_trait]
pub trait HaRecordStore: Send + Sync {
    async fn find_by_resource(
        &self,
        resource_id: i64,
        resource_type: ResourceType,
    ) -> PersistenceResult<Option<HaRecord>>;

    /// All records, optionally restricted to one resource type
    async fn list_by_resource(
        &self,
        resource_type: Option<ResourceType>,
    ) -> PersistenceResult<Vec<HaRecord>>;

    /// Insert a new record with `update_count = 0`
    async fn create(&self, record: NewHaRecord) -> PersistenceResult<HaRecord>;

    /// Update the non-state settings of a record
    async fn update_settings(
        &self,
        resource_id: i64,
        resource_type: ResourceType,
        enabled: bool,
        provider_name: &str,
    ) -> PersistenceResult<HaRecord>;

    /// Compare-and-swap state commit.
    ///
    /// Succeeds only if the stored record still has `expected_state` and
    /// `record.update_count`. On success the state becomes `next_state`,
    /// `update_count` grows by one and the owner becomes
    /// `payload.owner_after(event)`.
    async fn update_state(
        &self,
        expected_state: HaState,
        event: HaEvent,
        next_state: HaState,
        record: &HaRecord,
        payload: &TransitionPayload,
    ) -> PersistenceResult<bool>;

    /// Clear every claim held by `management_server_id`; returns rows touched
    async fn expire_ownership(&self, management_server_id: ManagementServerId)
        -> PersistenceResult<u64>;
}
