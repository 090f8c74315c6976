//! In-process record store.
//!
//! Backed by a `DashMap`; the conditional state write holds the entry's shard
//! lock for the compare and the swap, so concurrent writers on one record are
//! serialised exactly as a row-level conditional UPDATE would serialise them.

use crate::models::{HaRecord, ManagementServerId, NewHaRecord, ResourceKey, ResourceType};
use crate::state_machine::errors::{PersistenceError, PersistenceResult};
use crate::state_machine::events::HaEvent;
use crate::state_machine::persistence::{HaRecordStore, TransitionPayload};
use crate::state_machine::states::HaState;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

#[derive(Debug, Default)]
pub struct InMemoryHaStore {
    records: DashMap<ResourceKey, HaRecord>,
}

impl InMemoryHaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl HaRecordStore for InMemoryHaStore {
    async fn find_by_resource(
        &self,
        resource_id: i64,
        resource_type: ResourceType,
    ) -> PersistenceResult<Option<HaRecord>> {
        Ok(self
            .records
            .get(&(resource_id, resource_type))
            .map(|entry| entry.value().clone()))
    }

    async fn list_by_resource(
        &self,
        resource_type: Option<ResourceType>,
    ) -> PersistenceResult<Vec<HaRecord>> {
        let mut records: Vec<HaRecord> = self
            .records
            .iter()
            .filter(|entry| resource_type.map_or(true, |t| entry.key().1 == t))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.key());
        Ok(records)
    }

    async fn create(&self, record: NewHaRecord) -> PersistenceResult<HaRecord> {
        let key = (record.resource_id, record.resource_type);
        match self.records.entry(key) {
            Entry::Occupied(_) => Err(PersistenceError::DuplicateRecord {
                resource_id: key.0,
                resource_type: key.1.to_string(),
            }),
            Entry::Vacant(slot) => {
                let created = record.into_record(Utc::now());
                slot.insert(created.clone());
                Ok(created)
            }
        }
    }

    async fn update_settings(
        &self,
        resource_id: i64,
        resource_type: ResourceType,
        enabled: bool,
        provider_name: &str,
    ) -> PersistenceResult<HaRecord> {
        let mut entry = self
            .records
            .get_mut(&(resource_id, resource_type))
            .ok_or_else(|| PersistenceError::RecordNotFound {
                resource_id,
                resource_type: resource_type.to_string(),
            })?;
        let record = entry.value_mut();
        record.enabled = enabled;
        record.provider_name = provider_name.to_string();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn update_state(
        &self,
        expected_state: HaState,
        event: HaEvent,
        next_state: HaState,
        record: &HaRecord,
        payload: &TransitionPayload,
    ) -> PersistenceResult<bool> {
        let Some(mut entry) = self.records.get_mut(&record.key()) else {
            return Ok(false);
        };
        let stored = entry.value_mut();
        if stored.state != expected_state || stored.update_count != record.update_count {
            trace!(
                resource_id = record.resource_id,
                stored_state = %stored.state,
                stored_update_count = stored.update_count,
                expected_state = %expected_state,
                expected_update_count = record.update_count,
                "Conditional state write rejected"
            );
            return Ok(false);
        }
        stored.state = next_state;
        stored.update_count += 1;
        stored.management_server_id = payload.owner_after(event);
        stored.last_transition_metadata = payload.metadata.clone();
        stored.updated_at = Utc::now();
        Ok(true)
    }

    async fn expire_ownership(
        &self,
        management_server_id: ManagementServerId,
    ) -> PersistenceResult<u64> {
        let mut expired = 0;
        for mut entry in self.records.iter_mut() {
            if entry.management_server_id == Some(management_server_id) {
                entry.management_server_id = None;
                expired += 1;
            }
        }
        Ok(expired)
    }
}
