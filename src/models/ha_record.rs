//! # HA Record Model
//!
//! The resource health record: one row per monitored resource, mutated only
//! through the versioned state commit of the persistence layer.
//!
//! ## Database Schema
//!
//! Maps to the `ha_config` table:
//! ```sql
//! CREATE TABLE ha_config (
//!   id BIGSERIAL PRIMARY KEY,
//!   resource_id BIGINT NOT NULL,
//!   resource_type VARCHAR(32) NOT NULL,
//!   resource_sub_type VARCHAR(64) NOT NULL,
//!   enabled BOOLEAN NOT NULL DEFAULT false,
//!   state VARCHAR(32) NOT NULL,
//!   provider_name VARCHAR(64) NOT NULL,
//!   management_server_id BIGINT,
//!   update_count BIGINT NOT NULL DEFAULT 0,
//!   last_transition_metadata JSONB,
//!   created_at TIMESTAMPTZ NOT NULL,
//!   updated_at TIMESTAMPTZ NOT NULL,
//!   UNIQUE (resource_id, resource_type)
//! );
//! ```
//!
//! ## Versioning
//!
//! `update_count` is the optimistic-concurrency token. A state write only
//! lands when the stored `(state, update_count)` still matches what the writer
//! read, and every landed write bumps it by exactly one.

use super::resource::{HaResource, ManagementServerId, ResourceKey, ResourceType};
use crate::state_machine::states::HaState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaRecord {
    pub resource_id: i64,
    pub resource_type: ResourceType,
    pub resource_sub_type: String,
    pub enabled: bool,
    pub state: HaState,
    /// Node that last drove a transition; advisory only
    pub management_server_id: Option<ManagementServerId>,
    pub update_count: i64,
    pub provider_name: String,
    /// Metadata written with the most recent committed transition
    #[serde(default)]
    pub last_transition_metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HaRecord {
    pub fn key(&self) -> ResourceKey {
        (self.resource_id, self.resource_type)
    }

    /// The probe subject described by this record
    pub fn resource(&self) -> HaResource {
        HaResource::new(
            self.resource_id,
            self.resource_type,
            self.resource_sub_type.clone(),
        )
    }

    /// True when no other node holds a claim on the record
    pub fn is_claimable_by(&self, management_server_id: ManagementServerId) -> bool {
        match self.management_server_id {
            None => true,
            Some(owner) => owner == management_server_id,
        }
    }
}

/// Values for creating a new record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHaRecord {
    pub resource_id: i64,
    pub resource_type: ResourceType,
    pub resource_sub_type: String,
    pub enabled: bool,
    pub state: HaState,
    pub provider_name: String,
    pub management_server_id: Option<ManagementServerId>,
}

impl NewHaRecord {
    pub fn into_record(self, now: DateTime<Utc>) -> HaRecord {
        HaRecord {
            resource_id: self.resource_id,
            resource_type: self.resource_type,
            resource_sub_type: self.resource_sub_type,
            enabled: self.enabled,
            state: self.state,
            management_server_id: self.management_server_id,
            update_count: 0,
            provider_name: self.provider_name,
            last_transition_metadata: None,
            created_at: now,
            updated_at: now,
        }
    }
}
