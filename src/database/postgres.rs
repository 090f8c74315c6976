//! PostgreSQL record store.
//!
//! The conditional state write is a single `UPDATE ... WHERE state = $ AND
//! update_count = $`; `rows_affected() == 1` means this node won the race.

use crate::models::{HaRecord, ManagementServerId, NewHaRecord, ResourceType};
use crate::state_machine::errors::{PersistenceError, PersistenceResult};
use crate::state_machine::events::HaEvent;
use crate::state_machine::persistence::{HaRecordStore, TransitionPayload};
use crate::state_machine::states::HaState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};

const SCHEMA: &str = include_str!("../../migrations/20260101000000_create_ha_config.sql");

const SELECT_COLUMNS: &str = "resource_id, resource_type, resource_sub_type, enabled, state, \
     provider_name, management_server_id, update_count, last_transition_metadata, created_at, \
     updated_at";

/// Internal struct for SQL query results
#[derive(Debug, FromRow)]
struct HaConfigRow {
    resource_id: i64,
    resource_type: String,
    resource_sub_type: String,
    enabled: bool,
    state: String,
    provider_name: String,
    management_server_id: Option<i64>,
    update_count: i64,
    last_transition_metadata: Option<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<HaConfigRow> for HaRecord {
    type Error = PersistenceError;

    fn try_from(row: HaConfigRow) -> Result<Self, Self::Error> {
        let resource_type = row
            .resource_type
            .parse()
            .map_err(|field| PersistenceError::InvalidRecordData { field })?;
        let state = row
            .state
            .parse()
            .map_err(|field| PersistenceError::InvalidRecordData { field })?;

        Ok(HaRecord {
            resource_id: row.resource_id,
            resource_type,
            resource_sub_type: row.resource_sub_type,
            enabled: row.enabled,
            state,
            management_server_id: row.management_server_id.map(ManagementServerId),
            update_count: row.update_count,
            provider_name: row.provider_name,
            last_transition_metadata: row.last_transition_metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgHaStore {
    pool: PgPool,
}

impl PgHaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> PersistenceResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections = max_connections, "Connected HA record store");
        Ok(Self::new(pool))
    }

    /// Create the `ha_config` table and indexes when missing
    pub async fn ensure_schema(&self) -> PersistenceResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        debug!("HA schema ensured");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HaRecordStore for PgHaStore {
    async fn find_by_resource(
        &self,
        resource_id: i64,
        resource_type: ResourceType,
    ) -> PersistenceResult<Option<HaRecord>> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM ha_config WHERE resource_id = $1 AND resource_type = $2"
        );
        let row = sqlx::query_as::<_, HaConfigRow>(&query)
            .bind(resource_id)
            .bind(resource_type.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(HaRecord::try_from).transpose()
    }

    async fn list_by_resource(
        &self,
        resource_type: Option<ResourceType>,
    ) -> PersistenceResult<Vec<HaRecord>> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM ha_config \
             WHERE ($1::VARCHAR IS NULL OR resource_type = $1) \
             ORDER BY resource_type, resource_id"
        );
        let rows = sqlx::query_as::<_, HaConfigRow>(&query)
            .bind(resource_type.map(|t| t.to_string()))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(HaRecord::try_from).collect()
    }

    async fn create(&self, record: NewHaRecord) -> PersistenceResult<HaRecord> {
        let query = format!(
            "INSERT INTO ha_config \
             (resource_id, resource_type, resource_sub_type, enabled, state, provider_name, \
              management_server_id, update_count, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 0, NOW(), NOW()) \
             ON CONFLICT (resource_id, resource_type) DO NOTHING \
             RETURNING {SELECT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, HaConfigRow>(&query)
            .bind(record.resource_id)
            .bind(record.resource_type.to_string())
            .bind(&record.resource_sub_type)
            .bind(record.enabled)
            .bind(record.state.to_string())
            .bind(&record.provider_name)
            .bind(record.management_server_id.map(|id| id.0))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => HaRecord::try_from(row),
            None => Err(PersistenceError::DuplicateRecord {
                resource_id: record.resource_id,
                resource_type: record.resource_type.to_string(),
            }),
        }
    }

    async fn update_settings(
        &self,
        resource_id: i64,
        resource_type: ResourceType,
        enabled: bool,
        provider_name: &str,
    ) -> PersistenceResult<HaRecord> {
        let query = format!(
            "UPDATE ha_config SET enabled = $1, provider_name = $2, updated_at = NOW() \
             WHERE resource_id = $3 AND resource_type = $4 \
             RETURNING {SELECT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, HaConfigRow>(&query)
            .bind(enabled)
            .bind(provider_name)
            .bind(resource_id)
            .bind(resource_type.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(HaRecord::try_from)
            .transpose()?
            .ok_or_else(|| PersistenceError::RecordNotFound {
                resource_id,
                resource_type: resource_type.to_string(),
            })
    }

    async fn update_state(
        &self,
        expected_state: HaState,
        event: HaEvent,
        next_state: HaState,
        record: &HaRecord,
        payload: &TransitionPayload,
    ) -> PersistenceResult<bool> {
        let result = sqlx::query(
            "UPDATE ha_config \
             SET state = $1, management_server_id = $2, last_transition_metadata = $7, \
                 update_count = update_count + 1, updated_at = NOW() \
             WHERE resource_id = $3 AND resource_type = $4 \
               AND state = $5 AND update_count = $6",
        )
        .bind(next_state.to_string())
        .bind(payload.owner_after(event).map(|id| id.0))
        .bind(record.resource_id)
        .bind(record.resource_type.to_string())
        .bind(expected_state.to_string())
        .bind(record.update_count)
        .bind(payload.metadata.clone())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn expire_ownership(
        &self,
        management_server_id: ManagementServerId,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query(
            "UPDATE ha_config SET management_server_id = NULL, updated_at = NOW() \
             WHERE management_server_id = $1",
        )
        .bind(management_server_id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
