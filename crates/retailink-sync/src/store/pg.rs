//! Postgres-backed link and watermark stores.
//!
//! Callers serialize mutations per `(node, entity type)`; the unique
//! constraints are the backstop against races, not the primary mechanism.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use retailink_connector::{EntityType, RemoteId};

use crate::error::{SyncError, SyncResult};
use crate::link::LinkStore;
use crate::watermark::{SyncOperation, WatermarkStore};

/// Run all pending migrations, embedded at compile time.
pub async fn run_migrations(pool: &PgPool) -> SyncResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| SyncError::internal(format!("migration failed: {e}")))?;
    Ok(())
}

/// Identity links persisted in `sync_entity_links`.
#[derive(Clone)]
pub struct PgLinkStore {
    pool: PgPool,
}

impl PgLinkStore {
    /// Create a store over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RemoteIdRow {
    remote_id: String,
}

#[derive(sqlx::FromRow)]
struct EntityIdRow {
    entity_id: Uuid,
}

#[async_trait]
impl LinkStore for PgLinkStore {
    #[instrument(skip(self))]
    async fn find_by_remote_id(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        remote_id: &RemoteId,
    ) -> SyncResult<Option<Uuid>> {
        let row = sqlx::query_as::<_, EntityIdRow>(
            r"
            SELECT entity_id
            FROM sync_entity_links
            WHERE node_id = $1 AND entity_type = $2 AND remote_id = $3
            ",
        )
        .bind(node_id)
        .bind(entity_type.as_str())
        .bind(remote_id.value())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.entity_id))
    }

    #[instrument(skip(self))]
    async fn current_remote_id(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> SyncResult<Option<RemoteId>> {
        let row = sqlx::query_as::<_, RemoteIdRow>(
            r"
            SELECT remote_id
            FROM sync_entity_links
            WHERE node_id = $1 AND entity_type = $2 AND entity_id = $3
            ",
        )
        .bind(node_id)
        .bind(entity_type.as_str())
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| RemoteId::new(r.remote_id)))
    }

    #[instrument(skip(self))]
    async fn link(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
        remote_id: &RemoteId,
    ) -> SyncResult<()> {
        if let Some(existing) = self.current_remote_id(node_id, entity_type, entity_id).await? {
            if &existing == remote_id {
                return Ok(());
            }
            return Err(SyncError::link_conflict(
                entity_id,
                format!(
                    "already linked to remote id {existing}; unlink before relinking to {remote_id}"
                ),
            ));
        }

        if let Some(other) = self.find_by_remote_id(node_id, entity_type, remote_id).await? {
            return Err(SyncError::link_conflict(
                entity_id,
                format!("remote id {remote_id} is already linked to entity {other}"),
            ));
        }

        sqlx::query(
            r"
            INSERT INTO sync_entity_links (node_id, entity_type, entity_id, remote_id)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(node_id)
        .bind(entity_type.as_str())
        .bind(entity_id)
        .bind(remote_id.value())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn unlink(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> SyncResult<()> {
        sqlx::query(
            r"
            DELETE FROM sync_entity_links
            WHERE node_id = $1 AND entity_type = $2 AND entity_id = $3
            ",
        )
        .bind(node_id)
        .bind(entity_type.as_str())
        .bind(entity_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Retrieval watermarks persisted in `sync_watermarks`.
#[derive(Clone)]
pub struct PgWatermarkStore {
    pool: PgPool,
}

impl PgWatermarkStore {
    /// Create a store over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct WatermarkRow {
    last_sync_at: DateTime<Utc>,
}

#[async_trait]
impl WatermarkStore for PgWatermarkStore {
    #[instrument(skip(self))]
    async fn get(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        operation: SyncOperation,
    ) -> SyncResult<Option<DateTime<Utc>>> {
        let row = sqlx::query_as::<_, WatermarkRow>(
            r"
            SELECT last_sync_at
            FROM sync_watermarks
            WHERE node_id = $1 AND entity_type = $2 AND operation = $3
            ",
        )
        .bind(node_id)
        .bind(entity_type.as_str())
        .bind(operation.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.last_sync_at))
    }

    #[instrument(skip(self))]
    async fn advance(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        operation: SyncOperation,
        to: DateTime<Utc>,
    ) -> SyncResult<()> {
        sqlx::query(
            r"
            INSERT INTO sync_watermarks (node_id, entity_type, operation, last_sync_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (node_id, entity_type, operation) DO UPDATE SET
                last_sync_at = EXCLUDED.last_sync_at,
                updated_at = NOW()
            ",
        )
        .bind(node_id)
        .bind(entity_type.as_str())
        .bind(operation.as_str())
        .bind(to)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
