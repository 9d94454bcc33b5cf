//! Identity links between canonical entities and remote-issued identifiers.
//!
//! Invariants enforced by every [`LinkStore`] implementation:
//! - at most one active remote id per `(node, entity type, entity)`;
//! - at most one entity per `(node, entity type, remote id)`;
//! - `link` on an entity that already holds a *different* remote id fails
//!   with `LinkConflict` — relinking requires an explicit `unlink` first,
//!   which keeps every link replacement auditable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use retailink_connector::{EntityType, RemoteId};

use crate::error::SyncResult;

/// A stored association between a canonical entity and a remote identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Integration node the link belongs to.
    pub node_id: Uuid,

    /// Entity type, scoping the remote id namespace.
    pub entity_type: EntityType,

    /// The canonical entity.
    pub entity_id: Uuid,

    /// The remote-issued identifier.
    pub remote_id: RemoteId,

    /// When the link was created.
    pub linked_at: DateTime<Utc>,
}

impl LinkRecord {
    /// Create a link record stamped now.
    #[must_use]
    pub fn new(
        node_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
        remote_id: RemoteId,
    ) -> Self {
        Self {
            node_id,
            entity_type,
            entity_id,
            remote_id,
            linked_at: Utc::now(),
        }
    }
}

/// The bidirectional identity mapping consumed by the engine.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Find the entity linked to a remote id, if any.
    async fn find_by_remote_id(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        remote_id: &RemoteId,
    ) -> SyncResult<Option<Uuid>>;

    /// The remote id currently linked to an entity, if any.
    async fn current_remote_id(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> SyncResult<Option<RemoteId>>;

    /// Create a link. Fails with `LinkConflict` when the entity already
    /// holds a different remote id, or the remote id is already taken by a
    /// different entity. Linking the same pair again is a no-op.
    async fn link(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
        remote_id: &RemoteId,
    ) -> SyncResult<()>;

    /// Remove the entity's active link. Unlinking an unlinked entity is a
    /// no-op.
    async fn unlink(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> SyncResult<()>;
}
