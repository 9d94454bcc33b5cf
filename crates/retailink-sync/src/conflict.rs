//! Duplicate-natural-key resolution for failed remote creates.
//!
//! When the remote rejects a create because the natural key already exists,
//! the record it holds is either the same business entity (link to it and
//! carry on) or something the engine must not guess about (fail loudly).

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use retailink_connector::{RemoteClient, RemoteId};

use crate::entity::CanonicalEntity;
use crate::error::{SyncError, SyncResult};
use crate::link::LinkStore;

/// Resolves duplicate-key faults by querying the remote for the colliding
/// natural key.
pub struct ConflictResolver {
    client: Arc<dyn RemoteClient>,
    links: Arc<dyn LinkStore>,
}

impl ConflictResolver {
    /// Create a resolver over the remote client and link store.
    pub fn new(client: Arc<dyn RemoteClient>, links: Arc<dyn LinkStore>) -> Self {
        Self { client, links }
    }

    /// Resolve a duplicate-key fault raised while creating `entity`.
    ///
    /// Looks the natural key up remotely and scans for an exact match. On a
    /// match the entity is linked to the discovered remote id and that id is
    /// returned, promoting the failed create into an update on the next
    /// cycle. Anything else is an irreconcilable inconsistency: the remote
    /// claimed a duplicate the lookup cannot confirm, and auto-resolution
    /// would risk linking to the wrong record.
    pub async fn resolve_duplicate(
        &self,
        node_id: Uuid,
        entity: &CanonicalEntity,
    ) -> SyncResult<RemoteId> {
        warn!(
            entity_type = %entity.entity_type,
            natural_key = %entity.natural_key,
            "create hit duplicate natural key fault, querying remote"
        );

        let matches = self
            .client
            .lookup_by_natural_key(entity.entity_type, &entity.natural_key)
            .await?;

        if matches.is_empty() {
            return Err(SyncError::irreconcilable(
                entity.entity_type,
                &entity.natural_key,
                "remote reported a duplicate but the lookup found no record",
            ));
        }

        let exact = matches
            .iter()
            .find(|record| record.natural_key == entity.natural_key);

        match exact {
            Some(record) => {
                self.links
                    .link(node_id, entity.entity_type, entity.id, &record.remote_id)
                    .await?;
                info!(
                    entity_type = %entity.entity_type,
                    natural_key = %entity.natural_key,
                    remote_id = %record.remote_id,
                    "resolved duplicate fault by linking to existing remote record"
                );
                Ok(record.remote_id.clone())
            }
            None => Err(SyncError::irreconcilable(
                entity.entity_type,
                &entity.natural_key,
                "remote reported a duplicate but no returned record matches exactly",
            )),
        }
    }
}
