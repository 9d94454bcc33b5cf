//! In-memory storage backends.
//!
//! These enforce the same invariants as the Postgres backends and exist so
//! engine behaviour can be tested without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use retailink_connector::{EntityType, RemoteId};

use crate::entity::{AttributeMap, CanonicalEntity, EntityStore, SchemaRegistry};
use crate::error::{SyncError, SyncResult};
use crate::link::{LinkRecord, LinkStore};
use crate::watermark::{SyncOperation, WatermarkStore};

/// Link store backed by a map keyed on `(node, entity type, entity)`.
#[derive(Default)]
pub struct MemoryLinkStore {
    links: RwLock<HashMap<(Uuid, EntityType, Uuid), LinkRecord>>,
}

impl MemoryLinkStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn find_by_remote_id(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        remote_id: &RemoteId,
    ) -> SyncResult<Option<Uuid>> {
        let links = self.links.read().await;
        Ok(links
            .values()
            .find(|link| {
                link.node_id == node_id
                    && link.entity_type == entity_type
                    && &link.remote_id == remote_id
            })
            .map(|link| link.entity_id))
    }

    async fn current_remote_id(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> SyncResult<Option<RemoteId>> {
        let links = self.links.read().await;
        Ok(links
            .get(&(node_id, entity_type, entity_id))
            .map(|link| link.remote_id.clone()))
    }

    async fn link(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
        remote_id: &RemoteId,
    ) -> SyncResult<()> {
        let mut links = self.links.write().await;

        if let Some(existing) = links.get(&(node_id, entity_type, entity_id)) {
            if &existing.remote_id == remote_id {
                return Ok(());
            }
            return Err(SyncError::link_conflict(
                entity_id,
                format!(
                    "already linked to remote id {}; unlink before relinking to {}",
                    existing.remote_id, remote_id
                ),
            ));
        }

        let taken = links.values().any(|link| {
            link.node_id == node_id
                && link.entity_type == entity_type
                && &link.remote_id == remote_id
        });
        if taken {
            return Err(SyncError::link_conflict(
                entity_id,
                format!("remote id {remote_id} is already linked to another entity"),
            ));
        }

        links.insert(
            (node_id, entity_type, entity_id),
            LinkRecord::new(node_id, entity_type, entity_id, remote_id.clone()),
        );
        Ok(())
    }

    async fn unlink(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> SyncResult<()> {
        let mut links = self.links.write().await;
        links.remove(&(node_id, entity_type, entity_id));
        Ok(())
    }
}

/// Entity store backed by two maps, by id and by `(type, natural key)`.
#[derive(Default)]
pub struct MemoryEntityStore {
    inner: RwLock<EntityStoreInner>,
}

#[derive(Default)]
struct EntityStoreInner {
    by_id: HashMap<Uuid, CanonicalEntity>,
    by_key: HashMap<(EntityType, String), Uuid>,
}

impl MemoryEntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entity directly, for tests.
    pub async fn insert(&self, entity: CanonicalEntity) {
        let mut inner = self.inner.write().await;
        inner
            .by_key
            .insert((entity.entity_type, entity.natural_key.clone()), entity.id);
        inner.by_id.insert(entity.id, entity);
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn load(&self, id: Uuid) -> SyncResult<Option<CanonicalEntity>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn load_by_natural_key(
        &self,
        entity_type: EntityType,
        natural_key: &str,
    ) -> SyncResult<Option<CanonicalEntity>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_key
            .get(&(entity_type, natural_key.to_string()))
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn create(
        &self,
        entity_type: EntityType,
        natural_key: &str,
        attributes: AttributeMap,
        parent_id: Option<Uuid>,
    ) -> SyncResult<CanonicalEntity> {
        let mut inner = self.inner.write().await;
        let key = (entity_type, natural_key.to_string());
        if inner.by_key.contains_key(&key) {
            return Err(SyncError::AlreadyExists {
                entity_type,
                natural_key: natural_key.to_string(),
            });
        }

        let entity = CanonicalEntity::new(entity_type, natural_key, attributes, parent_id);
        inner.by_key.insert(key, entity.id);
        inner.by_id.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn update(&self, id: Uuid, attributes: AttributeMap) -> SyncResult<()> {
        let mut inner = self.inner.write().await;
        let entity = inner
            .by_id
            .get_mut(&id)
            .ok_or_else(|| SyncError::not_found("entity", id))?;
        entity.attributes.extend(attributes);
        Ok(())
    }
}

/// Schema registry backed by a set of known attribute codes.
#[derive(Default)]
pub struct MemorySchemaRegistry {
    known: RwLock<HashMap<EntityType, Vec<String>>>,
}

impl MemorySchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Codes registered for a type, for assertions.
    pub async fn registered(&self, entity_type: EntityType) -> Vec<String> {
        self.known
            .read()
            .await
            .get(&entity_type)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SchemaRegistry for MemorySchemaRegistry {
    async fn has_attribute(&self, entity_type: EntityType, code: &str) -> SyncResult<bool> {
        Ok(self
            .known
            .read()
            .await
            .get(&entity_type)
            .is_some_and(|codes| codes.iter().any(|c| c == code)))
    }

    async fn register_text_attribute(
        &self,
        entity_type: EntityType,
        code: &str,
    ) -> SyncResult<()> {
        let mut known = self.known.write().await;
        let codes = known.entry(entity_type).or_default();
        if !codes.iter().any(|c| c == code) {
            codes.push(code.to_string());
        }
        Ok(())
    }
}

/// Watermark store backed by a map.
#[derive(Default)]
pub struct MemoryWatermarkStore {
    marks: RwLock<HashMap<(Uuid, EntityType, SyncOperation), DateTime<Utc>>>,
}

impl MemoryWatermarkStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn get(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        operation: SyncOperation,
    ) -> SyncResult<Option<DateTime<Utc>>> {
        Ok(self
            .marks
            .read()
            .await
            .get(&(node_id, entity_type, operation))
            .copied())
    }

    async fn advance(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        operation: SyncOperation,
        to: DateTime<Utc>,
    ) -> SyncResult<()> {
        self.marks
            .write()
            .await
            .insert((node_id, entity_type, operation), to);
        Ok(())
    }
}
