//! Canonical entities and the persistence collaborator seam.
//!
//! The canonical store owns entity records; the engine only reads and writes
//! them through [`EntityStore`]. Attribute registration for remote custom
//! fields goes through [`SchemaRegistry`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use retailink_connector::EntityType;

use crate::error::SyncResult;

/// Attribute code to value map on a canonical entity.
pub type AttributeMap = HashMap<String, serde_json::Value>;

/// A typed record in the canonical entity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEntity {
    /// Entity ID.
    pub id: Uuid,

    /// Entity type.
    pub entity_type: EntityType,

    /// Business-unique key within the store scope (email, SKU).
    pub natural_key: String,

    /// Parent entity (address→customer, stockitem→product).
    pub parent_id: Option<Uuid>,

    /// Attribute values.
    pub attributes: AttributeMap,
}

impl CanonicalEntity {
    /// Create a new entity with a fresh id.
    #[must_use]
    pub fn new(
        entity_type: EntityType,
        natural_key: impl Into<String>,
        attributes: AttributeMap,
        parent_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type,
            natural_key: natural_key.into(),
            parent_id,
            attributes,
        }
    }

    /// Get an attribute value.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&serde_json::Value> {
        self.attributes.get(code)
    }

    /// Get an attribute as a string slice.
    #[must_use]
    pub fn get_str(&self, code: &str) -> Option<&str> {
        self.get(code).and_then(serde_json::Value::as_str)
    }
}

/// The canonical persistence collaborator consumed by the engine.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Load an entity by its id.
    async fn load(&self, id: Uuid) -> SyncResult<Option<CanonicalEntity>>;

    /// Load an entity by type and natural key.
    async fn load_by_natural_key(
        &self,
        entity_type: EntityType,
        natural_key: &str,
    ) -> SyncResult<Option<CanonicalEntity>>;

    /// Create an entity. Fails with `AlreadyExists` when the natural key is
    /// already taken for this type.
    async fn create(
        &self,
        entity_type: EntityType,
        natural_key: &str,
        attributes: AttributeMap,
        parent_id: Option<Uuid>,
    ) -> SyncResult<CanonicalEntity>;

    /// Merge attribute values into an existing entity.
    async fn update(&self, id: Uuid, attributes: AttributeMap) -> SyncResult<()>;
}

/// Canonical attribute schema, used for on-demand registration of remote
/// custom fields. Registration is idempotent: registering a known attribute
/// is a no-op, not an error.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Whether the canonical schema knows this attribute code.
    async fn has_attribute(&self, entity_type: EntityType, code: &str) -> SyncResult<bool>;

    /// Register a generic text attribute and subscribe it for the node.
    async fn register_text_attribute(&self, entity_type: EntityType, code: &str)
        -> SyncResult<()>;
}
