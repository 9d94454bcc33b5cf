//! Remote client capability trait.
//!
//! The transport itself (wire encoding, timeouts, retries) is a collaborator
//! behind this seam; the reconciliation engine treats any transport failure
//! as a terminal fault for the record being processed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ConnectorResult;
use crate::record::{RemotePayload, RemoteRecord};
use crate::types::{EntityType, RemoteId, StoreViewId};

/// Operations the reconciliation engine issues against the remote system.
///
/// Creates and updates are split (rather than one create-or-update call) so
/// the caller can react to the two business faults that drive reconciliation:
/// a create rejected for a duplicate natural key, and an update rejected
/// because the record no longer exists.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetch records of one type changed since the given timestamp, scoped
    /// to the node's remote channel.
    async fn fetch_updated_since(
        &self,
        entity_type: EntityType,
        since: DateTime<Utc>,
        channel_id: u32,
    ) -> ConnectorResult<Vec<RemoteRecord>>;

    /// Create a record, returning the identifier the remote issued.
    ///
    /// Fails with [`ConnectorError::DuplicateNaturalKey`] when the natural
    /// key is already taken remotely.
    ///
    /// [`ConnectorError::DuplicateNaturalKey`]: crate::error::ConnectorError::DuplicateNaturalKey
    async fn create(
        &self,
        entity_type: EntityType,
        natural_key: &str,
        payload: &RemotePayload,
    ) -> ConnectorResult<RemoteId>;

    /// Update a record at the given store-view scope, addressed by natural key.
    ///
    /// Fails with [`ConnectorError::ObjectNotFound`] when the record has
    /// disappeared remotely.
    ///
    /// [`ConnectorError::ObjectNotFound`]: crate::error::ConnectorError::ObjectNotFound
    async fn update(
        &self,
        entity_type: EntityType,
        natural_key: &str,
        store_view: StoreViewId,
        payload: &RemotePayload,
    ) -> ConnectorResult<()>;

    /// Delete a record by natural key.
    async fn delete(&self, entity_type: EntityType, natural_key: &str) -> ConnectorResult<()>;

    /// Set or clear a special price within a date range at one store-view
    /// scope.
    async fn set_special_price(
        &self,
        natural_key: &str,
        price: Option<f64>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        store_view: StoreViewId,
    ) -> ConnectorResult<()>;

    /// Look up records by natural key, used to resolve duplicate-key faults.
    ///
    /// Returns zero or more raw records; the caller scans for an exact
    /// natural-key match.
    async fn lookup_by_natural_key(
        &self,
        entity_type: EntityType,
        natural_key: &str,
    ) -> ConnectorResult<Vec<RemoteRecord>>;
}
