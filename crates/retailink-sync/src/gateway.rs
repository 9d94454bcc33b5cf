//! Per-entity-type gateways and the dispatcher that routes operations to
//! them.
//!
//! A gateway accepts a fixed set of entity types; asking it to handle
//! anything else is a configuration fault that aborts startup rather than a
//! runtime condition to recover from.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use retailink_connector::EntityType;

use crate::engine::{
    CancelToken, ReconciliationEngine, RetrievalSummary, WriteAction, WriteOutcome,
};
use crate::error::{SyncError, SyncResult};

/// The gateway families the node runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    /// Customers and their addresses.
    Customer,
    /// Products and their paired stock items.
    Product,
}

impl GatewayKind {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Customer => "customer",
            GatewayKind::Product => "product",
        }
    }

    /// The entity types this gateway accepts.
    #[must_use]
    pub fn supported_types(&self) -> &'static [EntityType] {
        match self {
            GatewayKind::Customer => &[EntityType::Customer, EntityType::Address],
            GatewayKind::Product => &[EntityType::Product, EntityType::StockItem],
        }
    }

    /// Whether this gateway accepts the entity type.
    #[must_use]
    pub fn supports(&self, entity_type: EntityType) -> bool {
        self.supported_types().contains(&entity_type)
    }
}

impl std::fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One gateway: a typed front onto the reconciliation engine.
pub struct Gateway {
    kind: GatewayKind,
    engine: Arc<ReconciliationEngine>,
}

impl Gateway {
    /// Create a gateway of the given kind.
    pub fn new(kind: GatewayKind, engine: Arc<ReconciliationEngine>) -> Self {
        Self { kind, engine }
    }

    /// The gateway's kind.
    #[must_use]
    pub fn kind(&self) -> GatewayKind {
        self.kind
    }

    /// Validate the entity type against this gateway's supported set.
    ///
    /// A mismatch is a configuration error and fatal at startup.
    pub fn initialize(&self, entity_type: EntityType) -> SyncResult<()> {
        if !self.kind.supports(entity_type) {
            return Err(SyncError::configuration(format!(
                "invalid entity type {entity_type} for the {} gateway",
                self.kind
            )));
        }
        debug!(gateway = %self.kind, %entity_type, "initialised gateway");
        Ok(())
    }

    /// Run a retrieval cycle for one of this gateway's entity types.
    pub async fn retrieve(
        &self,
        entity_type: EntityType,
        cancel: &CancelToken,
    ) -> SyncResult<RetrievalSummary> {
        self.initialize(entity_type)?;
        self.engine.retrieve(entity_type, cancel).await
    }

    /// Push an entity's changed attributes to the remote.
    pub async fn write_updates(
        &self,
        entity_id: Uuid,
        changed_codes: &[String],
    ) -> SyncResult<WriteOutcome> {
        self.engine.write_updates(entity_id, changed_codes).await
    }

    /// Execute a one-shot remote action.
    pub async fn write_action(&self, entity_id: Uuid, action: WriteAction) -> SyncResult<()> {
        self.engine.write_action(entity_id, action).await
    }
}

/// Routes operations to the gateway responsible for an entity type.
pub struct GatewayDispatcher {
    gateways: Vec<Gateway>,
}

impl GatewayDispatcher {
    /// Build the standard dispatcher with a customer and a product gateway
    /// over one engine.
    pub fn new(engine: Arc<ReconciliationEngine>) -> Self {
        Self {
            gateways: vec![
                Gateway::new(GatewayKind::Customer, engine.clone()),
                Gateway::new(GatewayKind::Product, engine),
            ],
        }
    }

    /// The gateway responsible for an entity type.
    ///
    /// No gateway claiming the type is a configuration error.
    pub fn gateway_for(&self, entity_type: EntityType) -> SyncResult<&Gateway> {
        self.gateways
            .iter()
            .find(|gateway| gateway.kind.supports(entity_type))
            .ok_or_else(|| {
                SyncError::configuration(format!("no gateway supports entity type {entity_type}"))
            })
    }

    /// Validate every gateway against the entity types it will serve.
    pub fn initialize(&self) -> SyncResult<()> {
        for gateway in &self.gateways {
            for entity_type in gateway.kind.supported_types() {
                gateway.initialize(*entity_type)?;
            }
        }
        Ok(())
    }

    /// Run a retrieval cycle, routed by entity type.
    pub async fn retrieve(
        &self,
        entity_type: EntityType,
        cancel: &CancelToken,
    ) -> SyncResult<RetrievalSummary> {
        self.gateway_for(entity_type)?
            .retrieve(entity_type, cancel)
            .await
    }

    /// Push an entity's changes, routed by entity type.
    pub async fn write_updates(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        changed_codes: &[String],
    ) -> SyncResult<WriteOutcome> {
        self.gateway_for(entity_type)?
            .write_updates(entity_id, changed_codes)
            .await
    }

    /// Execute a one-shot remote action, routed by entity type.
    pub async fn write_action(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        action: WriteAction,
    ) -> SyncResult<()> {
        self.gateway_for(entity_type)?
            .write_action(entity_id, action)
            .await
    }

    /// Delete the remote record for an entity.
    pub async fn delete(&self, entity_type: EntityType, entity_id: Uuid) -> SyncResult<()> {
        self.write_action(entity_type, entity_id, WriteAction::Delete)
            .await
    }

    /// Set or clear a special price for a product at one store view.
    pub async fn set_special_price(
        &self,
        entity_id: Uuid,
        price: Option<f64>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        store_view: retailink_connector::StoreViewId,
    ) -> SyncResult<()> {
        self.write_action(
            EntityType::Product,
            entity_id,
            WriteAction::SetSpecialPrice {
                price,
                from,
                to,
                store_view,
            },
        )
        .await
    }
}
