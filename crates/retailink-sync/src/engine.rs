//! The reconciliation engine: retrieval cycles (remote to local) and write
//! dispatch (local to remote) for one integration node.
//!
//! Processing is sequential per entity: one record's reconciliation runs to
//! completion before the next begins, so link mutations are never interleaved
//! within an entity type. A cycle can be cancelled between records but never
//! mid-record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use retailink_connector::{EntityType, RemoteClient, RemoteId, RemoteRecord, StoreViewId};

use crate::config::NodeConfig;
use crate::conflict::ConflictResolver;
use crate::entity::{AttributeMap, CanonicalEntity, EntityStore, SchemaRegistry};
use crate::error::{SyncError, SyncResult};
use crate::link::LinkStore;
use crate::mapper::AttributeMapper;
use crate::planner::UpdatePlanner;
use crate::watermark::{SyncOperation, WatermarkStore};

/// Cooperative cancellation flag, checked between records.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the cycle holding this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// What the engine did with one retrieved record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new canonical entity was created and linked.
    Created,
    /// An existing, correctly linked entity was updated in place.
    Updated,
    /// The entity existed but its link was stale; it was relinked.
    Relinked,
    /// The record could not be attributed to an entity and was skipped.
    Skipped,
}

impl RecordOutcome {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordOutcome::Created => "created",
            RecordOutcome::Updated => "updated",
            RecordOutcome::Relinked => "relinked",
            RecordOutcome::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tally of one retrieval cycle.
#[derive(Debug, Clone, Default)]
pub struct RetrievalSummary {
    /// Records the remote returned for the window.
    pub fetched: usize,
    /// Entities created.
    pub created: usize,
    /// Entities updated in place.
    pub updated: usize,
    /// Entities relinked.
    pub relinked: usize,
    /// Records skipped.
    pub skipped: usize,
    /// Records that failed with a per-record fault.
    pub failed: usize,
    /// Whether the cycle stopped early on cancellation.
    pub cancelled: bool,
}

impl RetrievalSummary {
    fn tally(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Created => self.created += 1,
            RecordOutcome::Updated => self.updated += 1,
            RecordOutcome::Relinked => self.relinked += 1,
            RecordOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Result of pushing one entity's changes to the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The remote created the record; the returned id is now linked.
    Created(RemoteId),
    /// The remote updated the record in place.
    Updated,
    /// A duplicate fault was resolved by linking to an existing remote
    /// record; the change itself goes out on the next cycle.
    Relinked(RemoteId),
    /// Nothing to send for the requested attribute subset.
    Skipped,
}

/// A one-shot action against the remote, outside the update flow.
#[derive(Debug, Clone)]
pub enum WriteAction {
    /// Delete the remote record by natural key. Fire-and-forget: local link
    /// bookkeeping is not altered on success.
    Delete,
    /// Set or clear a special price within a date range at one store view.
    SetSpecialPrice {
        price: Option<f64>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        store_view: StoreViewId,
    },
}

/// Reconciliation core for one integration node.
pub struct ReconciliationEngine {
    node: Arc<NodeConfig>,
    client: Arc<dyn RemoteClient>,
    entities: Arc<dyn EntityStore>,
    links: Arc<dyn LinkStore>,
    watermarks: Arc<dyn WatermarkStore>,
    mapper: AttributeMapper,
    planner: UpdatePlanner,
    resolver: ConflictResolver,
}

impl ReconciliationEngine {
    /// Wire up an engine from its collaborators.
    pub fn new(
        node: Arc<NodeConfig>,
        client: Arc<dyn RemoteClient>,
        entities: Arc<dyn EntityStore>,
        links: Arc<dyn LinkStore>,
        watermarks: Arc<dyn WatermarkStore>,
        registry: Arc<dyn SchemaRegistry>,
    ) -> Self {
        let mapper = AttributeMapper::new(node.clone(), registry);
        let planner = UpdatePlanner::new(node.clone());
        let resolver = ConflictResolver::new(client.clone(), links.clone());
        Self {
            node,
            client,
            entities,
            links,
            watermarks,
            mapper,
            planner,
            resolver,
        }
    }

    /// Run one retrieval cycle for an entity type.
    ///
    /// The cycle timestamp is captured before the remote call; the watermark
    /// is advanced to it only after the whole cycle completes without a
    /// fatal error, so records changed mid-cycle land in the next window and
    /// a crashed cycle re-processes the same window.
    #[instrument(skip(self, cancel), fields(node_id = %self.node.node_id))]
    pub async fn retrieve(
        &self,
        entity_type: EntityType,
        cancel: &CancelToken,
    ) -> SyncResult<RetrievalSummary> {
        let cycle_started = Utc::now();
        let since = self
            .watermarks
            .get(self.node.node_id, entity_type, SyncOperation::Retrieve)
            .await?
            .unwrap_or(DateTime::UNIX_EPOCH);

        info!(%entity_type, %since, "retrieving records updated since watermark");

        let records = self
            .client
            .fetch_updated_since(entity_type, since, self.node.channel_id)
            .await
            .map_err(SyncError::from)?;

        let mut summary = RetrievalSummary {
            fetched: records.len(),
            ..RetrievalSummary::default()
        };

        for record in records {
            if cancel.is_cancelled() {
                warn!(%entity_type, "retrieval cycle cancelled between records");
                summary.cancelled = true;
                break;
            }

            let natural_key = record.natural_key.clone();
            match self.process_record(entity_type, record).await {
                Ok(outcome) => summary.tally(outcome),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(%entity_type, %natural_key, error = %err, "record failed, continuing");
                    summary.failed += 1;
                }
            }
        }

        if !summary.cancelled {
            self.watermarks
                .advance(
                    self.node.node_id,
                    entity_type,
                    SyncOperation::Retrieve,
                    cycle_started,
                )
                .await?;
        }

        info!(
            %entity_type,
            fetched = summary.fetched,
            created = summary.created,
            updated = summary.updated,
            relinked = summary.relinked,
            skipped = summary.skipped,
            failed = summary.failed,
            "retrieval cycle complete"
        );
        Ok(summary)
    }

    /// Reconcile one retrieved record against the canonical store.
    async fn process_record(
        &self,
        entity_type: EntityType,
        record: RemoteRecord,
    ) -> SyncResult<RecordOutcome> {
        if record.natural_key.trim().is_empty() {
            warn!(%entity_type, remote_id = %record.remote_id, "record has no natural key, skipping");
            return Ok(RecordOutcome::Skipped);
        }

        let node_id = self.node.node_id;
        let mapped = self.mapper.to_canonical(entity_type, &record.fields).await?;

        // Already linked to this remote id?
        if let Some(entity_id) = self
            .links
            .find_by_remote_id(node_id, entity_type, &record.remote_id)
            .await?
        {
            if let Some(entity) = self.entities.load(entity_id).await? {
                if entity.natural_key == record.natural_key {
                    info!(%entity_type, natural_key = %record.natural_key, "updating linked entity");
                    self.entities.update(entity.id, mapped.attributes).await?;
                    return Ok(RecordOutcome::Updated);
                }
                // The remote id points at an entity with another key; the
                // link is stale and must be released before reattribution.
                error!(
                    %entity_type,
                    remote_id = %record.remote_id,
                    held_by = %entity.natural_key,
                    incoming = %record.natural_key,
                    "remote id held by a different natural key, releasing stale link"
                );
                self.links.unlink(node_id, entity_type, entity.id).await?;
            } else {
                // Link without a backing entity; drop it and reattribute.
                self.links.unlink(node_id, entity_type, entity_id).await?;
            }
        }

        match self
            .entities
            .load_by_natural_key(entity_type, &record.natural_key)
            .await?
        {
            None => {
                let entity = self
                    .entities
                    .create(entity_type, &record.natural_key, mapped.attributes, None)
                    .await?;
                self.links
                    .link(node_id, entity_type, entity.id, &record.remote_id)
                    .await?;
                info!(%entity_type, natural_key = %record.natural_key, "created and linked new entity");

                if let Some(dependent_type) = entity_type.dependent() {
                    self.create_dependent(dependent_type, &entity, &record.remote_id)
                        .await?;
                }
                Ok(RecordOutcome::Created)
            }
            Some(entity) => {
                let current = self
                    .links
                    .current_remote_id(node_id, entity_type, entity.id)
                    .await?;

                if current.as_ref() == Some(&record.remote_id) {
                    info!(%entity_type, natural_key = %record.natural_key, "updating entity");
                    self.entities.update(entity.id, mapped.attributes).await?;
                    return Ok(RecordOutcome::Updated);
                }

                // Linked to nothing or to a different remote id: drift
                // between the systems, relink explicitly.
                error!(
                    %entity_type,
                    natural_key = %record.natural_key,
                    stale_remote_id = current.as_ref().map(RemoteId::value).unwrap_or("none"),
                    remote_id = %record.remote_id,
                    "incorrectly linked entity, relinking"
                );
                self.links.unlink(node_id, entity_type, entity.id).await?;
                self.links
                    .link(node_id, entity_type, entity.id, &record.remote_id)
                    .await?;

                if let Some(dependent_type) = entity_type.dependent() {
                    self.relink_dependent(dependent_type, &entity, &record.remote_id)
                        .await?;
                }

                self.entities.update(entity.id, mapped.attributes).await?;
                Ok(RecordOutcome::Relinked)
            }
        }
    }

    /// Create and link the mandatory dependent record for a new entity.
    async fn create_dependent(
        &self,
        dependent_type: EntityType,
        parent: &CanonicalEntity,
        remote_id: &RemoteId,
    ) -> SyncResult<()> {
        match self
            .entities
            .create(
                dependent_type,
                &parent.natural_key,
                AttributeMap::new(),
                Some(parent.id),
            )
            .await
        {
            Ok(dependent) => {
                self.links
                    .link(self.node.node_id, dependent_type, dependent.id, remote_id)
                    .await?;
                Ok(())
            }
            Err(SyncError::AlreadyExists { .. }) => {
                warn!(
                    %dependent_type,
                    natural_key = %parent.natural_key,
                    "dependent record already exists for new entity, continuing"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Carry a relink over to the dependent record, if it exists.
    async fn relink_dependent(
        &self,
        dependent_type: EntityType,
        parent: &CanonicalEntity,
        remote_id: &RemoteId,
    ) -> SyncResult<()> {
        let Some(dependent) = self
            .entities
            .load_by_natural_key(dependent_type, &parent.natural_key)
            .await?
        else {
            return Ok(());
        };

        self.links
            .unlink(self.node.node_id, dependent_type, dependent.id)
            .await?;
        self.links
            .link(self.node.node_id, dependent_type, dependent.id, remote_id)
            .await?;
        Ok(())
    }

    /// Push one entity's changed attributes to the remote.
    ///
    /// Address changes are redirected to the parent customer, whose full
    /// default payload is re-sent. An update hitting a vanished remote
    /// record flips into a create; a create hitting a duplicate natural key
    /// goes through duplicate resolution.
    #[instrument(skip(self, changed_codes), fields(node_id = %self.node.node_id))]
    pub async fn write_updates(
        &self,
        entity_id: Uuid,
        changed_codes: &[String],
    ) -> SyncResult<WriteOutcome> {
        let entity = self
            .entities
            .load(entity_id)
            .await?
            .ok_or_else(|| SyncError::not_found("entity", entity_id))?;

        match entity.entity_type {
            EntityType::Product => self.write_product(&entity, changed_codes).await,
            EntityType::Customer => {
                let subset = select_attributes(&entity, changed_codes);
                self.write_customer(&entity, subset).await
            }
            EntityType::Address => {
                let parent_id = entity.parent_id.ok_or_else(|| {
                    SyncError::internal(format!(
                        "address {} has no parent customer",
                        entity.natural_key
                    ))
                })?;
                let parent = self
                    .entities
                    .load(parent_id)
                    .await?
                    .ok_or_else(|| SyncError::not_found("customer", parent_id))?;
                info!(
                    address = %entity.natural_key,
                    customer = %parent.natural_key,
                    "redirecting address write to parent customer"
                );
                // The address's own fields become the customer payload's
                // billing fields.
                self.write_customer(&parent, entity.attributes.clone()).await
            }
            EntityType::StockItem => Err(SyncError::unsupported(
                "stock item writes are not supported by the remote",
            )),
        }
    }

    async fn write_customer(
        &self,
        entity: &CanonicalEntity,
        subset: AttributeMap,
    ) -> SyncResult<WriteOutcome> {
        let node_id = self.node.node_id;

        let current = self
            .links
            .current_remote_id(node_id, EntityType::Customer, entity.id)
            .await?;
        let is_create = current.is_none();

        let mut fields = self
            .mapper
            .to_remote(EntityType::Customer, &subset, is_create)
            .fields;
        // The natural key is the remote-side email, always carried.
        if !fields.has("BillEmail") {
            fields.set("BillEmail", entity.natural_key.as_str());
        }
        let payload = retailink_connector::RemotePayload::from_fields(fields);

        if is_create {
            let remote_id = self
                .client
                .create(EntityType::Customer, &entity.natural_key, &payload)
                .await
                .map_err(SyncError::from)?;
            self.links
                .link(node_id, EntityType::Customer, entity.id, &remote_id)
                .await?;
            info!(customer = %entity.natural_key, %remote_id, "created customer remotely");
            Ok(WriteOutcome::Created(remote_id))
        } else {
            self.client
                .update(
                    EntityType::Customer,
                    &entity.natural_key,
                    StoreViewId::DEFAULT,
                    &payload,
                )
                .await
                .map_err(SyncError::from)?;
            info!(customer = %entity.natural_key, "updated customer remotely");
            Ok(WriteOutcome::Updated)
        }
    }

    async fn write_product(
        &self,
        entity: &CanonicalEntity,
        changed_codes: &[String],
    ) -> SyncResult<WriteOutcome> {
        let node_id = self.node.node_id;
        let subset = select_attributes(entity, changed_codes);
        if subset.is_empty() {
            info!(
                sku = %entity.natural_key,
                requested = changed_codes.join(", "),
                "no update required"
            );
            return Ok(WriteOutcome::Skipped);
        }

        let current = self
            .links
            .current_remote_id(node_id, EntityType::Product, entity.id)
            .await?;
        let mut is_create = current.is_none();

        let mapped = self.mapper.to_remote(EntityType::Product, &subset, is_create);
        let plan = self.planner.plan(&mapped.fields)?;

        let mut outcome = if is_create {
            // Provisional; settled by the default view's create below.
            WriteOutcome::Skipped
        } else {
            WriteOutcome::Updated
        };

        for view in &plan.views {
            if is_create {
                match self
                    .client
                    .create(EntityType::Product, &entity.natural_key, &view.payload)
                    .await
                {
                    Ok(remote_id) => {
                        self.links
                            .link(node_id, EntityType::Product, entity.id, &remote_id)
                            .await?;
                        info!(
                            sku = %entity.natural_key,
                            %remote_id,
                            "created product remotely and linked"
                        );
                        outcome = WriteOutcome::Created(remote_id);
                        is_create = false;
                    }
                    Err(err) if err.is_duplicate_key() => {
                        let remote_id =
                            self.resolver.resolve_duplicate(node_id, entity).await?;
                        outcome = WriteOutcome::Relinked(remote_id);
                        is_create = false;
                    }
                    Err(err) => return Err(SyncError::from(err)),
                }
            } else {
                match self
                    .client
                    .update(
                        EntityType::Product,
                        &entity.natural_key,
                        view.store_view,
                        &view.payload,
                    )
                    .await
                {
                    Ok(()) => {}
                    Err(err) if err.is_not_found() => {
                        // The remote record vanished; recreate it at this
                        // view and carry on.
                        warn!(
                            sku = %entity.natural_key,
                            store_view = view.store_view.0,
                            "remote product missing on update, flipping to create"
                        );
                        self.links
                            .unlink(node_id, EntityType::Product, entity.id)
                            .await?;
                        let remote_id = self
                            .client
                            .create(EntityType::Product, &entity.natural_key, &view.payload)
                            .await
                            .map_err(SyncError::from)?;
                        self.links
                            .link(node_id, EntityType::Product, entity.id, &remote_id)
                            .await?;
                        outcome = WriteOutcome::Created(remote_id);
                    }
                    Err(err) => return Err(SyncError::from(err)),
                }
            }
        }

        Ok(outcome)
    }

    /// Execute a one-shot action against the remote.
    #[instrument(skip(self), fields(node_id = %self.node.node_id))]
    pub async fn write_action(&self, entity_id: Uuid, action: WriteAction) -> SyncResult<()> {
        let entity = self
            .entities
            .load(entity_id)
            .await?
            .ok_or_else(|| SyncError::not_found("entity", entity_id))?;

        match action {
            WriteAction::Delete => {
                self.client
                    .delete(entity.entity_type, &entity.natural_key)
                    .await
                    .map_err(SyncError::from)?;
                info!(
                    entity_type = %entity.entity_type,
                    natural_key = %entity.natural_key,
                    "deleted remote record"
                );
                Ok(())
            }
            WriteAction::SetSpecialPrice {
                price,
                from,
                to,
                store_view,
            } => {
                if entity.entity_type != EntityType::Product {
                    return Err(SyncError::unsupported(format!(
                        "special price applies to products, not {}",
                        entity.entity_type
                    )));
                }
                self.client
                    .set_special_price(&entity.natural_key, price, from, to, store_view)
                    .await
                    .map_err(SyncError::from)?;
                info!(
                    sku = %entity.natural_key,
                    store_view = store_view.0,
                    "set special price remotely"
                );
                Ok(())
            }
        }
    }
}

/// Project an entity's attributes down to the requested codes; an empty
/// request selects nothing (the mapper's structural defaults still apply).
fn select_attributes(entity: &CanonicalEntity, changed_codes: &[String]) -> AttributeMap {
    entity
        .attributes
        .iter()
        .filter(|(code, _)| changed_codes.contains(code))
        .map(|(code, value)| (code.clone(), value.clone()))
        .collect()
}
