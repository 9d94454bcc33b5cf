//! Reconciliation engine tests.
//!
//! Covers the retrieval state machine (create / update / relink / skip), the
//! watermark contract, write planning across store views, duplicate
//! resolution, and gateway routing — all against in-memory stores and a
//! scripted remote client.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use retailink_connector::{
    ConnectorError, ConnectorResult, EntityType, FieldMap, FieldValue, RemoteClient, RemoteId,
    RemotePayload, RemoteRecord, StoreViewId,
};
use retailink_sync::entity::{AttributeMap, CanonicalEntity, EntityStore};
use retailink_sync::store::memory::{
    MemoryEntityStore, MemoryLinkStore, MemorySchemaRegistry, MemoryWatermarkStore,
};
use retailink_sync::{
    CancelToken, GatewayDispatcher, GatewayKind, LinkStore, NodeConfig, ReconciliationEngine,
    StoreViewConfig, SyncError, SyncOperation, SyncResult, WatermarkStore, WriteAction,
    WriteOutcome,
};

// =============================================================================
// Scripted remote client
// =============================================================================

/// What the next create call should do.
#[derive(Debug, Clone, Copy)]
enum CreateScript {
    Ok,
    DuplicateKey,
}

/// Remote client with scripted responses and full call capture.
#[derive(Default)]
struct TestClient {
    /// Records returned from `fetch_updated_since`.
    records: Mutex<Vec<RemoteRecord>>,
    /// Records returned from `lookup_by_natural_key`.
    lookup: Mutex<Vec<RemoteRecord>>,
    /// Per-call create scripting; empty means unconditional success.
    create_script: Mutex<VecDeque<CreateScript>>,
    /// When set, `fetch_updated_since` fails with a transport fault.
    fail_fetch: AtomicBool,
    /// When set, the next update call fails with object-not-found.
    update_not_found_once: AtomicBool,
    next_remote_id: AtomicU32,
    creates: Mutex<Vec<(EntityType, String, RemotePayload)>>,
    updates: Mutex<Vec<(String, StoreViewId, RemotePayload)>>,
    deletes: Mutex<Vec<String>>,
    special_prices: Mutex<Vec<SpecialPriceCall>>,
}

#[derive(Debug, Clone, PartialEq)]
struct SpecialPriceCall {
    natural_key: String,
    price: Option<f64>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    store_view: StoreViewId,
}

impl TestClient {
    fn new() -> Self {
        Self {
            next_remote_id: AtomicU32::new(501),
            ..Self::default()
        }
    }

    fn set_records(&self, records: Vec<RemoteRecord>) {
        *self.records.lock().unwrap() = records;
    }

    fn set_lookup(&self, records: Vec<RemoteRecord>) {
        *self.lookup.lock().unwrap() = records;
    }

    fn script_create(&self, script: CreateScript) {
        self.create_script.lock().unwrap().push_back(script);
    }

    fn creates(&self) -> Vec<(EntityType, String, RemotePayload)> {
        self.creates.lock().unwrap().clone()
    }

    fn updates(&self) -> Vec<(String, StoreViewId, RemotePayload)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteClient for TestClient {
    async fn fetch_updated_since(
        &self,
        _entity_type: EntityType,
        _since: DateTime<Utc>,
        _channel_id: u32,
    ) -> ConnectorResult<Vec<RemoteRecord>> {
        if self.fail_fetch.load(Ordering::Relaxed) {
            return Err(ConnectorError::connection_failed("scripted fetch failure"));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn create(
        &self,
        entity_type: EntityType,
        natural_key: &str,
        payload: &RemotePayload,
    ) -> ConnectorResult<RemoteId> {
        self.creates
            .lock()
            .unwrap()
            .push((entity_type, natural_key.to_string(), payload.clone()));

        let script = self
            .create_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CreateScript::Ok);
        match script {
            CreateScript::Ok => {
                let id = self.next_remote_id.fetch_add(1, Ordering::Relaxed);
                Ok(RemoteId::new(id.to_string()))
            }
            CreateScript::DuplicateKey => {
                Err(ConnectorError::duplicate_key(entity_type, natural_key))
            }
        }
    }

    async fn update(
        &self,
        entity_type: EntityType,
        natural_key: &str,
        store_view: StoreViewId,
        payload: &RemotePayload,
    ) -> ConnectorResult<()> {
        if self.update_not_found_once.swap(false, Ordering::Relaxed) {
            return Err(ConnectorError::not_found(entity_type, natural_key));
        }
        self.updates
            .lock()
            .unwrap()
            .push((natural_key.to_string(), store_view, payload.clone()));
        Ok(())
    }

    async fn delete(&self, _entity_type: EntityType, natural_key: &str) -> ConnectorResult<()> {
        self.deletes.lock().unwrap().push(natural_key.to_string());
        Ok(())
    }

    async fn set_special_price(
        &self,
        natural_key: &str,
        price: Option<f64>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        store_view: StoreViewId,
    ) -> ConnectorResult<()> {
        self.special_prices.lock().unwrap().push(SpecialPriceCall {
            natural_key: natural_key.to_string(),
            price,
            from,
            to,
            store_view,
        });
        Ok(())
    }

    async fn lookup_by_natural_key(
        &self,
        _entity_type: EntityType,
        _natural_key: &str,
    ) -> ConnectorResult<Vec<RemoteRecord>> {
        Ok(self.lookup.lock().unwrap().clone())
    }
}

/// Entity store wrapper that fails creates for one natural key, for
/// per-record fault isolation tests.
struct FaultyEntityStore {
    inner: Arc<MemoryEntityStore>,
    poison_key: String,
}

#[async_trait]
impl EntityStore for FaultyEntityStore {
    async fn load(&self, id: Uuid) -> SyncResult<Option<CanonicalEntity>> {
        self.inner.load(id).await
    }

    async fn load_by_natural_key(
        &self,
        entity_type: EntityType,
        natural_key: &str,
    ) -> SyncResult<Option<CanonicalEntity>> {
        self.inner.load_by_natural_key(entity_type, natural_key).await
    }

    async fn create(
        &self,
        entity_type: EntityType,
        natural_key: &str,
        attributes: AttributeMap,
        parent_id: Option<Uuid>,
    ) -> SyncResult<CanonicalEntity> {
        if natural_key == self.poison_key {
            return Err(SyncError::internal("scripted create failure"));
        }
        self.inner
            .create(entity_type, natural_key, attributes, parent_id)
            .await
    }

    async fn update(&self, id: Uuid, attributes: AttributeMap) -> SyncResult<()> {
        self.inner.update(id, attributes).await
    }
}

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    node: Arc<NodeConfig>,
    client: Arc<TestClient>,
    entities: Arc<MemoryEntityStore>,
    links: Arc<MemoryLinkStore>,
    watermarks: Arc<MemoryWatermarkStore>,
    engine: Arc<ReconciliationEngine>,
}

impl Harness {
    fn new(node: NodeConfig) -> Self {
        let node = Arc::new(node);
        let client = Arc::new(TestClient::new());
        let entities = Arc::new(MemoryEntityStore::new());
        let links = Arc::new(MemoryLinkStore::new());
        let watermarks = Arc::new(MemoryWatermarkStore::new());
        let engine = Arc::new(ReconciliationEngine::new(
            node.clone(),
            client.clone(),
            entities.clone(),
            links.clone(),
            watermarks.clone(),
            Arc::new(MemorySchemaRegistry::new()),
        ));
        Self {
            node,
            client,
            entities,
            links,
            watermarks,
            engine,
        }
    }

    fn plain() -> Self {
        Self::new(NodeConfig::new(Uuid::new_v4(), 3))
    }

    async fn product(&self, sku: &str, attributes: AttributeMap) -> CanonicalEntity {
        self.entities
            .create(EntityType::Product, sku, attributes, None)
            .await
            .unwrap()
    }

    async fn link(&self, entity_type: EntityType, entity_id: Uuid, remote_id: &str) {
        self.links
            .link(
                self.node.node_id,
                entity_type,
                entity_id,
                &RemoteId::new(remote_id),
            )
            .await
            .unwrap();
    }

    async fn linked_remote_id(&self, entity_type: EntityType, entity_id: Uuid) -> Option<String> {
        self.links
            .current_remote_id(self.node.node_id, entity_type, entity_id)
            .await
            .unwrap()
            .map(|id| id.value().to_string())
    }

    async fn retrieve_watermark(&self, entity_type: EntityType) -> Option<DateTime<Utc>> {
        self.watermarks
            .get(self.node.node_id, entity_type, SyncOperation::Retrieve)
            .await
            .unwrap()
    }
}

fn product_record(sku: &str, remote_id: &str, price: f64) -> RemoteRecord {
    RemoteRecord::new(
        remote_id,
        sku,
        FieldMap::new()
            .with("name", format!("Product {sku}"))
            .with("status", "1")
            .with("price", price),
    )
}

fn attrs(pairs: &[(&str, serde_json::Value)]) -> AttributeMap {
    pairs
        .iter()
        .map(|(code, value)| ((*code).to_string(), value.clone()))
        .collect()
}

// =============================================================================
// Retrieval path
// =============================================================================

#[tokio::test]
async fn test_new_remote_product_creates_links_and_dependent() {
    let h = Harness::plain();
    h.client
        .set_records(vec![product_record("SKU1", "501", 10.0)]);

    let summary = h
        .engine
        .retrieve(EntityType::Product, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 0);

    let product = h
        .entities
        .load_by_natural_key(EntityType::Product, "SKU1")
        .await
        .unwrap()
        .expect("product created");
    assert_eq!(product.get("enabled"), Some(&serde_json::json!(true)));
    assert_eq!(product.get("price"), Some(&serde_json::json!(10.0)));
    assert_eq!(
        h.linked_remote_id(EntityType::Product, product.id).await,
        Some("501".to_string())
    );

    // The mandatory dependent stock item was created and linked too.
    let stock = h
        .entities
        .load_by_natural_key(EntityType::StockItem, "SKU1")
        .await
        .unwrap()
        .expect("stock item created");
    assert_eq!(stock.parent_id, Some(product.id));
    assert_eq!(
        h.linked_remote_id(EntityType::StockItem, stock.id).await,
        Some("501".to_string())
    );
}

#[tokio::test]
async fn test_retrieval_is_idempotent_over_unchanged_window() {
    let h = Harness::plain();
    h.client
        .set_records(vec![product_record("SKU1", "501", 10.0)]);

    let first = h
        .engine
        .retrieve(EntityType::Product, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(first.created, 1);

    let second = h
        .engine
        .retrieve(EntityType::Product, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 1);
    assert_eq!(second.relinked, 0);

    // Bijectivity holds: remote id and entity resolve to each other.
    let product = h
        .entities
        .load_by_natural_key(EntityType::Product, "SKU1")
        .await
        .unwrap()
        .unwrap();
    let by_remote = h
        .links
        .find_by_remote_id(h.node.node_id, EntityType::Product, &RemoteId::new("501"))
        .await
        .unwrap();
    assert_eq!(by_remote, Some(product.id));
    assert_eq!(
        h.linked_remote_id(EntityType::Product, product.id).await,
        Some("501".to_string())
    );
}

#[tokio::test]
async fn test_relink_when_remote_id_changes_for_same_natural_key() {
    let h = Harness::plain();
    let product = h.product("SKU1", AttributeMap::new()).await;
    let stock = h
        .entities
        .create(
            EntityType::StockItem,
            "SKU1",
            AttributeMap::new(),
            Some(product.id),
        )
        .await
        .unwrap();
    h.link(EntityType::Product, product.id, "501").await;
    h.link(EntityType::StockItem, stock.id, "501").await;

    // Same natural key comes back under a new remote id.
    h.client
        .set_records(vec![product_record("SKU1", "502", 10.0)]);
    let summary = h
        .engine
        .retrieve(EntityType::Product, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.relinked, 1);

    assert_eq!(
        h.linked_remote_id(EntityType::Product, product.id).await,
        Some("502".to_string())
    );
    assert_eq!(
        h.linked_remote_id(EntityType::StockItem, stock.id).await,
        Some("502".to_string())
    );

    // The stale id no longer resolves.
    let stale = h
        .links
        .find_by_remote_id(h.node.node_id, EntityType::Product, &RemoteId::new("501"))
        .await
        .unwrap();
    assert!(stale.is_none());
}

#[tokio::test]
async fn test_unlinked_existing_entity_is_relinked() {
    let h = Harness::plain();
    let product = h.product("SKU1", AttributeMap::new()).await;

    h.client
        .set_records(vec![product_record("SKU1", "501", 10.0)]);
    let summary = h
        .engine
        .retrieve(EntityType::Product, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(summary.relinked, 1);
    assert_eq!(summary.created, 0);
    assert_eq!(
        h.linked_remote_id(EntityType::Product, product.id).await,
        Some("501".to_string())
    );
}

#[tokio::test]
async fn test_blank_natural_key_is_skipped() {
    let h = Harness::plain();
    h.client.set_records(vec![
        RemoteRecord::new("501", "  ", FieldMap::new().with("status", "1")),
        product_record("SKU1", "502", 10.0),
    ]);

    let summary = h
        .engine
        .retrieve(EntityType::Product, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.created, 1);
}

#[tokio::test]
async fn test_per_record_fault_does_not_stop_batch() {
    let node = Arc::new(NodeConfig::new(Uuid::new_v4(), 3));
    let client = Arc::new(TestClient::new());
    let inner = Arc::new(MemoryEntityStore::new());
    let watermarks = Arc::new(MemoryWatermarkStore::new());
    let engine = ReconciliationEngine::new(
        node.clone(),
        client.clone(),
        Arc::new(FaultyEntityStore {
            inner: inner.clone(),
            poison_key: "BAD".to_string(),
        }),
        Arc::new(MemoryLinkStore::new()),
        watermarks.clone(),
        Arc::new(MemorySchemaRegistry::new()),
    );

    client.set_records(vec![
        product_record("BAD", "501", 10.0),
        product_record("SKU1", "502", 12.0),
    ]);

    let summary = engine
        .retrieve(EntityType::Product, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.created, 1);

    // Per-record faults do not block the watermark.
    let advanced = watermarks
        .get(node.node_id, EntityType::Product, SyncOperation::Retrieve)
        .await
        .unwrap();
    assert!(advanced.is_some());
}

#[tokio::test]
async fn test_watermark_unadvanced_on_transport_failure() {
    let h = Harness::plain();
    h.client.fail_fetch.store(true, Ordering::Relaxed);

    let err = h
        .engine
        .retrieve(EntityType::Product, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Transport { .. }));
    assert!(h.retrieve_watermark(EntityType::Product).await.is_none());

    // A later clean cycle advances it.
    h.client.fail_fetch.store(false, Ordering::Relaxed);
    h.engine
        .retrieve(EntityType::Product, &CancelToken::new())
        .await
        .unwrap();
    assert!(h.retrieve_watermark(EntityType::Product).await.is_some());
}

#[tokio::test]
async fn test_watermark_set_to_pre_call_timestamp() {
    let h = Harness::plain();
    let before = Utc::now();
    h.engine
        .retrieve(EntityType::Product, &CancelToken::new())
        .await
        .unwrap();
    let after = Utc::now();

    let mark = h.retrieve_watermark(EntityType::Product).await.unwrap();
    assert!(mark >= before && mark <= after);
}

#[tokio::test]
async fn test_cancellation_stops_before_processing_and_keeps_watermark() {
    let h = Harness::plain();
    h.client
        .set_records(vec![product_record("SKU1", "501", 10.0)]);

    let cancel = CancelToken::new();
    cancel.cancel();
    let summary = h
        .engine
        .retrieve(EntityType::Product, &cancel)
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.created, 0);
    assert!(h
        .entities
        .load_by_natural_key(EntityType::Product, "SKU1")
        .await
        .unwrap()
        .is_none());
    assert!(h.retrieve_watermark(EntityType::Product).await.is_none());
}

// =============================================================================
// Write path
// =============================================================================

#[tokio::test]
async fn test_write_create_links_assigned_remote_id() {
    let h = Harness::plain();
    let product = h
        .product(
            "SKU1",
            attrs(&[
                ("name", serde_json::json!("Alpha Tee")),
                ("price", serde_json::json!(10.0)),
            ]),
        )
        .await;

    let outcome = h
        .engine
        .write_updates(product.id, &["name".to_string(), "price".to_string()])
        .await
        .unwrap();

    let WriteOutcome::Created(remote_id) = outcome else {
        panic!("expected create, got {outcome:?}");
    };
    assert_eq!(
        h.linked_remote_id(EntityType::Product, product.id).await,
        Some(remote_id.value().to_string())
    );

    let creates = h.client.creates();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].1, "SKU1");
    assert!(creates[0].2.fields.has("price"));
}

#[tokio::test]
async fn test_write_duplicate_fault_resolves_to_existing_remote_record() {
    let h = Harness::plain();
    let product = h
        .product("SKU1", attrs(&[("price", serde_json::json!(10.0))]))
        .await;

    h.client.script_create(CreateScript::DuplicateKey);
    h.client
        .set_lookup(vec![product_record("SKU1", "777", 10.0)]);

    let outcome = h
        .engine
        .write_updates(product.id, &["price".to_string()])
        .await
        .unwrap();

    assert_eq!(outcome, WriteOutcome::Relinked(RemoteId::new("777")));
    assert_eq!(
        h.linked_remote_id(EntityType::Product, product.id).await,
        Some("777".to_string())
    );
}

#[tokio::test]
async fn test_write_duplicate_fault_without_match_is_irreconcilable() {
    let h = Harness::plain();
    let product = h
        .product("SKU1", attrs(&[("price", serde_json::json!(10.0))]))
        .await;

    h.client.script_create(CreateScript::DuplicateKey);
    h.client.set_lookup(Vec::new());

    let err = h
        .engine
        .write_updates(product.id, &["price".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::IrreconcilableDuplicate { .. }));
    assert_eq!(h.linked_remote_id(EntityType::Product, product.id).await, None);
}

#[tokio::test]
async fn test_write_update_flips_to_create_when_remote_record_vanished() {
    let h = Harness::plain();
    let product = h
        .product("SKU1", attrs(&[("price", serde_json::json!(10.0))]))
        .await;
    h.link(EntityType::Product, product.id, "400").await;
    h.client.update_not_found_once.store(true, Ordering::Relaxed);

    let outcome = h
        .engine
        .write_updates(product.id, &["price".to_string()])
        .await
        .unwrap();

    let WriteOutcome::Created(remote_id) = outcome else {
        panic!("expected create after not-found flip, got {outcome:?}");
    };
    assert_ne!(remote_id.value(), "400");
    assert_eq!(
        h.linked_remote_id(EntityType::Product, product.id).await,
        Some(remote_id.value().to_string())
    );
}

#[tokio::test]
async fn test_write_with_no_selected_attributes_is_skipped() {
    let h = Harness::plain();
    let product = h
        .product("SKU1", attrs(&[("price", serde_json::json!(10.0))]))
        .await;

    let outcome = h
        .engine
        .write_updates(product.id, &["unchanged_code".to_string()])
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Skipped);
    assert!(h.client.creates().is_empty());
    assert!(h.client.updates().is_empty());
}

#[tokio::test]
async fn test_store_view_payloads_follow_inheritance_and_clear_rules() {
    // Three store views: two inherit the default view, one stands alone
    // with its own price override.
    let node = NodeConfig::new(Uuid::new_v4(), 3)
        .with_store_view(StoreViewConfig::inheriting(StoreViewId(2), 7))
        .with_store_view(StoreViewConfig::inheriting(StoreViewId(3), 7))
        .with_store_view(StoreViewConfig::standalone(
            StoreViewId(4),
            8,
            FieldMap::new().with("price", 9.0),
        ));
    let h = Harness::new(node);

    let product = h
        .product("SKU2", attrs(&[("price", serde_json::json!(10.0))]))
        .await;
    h.link(EntityType::Product, product.id, "600").await;

    h.engine
        .write_updates(
            product.id,
            &["price".to_string(), "special_price".to_string()],
        )
        .await
        .unwrap();

    let updates = h.client.updates();
    assert_eq!(updates.len(), 4);

    // Default view clears the special price with explicit nulls.
    let (_, view, default_payload) = &updates[0];
    assert!(view.is_default());
    assert_eq!(
        default_payload.fields.get("special_price"),
        Some(&FieldValue::Null)
    );
    assert_eq!(
        default_payload.fields.get("special_to_date"),
        Some(&FieldValue::Null)
    );

    // Inheriting views omit the special price group entirely.
    for (_, view, payload) in &updates[1..3] {
        assert!(!view.is_default());
        assert!(!payload.fields.has("special_price"));
        assert!(!payload.fields.has("special_from_date"));
    }

    // The standalone view clears with empty strings.
    let (_, _, standalone_payload) = &updates[3];
    assert_eq!(
        standalone_payload.fields.get("special_price"),
        Some(&FieldValue::String(String::new()))
    );

    // Every payload carries the aggregate website list: the inheriting
    // views are enabled through the default price, the standalone one
    // through its own.
    for (_, _, payload) in &updates {
        assert_eq!(payload.website_ids, vec![7, 8]);
    }
}

#[tokio::test]
async fn test_customer_create_and_address_redirect() {
    let h = Harness::plain();
    let customer = h
        .entities
        .create(
            EntityType::Customer,
            "jo@example.com",
            attrs(&[
                ("first_name", serde_json::json!("Jo")),
                ("last_name", serde_json::json!("Bloggs")),
            ]),
            None,
        )
        .await
        .unwrap();
    let address = h
        .entities
        .create(
            EntityType::Address,
            "jo@example.com-1",
            attrs(&[
                ("street", serde_json::json!("1 High St")),
                ("postcode", serde_json::json!("6011")),
            ]),
            Some(customer.id),
        )
        .await
        .unwrap();

    // Address writes go out as the parent customer's payload.
    let outcome = h.engine.write_updates(address.id, &[]).await.unwrap();
    let WriteOutcome::Created(remote_id) = outcome else {
        panic!("expected customer create, got {outcome:?}");
    };
    assert_eq!(
        h.linked_remote_id(EntityType::Customer, customer.id).await,
        Some(remote_id.value().to_string())
    );

    let creates = h.client.creates();
    assert_eq!(creates.len(), 1);
    let (entity_type, natural_key, payload) = &creates[0];
    assert_eq!(*entity_type, EntityType::Customer);
    assert_eq!(natural_key, "jo@example.com");
    assert_eq!(payload.fields.get_str("BillEmail"), Some("jo@example.com"));
    assert_eq!(payload.fields.get_str("BillAddress"), Some("1 High St"));
    assert_eq!(payload.fields.get_str("BillPostCode"), Some("6011"));
    assert!(payload.fields.has("Password"));
}

#[tokio::test]
async fn test_delete_action_keeps_link_bookkeeping() {
    let h = Harness::plain();
    let product = h.product("SKU1", AttributeMap::new()).await;
    h.link(EntityType::Product, product.id, "501").await;

    h.engine
        .write_action(product.id, WriteAction::Delete)
        .await
        .unwrap();

    assert_eq!(h.client.deletes.lock().unwrap().as_slice(), ["SKU1"]);
    // Fire-and-forget: the link is untouched.
    assert_eq!(
        h.linked_remote_id(EntityType::Product, product.id).await,
        Some("501".to_string())
    );
}

#[tokio::test]
async fn test_set_special_price_passes_through_to_remote() {
    let h = Harness::plain();
    let product = h.product("SKU1", AttributeMap::new()).await;
    let from = Utc::now();
    let to = from + chrono::Duration::days(7);

    h.engine
        .write_action(
            product.id,
            WriteAction::SetSpecialPrice {
                price: Some(7.5),
                from: Some(from),
                to: Some(to),
                store_view: StoreViewId(2),
            },
        )
        .await
        .unwrap();

    let calls = h.client.special_prices.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![SpecialPriceCall {
            natural_key: "SKU1".to_string(),
            price: Some(7.5),
            from: Some(from),
            to: Some(to),
            store_view: StoreViewId(2),
        }]
    );
}

#[tokio::test]
async fn test_set_special_price_rejected_for_non_product() {
    let h = Harness::plain();
    let customer = h
        .entities
        .create(
            EntityType::Customer,
            "jo@example.com",
            AttributeMap::new(),
            None,
        )
        .await
        .unwrap();

    let err = h
        .engine
        .write_action(
            customer.id,
            WriteAction::SetSpecialPrice {
                price: None,
                from: None,
                to: None,
                store_view: StoreViewId::DEFAULT,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Unsupported { .. }));
    assert!(h.client.special_prices.lock().unwrap().is_empty());
}

// =============================================================================
// Gateway routing
// =============================================================================

#[tokio::test]
async fn test_gateway_rejects_unsupported_entity_type() {
    let h = Harness::plain();
    let dispatcher = GatewayDispatcher::new(h.engine.clone());

    dispatcher.initialize().unwrap();

    let product_gateway = dispatcher.gateway_for(EntityType::Product).unwrap();
    assert_eq!(product_gateway.kind(), GatewayKind::Product);
    let err = product_gateway.initialize(EntityType::Customer).unwrap_err();
    assert!(matches!(err, SyncError::Configuration { .. }));
    assert!(err.is_fatal());

    // Addresses route to the customer gateway.
    let address_gateway = dispatcher.gateway_for(EntityType::Address).unwrap();
    assert_eq!(address_gateway.kind(), GatewayKind::Customer);
}

#[tokio::test]
async fn test_dispatcher_routes_retrieval_by_entity_type() {
    let h = Harness::plain();
    h.client
        .set_records(vec![product_record("SKU1", "501", 10.0)]);
    let dispatcher = GatewayDispatcher::new(h.engine.clone());

    let summary = dispatcher
        .retrieve(EntityType::Product, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(summary.created, 1);
}
