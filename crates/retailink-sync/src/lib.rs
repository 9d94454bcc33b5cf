//! # Retailink Sync
//!
//! Entity reconciliation and link management between a remote
//! retail-management system and the canonical local entity store.
//!
//! The engine keeps a bidirectional identity mapping consistent across two
//! systems with incompatible schemas and identifiers, under non-transactional
//! remote calls. For any remote or local change it decides whether a record
//! is new, already linked, incorrectly linked, or in conflict, then drives
//! the matching create, update or relink.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   retrieve    ┌──────────────────────┐
//! │ RemoteClient │──────────────►│ ReconciliationEngine │
//! │ (transport)  │◄──────────────│                      │
//! └──────────────┘  write plan   └──────────┬───────────┘
//!                                           │
//!          ┌─────────────────┬────────────────┼───────────────┬──────────────────┐
//!          ▼                 ▼                ▼               ▼                  ▼
//!  ┌─────────────────┐ ┌───────────────┐ ┌───────────┐ ┌────────────────┐ ┌──────────────────┐
//!  │ AttributeMapper │ │ UpdatePlanner │ │ LinkStore │ │ WatermarkStore │ │ ConflictResolver │
//!  └─────────────────┘ └───────────────┘ └───────────┘ └────────────────┘ └──────────────────┘
//! ```
//!
//! Retrieval pulls changed remote records and resolves each against the link
//! store; writes map changed canonical attributes into per-store-view
//! payloads and repair links when the remote reports duplicate keys. The
//! watermark bounds each retrieval window and only advances after a cycle
//! completes cleanly.

pub mod colour;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod link;
pub mod mapper;
pub mod planner;
pub mod store;
pub mod watermark;

pub use config::{NodeConfig, StoreViewConfig};
pub use conflict::ConflictResolver;
pub use engine::{
    CancelToken, ReconciliationEngine, RecordOutcome, RetrievalSummary, WriteAction, WriteOutcome,
};
pub use entity::{AttributeMap, CanonicalEntity, EntityStore, SchemaRegistry};
pub use error::{SyncError, SyncResult};
pub use gateway::{Gateway, GatewayDispatcher, GatewayKind};
pub use link::{LinkRecord, LinkStore};
pub use mapper::{AttributeMapper, MappedAttributes, MappedFields};
pub use planner::{StoreViewPlan, UpdatePlan, UpdatePlanner};
pub use watermark::{SyncOperation, SyncWatermark, WatermarkStore};
