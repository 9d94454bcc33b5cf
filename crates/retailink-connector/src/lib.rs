//! # Retailink Connector
//!
//! Remote-side abstraction for the retailink reconciliation engine.
//!
//! This crate defines the seam between the engine and whatever transport
//! talks to the retail-management system:
//! - Opaque identifiers and entity types ([`types`])
//! - Field-map payloads and transient remote records ([`record`])
//! - The [`RemoteClient`] capability trait ([`traits`])
//! - A fault taxonomy that separates transport faults from business
//!   rejections ([`error`])
//!
//! The concrete wire encoding is out of scope; implementations of
//! [`RemoteClient`] live with the transport.

pub mod error;
pub mod record;
pub mod traits;
pub mod types;

pub use error::{ConnectorError, ConnectorResult};
pub use record::{CustomField, FieldMap, FieldValue, RemotePayload, RemoteRecord};
pub use traits::RemoteClient;
pub use types::{EntityType, RemoteId, StoreViewId};
