//! Retrieval watermarks: the last successfully processed "updated-since"
//! timestamp per `(node, entity type, operation)`.
//!
//! The engine captures the cycle timestamp *before* the remote call and
//! advances the watermark to that value only after the cycle completes
//! without a fatal error, so a crash mid-cycle re-processes the same window
//! and records changed mid-cycle are not missed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use retailink_connector::EntityType;

use crate::error::SyncResult;

/// The operation a watermark bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    /// Remote-to-local retrieval cycles.
    Retrieve,
    /// Local-to-remote write cycles.
    Write,
}

impl SyncOperation {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::Retrieve => "retrieve",
            SyncOperation::Write => "write",
        }
    }
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SyncOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "retrieve" => Ok(SyncOperation::Retrieve),
            "write" => Ok(SyncOperation::Write),
            _ => Err(format!("Unknown sync operation: {s}")),
        }
    }
}

/// One persisted watermark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncWatermark {
    /// Integration node.
    pub node_id: Uuid,
    /// Entity type the cycle covered.
    pub entity_type: EntityType,
    /// Operation the cycle performed.
    pub operation: SyncOperation,
    /// The bound for the next cycle's query window.
    pub last_sync_at: DateTime<Utc>,
}

/// Watermark persistence owned by the engine.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// The current watermark, if a cycle has ever completed.
    async fn get(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        operation: SyncOperation,
    ) -> SyncResult<Option<DateTime<Utc>>>;

    /// Advance the watermark. Only called after a cycle completes without a
    /// fatal error.
    async fn advance(
        &self,
        node_id: Uuid,
        entity_type: EntityType,
        operation: SyncOperation,
        to: DateTime<Utc>,
    ) -> SyncResult<()>;
}
