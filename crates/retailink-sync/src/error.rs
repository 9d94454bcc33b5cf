//! Sync error taxonomy.
//!
//! Per-record faults are caught at the reconciliation boundary and do not
//! stop the batch; only configuration faults and cycle-level transport
//! unavailability abort a whole cycle. `is_fatal` encodes that split.

use thiserror::Error;
use uuid::Uuid;

use retailink_connector::{ConnectorError, EntityType};

/// Errors that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Unsupported entity type requested of a gateway. Aborts startup.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Remote call failed below the protocol layer.
    #[error("transport fault: {source}")]
    Transport {
        #[source]
        source: ConnectorError,
    },

    /// The remote accepted the call but returned a business fault that
    /// resolution could not absorb.
    #[error("remote rejected the call: {message}")]
    RemoteRejection { message: String },

    /// The remote reported a duplicate natural key but the duplicate cannot
    /// be located or does not match. The two systems disagree in a way the
    /// engine cannot resolve automatically.
    #[error("irreconcilable duplicate for {entity_type} '{natural_key}': {detail}")]
    IrreconcilableDuplicate {
        entity_type: EntityType,
        natural_key: String,
        detail: String,
    },

    /// A payload shape the write path does not support.
    #[error("unsupported: {message}")]
    Unsupported { message: String },

    /// A link mutation would violate the one-active-link invariant.
    #[error("link conflict for entity {entity_id}: {message}")]
    LinkConflict { entity_id: Uuid, message: String },

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// An entity with the same natural key already exists locally.
    #[error("{entity_type} already exists: {natural_key}")]
    AlreadyExists {
        entity_type: EntityType,
        natural_key: String,
    },

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl SyncError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a remote-rejection error.
    pub fn rejection(message: impl Into<String>) -> Self {
        Self::RemoteRejection {
            message: message.into(),
        }
    }

    /// Create an irreconcilable-duplicate error.
    pub fn irreconcilable(
        entity_type: EntityType,
        natural_key: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::IrreconcilableDuplicate {
            entity_type,
            natural_key: natural_key.into(),
            detail: detail.into(),
        }
    }

    /// Create an unsupported-payload error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Create a link-conflict error.
    pub fn link_conflict(entity_id: Uuid, message: impl Into<String>) -> Self {
        Self::LinkConflict {
            entity_id,
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this fault aborts the whole cycle rather than a single
    /// record: configuration faults, and transport faults that mean no
    /// usable remote channel exists at all.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Configuration { .. } => true,
            SyncError::Transport { source } => {
                matches!(source, ConnectorError::NoChannel { .. })
            }
            _ => false,
        }
    }
}

impl From<ConnectorError> for SyncError {
    fn from(err: ConnectorError) -> Self {
        if err.is_transport() {
            SyncError::Transport { source: err }
        } else {
            SyncError::RemoteRejection {
                message: err.to_string(),
            }
        }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
