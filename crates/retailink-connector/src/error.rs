//! Remote-call fault taxonomy.
//!
//! Faults are classified along two axes the reconciliation engine cares
//! about: transport faults (below the protocol, transient, never mutate
//! links) versus business rejections (the remote accepted the call and said
//! no), and within rejections the two shapes the engine reacts to
//! specially — duplicate natural key and object-not-found.

use thiserror::Error;

use crate::types::EntityType;

/// Error that can occur while talking to the remote system.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Transport faults (transient).
    /// Failed to establish a connection to the remote.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote did not answer in time.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    /// The remote is temporarily unavailable.
    #[error("remote unavailable: {message}")]
    RemoteUnavailable { message: String },

    /// Network error mid-exchange.
    #[error("network error: {message}")]
    NetworkError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No usable remote channel is configured at all.
    #[error("no usable remote channel for node: {message}")]
    NoChannel { message: String },

    // Business rejections (the call reached the remote).
    /// Create rejected because the natural key already exists remotely.
    #[error("duplicate natural key on remote: {entity_type} {natural_key}")]
    DuplicateNaturalKey {
        entity_type: EntityType,
        natural_key: String,
    },

    /// Update rejected because the record does not exist remotely.
    #[error("object not found on remote: {entity_type} {natural_key}")]
    ObjectNotFound {
        entity_type: EntityType,
        natural_key: String,
    },

    /// Any other business fault returned by the remote.
    #[error("remote rejected the call: {message}")]
    Rejected { message: String },

    // Data faults.
    /// The remote returned a payload the client could not interpret.
    #[error("invalid data from remote: {message}")]
    InvalidData { message: String },

    /// Serialization error building or parsing a payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConnectorError {
    /// Create a connection-failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a remote-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            message: message.into(),
        }
    }

    /// Create a no-channel error.
    pub fn no_channel(message: impl Into<String>) -> Self {
        Self::NoChannel {
            message: message.into(),
        }
    }

    /// Create a duplicate-natural-key rejection.
    pub fn duplicate_key(entity_type: EntityType, natural_key: impl Into<String>) -> Self {
        Self::DuplicateNaturalKey {
            entity_type,
            natural_key: natural_key.into(),
        }
    }

    /// Create an object-not-found rejection.
    pub fn not_found(entity_type: EntityType, natural_key: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            entity_type,
            natural_key: natural_key.into(),
        }
    }

    /// Create a generic rejection.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create an invalid-data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// True for faults below the protocol layer. These never mutate links
    /// and are surfaced per record without advancing the watermark.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ConnectorError::ConnectionFailed { .. }
                | ConnectorError::ConnectionTimeout { .. }
                | ConnectorError::RemoteUnavailable { .. }
                | ConnectorError::NetworkError { .. }
                | ConnectorError::NoChannel { .. }
        )
    }

    /// True when a create was rejected for a duplicate natural key.
    #[must_use]
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, ConnectorError::DuplicateNaturalKey { .. })
    }

    /// True when an update was rejected because the record is missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConnectorError::ObjectNotFound { .. })
    }
}

/// Result type for remote-client operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
