//! Core identifier and entity-type definitions shared between the remote
//! client and the reconciliation engine.

use serde::{Deserialize, Serialize};

/// The kinds of canonical entities the remote system exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A customer account, keyed by email address.
    Customer,

    /// A billing or shipping address attached to a customer.
    Address,

    /// A catalogue product, keyed by SKU.
    Product,

    /// The stock record paired with a product.
    StockItem,
}

impl EntityType {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Customer => "customer",
            EntityType::Address => "address",
            EntityType::Product => "product",
            EntityType::StockItem => "stockitem",
        }
    }

    /// The dependent record that must exist alongside this type.
    ///
    /// Products carry a mandatory paired stock item; the reconciliation
    /// engine creates it together with a newly discovered product.
    #[must_use]
    pub fn dependent(&self) -> Option<EntityType> {
        match self {
            EntityType::Product => Some(EntityType::StockItem),
            _ => None,
        }
    }

    /// The parent type this entity hangs off, if any.
    #[must_use]
    pub fn parent(&self) -> Option<EntityType> {
        match self {
            EntityType::Address => Some(EntityType::Customer),
            EntityType::StockItem => Some(EntityType::Product),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "customer" => Ok(EntityType::Customer),
            "address" => Ok(EntityType::Address),
            "product" => Ok(EntityType::Product),
            "stockitem" => Ok(EntityType::StockItem),
            _ => Err(format!("Unknown entity type: {s}")),
        }
    }
}

/// An identifier issued by the remote system for one of its records.
///
/// Opaque to the engine: the remote is authoritative for the identifiers it
/// issues, and the engine only ever stores, compares, and echoes them back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a remote id from its wire representation.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw identifier value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RemoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RemoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A store-view (channel) scope identifier on the remote side.
///
/// View `0` is the default view whose data seeds all others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreViewId(pub u32);

impl StoreViewId {
    /// The default store view.
    pub const DEFAULT: StoreViewId = StoreViewId(0);

    /// Whether this is the default view.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for StoreViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
