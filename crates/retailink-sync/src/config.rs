//! Per-node configuration: remote channel, custom attribute codes, and the
//! store-view table. Read-only to the engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use retailink_connector::{FieldMap, StoreViewId};

/// Configuration for one store view on the remote side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreViewConfig {
    /// The store-view identifier (never 0; the default view is implicit).
    pub id: StoreViewId,

    /// The remote website grouping this view belongs to.
    pub website_id: u32,

    /// Whether this view inherits the default view's data. Inheriting views
    /// take their enable/disable decision and special-price handling from
    /// the default payload.
    #[serde(default)]
    pub use_defaults: bool,

    /// Store-specific field overrides applied on top of the shared payload.
    #[serde(default)]
    pub overrides: FieldMap,
}

/// Configuration for one integration node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// The integration node this configuration belongs to.
    pub node_id: Uuid,

    /// The remote channel records are retrieved from.
    pub channel_id: u32,

    /// Custom attribute codes carried in the payload's dedicated
    /// sub-structure rather than as standard fields.
    #[serde(default)]
    pub custom_attributes: Vec<String>,

    /// Non-default store views, in remote declaration order.
    #[serde(default)]
    pub store_views: Vec<StoreViewConfig>,
}

impl NodeConfig {
    /// Create a minimal configuration with no store views.
    #[must_use]
    pub fn new(node_id: Uuid, channel_id: u32) -> Self {
        Self {
            node_id,
            channel_id,
            custom_attributes: Vec::new(),
            store_views: Vec::new(),
        }
    }

    /// Add a store view (builder style).
    #[must_use]
    pub fn with_store_view(mut self, view: StoreViewConfig) -> Self {
        self.store_views.push(view);
        self
    }

    /// Add custom attribute codes (builder style).
    #[must_use]
    pub fn with_custom_attributes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_attributes
            .extend(codes.into_iter().map(Into::into));
        self
    }

    /// Whether a canonical code is configured as a custom attribute.
    #[must_use]
    pub fn is_custom_attribute(&self, code: &str) -> bool {
        self.custom_attributes.iter().any(|c| c == code)
    }

    /// Look up a store view by id.
    #[must_use]
    pub fn store_view(&self, id: StoreViewId) -> Option<&StoreViewConfig> {
        self.store_views.iter().find(|v| v.id == id)
    }
}

impl StoreViewConfig {
    /// Create a view that inherits defaults.
    #[must_use]
    pub fn inheriting(id: StoreViewId, website_id: u32) -> Self {
        Self {
            id,
            website_id,
            use_defaults: true,
            overrides: FieldMap::new(),
        }
    }

    /// Create a view with its own data.
    #[must_use]
    pub fn standalone(id: StoreViewId, website_id: u32, overrides: FieldMap) -> Self {
        Self {
            id,
            website_id,
            use_defaults: false,
            overrides,
        }
    }
}
