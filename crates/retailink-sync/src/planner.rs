//! Write-path planning: turns one set of mapped remote fields into the
//! per-store-view payloads the remote expects.
//!
//! The remote treats the default view (store 0) and named store views
//! differently in two ways that matter here: price fields live on the default
//! view only, and clearing a special price needs explicit null at default
//! scope but explicit empty string at store scope.

use std::sync::Arc;

use tracing::debug;

use retailink_connector::{CustomField, FieldMap, FieldValue, RemotePayload, StoreViewId};

use crate::config::NodeConfig;
use crate::error::{SyncError, SyncResult};

/// Fields carried exclusively by the default view.
const DEFAULT_SCOPE_FIELDS: [&str; 4] = ["price", "special_price", "msrp", "cost"];

/// The special-price field group, cleared or stripped together.
const SPECIAL_PRICE_FIELDS: [&str; 3] = ["special_price", "special_from_date", "special_to_date"];

/// One store view's share of a planned update.
#[derive(Debug, Clone)]
pub struct StoreViewPlan {
    /// The view this payload targets; `StoreViewId::DEFAULT` for store 0.
    pub store_view: StoreViewId,
    /// The payload to send for this view.
    pub payload: RemotePayload,
    /// Whether the entity is enabled on this view (its effective payload
    /// defines a price). Only meaningful for non-default views.
    pub enabled: bool,
}

/// A full planned update: the default view first, then each configured view
/// in declaration order.
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    /// Per-view payloads, default view first.
    pub views: Vec<StoreViewPlan>,
    /// Website groupings of every enabled view, attached to each payload.
    pub website_ids: Vec<u32>,
}

/// Plans per-store-view remote payloads for one node.
pub struct UpdatePlanner {
    node: Arc<NodeConfig>,
}

impl UpdatePlanner {
    /// Create a planner for a node.
    pub fn new(node: Arc<NodeConfig>) -> Self {
        Self { node }
    }

    /// Build the per-view payloads for one entity's changed fields.
    ///
    /// `fields` is the mapped remote field set for the default view. Returns
    /// an error if any configured custom attribute carries a multi-value.
    pub fn plan(&self, fields: &FieldMap) -> SyncResult<UpdatePlan> {
        let default_data = fields.clone();

        // Shared base for named views: price fields stay at default scope.
        let mut base = fields.clone();
        for field in DEFAULT_SCOPE_FIELDS {
            base.remove(field);
        }

        let mut website_ids: Vec<u32> = Vec::new();
        let mut views = Vec::with_capacity(self.node.store_views.len() + 1);
        let mut per_view_fields = Vec::with_capacity(self.node.store_views.len() + 1);

        // Default view first; its field map and the website aggregation are
        // finalized over the named views before payloads are built.
        views.push(StoreViewPlan {
            store_view: StoreViewId::DEFAULT,
            payload: RemotePayload::default(),
            enabled: default_data.has("price"),
        });

        for view in &self.node.store_views {
            let mut view_data = base.clone();
            view_data.merge(&view.overrides);

            let check_data = if view.use_defaults {
                &default_data
            } else {
                &view_data
            };
            let enabled = check_data.has("price");
            if enabled && !website_ids.contains(&view.website_id) {
                website_ids.push(view.website_id);
            }
            debug!(
                store_view = view.id.0,
                website_id = view.website_id,
                enabled,
                "planned store view payload"
            );

            if view.use_defaults {
                // Special price is inherited from the default view.
                for field in SPECIAL_PRICE_FIELDS {
                    view_data.remove(field);
                }
            } else if !view_data.has("special_price") {
                // Clearing at store scope needs empty strings, not nulls.
                for field in SPECIAL_PRICE_FIELDS {
                    view_data.set(field, "");
                }
            }

            views.push(StoreViewPlan {
                store_view: view.id,
                payload: RemotePayload::default(),
                enabled,
            });
            per_view_fields.push(view_data);
        }

        // Default view: clearing needs explicit nulls.
        let mut default_data = default_data;
        if !default_data.has("special_price") {
            for field in SPECIAL_PRICE_FIELDS {
                default_data.set(field, FieldValue::Null);
            }
        }
        per_view_fields.insert(0, default_data);

        for (plan, view_fields) in views.iter_mut().zip(per_view_fields) {
            plan.payload = self.build_payload(view_fields, &website_ids)?;
        }

        Ok(UpdatePlan { views, website_ids })
    }

    /// Split configured custom attributes into the payload's dedicated
    /// single-value sub-structure. Multi-value custom fields are rejected.
    fn build_payload(&self, fields: FieldMap, website_ids: &[u32]) -> SyncResult<RemotePayload> {
        let mut standard = FieldMap::new();
        let mut custom_single = Vec::new();

        for (name, value) in fields.iter() {
            if self.node.is_custom_attribute(name) {
                if value.is_multi_valued() {
                    return Err(SyncError::unsupported(format!(
                        "multi-value custom attribute '{name}' cannot be sent"
                    )));
                }
                custom_single.push(CustomField {
                    key: name.clone(),
                    value: value.clone(),
                });
            } else {
                standard.set(name.clone(), value.clone());
            }
        }

        // Stable order for the wire and for assertions.
        custom_single.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(RemotePayload {
            fields: standard,
            custom_single,
            website_ids: website_ids.to_vec(),
        })
    }
}
