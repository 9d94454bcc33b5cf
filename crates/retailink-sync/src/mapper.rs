//! Bidirectional attribute mapping between remote field maps and canonical
//! attribute maps.
//!
//! The remote uses coded values for boolean-like fields (status, visibility,
//! tax class) and its own field names; the canonical store uses plain
//! attribute codes and booleans. Mapping is lossy only where explicitly
//! decided: every dropped code is logged and reported back to the caller.

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use tracing::warn;

use retailink_connector::{EntityType, FieldMap, FieldValue};

use crate::colour;
use crate::config::NodeConfig;
use crate::entity::{AttributeMap, SchemaRegistry};
use crate::error::SyncResult;

/// Placeholder the remote requires for mandatory delivery fields that the
/// canonical record does not carry.
pub const MISSING_PLACEHOLDER: &str = "> Information missing <";

/// Result of an inbound mapping pass.
#[derive(Debug, Clone, Default)]
pub struct MappedAttributes {
    /// Canonical attribute code to value.
    pub attributes: AttributeMap,
    /// Remote field names that were dropped with a warning.
    pub dropped: Vec<String>,
    /// Custom attribute codes registered on demand during this pass.
    pub registered: Vec<String>,
}

/// Result of an outbound mapping pass.
#[derive(Debug, Clone, Default)]
pub struct MappedFields {
    /// Remote field name to value.
    pub fields: FieldMap,
    /// Canonical attribute codes that were dropped with a warning.
    pub dropped: Vec<String>,
}

/// Maps field maps between the remote shape and the canonical shape, one
/// instance per integration node.
pub struct AttributeMapper {
    node: Arc<NodeConfig>,
    registry: Arc<dyn SchemaRegistry>,
}

impl AttributeMapper {
    /// Create a mapper for a node.
    pub fn new(node: Arc<NodeConfig>, registry: Arc<dyn SchemaRegistry>) -> Self {
        Self { node, registry }
    }

    /// Map a raw remote field map to canonical attributes.
    ///
    /// Blank field names are dropped before mapping. Category and website
    /// associations are excluded here; a separate collaborator owns them.
    /// Remote custom fields the canonical schema does not know yet are
    /// registered as generic text attributes before their value is stored;
    /// registration is idempotent.
    pub async fn to_canonical(
        &self,
        entity_type: EntityType,
        fields: &FieldMap,
    ) -> SyncResult<MappedAttributes> {
        let mut result = MappedAttributes::default();

        for (name, value) in fields.iter() {
            if name.trim().is_empty() {
                continue;
            }
            if is_excluded_remote_field(name) {
                continue;
            }

            match entity_type {
                EntityType::Product => {
                    self.product_to_canonical(name, value, &mut result).await?;
                }
                EntityType::StockItem => {
                    map_stock_field(name, value, &mut result);
                }
                EntityType::Customer | EntityType::Address => {
                    map_contact_field(entity_type, name, value, &mut result);
                }
            }
        }

        // A record arriving without the status fields means the flags are
        // off remotely; an absent attribute must not preserve a stale true.
        if entity_type == EntityType::Product {
            for flag in ["enabled", "visible", "taxable"] {
                result
                    .attributes
                    .entry(flag.to_string())
                    .or_insert(serde_json::Value::Bool(false));
            }
        }

        Ok(result)
    }

    async fn product_to_canonical(
        &self,
        name: &str,
        value: &FieldValue,
        result: &mut MappedAttributes,
    ) -> SyncResult<()> {
        match name {
            "type_id" | "type" => {
                result
                    .attributes
                    .insert("type".into(), value_to_json(value));
            }
            "name" | "description" | "short_description" | "price" | "weight" | "barcode"
            | "bin_location" | "msrp" | "cost" | "special_price" | "special_from_date"
            | "special_to_date" | "product_class" => {
                result
                    .attributes
                    .insert(name.to_string(), value_to_json(value));
            }
            "status" => {
                let enabled = value.as_integer() == Some(1);
                result.attributes.insert("enabled".into(), enabled.into());
            }
            "visibility" => {
                let visible = value.as_integer() == Some(4);
                result.attributes.insert("visible".into(), visible.into());
            }
            "tax_class_id" => {
                let taxable = value.as_integer() == Some(2);
                result.attributes.insert("taxable".into(), taxable.into());
            }
            "colour_id" => match value.as_integer().and_then(|id| {
                u32::try_from(id).ok().and_then(colour::colour_name)
            }) {
                Some(colour) => {
                    result.attributes.insert("colour".into(), colour.into());
                }
                None => {
                    warn!(field = name, ?value, "unknown colour id, dropping field");
                    result.dropped.push(name.to_string());
                }
            },
            "size_id" => {
                // No canonical counterpart.
                result.dropped.push(name.to_string());
            }
            custom => {
                let code = custom.trim().to_lowercase();
                if !self.registry.has_attribute(EntityType::Product, &code).await? {
                    self.registry
                        .register_text_attribute(EntityType::Product, &code)
                        .await?;
                    result.registered.push(code.clone());
                }
                result.attributes.insert(code, value_to_json(value));
            }
        }
        Ok(())
    }

    /// Map changed canonical attributes to remote fields.
    ///
    /// Unknown canonical codes are logged and dropped, never sent. Price-like
    /// fields collapse empty values to explicit null. The product class and
    /// type are carried only on create; on update they are reported as
    /// dropped because the remote does not accept changing them.
    pub fn to_remote(
        &self,
        entity_type: EntityType,
        attributes: &AttributeMap,
        is_create: bool,
    ) -> MappedFields {
        match entity_type {
            EntityType::Product => self.product_to_remote(attributes, is_create),
            EntityType::Customer => self.customer_to_remote(attributes, is_create),
            EntityType::Address | EntityType::StockItem => {
                // Address writes flow through the parent customer and stock
                // writes through the paired product; nothing maps directly.
                let mut result = MappedFields::default();
                for code in attributes.keys() {
                    warn!(
                        entity_type = %entity_type,
                        code = %code,
                        "attribute has no direct remote counterpart, dropping"
                    );
                    result.dropped.push(code.clone());
                }
                result
            }
        }
    }

    fn product_to_remote(&self, attributes: &AttributeMap, is_create: bool) -> MappedFields {
        let mut result = MappedFields::default();

        for (code, value) in attributes {
            match code.as_str() {
                "price" | "special_price" | "special_from_date" | "special_to_date" => {
                    let field = json_to_field(value);
                    if field.is_empty_like() {
                        result.fields.set(code.clone(), FieldValue::Null);
                    } else {
                        result.fields.set(code.clone(), field);
                    }
                }
                "name" | "description" | "short_description" | "weight" | "barcode"
                | "bin_location" | "msrp" | "cost" => {
                    result.fields.set(code.clone(), json_to_field(value));
                }
                "enabled" => {
                    result
                        .fields
                        .set("status", if is_truthy(value) { 1 } else { 2 });
                }
                "taxable" => {
                    result
                        .fields
                        .set("tax_class_id", if is_truthy(value) { 2 } else { 1 });
                }
                "visible" => {
                    result
                        .fields
                        .set("visibility", if is_truthy(value) { 4 } else { 1 });
                }
                "colour" => match value.as_str().and_then(colour::colour_id) {
                    Some(id) => result.fields.set("colour_id", i64::from(id)),
                    None => {
                        warn!(code = %code, ?value, "unknown colour name, dropping");
                        result.dropped.push(code.clone());
                    }
                },
                "brand" | "size" => {
                    // The remote has no writable counterpart for these.
                }
                "product_class" | "type" => {
                    if is_create {
                        // Consumed by the create call itself, not the field map.
                    } else {
                        warn!(code = %code, "immutable after create, dropping from update");
                        result.dropped.push(code.clone());
                    }
                }
                custom if self.node.is_custom_attribute(custom) => {
                    result.fields.set(custom.to_string(), json_to_field(value));
                }
                other => {
                    warn!(code = %other, "unsupported attribute for remote update, dropping");
                    result.dropped.push(other.to_string());
                }
            }
        }

        result
    }

    fn customer_to_remote(&self, attributes: &AttributeMap, is_create: bool) -> MappedFields {
        let mut result = MappedFields::default();

        // The remote rejects customer payloads missing delivery fields, so
        // they default to an explicit placeholder. Known address data
        // overwrites them below: one address serves as both billing and
        // delivery.
        for field in ["DelAddress", "DelPostCode", "DelSuburb", "DelState"] {
            result.fields.set(field, MISSING_PLACEHOLDER);
        }
        result.fields.set("ReceiverNews", 0);
        if is_create {
            result.fields.set("Password", random_password());
        }

        let mut name_parts: [Option<&str>; 3] = [None, None, None];

        for (code, value) in attributes {
            match code.as_str() {
                "email" => result.fields.set("BillEmail", json_to_field(value)),
                "first_name" => {
                    result.fields.set("BillFirstName", json_to_field(value));
                    name_parts[0] = value.as_str();
                }
                "middle_name" => {
                    name_parts[1] = value.as_str();
                }
                "last_name" => {
                    result.fields.set("BillLastName", json_to_field(value));
                    name_parts[2] = value.as_str();
                }
                "company" => {
                    result.fields.set("BillCompany", json_to_field(value));
                    result.fields.set("DelCompany", json_to_field(value));
                }
                "telephone" => {
                    result.fields.set("BillPhone", json_to_field(value));
                    result.fields.set("DelPhone", json_to_field(value));
                }
                "postcode" => {
                    result.fields.set("BillPostCode", json_to_field(value));
                    result.fields.set("DelPostCode", json_to_field(value));
                }
                "region" => {
                    result.fields.set("BillState", json_to_field(value));
                    result.fields.set("DelState", json_to_field(value));
                }
                "country_code" => {
                    result.fields.set("BillCountry", json_to_field(value));
                    result.fields.set("DelCountry", json_to_field(value));
                }
                "street" => {
                    result.fields.set("BillAddress", json_to_field(value));
                    result.fields.set("DelAddress", json_to_field(value));
                }
                "suburb" => {
                    result.fields.set("BillSuburb", json_to_field(value));
                    result.fields.set("DelSuburb", json_to_field(value));
                }
                "enable_newsletter" => {
                    result
                        .fields
                        .set("ReceiverNews", if is_truthy(value) { 1 } else { 0 });
                }
                "date_of_birth" | "newslettersubscription" => {
                    // Not carried by the remote customer payload.
                }
                other => {
                    warn!(code = %other, "unsupported attribute for remote update, dropping");
                    result.dropped.push(other.to_string());
                }
            }
        }

        result.fields.set("DelName", derive_delivery_name(&name_parts));

        result
    }
}

/// Assemble a delivery name from first, middle and last parts with
/// single-space normalization; empty when all parts are absent.
fn derive_delivery_name(parts: &[Option<&str>; 3]) -> String {
    parts
        .iter()
        .filter_map(|p| *p)
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn random_password() -> String {
    (0..16).map(|_| OsRng.sample(Alphanumeric) as char).collect()
}

/// Identifier and association fields handled outside the attribute pass.
fn is_excluded_remote_field(name: &str) -> bool {
    matches!(
        name,
        "product_id" | "customer_id" | "sku" | "category_ids" | "website_ids" | "last_updated"
    )
}

fn map_stock_field(name: &str, value: &FieldValue, result: &mut MappedAttributes) {
    match name {
        "stock_available" | "qty" => {
            result
                .attributes
                .insert("available".into(), value_to_json(value));
        }
        "stock_on_hand" => {
            result
                .attributes
                .insert("on_hand".into(), value_to_json(value));
        }
        "stock_on_order" => {
            result
                .attributes
                .insert("on_order".into(), value_to_json(value));
        }
        other => {
            warn!(field = %other, "unsupported stock field, dropping");
            result.dropped.push(other.to_string());
        }
    }
}

fn map_contact_field(
    entity_type: EntityType,
    name: &str,
    value: &FieldValue,
    result: &mut MappedAttributes,
) {
    let code = match name {
        "BillEmail" => "email",
        "BillFirstName" => "first_name",
        "BillLastName" => "last_name",
        "BillCompany" | "DelCompany" => "company",
        "BillPhone" | "DelPhone" => "telephone",
        "BillPostCode" | "DelPostCode" => "postcode",
        "BillState" | "DelState" => "region",
        "BillCountry" | "DelCountry" => "country_code",
        "BillAddress" | "DelAddress" => "street",
        "BillSuburb" | "DelSuburb" => "suburb",
        "ReceiverNews" => {
            let subscribed = value.as_integer() == Some(1);
            result
                .attributes
                .insert("enable_newsletter".into(), subscribed.into());
            return;
        }
        other => {
            warn!(entity_type = %entity_type, field = %other, "unsupported field, dropping");
            result.dropped.push(other.to_string());
            return;
        }
    };

    // Placeholder values mean the remote had nothing; do not store them.
    if value.as_str() == Some(MISSING_PLACEHOLDER) {
        return;
    }
    result.attributes.insert(code.into(), value_to_json(value));
}

fn value_to_json(value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Null => serde_json::Value::Null,
        FieldValue::String(s) => serde_json::Value::String(s.clone()),
        FieldValue::Integer(i) => serde_json::Value::from(*i),
        FieldValue::Float(f) => serde_json::Value::from(*f),
        FieldValue::Bool(b) => serde_json::Value::Bool(*b),
        FieldValue::Array(values) => {
            serde_json::Value::Array(values.iter().map(value_to_json).collect())
        }
    }
}

fn json_to_field(value: &serde_json::Value) -> FieldValue {
    match value {
        serde_json::Value::Null => FieldValue::Null,
        serde_json::Value::Bool(b) => FieldValue::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Integer(i)
            } else {
                FieldValue::Float(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => FieldValue::String(s.clone()),
        serde_json::Value::Array(values) => {
            FieldValue::Array(values.iter().map(json_to_field).collect())
        }
        serde_json::Value::Object(_) => FieldValue::Null,
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_i64() == Some(1),
        serde_json::Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
