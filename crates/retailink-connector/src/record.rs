//! Field-map payload types exchanged with the remote system.
//!
//! A [`RemoteRecord`] is one raw record as the remote returns it; it lives for
//! a single retrieval cycle and is never persisted. A [`RemotePayload`] is the
//! outbound shape: standard fields plus a dedicated sub-structure for custom
//! single-value fields.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::RemoteId;

/// A value for a remote field.
///
/// `Null` is an explicit null on the wire and is distinct from an absent
/// field: the remote clears a value at default-view scope with null but
/// requires an empty string to clear at store-view scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Explicit null.
    Null,
    /// A string value. The empty string is meaningful at store-view scope.
    String(String),
    /// An integer value.
    Integer(i64),
    /// A floating-point value (prices).
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// Multiple values. Only valid for custom multi-value fields, which the
    /// outbound planner rejects as unsupported.
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// Check for explicit null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Get as a string if single string valued.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as an integer, coercing numeric strings the way the remote's
    /// XML payloads arrive (everything is a string on the wire).
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::String(s) => s.trim().parse().ok(),
            FieldValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Get as a float, coercing numeric strings.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Check if this is multi-valued.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, FieldValue::Array(_))
    }

    /// Null, or an empty/whitespace-only string.
    #[must_use]
    pub fn is_empty_like(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Integer(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// A map of remote field names to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMap {
    #[serde(flatten)]
    fields: HashMap<String, FieldValue>,
}

impl FieldMap {
    /// Create an empty field map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Set a field value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Set a field using builder pattern.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Get a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Get a single-valued string field.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    /// Check if a field is present (explicit null counts as present).
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Remove a field.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the map has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Field names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Merge another map into this one, overwriting existing fields.
    pub fn merge(&mut self, other: &FieldMap) {
        for (name, value) in &other.fields {
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

impl FromIterator<(String, FieldValue)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// One raw record returned by the remote for a retrieval window.
///
/// Transient: consumed within the retrieval cycle that fetched it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// The identifier the remote issued for this record.
    pub remote_id: RemoteId,
    /// The business-unique key on the remote side (SKU, email).
    pub natural_key: String,
    /// Raw field name/value pairs.
    pub fields: FieldMap,
}

impl RemoteRecord {
    /// Create a record from its parts.
    pub fn new(
        remote_id: impl Into<RemoteId>,
        natural_key: impl Into<String>,
        fields: FieldMap,
    ) -> Self {
        Self {
            remote_id: remote_id.into(),
            natural_key: natural_key.into(),
            fields,
        }
    }
}

/// A single custom field carried in the payload's dedicated sub-structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    /// The custom attribute code.
    pub key: String,
    /// Its single value.
    pub value: FieldValue,
}

/// An outbound payload for one store view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemotePayload {
    /// Standard fields.
    pub fields: FieldMap,
    /// Custom single-value fields, carried separately on the wire.
    pub custom_single: Vec<CustomField>,
    /// The website groupings of every store view enabled for the entity.
    pub website_ids: Vec<u32>,
}

impl RemotePayload {
    /// Create a payload of standard fields only.
    #[must_use]
    pub fn from_fields(fields: FieldMap) -> Self {
        Self {
            fields,
            custom_single: Vec::new(),
            website_ids: Vec::new(),
        }
    }
}
