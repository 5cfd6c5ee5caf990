//! # Tagged Documents — Ordered Serialized Form
//!
//! This module defines [`TaggedDocument`], the ordered string-keyed mapping
//! produced by every dump and consumed by every load.
//!
//! ## Ordering Invariant
//!
//! Key order is insertion order, and insertion order is schema order: the
//! type tag first, the version tag second when declared, then one entry per
//! bound attribute in declaration order. The JSON text projection preserves
//! that order byte-for-byte across repeated dumps, which is what lets
//! downstream consumers diff and digest serialized documents directly.
//! The inner map comes from `serde_json` with its `preserve_order` feature,
//! so the ordering survives the text round trip as well.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved document key carrying the record's type tag.
///
/// Always the first key of a dumped document.
pub const TYPE_KEY: &str = "_type";

/// Reserved document key carrying the schema's version tag, when declared.
///
/// Always the second key of a dumped document for versioned schemas.
pub const VERSION_KEY: &str = "_version";

/// The ordered key/value serialized form of one record instance.
///
/// Transient: one document is created per dump or load call. The tag and
/// version entries are synthetic — the engine emits them on dump and strips
/// them before invoking a record constructor on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaggedDocument(Map<String, Value>);

impl TaggedDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert a key, preserving insertion order. Returns the previous value
    /// if the key was already present.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the document contains the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries, reserved keys included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// The embedded type tag, if present and a string.
    pub fn type_tag(&self) -> Option<&str> {
        self.0.get(TYPE_KEY).and_then(Value::as_str)
    }

    /// The embedded version tag entry, if present.
    pub fn version(&self) -> Option<&Value> {
        self.0.get(VERSION_KEY)
    }

    /// Project the document to compact JSON text, preserving key order.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    /// Parse a document from JSON text, preserving key order.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::from_str(text)?))
    }

    /// Consume the document into a JSON value, for embedding as a nested
    /// object inside another document.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Consume the document into its inner map.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for TaggedDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl std::fmt::Display for TaggedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = serde_json::to_string(&self.0).map_err(|_| std::fmt::Error)?;
        write!(f, "{text}")
    }
}

/// The JSON kind of a value, for diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
