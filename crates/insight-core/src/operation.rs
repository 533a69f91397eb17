//! Operations - semi-structured metadata attached to frames
//!
//! An operation carries a type tag, an optional label, and an open set of
//! nested fields. Analyzers read the fields by name and treat anything
//! missing or of the wrong shape as absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Nested key/value data inside an operation
pub type OperationMap = Map<String, Value>;

/// Well-known operation types
pub mod types {
    /// Outbound HTTP client call
    pub const HTTP_CLIENT: &str = "http_client";
    /// REST template client call
    pub const SPRING_REST_TEMPLATE: &str = "spring_rest_template";
}

/// Well-known field names
pub mod fields {
    pub const REQUEST: &str = "request";
    pub const RESPONSE: &str = "response";
    pub const HEADERS: &str = "headers";
    pub const URI: &str = "uri";
    /// Resolved URI -> original templated URI, recorded on the root frame
    pub const UNRESOLVED_URI: &str = "unresolvedURI";
    pub const NAME: &str = "name";
    pub const VALUE: &str = "value";
}

/// Structured metadata for one captured call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation type, e.g. `http_client`
    #[serde(rename = "type")]
    pub op_type: String,

    /// Human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Everything else
    #[serde(flatten)]
    pub fields: OperationMap,
}

impl Operation {
    pub fn new(op_type: impl Into<String>) -> Self {
        Self {
            op_type: op_type.into(),
            label: None,
            fields: Map::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set a top-level field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a nested map, `None` if missing or not an object
    pub fn get_map(&self, key: &str) -> Option<&OperationMap> {
        self.fields.get(key).and_then(Value::as_object)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn get_list(&self, key: &str) -> Option<&Vec<Value>> {
        self.fields.get(key).and_then(Value::as_array)
    }
}

/// Read a string entry from a nested map
pub fn map_str<'a>(map: &'a OperationMap, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

/// Read a list entry from a nested map
pub fn map_list<'a>(map: &'a OperationMap, key: &str) -> Option<&'a Vec<Value>> {
    map.get(key).and_then(Value::as_array)
}
