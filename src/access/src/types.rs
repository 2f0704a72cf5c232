//! Core access-control types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::filter::WhereInput;

/// A persisted record of an entity type
pub type Item = Map<String, Value>;

/// Raw mutation payload; key order is the payload order
pub type InputData = Map<String, Value>;

/// Mutation operation being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create a new item
    Create,
    /// Update an existing item
    Update,
    /// Delete an existing item
    Delete,
}

impl Operation {
    /// Lowercase name used in tags and messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Whether field-level rules apply to this operation
    pub fn has_field_access(&self) -> bool {
        !matches!(self, Operation::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies exactly one candidate record before its existence is confirmed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueWhere {
    /// Unique field name (e.g., "id", "slug")
    pub field: String,

    /// Value of the unique field
    pub value: Value,
}

impl UniqueWhere {
    /// Create a new unique identity filter
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// JSON object form, `{"field": value}`
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.field.clone(), self.value.clone());
        Value::Object(map)
    }
}

impl fmt::Display for UniqueWhere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Per-entity-type, per-operation visibility restriction
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AccessFilter {
    /// Exclude everything
    Deny,
    /// No extra constraint
    #[default]
    Allow,
    /// Only items matching the filter
    Where(WhereInput),
}

impl AccessFilter {
    /// Treat an absent filter as allow-all
    pub fn or_allow(filter: Option<AccessFilter>) -> Self {
        filter.unwrap_or(AccessFilter::Allow)
    }
}

impl From<bool> for AccessFilter {
    fn from(allowed: bool) -> Self {
        if allowed {
            AccessFilter::Allow
        } else {
            AccessFilter::Deny
        }
    }
}

impl From<WhereInput> for AccessFilter {
    fn from(input: WhereInput) -> Self {
        AccessFilter::Where(input)
    }
}

/// Runtime type name of a rule return value
///
/// Only the name ever leaves the evaluator, never the value itself.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
