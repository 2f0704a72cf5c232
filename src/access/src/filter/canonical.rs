//! Canonical storage filter and in-memory matching

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::types::{Item, UniqueWhere};

/// Comparison operator of a single field condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
    Equals,
    Not,
    In,
    NotIn,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    /// Parse the where-input spelling of an operator
    pub fn parse(name: &str) -> Option<Self> {
        let op = match name {
            "equals" => CompareOp::Equals,
            "not" => CompareOp::Not,
            "in" => CompareOp::In,
            "notIn" => CompareOp::NotIn,
            "lt" => CompareOp::Lt,
            "lte" => CompareOp::Lte,
            "gt" => CompareOp::Gt,
            "gte" => CompareOp::Gte,
            "contains" => CompareOp::Contains,
            "startsWith" => CompareOp::StartsWith,
            "endsWith" => CompareOp::EndsWith,
            _ => return None,
        };
        Some(op)
    }

    /// Whether the operand must be a list
    pub fn takes_list(&self) -> bool {
        matches!(self, CompareOp::In | CompareOp::NotIn)
    }
}

/// Filter understood by the storage layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Filter {
    /// No constraint
    All,
    /// Single field condition
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    And { filters: Vec<Filter> },
    Or { filters: Vec<Filter> },
    Not { filter: Box<Filter> },
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Compare {
            field: field.into(),
            op: CompareOp::Equals,
            value: value.into(),
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Equality filter for a unique identity
    pub fn from_unique(unique: &UniqueWhere) -> Self {
        Filter::equals(unique.field.clone(), unique.value.clone())
    }

    /// Evaluate the filter against an item
    ///
    /// A missing field compares as `null`.
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Filter::All => true,
            Filter::Compare { field, op, value } => {
                let actual = item.get(field).unwrap_or(&Value::Null);
                compare(actual, *op, value)
            }
            Filter::And { filters } => filters.iter().all(|f| f.matches(item)),
            Filter::Or { filters } => filters.iter().any(|f| f.matches(item)),
            Filter::Not { filter } => !filter.matches(item),
        }
    }
}

fn compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    match op {
        CompareOp::Equals => actual == expected,
        CompareOp::Not => actual != expected,
        CompareOp::In => expected
            .as_array()
            .map(|values| values.contains(actual))
            .unwrap_or(false),
        CompareOp::NotIn => expected
            .as_array()
            .map(|values| !values.contains(actual))
            .unwrap_or(false),
        CompareOp::Lt => order(actual, expected) == Some(Ordering::Less),
        CompareOp::Lte => matches!(
            order(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Gt => order(actual, expected) == Some(Ordering::Greater),
        CompareOp::Gte => matches!(
            order(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Contains => str_pair(actual, expected)
            .map(|(a, e)| a.contains(e))
            .unwrap_or(false),
        CompareOp::StartsWith => str_pair(actual, expected)
            .map(|(a, e)| a.starts_with(e))
            .unwrap_or(false),
        CompareOp::EndsWith => str_pair(actual, expected)
            .map(|(a, e)| a.ends_with(e))
            .unwrap_or(false),
    }
}

fn order(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(e)) => a.as_f64()?.partial_cmp(&e.as_f64()?),
        (Value::String(a), Value::String(e)) => Some(a.cmp(e)),
        _ => None,
    }
}

fn str_pair<'a>(actual: &'a Value, expected: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((actual.as_str()?, expected.as_str()?))
}
