//! Error types for mutation access control

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::types::{InputData, Operation, UniqueWhere};

/// Stage name reported for broken access rules
pub const ACCESS_CONTROL_STAGE: &str = "Access control";

/// Access-control errors
#[derive(Debug, Error)]
pub enum AccessError {
    /// The legitimate "no" answer
    #[error("Access denied: {0}")]
    AccessDenied(AccessDenied),

    /// A rule returned something other than a boolean
    #[error("{0}")]
    ReturnType(AccessReturnError),

    /// A rule failed while running
    #[error("{0}")]
    Extension(ExtensionError),

    /// Filter could not be resolved by the storage layer
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Storage lookup failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// No entity type registered under this key
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    /// The outer request was cancelled
    #[error("Access control evaluation cancelled")]
    Cancelled,
}

impl AccessError {
    /// Stable machine-readable code for the mutation layer
    pub fn code(&self) -> &'static str {
        match self {
            AccessError::AccessDenied(_) => "ACCESS_DENIED",
            AccessError::ReturnType(_) => "ACCESS_RETURN_ERROR",
            AccessError::Extension(_) => "EXTENSION_ERROR",
            AccessError::InvalidFilter(_) => "INVALID_FILTER",
            AccessError::Storage(_) => "STORAGE_ERROR",
            AccessError::UnknownEntityType(_) => "UNKNOWN_ENTITY_TYPE",
            AccessError::Cancelled => "CANCELLED",
        }
    }

    /// Whether this is a clean denial rather than a broken rule or infrastructure failure
    pub fn is_denial(&self) -> bool {
        matches!(self, AccessError::AccessDenied(_))
    }
}

impl From<AccessDenied> for AccessError {
    fn from(denied: AccessDenied) -> Self {
        AccessError::AccessDenied(denied)
    }
}

impl From<AccessReturnError> for AccessError {
    fn from(err: AccessReturnError) -> Self {
        AccessError::ReturnType(err)
    }
}

impl From<ExtensionError> for AccessError {
    fn from(err: ExtensionError) -> Self {
        AccessError::Extension(err)
    }
}

/// What a denial refers to
///
/// Never carries a filter expression or any value of a stored record.
#[derive(Debug, Clone, PartialEq)]
pub enum DeniedTarget {
    /// The operation is forbidden on the whole entity type
    EntityType,
    /// A specific item, named by the identity the caller supplied
    Identity(UniqueWhere),
    /// The caller's own create payload
    Input(InputData),
}

impl DeniedTarget {
    fn describe(&self) -> String {
        match self {
            DeniedTarget::EntityType => String::new(),
            DeniedTarget::Identity(unique) => unique.to_string(),
            DeniedTarget::Input(input) => Value::Object(input.clone()).to_string(),
        }
    }
}

/// Access denied details
#[derive(Debug, Clone, PartialEq)]
pub struct AccessDenied {
    /// Entity type key
    pub entity_key: String,

    /// Denied operation
    pub operation: Operation,

    /// What was denied
    pub target: DeniedTarget,

    /// Denied field keys, sorted; empty for item-level denials
    pub denied_fields: Vec<String>,
}

impl AccessDenied {
    /// The operation is forbidden on every item of the entity type
    pub fn entity_type(entity_key: &str, operation: Operation) -> Self {
        Self {
            entity_key: entity_key.to_string(),
            operation,
            target: DeniedTarget::EntityType,
            denied_fields: Vec::new(),
        }
    }

    /// The operation is denied on one item (or the item is missing or filtered out)
    pub fn item(entity_key: &str, operation: Operation, target: DeniedTarget) -> Self {
        Self {
            entity_key: entity_key.to_string(),
            operation,
            target,
            denied_fields: Vec::new(),
        }
    }

    /// Some of the written fields are denied
    pub fn fields(
        entity_key: &str,
        operation: Operation,
        target: DeniedTarget,
        mut denied_fields: Vec<String>,
    ) -> Self {
        denied_fields.sort();
        Self {
            entity_key: entity_key.to_string(),
            operation,
            target,
            denied_fields,
        }
    }
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.operation;
        if let DeniedTarget::EntityType = self.target {
            return write!(
                f,
                "You cannot perform the '{}' operation on the entity type '{}'.",
                op, self.entity_key
            );
        }

        write!(
            f,
            "You cannot perform the '{}' operation on the item '{}'.",
            op,
            self.target.describe()
        )?;

        if !self.denied_fields.is_empty() {
            let fields = Value::from(self.denied_fields.clone());
            write!(f, " You cannot {} the fields {}.", op, fields)
        } else if let DeniedTarget::Identity(_) = self.target {
            f.write_str(" It may not exist.")
        } else {
            Ok(())
        }
    }
}

/// One rule that returned a non-boolean
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTypeFailure {
    /// Rule tag, e.g. `Post.access.item.update`
    pub tag: String,

    /// Observed runtime type name
    pub returned: &'static str,
}

/// Rules returned non-boolean values
#[derive(Debug, Clone, PartialEq)]
pub struct AccessReturnError {
    pub entries: Vec<ReturnTypeFailure>,
}

impl fmt::Display for AccessReturnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invalid values returned from access control function.")?;
        for entry in &self.entries {
            write!(
                f,
                "\n  - {}: Returned: {}. Expected: boolean.",
                entry.tag, entry.returned
            )?;
        }
        Ok(())
    }
}

/// A payload key that is not a declared field of the entity type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{field_key}' is not a field of '{entity_key}'")]
pub struct UnknownField {
    pub entity_key: String,
    pub field_key: String,
}

/// One rule that failed while running
#[derive(Debug, Clone)]
pub struct ExtensionFailure {
    /// Rule tag, e.g. `Post.title.access.update`
    pub tag: String,

    /// Original failure
    pub error: Arc<anyhow::Error>,
}

impl ExtensionFailure {
    pub fn new(tag: impl Into<String>, error: anyhow::Error) -> Self {
        Self {
            tag: tag.into(),
            error: Arc::new(error),
        }
    }

    /// Whether the failure names a payload key rather than a declared rule
    pub fn is_unknown_field(&self) -> bool {
        self.error.downcast_ref::<UnknownField>().is_some()
    }
}

/// Rules failed while running, aggregated across fields
#[derive(Debug, Clone)]
pub struct ExtensionError {
    /// Stage that ran the rules
    pub extension: String,

    /// Every failing rule, in evaluation order
    pub failures: Vec<ExtensionFailure>,
}

impl ExtensionError {
    /// Failures raised by access rules
    pub fn access_control(failures: Vec<ExtensionFailure>) -> Self {
        Self {
            extension: ACCESS_CONTROL_STAGE.to_string(),
            failures,
        }
    }

    pub fn tags(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.tag.as_str()).collect()
    }
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "An error occurred while running \"{}\".", self.extension)?;
        for failure in &self.failures {
            write!(f, "\n  - {}: {}", failure.tag, failure.error)?;
        }
        Ok(())
    }
}

/// Result type for access-control operations
pub type Result<T> = std::result::Result<T, AccessError>;
