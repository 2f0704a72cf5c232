//! Access filters and their resolution into storage filters
//!
//! A declarative [`WhereInput`] (possibly produced by a filter rule) is turned
//! into a canonical [`Filter`] by a storage-layer [`FilterResolver`].
//! [`WhereResolver`] is the only path the pipeline uses; it performs no
//! authorization itself, so resolver failures pass through untouched.

mod canonical;
mod json;

pub use canonical::{CompareOp, Filter};
pub use json::JsonWhereResolver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::trace;

use crate::context::RequestContext;
use crate::error::{AccessError, Result};
use crate::schema::EntityType;

/// Declarative filter expression, e.g. `{"author": {"equals": "u1"}, "OR": [...]}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WhereInput(Map<String, Value>);

impl WhereInput {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Build from a JSON value, which must be an object
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(AccessError::InvalidFilter(format!(
                "where input must be an object, got {}",
                crate::types::value_type_name(&other)
            ))),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Storage-layer filter resolver
#[async_trait]
pub trait FilterResolver: Send + Sync {
    /// Resolve a where input for an entity type into a canonical filter
    async fn resolve_filter(
        &self,
        filter: &WhereInput,
        entity: &EntityType,
        context: &RequestContext,
    ) -> Result<Filter>;
}

/// Turns structured access filters into canonical filters
#[derive(Clone)]
pub struct WhereResolver {
    resolver: Arc<dyn FilterResolver>,
}

impl WhereResolver {
    pub fn new(resolver: Arc<dyn FilterResolver>) -> Self {
        Self { resolver }
    }

    /// Resolve a structured access filter; resolver errors propagate unchanged
    pub async fn resolve(
        &self,
        filter: &WhereInput,
        entity: &EntityType,
        context: &RequestContext,
    ) -> Result<Filter> {
        trace!(entity = %entity.key(), "resolving access filter");
        self.resolver.resolve_filter(filter, entity, context).await
    }
}
