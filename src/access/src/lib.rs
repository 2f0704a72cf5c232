//! # Listgate Access Control
//!
//! Per-mutation access-control evaluation. For every create, update and delete
//! the engine decides whether the operation is permitted on the entity type and,
//! independently, whether every attribute being written may be written.
//!
//! ## Features
//!
//! - **Filter-merged lookup** so "does not exist" and "exists but filtered out"
//!   are indistinguishable to the caller
//! - **Strict rule validation**: a rule must return a boolean, anything else is
//!   a typed error rather than a truthy allow
//! - **Concurrent field rules** with full aggregation of broken rules
//! - **Async-first design** using the Tokio runtime
//!
//! ## Example
//!
//! ```rust
//! use listgate_access::{
//!     AccessControlPipeline, AccessFilter, EntityType, FieldDef, InMemoryItemStore,
//!     JsonWhereResolver, RequestContext, UniqueWhere, rule_fn,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let posts = EntityType::new("Post")
//!     .with_field("title", FieldDef::new())
//!     .with_field(
//!         "status",
//!         FieldDef::new().with_update(rule_fn(|args| async move {
//!             Ok(json!(args.session.map(|s| s.has_role("editor")).unwrap_or(false)))
//!         })),
//!     );
//!
//! let store = Arc::new(InMemoryItemStore::new());
//! store.insert("Post", json!({"id": "1", "title": "Hello", "status": "draft"})).await?;
//!
//! let pipeline = AccessControlPipeline::new(store, Arc::new(JsonWhereResolver::new()));
//! let input = json!({"title": "Hello again"}).as_object().cloned().unwrap_or_default();
//!
//! let item = pipeline
//!     .authorize_update(
//!         &posts,
//!         &RequestContext::new(),
//!         &UniqueWhere::new("id", "1"),
//!         &AccessFilter::Allow,
//!         input,
//!     )
//!     .await?;
//! assert_eq!(item["title"], "Hello");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod filter;
pub mod lookup;
pub mod metrics;
pub mod pipeline;
pub mod rule;
pub mod schema;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use context::{EvaluationContext, RequestContext, Session};
pub use error::{
    AccessDenied, AccessError, AccessReturnError, DeniedTarget, ExtensionError, ExtensionFailure,
    Result, ReturnTypeFailure, UnknownField,
};
pub use evaluator::{
    collect_field_outcomes, evaluate_fields, evaluate_item, fold_field_outcomes, FieldOutcome,
};
pub use filter::{CompareOp, Filter, FilterResolver, JsonWhereResolver, WhereInput, WhereResolver};
pub use lookup::FilteredItemLookup;
pub use metrics::{MetricsCollector, PipelineMetrics, UNKNOWN_FIELD_TAG};
pub use pipeline::{AccessControlPipeline, Mutation};
pub use rule::{rule_fn, AccessRule, AllowAll, DenyAll, RuleOutcome};
pub use schema::{EntityRegistry, EntityType, FieldDef};
pub use store::{InMemoryItemStore, ItemStore};
pub use types::{AccessFilter, InputData, Item, Operation, UniqueWhere};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
