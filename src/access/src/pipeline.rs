//! Access-control pipeline: the three public mutation entry points
//!
//! # Evaluation order
//!
//! ```text
//! delete: FilteredItemLookup → item rule
//! update: FilteredItemLookup → item rule → field rules
//! create:                      item rule → field rules
//! ```
//!
//! Visibility filtering runs first so a hidden item never reaches rule
//! arguments. Lookup and item-level failures end the pipeline at once; field
//! rules are always evaluated in full before their outcome is raised.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::context::{EvaluationContext, RequestContext};
use crate::error::{AccessError, DeniedTarget, Result};
use crate::evaluator::{evaluate_fields, evaluate_item};
use crate::filter::{FilterResolver, WhereResolver};
use crate::lookup::FilteredItemLookup;
use crate::metrics::MetricsCollector;
use crate::schema::{EntityRegistry, EntityType};
use crate::store::ItemStore;
use crate::types::{AccessFilter, InputData, Item, Operation, UniqueWhere};

/// A mutation to authorize against an entity type looked up by key
#[derive(Debug, Clone)]
pub enum Mutation {
    Create {
        input_data: InputData,
    },
    Update {
        unique: UniqueWhere,
        access_filter: AccessFilter,
        input_data: InputData,
    },
    Delete {
        unique: UniqueWhere,
        access_filter: AccessFilter,
    },
}

impl Mutation {
    pub fn operation(&self) -> Operation {
        match self {
            Mutation::Create { .. } => Operation::Create,
            Mutation::Update { .. } => Operation::Update,
            Mutation::Delete { .. } => Operation::Delete,
        }
    }
}

/// Mutation access-control pipeline
///
/// Holds no per-request state; one instance serves any number of concurrent
/// requests.
pub struct AccessControlPipeline {
    lookup: FilteredItemLookup,
    registry: EntityRegistry,
    metrics: Option<Arc<MetricsCollector>>,
    config: PipelineConfig,
}

impl AccessControlPipeline {
    /// Pipeline with the default configuration
    pub fn new(store: Arc<dyn ItemStore>, resolver: Arc<dyn FilterResolver>) -> Self {
        Self::with_config(PipelineConfig::default(), store, resolver)
    }

    pub fn with_config(
        config: PipelineConfig,
        store: Arc<dyn ItemStore>,
        resolver: Arc<dyn FilterResolver>,
    ) -> Self {
        let lookup = FilteredItemLookup::new(store, WhereResolver::new(resolver));
        let metrics = config
            .enable_metrics
            .then(|| Arc::new(MetricsCollector::new(config.max_latency_samples)));

        info!("AccessControlPipeline initialized with metrics={}", config.enable_metrics);

        Self {
            lookup,
            registry: EntityRegistry::new(),
            metrics,
            config,
        }
    }

    /// Entity types resolvable by [`AccessControlPipeline::authorize`]
    pub fn with_registry(mut self, registry: EntityRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Metrics collector, when enabled
    pub fn metrics(&self) -> Option<&Arc<MetricsCollector>> {
        self.metrics.as_ref()
    }

    /// Authorize deleting the item named by `unique`
    ///
    /// Returns the item so the caller can delete it. No field rules apply.
    #[instrument(
        name = "authorize_delete",
        skip_all,
        fields(entity = %entity.key(), evaluation_id = %Uuid::new_v4())
    )]
    pub async fn authorize_delete(
        &self,
        entity: &EntityType,
        context: &RequestContext,
        unique: &UniqueWhere,
        access_filter: &AccessFilter,
    ) -> Result<Item> {
        self.observe(Operation::Delete, context, async {
            let item = self
                .lookup
                .find(entity, context, unique, access_filter, Operation::Delete)
                .await?;

            let target = DeniedTarget::Identity(unique.clone());
            let args = EvaluationContext::for_delete(entity.key(), context, item.clone());
            evaluate_item(entity, &args, &target).await?;

            Ok(item)
        })
        .await
    }

    /// Authorize writing `input_data` to the item named by `unique`
    ///
    /// Returns the item as it was before the update.
    #[instrument(
        name = "authorize_update",
        skip_all,
        fields(entity = %entity.key(), evaluation_id = %Uuid::new_v4())
    )]
    pub async fn authorize_update(
        &self,
        entity: &EntityType,
        context: &RequestContext,
        unique: &UniqueWhere,
        access_filter: &AccessFilter,
        input_data: InputData,
    ) -> Result<Item> {
        self.observe(Operation::Update, context, async {
            let item = self
                .lookup
                .find(entity, context, unique, access_filter, Operation::Update)
                .await?;

            let target = DeniedTarget::Identity(unique.clone());
            let args =
                EvaluationContext::for_update(entity.key(), context, item.clone(), input_data);
            evaluate_item(entity, &args, &target).await?;
            evaluate_fields(entity, &args, &target, true).await?;

            Ok(item)
        })
        .await
    }

    /// Authorize creating an item from `input_data`
    ///
    /// Succeeds with nothing: the caller goes on to construct the record.
    #[instrument(
        name = "authorize_create",
        skip_all,
        fields(entity = %entity.key(), evaluation_id = %Uuid::new_v4())
    )]
    pub async fn authorize_create(
        &self,
        entity: &EntityType,
        context: &RequestContext,
        input_data: InputData,
    ) -> Result<()> {
        self.observe(Operation::Create, context, async {
            let target = DeniedTarget::Input(input_data.clone());
            let args = EvaluationContext::for_create(entity.key(), context, input_data);
            evaluate_item(entity, &args, &target).await?;
            evaluate_fields(entity, &args, &target, true).await
        })
        .await
    }

    /// Authorize a mutation on the entity type registered under `entity_key`
    ///
    /// Returns the existing item for updates and deletes, `None` for creates.
    pub async fn authorize(
        &self,
        entity_key: &str,
        context: &RequestContext,
        mutation: Mutation,
    ) -> Result<Option<Item>> {
        let entity = match self.registry.require(entity_key) {
            Ok(entity) => entity,
            Err(err) => {
                debug!(operation = %mutation.operation(), code = err.code(), "mutation rejected");
                let result: Result<Option<Item>> = Err(err);
                if let Some(metrics) = &self.metrics {
                    metrics.record_result(&result, Duration::ZERO).await;
                }
                return result;
            }
        };

        match mutation {
            Mutation::Create { input_data } => self
                .authorize_create(&entity, context, input_data)
                .await
                .map(|()| None),
            Mutation::Update {
                unique,
                access_filter,
                input_data,
            } => self
                .authorize_update(&entity, context, &unique, &access_filter, input_data)
                .await
                .map(Some),
            Mutation::Delete {
                unique,
                access_filter,
            } => self
                .authorize_delete(&entity, context, &unique, &access_filter)
                .await
                .map(Some),
        }
    }

    /// Race against request cancellation, then record the outcome
    async fn observe<T, F>(
        &self,
        operation: Operation,
        context: &RequestContext,
        evaluation: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();

        let result = match context.cancellation() {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(AccessError::Cancelled),
                result = evaluation => result,
            },
            None => evaluation.await,
        };

        let latency = start.elapsed();
        match &result {
            Ok(_) => debug!(%operation, ?latency, "mutation allowed"),
            Err(err) => debug!(%operation, ?latency, code = err.code(), "mutation rejected"),
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_result(&result, latency).await;
        }

        result
    }
}
