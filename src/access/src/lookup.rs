//! Filter-merged item lookup for update and delete
//!
//! The access filter is folded into the storage query itself, so a record that
//! does not exist and a record hidden by the filter produce the same denial.

use std::sync::Arc;
use tracing::debug;

use crate::context::RequestContext;
use crate::error::{AccessDenied, DeniedTarget, Result};
use crate::filter::{Filter, WhereResolver};
use crate::schema::EntityType;
use crate::store::ItemStore;
use crate::types::{AccessFilter, Item, Operation, UniqueWhere};

/// Retrieves at most one item visible under an access filter
#[derive(Clone)]
pub struct FilteredItemLookup {
    store: Arc<dyn ItemStore>,
    where_resolver: WhereResolver,
}

impl FilteredItemLookup {
    pub fn new(store: Arc<dyn ItemStore>, where_resolver: WhereResolver) -> Self {
        Self {
            store,
            where_resolver,
        }
    }

    /// Find the item named by `unique` if the access filter lets it through
    ///
    /// # Errors
    ///
    /// - `AccessDenied` on the entity type when the filter denies everything;
    ///   storage is not queried
    /// - `AccessDenied` on the identity when nothing matches
    /// - resolver and storage errors, unchanged
    pub async fn find(
        &self,
        entity: &EntityType,
        context: &RequestContext,
        unique: &UniqueWhere,
        access_filter: &AccessFilter,
        operation: Operation,
    ) -> Result<Item> {
        let identity = Filter::from_unique(unique);
        let filter = match access_filter {
            AccessFilter::Deny => {
                debug!(entity = %entity.key(), %operation, "access filter excludes every item");
                return Err(AccessDenied::entity_type(entity.key(), operation).into());
            }
            AccessFilter::Allow => identity,
            AccessFilter::Where(input) => {
                let resolved = self.where_resolver.resolve(input, entity, context).await?;
                Filter::and(vec![identity, resolved])
            }
        };

        match self.store.find_one(entity.key(), &filter).await? {
            Some(item) => Ok(item),
            None => {
                debug!(entity = %entity.key(), %operation, "no visible item for identity");
                Err(AccessDenied::item(
                    entity.key(),
                    operation,
                    DeniedTarget::Identity(unique.clone()),
                )
                .into())
            }
        }
    }
}
