//! Storage query interface and an in-memory implementation

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AccessError, Result};
use crate::filter::Filter;
use crate::types::Item;

/// Storage query trait
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Find at most one item of an entity type matching the filter
    async fn find_one(&self, entity_key: &str, filter: &Filter) -> Result<Option<Item>>;
}

/// In-memory item store
pub struct InMemoryItemStore {
    items: Arc<RwLock<HashMap<String, Vec<Item>>>>,
    lookups: AtomicUsize,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Store an item; the value must be a JSON object
    pub async fn insert(&self, entity_key: &str, item: Value) -> Result<()> {
        let item = match item {
            Value::Object(map) => map,
            other => {
                return Err(AccessError::Storage(format!(
                    "items must be objects, got {}",
                    crate::types::value_type_name(&other)
                )))
            }
        };

        let mut items = self.items.write().await;
        items.entry(entity_key.to_string()).or_default().push(item);
        Ok(())
    }

    /// Number of `find_one` calls served so far
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryItemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn find_one(&self, entity_key: &str, filter: &Filter) -> Result<Option<Item>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let items = self.items.read().await;
        Ok(items
            .get(entity_key)
            .and_then(|list| list.iter().find(|item| filter.matches(item)))
            .cloned())
    }
}
