//! Entity-type registry: item-level and field-level rules per operation

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{AccessError, Result};
use crate::rule::{AccessRule, AllowAll};
use crate::types::Operation;

/// Field that is always present and filterable
pub const ID_FIELD: &str = "id";

/// Per-field access rules
///
/// A missing rule means the field inherits the item-level decision.
#[derive(Clone, Default)]
pub struct FieldDef {
    create: Option<Arc<dyn AccessRule>>,
    update: Option<Arc<dyn AccessRule>>,
}

impl FieldDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create(mut self, rule: Arc<dyn AccessRule>) -> Self {
        self.create = Some(rule);
        self
    }

    pub fn with_update(mut self, rule: Arc<dyn AccessRule>) -> Self {
        self.update = Some(rule);
        self
    }

    /// Same rule for create and update
    pub fn with_write(self, rule: Arc<dyn AccessRule>) -> Self {
        self.with_create(rule.clone()).with_update(rule)
    }

    /// Field rule for an operation; deletes never have one
    pub fn rule(&self, operation: Operation) -> Option<&Arc<dyn AccessRule>> {
        match operation {
            Operation::Create => self.create.as_ref(),
            Operation::Update => self.update.as_ref(),
            Operation::Delete => None,
        }
    }
}

/// A schema-declared kind of record and its access rules
#[derive(Clone)]
pub struct EntityType {
    key: String,
    create: Arc<dyn AccessRule>,
    update: Arc<dyn AccessRule>,
    delete: Arc<dyn AccessRule>,
    fields: BTreeMap<String, FieldDef>,
}

impl EntityType {
    /// New entity type; every item-level rule defaults to allow
    pub fn new(key: impl Into<String>) -> Self {
        let allow: Arc<dyn AccessRule> = Arc::new(AllowAll);
        Self {
            key: key.into(),
            create: allow.clone(),
            update: allow.clone(),
            delete: allow,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_item_rule(mut self, operation: Operation, rule: Arc<dyn AccessRule>) -> Self {
        match operation {
            Operation::Create => self.create = rule,
            Operation::Update => self.update = rule,
            Operation::Delete => self.delete = rule,
        }
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, field: FieldDef) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Item-level rule for an operation
    pub fn item_rule(&self, operation: Operation) -> &Arc<dyn AccessRule> {
        match operation {
            Operation::Create => &self.create,
            Operation::Update => &self.update,
            Operation::Delete => &self.delete,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Declared fields plus the id field
    pub fn is_filterable(&self, name: &str) -> bool {
        name == ID_FIELD || self.fields.contains_key(name)
    }
}

impl std::fmt::Debug for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityType")
            .field("key", &self.key)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Read-only lookup of entity types by key
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: HashMap<String, Arc<EntityType>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type, replacing any previous one with the same key
    pub fn with_entity(mut self, entity: EntityType) -> Self {
        self.entities
            .insert(entity.key().to_string(), Arc::new(entity));
        self
    }

    pub fn get(&self, key: &str) -> Option<Arc<EntityType>> {
        self.entities.get(key).cloned()
    }

    /// Look up an entity type that must exist
    pub fn require(&self, key: &str) -> Result<Arc<EntityType>> {
        self.get(key)
            .ok_or_else(|| AccessError::UnknownEntityType(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
