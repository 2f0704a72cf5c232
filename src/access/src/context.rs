//! Request and rule-evaluation contexts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::types::{InputData, Item, Operation};

/// Authenticated principal of the current request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Session {
    /// Principal identifier (e.g., "user:alice@example.com")
    pub id: String,

    /// Roles granted to the principal
    #[serde(default)]
    pub roles: Vec<String>,

    /// Additional attributes (e.g., tenant, department)
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl Session {
    /// Create a new session for a principal
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    /// Grant a role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Check whether the principal holds a role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Request-scoped handles passed verbatim into every rule
///
/// Cloning is cheap; all shared state sits behind `Arc`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    session: Option<Arc<Session>>,
    attributes: Arc<HashMap<String, Value>>,
    received_at: DateTime<Utc>,
    cancellation: Option<CancellationToken>,
}

impl RequestContext {
    /// Anonymous request context
    pub fn new() -> Self {
        Self {
            session: None,
            attributes: Arc::new(HashMap::new()),
            received_at: Utc::now(),
            cancellation: None,
        }
    }

    /// Attach the authenticated session
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(Arc::new(session));
        self
    }

    /// Attach request attributes (client address, tenant, ...)
    pub fn with_attributes(mut self, attributes: HashMap<String, Value>) -> Self {
        self.attributes = Arc::new(attributes);
        self
    }

    /// Propagate cancellation from the outer request
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Argument bundle handed to every access rule
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    /// Operation being authorized
    pub operation: Operation,

    /// Current session, if any
    pub session: Option<Arc<Session>>,

    /// Entity type key
    pub entity_key: String,

    /// Request-scoped handles
    pub context: RequestContext,

    /// Existing item (update and delete only)
    pub item: Option<Arc<Item>>,

    /// Raw mutation payload (create and update only)
    pub input_data: Option<Arc<InputData>>,

    /// Field being written (field rules only)
    pub field_key: Option<String>,
}

impl EvaluationContext {
    /// Arguments for a create: no item exists yet
    pub fn for_create(entity_key: &str, context: &RequestContext, input_data: InputData) -> Self {
        Self::base(Operation::Create, entity_key, context).with_input(input_data)
    }

    /// Arguments for an update of an already visible item
    pub fn for_update(
        entity_key: &str,
        context: &RequestContext,
        item: Item,
        input_data: InputData,
    ) -> Self {
        Self::base(Operation::Update, entity_key, context)
            .with_item(item)
            .with_input(input_data)
    }

    /// Arguments for a delete of an already visible item
    pub fn for_delete(entity_key: &str, context: &RequestContext, item: Item) -> Self {
        Self::base(Operation::Delete, entity_key, context).with_item(item)
    }

    fn base(operation: Operation, entity_key: &str, context: &RequestContext) -> Self {
        Self {
            operation,
            session: context.session().cloned(),
            entity_key: entity_key.to_string(),
            context: context.clone(),
            item: None,
            input_data: None,
            field_key: None,
        }
    }

    fn with_item(mut self, item: Item) -> Self {
        self.item = Some(Arc::new(item));
        self
    }

    fn with_input(mut self, input_data: InputData) -> Self {
        self.input_data = Some(Arc::new(input_data));
        self
    }

    /// Same bundle, scoped to one field
    pub fn for_field(&self, field_key: &str) -> Self {
        let mut args = self.clone();
        args.field_key = Some(field_key.to_string());
        args
    }

    /// Tag identifying the item-level rule for this operation
    pub fn item_tag(&self) -> String {
        format!("{}.access.item.{}", self.entity_key, self.operation)
    }

    /// Tag identifying a field-level rule for this operation
    pub fn field_tag(&self, field_key: &str) -> String {
        format!("{}.{}.access.{}", self.entity_key, field_key, self.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_roles() {
        let session = Session::new("user:alice@example.com")
            .with_role("editor")
            .with_attribute("tenant", "acme");

        assert!(session.has_role("editor"));
        assert!(!session.has_role("admin"));
        assert_eq!(session.attributes.get("tenant"), Some(&json!("acme")));
    }

    #[test]
    fn test_create_args_have_no_item() {
        let ctx = RequestContext::new().with_session(Session::new("user:bob"));
        let input = json!({"title": "x"}).as_object().cloned().unwrap();

        let args = EvaluationContext::for_create("Post", &ctx, input);
        assert_eq!(args.operation, Operation::Create);
        assert!(args.item.is_none());
        assert!(args.input_data.is_some());
        assert_eq!(args.session.as_ref().map(|s| s.id.as_str()), Some("user:bob"));
    }

    #[test]
    fn test_tags() {
        let item = json!({"id": "1"}).as_object().cloned().unwrap();
        let args = EvaluationContext::for_delete("Post", &RequestContext::new(), item);

        assert_eq!(args.item_tag(), "Post.access.item.delete");
        assert_eq!(args.field_tag("title"), "Post.title.access.delete");

        let field_args = args.for_field("title");
        assert_eq!(field_args.field_key.as_deref(), Some("title"));
        assert!(args.field_key.is_none());
    }
}
