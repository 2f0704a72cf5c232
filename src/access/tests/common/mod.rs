//! Shared fixtures for integration tests

#![allow(dead_code)]

use listgate_access::{
    rule_fn, AccessControlPipeline, AccessRule, EntityType, EvaluationContext, FieldDef,
    InMemoryItemStore, InputData, JsonWhereResolver,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Install a test subscriber once; honours RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn input(value: Value) -> InputData {
    value
        .as_object()
        .cloned()
        .expect("test payloads are JSON objects")
}

/// Store seeded with two posts: "1" published, "2" draft
pub async fn seeded_store() -> Arc<InMemoryItemStore> {
    let store = Arc::new(InMemoryItemStore::new());
    store
        .insert(
            "Post",
            json!({"id": "1", "title": "Launch", "status": "published", "author": "user:alice"}),
        )
        .await
        .unwrap();
    store
        .insert(
            "Post",
            json!({"id": "2", "title": "Plans", "status": "draft", "author": "user:bob"}),
        )
        .await
        .unwrap();
    store
}

pub fn pipeline(store: Arc<InMemoryItemStore>) -> AccessControlPipeline {
    init_tracing();
    AccessControlPipeline::new(store, Arc::new(JsonWhereResolver::new()))
}

/// Post with title, status and author fields and no rules of its own
pub fn posts() -> EntityType {
    EntityType::new("Post")
        .with_field("title", FieldDef::new())
        .with_field("status", FieldDef::new())
        .with_field("author", FieldDef::new())
}

pub fn returns(value: Value) -> Arc<dyn AccessRule> {
    rule_fn(move |_| {
        let value = value.clone();
        async move { Ok(value) }
    })
}

pub fn fails(message: &'static str) -> Arc<dyn AccessRule> {
    rule_fn(move |_| async move { Err(anyhow::anyhow!(message)) })
}

pub fn sleeps_then(delay: Duration, value: Value) -> Arc<dyn AccessRule> {
    rule_fn(move |_| {
        let value = value.clone();
        async move {
            tokio::time::sleep(delay).await;
            Ok(value)
        }
    })
}

/// Allows only editors
pub fn editors_only() -> Arc<dyn AccessRule> {
    rule_fn(|args: EvaluationContext| async move {
        Ok(json!(args.session.map(|s| s.has_role("editor")).unwrap_or(false)))
    })
}
