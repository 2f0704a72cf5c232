//! Access rule capability and the guarded invocation wrapper
//!
//! Rules are user-authored and untrusted. They are only ever invoked through
//! [`invoke_rule`], which catches errors and panics and validates the return
//! shape before anything branches on the value.

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::context::EvaluationContext;
use crate::types::value_type_name;

/// A boolean-returning authorization callback
///
/// The return type is a JSON value rather than `bool` so a rule that returns
/// a filter object or a truthy string is detected instead of coerced.
#[async_trait]
pub trait AccessRule: Send + Sync {
    async fn check(&self, args: EvaluationContext) -> anyhow::Result<Value>;
}

/// Always allows
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl AccessRule for AllowAll {
    async fn check(&self, _args: EvaluationContext) -> anyhow::Result<Value> {
        Ok(Value::Bool(true))
    }
}

/// Always denies
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

#[async_trait]
impl AccessRule for DenyAll {
    async fn check(&self, _args: EvaluationContext) -> anyhow::Result<Value> {
        Ok(Value::Bool(false))
    }
}

/// Adapter turning an async closure into an [`AccessRule`]
pub struct RuleFn<F>(F);

#[async_trait]
impl<F, Fut> AccessRule for RuleFn<F>
where
    F: Fn(EvaluationContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn check(&self, args: EvaluationContext) -> anyhow::Result<Value> {
        (self.0)(args).await
    }
}

/// Wrap an async closure as a shareable rule
pub fn rule_fn<F, Fut>(f: F) -> Arc<dyn AccessRule>
where
    F: Fn(EvaluationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(RuleFn(f))
}

/// Validated result of one rule invocation
#[derive(Debug)]
pub enum RuleOutcome {
    Allowed,
    Denied,
    WrongReturnType { observed: &'static str },
    Threw(anyhow::Error),
}

impl RuleOutcome {
    /// Classify a raw rule result; only a JSON boolean is a decision
    pub fn classify(result: anyhow::Result<Value>) -> Self {
        match result {
            Ok(Value::Bool(true)) => RuleOutcome::Allowed,
            Ok(Value::Bool(false)) => RuleOutcome::Denied,
            Ok(other) => RuleOutcome::WrongReturnType {
                observed: value_type_name(&other),
            },
            Err(error) => RuleOutcome::Threw(error),
        }
    }

    /// Outcome equivalent to a cached, already validated decision
    pub fn from_decision(allowed: bool) -> Self {
        if allowed {
            RuleOutcome::Allowed
        } else {
            RuleOutcome::Denied
        }
    }
}

/// Invoke a rule, converting every failure mode into a [`RuleOutcome`]
pub async fn invoke_rule(rule: &dyn AccessRule, args: EvaluationContext) -> RuleOutcome {
    match AssertUnwindSafe(rule.check(args)).catch_unwind().await {
        Ok(result) => RuleOutcome::classify(result),
        Err(panic) => RuleOutcome::Threw(anyhow::anyhow!(
            "access rule panicked: {}",
            panic_message(panic.as_ref())
        )),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
