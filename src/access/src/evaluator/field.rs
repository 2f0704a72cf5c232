//! Field-level access evaluation
//!
//! Every key of the input payload is checked. All field rules are started
//! together and awaited together; a failing rule never stops the others.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::context::EvaluationContext;
use crate::error::{
    AccessDenied, AccessReturnError, DeniedTarget, ExtensionError, ExtensionFailure, Result,
    ReturnTypeFailure, UnknownField,
};
use crate::rule::{invoke_rule, RuleOutcome};
use crate::schema::EntityType;

/// Outcome of one field's rule
#[derive(Debug)]
pub struct FieldOutcome {
    pub field_key: String,
    pub outcome: RuleOutcome,
}

/// Evaluate every written field and fold the outcomes into one decision
///
/// `item_decision` is the already validated item-level result; fields without
/// their own rule reuse it instead of invoking the item rule again. Deletes
/// and argument bundles without input data have nothing to evaluate.
pub async fn evaluate_fields(
    entity: &EntityType,
    args: &EvaluationContext,
    target: &DeniedTarget,
    item_decision: bool,
) -> Result<()> {
    if !args.operation.has_field_access() {
        return Ok(());
    }

    let outcomes = collect_field_outcomes(entity, args, item_decision).await;
    fold_field_outcomes(entity, args, target, outcomes)
}

/// Run all field rules concurrently, returning outcomes in payload key order
pub async fn collect_field_outcomes(
    entity: &EntityType,
    args: &EvaluationContext,
    item_decision: bool,
) -> Vec<FieldOutcome> {
    let Some(input) = args.input_data.as_ref() else {
        return Vec::new();
    };

    let checks = input.keys().map(|field_key| async move {
        let outcome = match entity.field(field_key) {
            None => RuleOutcome::Threw(
                UnknownField {
                    entity_key: entity.key().to_string(),
                    field_key: field_key.clone(),
                }
                .into(),
            ),
            Some(field) => match field.rule(args.operation) {
                Some(rule) => invoke_rule(rule.as_ref(), args.for_field(field_key)).await,
                None => RuleOutcome::from_decision(item_decision),
            },
        };

        FieldOutcome {
            field_key: field_key.clone(),
            outcome,
        }
    });

    join_all(checks).await
}

/// Fold field outcomes: extension errors, then return-type errors, then denials
pub fn fold_field_outcomes(
    entity: &EntityType,
    args: &EvaluationContext,
    target: &DeniedTarget,
    outcomes: Vec<FieldOutcome>,
) -> Result<()> {
    let mut access_errors = Vec::new();
    let mut non_booleans = Vec::new();
    let mut fields_denied = Vec::new();

    for FieldOutcome { field_key, outcome } in outcomes {
        match outcome {
            RuleOutcome::Allowed => {}
            RuleOutcome::Denied => fields_denied.push(field_key),
            RuleOutcome::WrongReturnType { observed } => non_booleans.push(ReturnTypeFailure {
                tag: args.field_tag(&field_key),
                returned: observed,
            }),
            RuleOutcome::Threw(error) => {
                access_errors.push(ExtensionFailure::new(args.field_tag(&field_key), error))
            }
        }
    }

    if !access_errors.is_empty() {
        warn!(
            entity = %entity.key(),
            operation = %args.operation,
            failed = access_errors.len(),
            "field rules failed"
        );
        return Err(ExtensionError::access_control(access_errors).into());
    }

    if !non_booleans.is_empty() {
        warn!(
            entity = %entity.key(),
            operation = %args.operation,
            failed = non_booleans.len(),
            "field rules returned non-booleans"
        );
        return Err(AccessReturnError {
            entries: non_booleans,
        }
        .into());
    }

    if !fields_denied.is_empty() {
        debug!(
            entity = %entity.key(),
            operation = %args.operation,
            denied = fields_denied.len(),
            "field rules denied"
        );
        return Err(AccessDenied::fields(
            entity.key(),
            args.operation,
            target.clone(),
            fields_denied,
        )
        .into());
    }

    Ok(())
}
