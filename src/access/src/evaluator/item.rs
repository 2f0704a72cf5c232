//! Item-level access evaluation

use tracing::{debug, warn};

use crate::context::EvaluationContext;
use crate::error::{
    AccessDenied, AccessReturnError, DeniedTarget, ExtensionError, ExtensionFailure, Result,
    ReturnTypeFailure,
};
use crate::rule::{invoke_rule, RuleOutcome};
use crate::schema::EntityType;

/// Run the entity type's item-level rule for `args.operation`
///
/// Succeeds only when the rule returns exactly `true`.
pub async fn evaluate_item(
    entity: &EntityType,
    args: &EvaluationContext,
    target: &DeniedTarget,
) -> Result<()> {
    let rule = entity.item_rule(args.operation);

    match invoke_rule(rule.as_ref(), args.clone()).await {
        RuleOutcome::Allowed => Ok(()),
        RuleOutcome::Denied => {
            debug!(entity = %entity.key(), operation = %args.operation, "item rule denied");
            Err(AccessDenied::item(entity.key(), args.operation, target.clone()).into())
        }
        RuleOutcome::WrongReturnType { observed } => {
            let tag = args.item_tag();
            warn!(%tag, returned = observed, "item rule returned a non-boolean");
            Err(AccessReturnError {
                entries: vec![ReturnTypeFailure {
                    tag,
                    returned: observed,
                }],
            }
            .into())
        }
        RuleOutcome::Threw(error) => {
            let tag = args.item_tag();
            warn!(%tag, "item rule failed");
            Err(ExtensionError::access_control(vec![ExtensionFailure::new(tag, error)]).into())
        }
    }
}
