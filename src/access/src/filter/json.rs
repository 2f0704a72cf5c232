//! Default resolver for JSON where inputs

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::canonical::{CompareOp, Filter};
use super::{FilterResolver, WhereInput};
use crate::context::RequestContext;
use crate::error::{AccessError, Result};
use crate::schema::EntityType;
use crate::types::value_type_name;

/// Resolves where inputs of the shape
///
/// ```text
/// { "<field>": <value> | { "<op>": <value>, ... },
///   "AND": [<where>, ...], "OR": [<where>, ...], "NOT": [<where>, ...] }
/// ```
///
/// Field names are checked against the entity type. `NOT` matches items for
/// which none of the listed conditions hold.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWhereResolver;

impl JsonWhereResolver {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous resolution, shared by the async trait impl
    pub fn resolve_sync(&self, filter: &WhereInput, entity: &EntityType) -> Result<Filter> {
        parse_where(filter.as_map(), entity)
    }
}

#[async_trait]
impl FilterResolver for JsonWhereResolver {
    async fn resolve_filter(
        &self,
        filter: &WhereInput,
        entity: &EntityType,
        _context: &RequestContext,
    ) -> Result<Filter> {
        self.resolve_sync(filter, entity)
    }
}

fn parse_where(map: &Map<String, Value>, entity: &EntityType) -> Result<Filter> {
    let mut parts = Vec::with_capacity(map.len());

    for (key, value) in map {
        let part = match key.as_str() {
            "AND" => Filter::and(parse_list(key, value, entity)?),
            "OR" => Filter::or(parse_list(key, value, entity)?),
            "NOT" => Filter::and(
                parse_list(key, value, entity)?
                    .into_iter()
                    .map(Filter::negate)
                    .collect(),
            ),
            field => {
                if !entity.is_filterable(field) {
                    return Err(invalid(format!(
                        "unknown field '{}' on '{}'",
                        field,
                        entity.key()
                    )));
                }
                parse_field(field, value)?
            }
        };
        parts.push(part);
    }

    Ok(collapse(parts))
}

fn parse_list(key: &str, value: &Value, entity: &EntityType) -> Result<Vec<Filter>> {
    let entries = value.as_array().ok_or_else(|| {
        invalid(format!("'{}' expects a list, got {}", key, value_type_name(value)))
    })?;

    entries
        .iter()
        .map(|entry| match entry {
            Value::Object(map) => parse_where(map, entity),
            other => Err(invalid(format!(
                "'{}' entries must be objects, got {}",
                key,
                value_type_name(other)
            ))),
        })
        .collect()
}

fn parse_field(field: &str, value: &Value) -> Result<Filter> {
    let ops = match value {
        Value::Object(ops) => ops,
        scalar => return Ok(Filter::equals(field, scalar.clone())),
    };

    let mut parts = Vec::with_capacity(ops.len());
    for (name, operand) in ops {
        let op = CompareOp::parse(name).ok_or_else(|| {
            invalid(format!("unknown operator '{}' on field '{}'", name, field))
        })?;

        if op == CompareOp::Not && operand.is_object() {
            parts.push(Filter::negate(parse_field(field, operand)?));
            continue;
        }

        if op.takes_list() && !operand.is_array() {
            return Err(invalid(format!(
                "operator '{}' on field '{}' expects a list, got {}",
                name,
                field,
                value_type_name(operand)
            )));
        }

        parts.push(Filter::Compare {
            field: field.to_string(),
            op,
            value: operand.clone(),
        });
    }

    Ok(collapse(parts))
}

fn collapse(mut parts: Vec<Filter>) -> Filter {
    match parts.len() {
        0 => Filter::All,
        1 => parts.remove(0),
        _ => Filter::and(parts),
    }
}

fn invalid(message: String) -> AccessError {
    AccessError::InvalidFilter(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;
    use serde_json::json;

    fn posts() -> EntityType {
        EntityType::new("Post")
            .with_field("title", FieldDef::new())
            .with_field("status", FieldDef::new())
            .with_field("views", FieldDef::new())
    }

    fn resolve(value: Value) -> Result<Filter> {
        let input = WhereInput::from_json(value)?;
        JsonWhereResolver::new().resolve_sync(&input, &posts())
    }

    #[test]
    fn test_bare_value_is_equals() {
        assert_eq!(
            resolve(json!({"status": "published"})).unwrap(),
            Filter::equals("status", "published")
        );
    }

    #[test]
    fn test_empty_input_matches_all() {
        assert_eq!(resolve(json!({})).unwrap(), Filter::All);
    }

    #[test]
    fn test_operators_combine_with_and() {
        let filter = resolve(json!({"views": {"gte": 1, "lt": 100}})).unwrap();
        let item = json!({"views": 50}).as_object().cloned().unwrap();
        let out_of_range = json!({"views": 100}).as_object().cloned().unwrap();

        assert!(matches!(filter, Filter::And { ref filters } if filters.len() == 2));
        assert!(filter.matches(&item));
        assert!(!filter.matches(&out_of_range));
    }

    #[test]
    fn test_logical_operators() {
        let filter = resolve(json!({
            "OR": [{"status": "published"}, {"title": {"startsWith": "Draft:"}}],
            "NOT": [{"views": 0}]
        }))
        .unwrap();

        let visible = json!({"status": "draft", "title": "Draft: plans", "views": 3});
        let hidden = json!({"status": "published", "title": "x", "views": 0});
        assert!(filter.matches(visible.as_object().unwrap()));
        assert!(!filter.matches(hidden.as_object().unwrap()));
    }

    #[test]
    fn test_nested_not() {
        let filter = resolve(json!({"status": {"not": {"in": ["archived", "deleted"]}}})).unwrap();
        let live = json!({"status": "published"});
        let gone = json!({"status": "deleted"});
        assert!(filter.matches(live.as_object().unwrap()));
        assert!(!filter.matches(gone.as_object().unwrap()));
    }

    #[test]
    fn test_id_is_always_filterable() {
        assert_eq!(resolve(json!({"id": "1"})).unwrap(), Filter::equals("id", "1"));
    }

    #[test]
    fn test_validation_errors() {
        let unknown_field = resolve(json!({"secret": "x"})).unwrap_err();
        assert_eq!(unknown_field.to_string(), "Invalid filter: unknown field 'secret' on 'Post'");

        let unknown_op = resolve(json!({"title": {"like": "x"}})).unwrap_err();
        assert_eq!(
            unknown_op.to_string(),
            "Invalid filter: unknown operator 'like' on field 'title'"
        );

        let bad_list = resolve(json!({"status": {"in": "published"}})).unwrap_err();
        assert_eq!(
            bad_list.to_string(),
            "Invalid filter: operator 'in' on field 'status' expects a list, got string"
        );

        let bad_and = resolve(json!({"AND": {"status": "x"}})).unwrap_err();
        assert_eq!(bad_and.to_string(), "Invalid filter: 'AND' expects a list, got object");
    }
}
