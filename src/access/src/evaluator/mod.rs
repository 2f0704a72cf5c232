//! Item-level and field-level rule evaluation
//!
//! Both evaluators invoke rules only through [`crate::rule::invoke_rule`] and
//! translate the validated outcomes into the error taxonomy. Item-level
//! failures are reported immediately; field-level outcomes are collected in
//! full and then folded with the priority
//! extension errors > return-type errors > denials.

mod field;
mod item;

pub use field::{collect_field_outcomes, evaluate_fields, fold_field_outcomes, FieldOutcome};
pub use item::evaluate_item;
