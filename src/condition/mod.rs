//! Visibility condition evaluation.
//!
//! Conditions never fail. Unresolvable paths read as Undefined, failed
//! number coercions make the comparison false, and unknown operators fail
//! open (the node stays visible) with a warning.

use crate::definition::{ConditionOperator, LogicalOp, VisibilityCondition};
use crate::diagnostics::Diagnostic;
use crate::path::{self, RepeaterContext};
use crate::value::Value;
use serde_json::Value as JsonValue;
use tracing::warn;

/// Evaluates conditions against one entity under an optional repeater frame.
#[derive(Debug, Clone, Copy)]
pub struct ConditionEvaluator<'a> {
    entity: &'a JsonValue,
    context: Option<&'a RepeaterContext<'a>>,
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new(entity: &'a JsonValue, context: Option<&'a RepeaterContext<'a>>) -> Self {
        Self { entity, context }
    }

    pub fn evaluate(&self, condition: &VisibilityCondition) -> bool {
        let mut ignored = Vec::new();
        self.evaluate_reporting("", condition, &mut ignored)
    }

    /// Evaluates `condition` on behalf of `node_id`, recording anything
    /// noteworthy in `diagnostics`.
    pub fn evaluate_reporting(
        &self,
        node_id: &str,
        condition: &VisibilityCondition,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> bool {
        match condition {
            VisibilityCondition::Compound { op, conditions } => match op {
                LogicalOp::And => conditions
                    .iter()
                    .all(|c| self.evaluate_reporting(node_id, c, diagnostics)),
                LogicalOp::Or => conditions
                    .iter()
                    .any(|c| self.evaluate_reporting(node_id, c, diagnostics)),
                LogicalOp::Unknown(name) => unknown_operator(node_id, name, diagnostics),
            },
            VisibilityCondition::Simple {
                field,
                operator,
                value,
            } => {
                let actual = match path::resolve(self.entity, field, self.context) {
                    Ok(actual) => actual,
                    Err(e) => {
                        warn!(node_id, error = %e, "Condition path could not be resolved");
                        diagnostics.push(Diagnostic::path(node_id, e));
                        None
                    }
                };
                match apply_operator(operator, actual, value.as_ref()) {
                    Some(result) => result,
                    None => unknown_operator(node_id, operator.as_str(), diagnostics),
                }
            }
        }
    }
}

/// Evaluates a single condition with no diagnostics sink.
pub fn evaluate(
    entity: &JsonValue,
    condition: &VisibilityCondition,
    context: Option<&RepeaterContext<'_>>,
) -> bool {
    ConditionEvaluator::new(entity, context).evaluate(condition)
}

fn unknown_operator(node_id: &str, operator: &str, diagnostics: &mut Vec<Diagnostic>) -> bool {
    warn!(node_id, operator, "Unknown condition operator, treating node as visible");
    diagnostics.push(Diagnostic::UnknownOperator {
        node_id: node_id.to_string(),
        operator: operator.to_string(),
    });
    true
}

/// `None` when the operator is not recognized.
fn apply_operator(
    operator: &ConditionOperator,
    actual: Option<&JsonValue>,
    expected: Option<&JsonValue>,
) -> Option<bool> {
    let result = match operator {
        ConditionOperator::Equals => values_equal(actual, expected),
        ConditionOperator::NotEquals => !values_equal(actual, expected),
        ConditionOperator::IsEmpty => is_empty(actual),
        ConditionOperator::IsNotEmpty => !is_empty(actual),
        ConditionOperator::GreaterThan => compare(actual, expected, |a, b| a > b),
        ConditionOperator::LessThan => compare(actual, expected, |a, b| a < b),
        ConditionOperator::Contains => contains(actual, expected),
        ConditionOperator::Unknown(_) => return None,
    };
    Some(result)
}

/// Deep equality with numbers compared by value. An omitted expected value
/// means `null`, and absent data compares equal to `null`.
fn values_equal(actual: Option<&JsonValue>, expected: Option<&JsonValue>) -> bool {
    comparable(actual) == comparable(expected)
}

fn comparable(json: Option<&JsonValue>) -> Value {
    match Value::from_resolved(json) {
        Value::Undefined => Value::Null,
        other => other,
    }
}

/// Undefined, `null`, `""` and `[]` are empty.
pub fn is_empty(json: Option<&JsonValue>) -> bool {
    match json {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => s.is_empty(),
        Some(JsonValue::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn compare<F>(actual: Option<&JsonValue>, expected: Option<&JsonValue>, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    let actual = Value::from_resolved(actual).as_number();
    let expected = Value::from_resolved(expected).as_number();
    match (actual, expected) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Substring for strings, membership for arrays.
fn contains(actual: Option<&JsonValue>, expected: Option<&JsonValue>) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    match actual {
        Some(JsonValue::String(haystack)) => match Value::from(expected) {
            Value::String(needle) => haystack.contains(needle.as_str()),
            Value::Number(_) | Value::Bool(_) => {
                haystack.contains(Value::from(expected).to_string().as_str())
            }
            _ => false,
        },
        Some(JsonValue::Array(items)) => items
            .iter()
            .any(|item| values_equal(Some(item), Some(expected))),
        _ => false,
    }
}
