use crate::condition::is_empty;
use crate::definition::FieldValidation;
use crate::value::Value;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A constraint the current field value does not meet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationIssue {
    Required,
    BelowMinimum { min: f64 },
    AboveMaximum { max: f64 },
    #[serde(rename_all = "camelCase")]
    TooShort { min_length: usize },
    #[serde(rename_all = "camelCase")]
    TooLong { max_length: usize },
}

/// Checks `value` against `rules`. Range and length rules only apply to
/// values of a matching shape; an empty optional field has no issues.
pub fn validate(value: Option<&JsonValue>, rules: &FieldValidation) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if is_empty(value) {
        if rules.required {
            issues.push(ValidationIssue::Required);
        }
        return issues;
    }

    if let Some(n) = value.and_then(|v| match v {
        JsonValue::Number(_) | JsonValue::String(_) => Value::from(v).as_arithmetic_number(),
        _ => None,
    }) {
        if let Some(min) = rules.min.filter(|min| n < *min) {
            issues.push(ValidationIssue::BelowMinimum { min });
        }
        if let Some(max) = rules.max.filter(|max| n > *max) {
            issues.push(ValidationIssue::AboveMaximum { max });
        }
    }

    let length = match value {
        Some(JsonValue::String(s)) => Some(s.chars().count()),
        Some(JsonValue::Array(items)) => Some(items.len()),
        _ => None,
    };
    if let Some(length) = length {
        if let Some(min_length) = rules.min_length.filter(|min| length < *min) {
            issues.push(ValidationIssue::TooShort { min_length });
        }
        if let Some(max_length) = rules.max_length.filter(|max| length > *max) {
            issues.push(ValidationIssue::TooLong { max_length });
        }
    }

    issues
}
