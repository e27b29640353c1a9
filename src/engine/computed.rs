use crate::error::FormulaError;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// The outcome of one computed field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ComputedValue {
    Value(JsonValue),
    /// The `ComputationFailed` sentinel: rendered distinctly from any value.
    Failed(FormulaError),
}

impl ComputedValue {
    pub fn as_value(&self) -> Option<&JsonValue> {
        match self {
            ComputedValue::Value(value) => Some(value),
            ComputedValue::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FormulaError> {
        match self {
            ComputedValue::Value(_) => None,
            ComputedValue::Failed(error) => Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ComputedValue::Failed(_))
    }

    pub(crate) fn failed(field_id: &str, message: impl Into<String>) -> Self {
        ComputedValue::Failed(FormulaError {
            field_id: field_id.to_string(),
            message: message.into(),
        })
    }
}

/// The computed-field values of one entity, in evaluation order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ComputedValues {
    values: IndexMap<String, ComputedValue>,
}

impl ComputedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_id: &str) -> Option<&ComputedValue> {
        self.values.get(field_id)
    }

    /// The plain value of a field; `None` when absent or failed.
    pub fn value(&self, field_id: &str) -> Option<&JsonValue> {
        self.get(field_id).and_then(ComputedValue::as_value)
    }

    pub fn insert(&mut self, field_id: impl Into<String>, value: ComputedValue) {
        self.values.insert(field_id.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComputedValue)> {
        self.values.iter().map(|(id, value)| (id.as_str(), value))
    }

    pub fn failures(&self) -> impl Iterator<Item = &FormulaError> {
        self.values.values().filter_map(ComputedValue::error)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
