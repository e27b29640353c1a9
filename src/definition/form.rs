use super::node::LayoutNode;
use crate::error::{DefinitionError, EvalError};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

/// A complete, versioned form definition for one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    pub game_system_id: String,
    pub entity_type: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub layout: Vec<LayoutNode>,
    #[serde(default)]
    pub fragments: IndexMap<String, FormFragment>,
    #[serde(default)]
    pub computed_fields: IndexMap<String, FormComputedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<JsonValue>,
}

/// What a cached engine is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormIdentity {
    pub game_system_id: String,
    pub entity_type: String,
    pub version: u64,
}

impl FormDefinition {
    pub fn from_json_str(json: &str) -> Result<Self, DefinitionError> {
        let definition: FormDefinition = serde_json::from_str(json)
            .map_err(|e| DefinitionError::JsonParseError(e.to_string()))?;
        Ok(definition.normalized())
    }

    pub fn from_json_value(json: JsonValue) -> Result<Self, DefinitionError> {
        let definition: FormDefinition = serde_json::from_value(json)
            .map_err(|e| DefinitionError::JsonParseError(e.to_string()))?;
        Ok(definition.normalized())
    }

    /// Loads a definition from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DefinitionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DefinitionError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&content)
    }

    pub fn identity(&self) -> FormIdentity {
        FormIdentity {
            game_system_id: self.game_system_id.clone(),
            entity_type: self.entity_type.clone(),
            version: self.version,
        }
    }

    /// Fills ids and names omitted inside the keyed maps from their keys.
    fn normalized(mut self) -> Self {
        for (key, field) in self.computed_fields.iter_mut() {
            if field.id.is_empty() {
                field.id = key.clone();
            }
        }
        for (key, fragment) in self.fragments.iter_mut() {
            if fragment.name.is_empty() {
                fragment.name = key.clone();
            }
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultType {
    #[default]
    Number,
    String,
    Boolean,
}

impl ResultType {
    /// Coerces a formula result to the declared type.
    ///
    /// Absent data is not an error: it becomes `null`, `""` or `false`.
    pub fn coerce(self, value: Value) -> Result<JsonValue, EvalError> {
        match self {
            ResultType::Number => match value {
                Value::Undefined | Value::Null => Ok(JsonValue::Null),
                Value::Bool(b) => Ok(JsonValue::from(if b { 1 } else { 0 })),
                other => match other.as_arithmetic_number() {
                    Some(n) if n.is_finite() => Ok(Value::Number(n).to_json().unwrap_or_default()),
                    _ => Err(EvalError::type_mismatch("resultType", "number", other)),
                },
            },
            ResultType::String => Ok(JsonValue::String(value.display_text())),
            ResultType::Boolean => Ok(JsonValue::Bool(value.is_truthy())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormComputedField {
    #[serde(default)]
    pub id: String,
    pub formula: String,
    #[serde(default)]
    pub result_type: ResultType,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterKind {
    #[default]
    Literal,
    Binding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentParameter {
    pub name: String,
    #[serde(default)]
    pub kind: ParameterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
}

/// A reusable, parameterized layout subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFragment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<FragmentParameter>,
    #[serde(default)]
    pub layout: Vec<LayoutNode>,
}
