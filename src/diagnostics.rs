use crate::error::{FormulaError, FragmentError};
use serde::Serialize;
use thiserror::Error;

/// How loudly a host should surface a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Warning,
    Error,
}

/// A recoverable problem found while loading or resolving a form.
///
/// None of these abort a pass; they are collected next to the output so the
/// surrounding form keeps rendering.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    #[error(transparent)]
    Formula(FormulaError),

    #[error("Computed field '{field_id}' has an invalid formula: {message}")]
    #[serde(rename_all = "camelCase")]
    FormulaSyntax { field_id: String, message: String },

    #[error("Computed fields form a dependency cycle: {}", cycle.join(" → "))]
    DependencyCycle { cycle: Vec<String> },

    #[error("Computed field '{field_id}' reads '{path}' which is not listed in its dependencies")]
    #[serde(rename_all = "camelCase")]
    UndeclaredDependency { field_id: String, path: String },

    #[error("Fragment '{name}' referenced by node '{node_id}' is not defined")]
    #[serde(rename_all = "camelCase")]
    MissingFragment { node_id: String, name: String },

    #[error("Fragment expansion at node '{node_id}' loops: {}", chain.join(" → "))]
    #[serde(rename_all = "camelCase")]
    FragmentCycle { node_id: String, chain: Vec<String> },

    #[error("Fragment '{fragment}' expanded at node '{node_id}' has no argument for '{parameter}'")]
    #[serde(rename_all = "camelCase")]
    MissingFragmentArgument {
        node_id: String,
        fragment: String,
        parameter: String,
    },

    #[error("Node '{node_id}' uses unknown condition operator '{operator}' and is shown")]
    #[serde(rename_all = "camelCase")]
    UnknownOperator { node_id: String, operator: String },

    #[error("Node '{node_id}': {message}")]
    #[serde(rename_all = "camelCase")]
    Path { node_id: String, message: String },

    #[error("Node '{node_id}' refers to unknown computed field '{field_id}'")]
    #[serde(rename_all = "camelCase")]
    UnknownComputedField { node_id: String, field_id: String },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::UndeclaredDependency { .. }
            | Diagnostic::UnknownOperator { .. }
            | Diagnostic::MissingFragmentArgument { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// The layout node the diagnostic is attached to, if any.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Diagnostic::MissingFragment { node_id, .. }
            | Diagnostic::FragmentCycle { node_id, .. }
            | Diagnostic::MissingFragmentArgument { node_id, .. }
            | Diagnostic::UnknownOperator { node_id, .. }
            | Diagnostic::Path { node_id, .. }
            | Diagnostic::UnknownComputedField { node_id, .. } => Some(node_id),
            Diagnostic::Formula(_)
            | Diagnostic::FormulaSyntax { .. }
            | Diagnostic::DependencyCycle { .. }
            | Diagnostic::UndeclaredDependency { .. } => None,
        }
    }

    pub(crate) fn path(node_id: &str, error: impl ToString) -> Self {
        Diagnostic::Path {
            node_id: node_id.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<FormulaError> for Diagnostic {
    fn from(error: FormulaError) -> Self {
        Diagnostic::Formula(error)
    }
}

impl From<FragmentError> for Diagnostic {
    fn from(error: FragmentError) -> Self {
        match error {
            FragmentError::Missing { node_id, name } => Diagnostic::MissingFragment { node_id, name },
            FragmentError::Cycle { node_id, chain, .. } => {
                Diagnostic::FragmentCycle { node_id, chain }
            }
        }
    }
}
