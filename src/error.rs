use crate::value::Value;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while resolving a data path against an entity.
///
/// Missing data is never an error; these only fire for paths that cannot be
/// turned into a concrete location at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Path '{path}' uses '{{{{index}}}}' outside of any repeater")]
    MissingRepeaterContext { path: String },

    #[error("Path '{path}' contains the unresolved placeholder '{{{{{name}}}}}'")]
    UnknownPlaceholder { path: String, name: String },
}

/// Errors that can occur while lexing or parsing a formula.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unrecognized character at {pos}")]
    LexerError { pos: usize },

    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of formula at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },
}

impl ParseError {
    pub fn unexpected_token(
        pos: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }
}

/// Errors that can occur while evaluating a parsed formula.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(
        "Type mismatch during operation '{operation}': expected {expected}, but found value '{found}'"
    )]
    TypeMismatch {
        operation: String,
        expected: String,
        found: Value,
    },

    #[error("Operand of '{operation}' is undefined")]
    UndefinedOperand { operation: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Function '{name}' expects {expected} arguments, but received {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },

    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("Computed field '{0}' has no value because its own evaluation failed")]
    UpstreamFailed(String),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl EvalError {
    pub(crate) fn type_mismatch(operation: &str, expected: &str, found: Value) -> Self {
        Self::TypeMismatch {
            operation: operation.to_string(),
            expected: expected.to_string(),
            found,
        }
    }
}

/// The typed failure of a single computed field.
///
/// Its presence in place of a value is the `ComputationFailed` sentinel the
/// presentation layer renders distinctly from a legitimate zero or empty value.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("Formula for computed field '{field_id}' failed: {message}")]
pub struct FormulaError {
    pub field_id: String,
    pub message: String,
}

/// Errors that can occur while expanding a `fragmentRef` node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    #[error("Fragment '{name}' referenced by node '{node_id}' is not defined")]
    Missing { node_id: String, name: String },

    #[error("Fragment '{name}' referenced by node '{node_id}' re-enters its own expansion: {}", chain.join(" → "))]
    Cycle {
        node_id: String,
        name: String,
        chain: Vec<String>,
    },
}

/// Errors that can occur while materializing or mutating a repeater.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepeaterError {
    #[error("Index {index} is out of range for the repeater at '{path}' with {len} items")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Binding '{0}' does not resolve to an array")]
    NotAnArray(String),

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Errors that can occur when loading a form definition.
#[derive(Error, Debug, Clone)]
pub enum DefinitionError {
    #[error("Failed to parse form definition JSON: {0}")]
    JsonParseError(String),

    #[error("Could not read form definition '{path}': {message}")]
    Io { path: String, message: String },
}
