//! The formula language of computed fields.
//!
//! Formulas are a small expression language: arithmetic, comparison and
//! logical operators with JavaScript-like semantics, a ternary, string
//! templates, `@path` entity references, built-in functions (callable bare or
//! as `Math.f`) and the `reduce(collection, initial, body)` special form.
//! Formulas are parsed once per definition and evaluated many times.

pub mod ast;
pub mod engine;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOp, Expression, TemplateSegment, UnaryOp};
pub use engine::{COMPUTED_ROOT, FormulaScope};
pub use functions::{FormulaFunction, FunctionRegistry};
pub use parser::parse;

use crate::error::{EvalError, ParseError};
use crate::path::{self, RepeaterContext};
use crate::value::Value;
use engine::FormulaEngine;
use itertools::Itertools;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

/// A formula parsed ahead of time, together with what it reads.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    source: String,
    expression: Result<Expression, ParseError>,
}

impl CompiledFormula {
    /// Parses `source`. A syntax error is kept and reported on every
    /// evaluation, so one bad formula never blocks loading the form.
    pub fn compile(source: &str) -> Self {
        Self {
            source: source.to_string(),
            expression: parse(source),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> Result<&Expression, &ParseError> {
        self.expression.as_ref()
    }

    /// Entity and computed paths the formula reads, cut at their first
    /// placeholder (`items[{{index}}].weight` reads `items`).
    pub fn dependencies(&self) -> Vec<String> {
        match &self.expression {
            Ok(expression) => expression
                .references()
                .iter()
                .map(|reference| path::static_prefix(reference).to_string())
                .filter(|prefix| !prefix.is_empty())
                .unique()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn evaluate(&self, scope: FormulaScope<'_>) -> Result<Value, EvalError> {
        let expression = self.expression.as_ref().map_err(|e| e.clone())?;
        FormulaEngine::new(scope).evaluate(expression)
    }
}

fn default_functions() -> &'static FunctionRegistry {
    static FUNCTIONS: OnceLock<FunctionRegistry> = OnceLock::new();
    FUNCTIONS.get_or_init(FunctionRegistry::with_builtins)
}

/// Parses and evaluates a formula with the built-in functions only.
pub fn evaluate(
    formula: &str,
    entity: &JsonValue,
    context: Option<&RepeaterContext<'_>>,
) -> Result<Value, EvalError> {
    let expression = parse(formula)?;
    let scope = FormulaScope::new(entity, default_functions()).with_context(context);
    FormulaEngine::new(scope).evaluate(&expression)
}
