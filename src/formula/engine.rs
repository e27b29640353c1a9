use super::ast::{BinaryOp, Expression, TemplateSegment, UnaryOp};
use super::functions::FunctionRegistry;
use crate::engine::{ComputedValue, ComputedValues};
use crate::error::EvalError;
use crate::path::{self, PathSegment, RepeaterContext};
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

/// Root segment under which formulas read other computed fields.
pub const COMPUTED_ROOT: &str = "computed";

// This macro generates a match arm for a binary operation.
macro_rules! eval_op {
    ($self:ident, $l:ident, $r:ident, $op_str:expr, $op_fn:expr, number) => {
        $self.eval_arithmetic($l, $r, $op_str, $op_fn)
    };
    ($self:ident, $l:ident, $r:ident, $op_str:expr, $op_fn:expr, ordering) => {
        $self.eval_comparison($l, $r, $op_str, $op_fn)
    };
}

/// Everything a formula can read.
#[derive(Debug, Clone, Copy)]
pub struct FormulaScope<'a> {
    pub entity: &'a JsonValue,
    pub context: Option<&'a RepeaterContext<'a>>,
    pub computed: Option<&'a ComputedValues>,
    pub functions: &'a FunctionRegistry,
}

impl<'a> FormulaScope<'a> {
    pub fn new(entity: &'a JsonValue, functions: &'a FunctionRegistry) -> Self {
        Self {
            entity,
            context: None,
            computed: None,
            functions,
        }
    }

    pub fn with_context(mut self, context: Option<&'a RepeaterContext<'a>>) -> Self {
        self.context = context;
        self
    }

    pub fn with_computed(mut self, computed: &'a ComputedValues) -> Self {
        self.computed = Some(computed);
        self
    }
}

/// The recursive engine for evaluating one formula AST.
pub(super) struct FormulaEngine<'a> {
    scope: FormulaScope<'a>,
    /// Locals bound by `reduce`, innermost last.
    locals: Vec<(&'static str, Value)>,
}

impl<'a> FormulaEngine<'a> {
    pub(super) fn new(scope: FormulaScope<'a>) -> Self {
        Self {
            scope,
            locals: Vec::new(),
        }
    }

    pub(super) fn evaluate(&mut self, expr: &Expression) -> Result<Value, EvalError> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Reference(path) => self.read_reference(path),
            Expression::Variable { name, members } => {
                let value = self
                    .locals
                    .iter()
                    .rev()
                    .find(|(local, _)| local == name)
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| EvalError::UnknownVariable(name.clone()))?;
                Ok(members
                    .iter()
                    .fold(value, |current, member| current.member(member)))
            }
            Expression::Template(segments) => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        TemplateSegment::Text(text) => out.push_str(text),
                        TemplateSegment::Expr(expr) => {
                            out.push_str(&self.evaluate(expr)?.display_text())
                        }
                    }
                }
                Ok(Value::String(out))
            }
            Expression::Unary { op, operand } => {
                let value = self.evaluate(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Negate => Ok(Value::Number(-arithmetic_operand(value, "-")?)),
                }
            }
            Expression::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
            Expression::Call {
                function,
                arguments,
            } => {
                let functions = self.scope.functions;
                let function = functions
                    .get(function)
                    .ok_or_else(|| EvalError::UnknownFunction(function.clone()))?;
                let args = arguments
                    .iter()
                    .map(|argument| self.evaluate(argument))
                    .collect::<Result<Vec<_>, _>>()?;
                function.call(&args)
            }
            Expression::Reduce {
                collection,
                initial,
                body,
            } => {
                let items = match self.evaluate(collection)? {
                    Value::Undefined | Value::Null => Vec::new(),
                    Value::Array(items) => items,
                    other => return Err(EvalError::type_mismatch("reduce", "array", other)),
                };
                let mut acc = self.evaluate(initial)?;
                for (index, item) in items.into_iter().enumerate() {
                    self.locals.push(("acc", acc));
                    self.locals.push(("item", item));
                    self.locals.push(("index", Value::Number(index as f64)));
                    let result = self.evaluate(body);
                    self.locals.truncate(self.locals.len() - 3);
                    acc = result?;
                }
                Ok(acc)
            }
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        l: &Expression,
        r: &Expression,
    ) -> Result<Value, EvalError> {
        match op {
            // JavaScript semantics: the deciding operand is the result.
            BinaryOp::And => {
                let left = self.evaluate(l)?;
                if !left.is_truthy() {
                    return Ok(left);
                }
                self.evaluate(r)
            }
            BinaryOp::Or => {
                let left = self.evaluate(l)?;
                if left.is_truthy() {
                    return Ok(left);
                }
                self.evaluate(r)
            }
            BinaryOp::Equal => Ok(Value::Bool(self.evaluate(l)? == self.evaluate(r)?)),
            BinaryOp::NotEqual => Ok(Value::Bool(self.evaluate(l)? != self.evaluate(r)?)),
            BinaryOp::Add => {
                let left = self.evaluate(l)?;
                let right = self.evaluate(r)?;
                if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                    if left.is_undefined() || right.is_undefined() {
                        return Err(EvalError::UndefinedOperand {
                            operation: "+".to_string(),
                        });
                    }
                    return Ok(Value::String(left.display_text() + &right.display_text()));
                }
                Ok(Value::Number(
                    arithmetic_operand(left, "+")? + arithmetic_operand(right, "+")?,
                ))
            }
            BinaryOp::Subtract => eval_op!(self, l, r, "-", |a, b| Ok(a - b), number),
            BinaryOp::Multiply => eval_op!(self, l, r, "*", |a, b| Ok(a * b), number),
            BinaryOp::Divide => eval_op!(self, l, r, "/", checked_divide, number),
            BinaryOp::Modulo => eval_op!(self, l, r, "%", checked_modulo, number),
            BinaryOp::Less => eval_op!(self, l, r, "<", Ordering::is_lt, ordering),
            BinaryOp::LessOrEqual => eval_op!(self, l, r, "<=", Ordering::is_le, ordering),
            BinaryOp::Greater => eval_op!(self, l, r, ">", Ordering::is_gt, ordering),
            BinaryOp::GreaterOrEqual => eval_op!(self, l, r, ">=", Ordering::is_ge, ordering),
        }
    }

    fn eval_arithmetic<F>(
        &mut self,
        l: &Expression,
        r: &Expression,
        op_symbol: &str,
        op: F,
    ) -> Result<Value, EvalError>
    where
        F: Fn(f64, f64) -> Result<f64, EvalError>,
    {
        let left = arithmetic_operand(self.evaluate(l)?, op_symbol)?;
        let right = arithmetic_operand(self.evaluate(r)?, op_symbol)?;
        op(left, right).map(Value::Number)
    }

    /// Numbers (or numeric strings) compare numerically, strings compare
    /// lexicographically.
    fn eval_comparison<F>(
        &mut self,
        l: &Expression,
        r: &Expression,
        op_symbol: &str,
        op: F,
    ) -> Result<Value, EvalError>
    where
        F: Fn(Ordering) -> bool,
    {
        let left = self.evaluate(l)?;
        let right = self.evaluate(r)?;
        if left.is_undefined() || right.is_undefined() {
            return Err(EvalError::UndefinedOperand {
                operation: op_symbol.to_string(),
            });
        }
        if let (Value::String(a), Value::String(b)) = (&left, &right) {
            return Ok(Value::Bool(op(a.cmp(b))));
        }
        let a = left
            .as_arithmetic_number()
            .ok_or_else(|| EvalError::type_mismatch(op_symbol, "number", left.clone()))?;
        let b = right
            .as_arithmetic_number()
            .ok_or_else(|| EvalError::type_mismatch(op_symbol, "number", right.clone()))?;
        Ok(Value::Bool(a.partial_cmp(&b).is_some_and(op)))
    }

    /// `@computed.<id>...` reads another computed field; anything else reads
    /// the entity.
    fn read_reference(&self, reference: &str) -> Result<Value, EvalError> {
        if let Some(computed) = self.scope.computed {
            let concrete = path::concretize(reference, self.scope.context)?;
            let segments = path::parse_segments(&concrete);
            if let [PathSegment::Key(root), PathSegment::Key(field_id), rest @ ..] =
                segments.as_slice()
            {
                if root == COMPUTED_ROOT {
                    return match computed.get(field_id) {
                        Some(ComputedValue::Value(json)) => Ok(rest
                            .iter()
                            .fold(Value::from(json), |current, segment| {
                                current.member(&segment.to_string())
                            })),
                        Some(ComputedValue::Failed(_)) => {
                            Err(EvalError::UpstreamFailed(field_id.clone()))
                        }
                        None => Ok(Value::Undefined),
                    };
                }
            }
        }
        let resolved = path::resolve(self.scope.entity, reference, self.scope.context)?;
        Ok(Value::from_resolved(resolved))
    }
}

fn arithmetic_operand(value: Value, operation: &str) -> Result<f64, EvalError> {
    match value {
        Value::Undefined => Err(EvalError::UndefinedOperand {
            operation: operation.to_string(),
        }),
        other => other
            .as_arithmetic_number()
            .ok_or_else(|| EvalError::type_mismatch(operation, "number", other)),
    }
}

fn checked_divide(a: f64, b: f64) -> Result<f64, EvalError> {
    if b == 0.0 {
        Err(EvalError::DivisionByZero)
    } else {
        Ok(a / b)
    }
}

fn checked_modulo(a: f64, b: f64) -> Result<f64, EvalError> {
    if b == 0.0 {
        Err(EvalError::DivisionByZero)
    } else {
        Ok(a % b)
    }
}
