use crate::value::{Value, format_number};
use std::fmt;

/// A parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    /// `@path`, possibly containing `{{index}}`.
    Reference(String),
    /// A local bound by `reduce` (`acc`, `item`, `index`) with member access.
    Variable {
        name: String,
        members: Vec<String>,
    },
    Template(Vec<TemplateSegment>),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Conditional {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
    Call {
        function: String,
        arguments: Vec<Expression>,
    },
    Reduce {
        collection: Box<Expression>,
        initial: Box<Expression>,
        body: Box<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    Text(String),
    Expr(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 2,
            BinaryOp::And => 3,
            BinaryOp::Equal | BinaryOp::NotEqual => 4,
            BinaryOp::Less | BinaryOp::LessOrEqual | BinaryOp::Greater | BinaryOp::GreaterOrEqual => 5,
            BinaryOp::Add | BinaryOp::Subtract => 6,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 7,
        }
    }
}

const CONDITIONAL_PRECEDENCE: u8 = 1;
const UNARY_PRECEDENCE: u8 = 8;

impl Expression {
    /// Recursively collects every `@path` the expression reads, in order of
    /// first appearance.
    pub fn collect_references(&self, out: &mut Vec<String>) {
        match self {
            Expression::Reference(path) => {
                if !out.contains(path) {
                    out.push(path.clone());
                }
            }
            Expression::Literal(_) | Expression::Variable { .. } => {}
            Expression::Template(segments) => {
                for segment in segments {
                    if let TemplateSegment::Expr(expr) = segment {
                        expr.collect_references(out);
                    }
                }
            }
            Expression::Unary { operand, .. } => operand.collect_references(out),
            Expression::Binary { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.collect_references(out);
                then_branch.collect_references(out);
                else_branch.collect_references(out);
            }
            Expression::Call { arguments, .. } => {
                for argument in arguments {
                    argument.collect_references(out);
                }
            }
            Expression::Reduce {
                collection,
                initial,
                body,
            } => {
                collection.collect_references(out);
                initial.collect_references(out);
                body.collect_references(out);
            }
        }
    }

    pub fn references(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn precedence(&self) -> u8 {
        match self {
            Expression::Conditional { .. } => CONDITIONAL_PRECEDENCE,
            Expression::Binary { op, .. } => op.precedence(),
            Expression::Unary { .. } => UNARY_PRECEDENCE,
            _ => u8::MAX,
        }
    }

    fn fmt_with_parent(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        if self.precedence() < parent {
            write!(f, "(")?;
            self.fmt_inner(f)?;
            write!(f, ")")
        } else {
            self.fmt_inner(f)
        }
    }

    fn fmt_inner(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => fmt_literal(value, f),
            Expression::Reference(path) => write!(f, "@{}", path),
            Expression::Variable { name, members } => {
                write!(f, "{}", name)?;
                for member in members {
                    write!(f, ".{}", member)?;
                }
                Ok(())
            }
            Expression::Template(segments) => {
                write!(f, "`")?;
                for segment in segments {
                    match segment {
                        TemplateSegment::Text(text) => write!(
                            f,
                            "{}",
                            text.replace('\\', "\\\\")
                                .replace('`', "\\`")
                                .replace("${", "\\${")
                        )?,
                        TemplateSegment::Expr(expr) => write!(f, "${{{}}}", expr)?,
                    }
                }
                write!(f, "`")
            }
            Expression::Unary { op, operand } => {
                match op {
                    UnaryOp::Not => write!(f, "!")?,
                    UnaryOp::Negate => write!(f, "-")?,
                }
                operand.fmt_with_parent(f, UNARY_PRECEDENCE)
            }
            Expression::Binary { op, left, right } => {
                let precedence = op.precedence();
                left.fmt_with_parent(f, precedence)?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_with_parent(f, precedence + 1)
            }
            Expression::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.fmt_with_parent(f, CONDITIONAL_PRECEDENCE + 1)?;
                write!(f, " ? ")?;
                then_branch.fmt_with_parent(f, CONDITIONAL_PRECEDENCE)?;
                write!(f, " : ")?;
                else_branch.fmt_with_parent(f, CONDITIONAL_PRECEDENCE)
            }
            Expression::Call {
                function,
                arguments,
            } => {
                write!(f, "{}(", function)?;
                fmt_arguments(f, arguments.iter())?;
                write!(f, ")")
            }
            Expression::Reduce {
                collection,
                initial,
                body,
            } => {
                write!(f, "reduce(")?;
                fmt_arguments(f, [collection, initial, body].into_iter().map(|e| &**e))?;
                write!(f, ")")
            }
        }
    }
}

fn fmt_arguments<'e>(
    f: &mut fmt::Formatter<'_>,
    arguments: impl Iterator<Item = &'e Expression>,
) -> fmt::Result {
    for (i, argument) in arguments.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", argument)?;
    }
    Ok(())
}

fn fmt_literal(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Value::Number(n) => write!(f, "{}", format_number(*n)),
        other => write!(f, "{}", other),
    }
}

/// Canonical source text with only the parentheses precedence requires.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_parent(f, 0)
    }
}
