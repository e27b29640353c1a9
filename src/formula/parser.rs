use super::ast::{BinaryOp, Expression, TemplateSegment, UnaryOp};
use super::lexer::{Token, tokenize};
use crate::error::ParseError;
use crate::value::Value;
use std::ops::Range;

pub type ParseResult<T> = Result<T, ParseError>;

/// Deepest expression nesting a formula may have. Evaluation recurses over
/// the tree, so this also bounds the evaluator's stack use.
pub const MAX_NESTING: usize = 256;

/// Parses a complete formula.
pub fn parse(source: &str) -> ParseResult<Expression> {
    let mut parser = Parser::new(source)?;
    parser.parse_formula()
}

/// Recursive descent parser; one method per precedence level.
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    current: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            current: 0,
            depth: 0,
        })
    }

    pub fn parse_formula(&mut self) -> ParseResult<Expression> {
        let expr = self.parse_expression()?;
        match self.tokens.get(self.current) {
            None => Ok(expr),
            Some((token, span)) => Err(ParseError::unexpected_token(
                span.start,
                "end of formula",
                token.to_string(),
            )),
        }
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.nested(0, Self::parse_conditional)
    }

    /// Runs `parse` one level deeper, plus `extra` levels the caller has
    /// already built, failing once the tree would exceed `MAX_NESTING`.
    fn nested<T>(
        &mut self,
        extra: usize,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.depth + extra >= MAX_NESTING {
            return Err(ParseError::invalid_syntax(
                self.position(),
                "formula nested too deeply",
            ));
        }
        self.depth += 1 + extra;
        let result = parse(self);
        self.depth -= 1 + extra;
        result
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.current)
            .map_or(self.source.len(), |(_, span)| span.start)
    }

    fn parse_conditional(&mut self) -> ParseResult<Expression> {
        let condition = self.parse_binary(BinaryOp::Or.precedence())?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let then_branch = self.parse_expression()?;
        self.expect(&Token::Colon, "':'")?;
        let else_branch = self.parse_expression()?;
        Ok(Expression::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    /// Precedence climbing over the left-associative binary operators.
    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<Expression> {
        let mut left = self.parse_unary()?;
        // Each loop iteration deepens the left spine by one.
        let mut chain = 0;
        while let Some(op) = self.peek().and_then(binary_op) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            chain += 1;
            let right = self.nested(chain, |parser| parser.parse_binary(precedence + 1))?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Negate,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.nested(0, Self::parse_unary)?;
        Ok(Expression::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let Some((token, span)) = self.tokens.get(self.current).cloned() else {
            return Err(ParseError::UnexpectedEof {
                pos: self.source.len(),
            });
        };
        self.advance();

        match token {
            Token::Number(text) => text
                .parse::<f64>()
                .map(|n| Expression::Literal(Value::Number(n)))
                .map_err(|_| ParseError::invalid_syntax(span.start, "malformed number")),
            Token::String(raw) => Ok(Expression::Literal(Value::String(unescape(
                &raw[1..raw.len() - 1],
            )))),
            Token::Template(raw) => parse_template(&raw[1..raw.len() - 1], span.start + 1),
            Token::True => Ok(Expression::Literal(Value::Bool(true))),
            Token::False => Ok(Expression::Literal(Value::Bool(false))),
            Token::Null => Ok(Expression::Literal(Value::Null)),
            Token::Path(path) => Ok(Expression::Reference(path.to_string())),
            Token::LParen => {
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            Token::Ident(name) => self.parse_identifier(name, span.start),
            other => Err(ParseError::unexpected_token(
                span.start,
                "expression",
                other.to_string(),
            )),
        }
    }

    /// A call (`round(x)`, `Math.round(x)`) or a local variable (`item.weight`).
    fn parse_identifier(&mut self, first: &'src str, start: usize) -> ParseResult<Expression> {
        let mut names = vec![first.to_string()];
        while self.peek() == Some(&Token::Dot) {
            match self.tokens.get(self.current + 1) {
                Some((Token::Ident(name), _)) => {
                    names.push(name.to_string());
                    self.current += 2;
                }
                Some((token, span)) => {
                    return Err(ParseError::unexpected_token(
                        span.start,
                        "member name",
                        token.to_string(),
                    ));
                }
                None => {
                    return Err(ParseError::UnexpectedEof {
                        pos: self.source.len(),
                    });
                }
            }
        }

        if !self.eat(&Token::LParen) {
            let name = names.remove(0);
            return Ok(Expression::Variable {
                name,
                members: names,
            });
        }

        let function = match names.as_slice() {
            [name] => name.clone(),
            [namespace, name] if namespace == "Math" => name.clone(),
            _ => {
                return Err(ParseError::invalid_syntax(
                    start,
                    format!("'{}' is not a callable function", names.join(".")),
                ));
            }
        };
        let arguments = self.parse_arguments()?;

        if function == "reduce" {
            let [collection, initial, body]: [Expression; 3] =
                arguments.try_into().map_err(|args: Vec<Expression>| {
                    ParseError::invalid_syntax(
                        start,
                        format!("reduce expects 3 arguments, but received {}", args.len()),
                    )
                })?;
            return Ok(Expression::Reduce {
                collection: Box::new(collection),
                initial: Box::new(initial),
                body: Box::new(body),
            });
        }

        Ok(Expression::Call {
            function,
            arguments,
        })
    }

    /// Arguments after an already consumed '('.
    fn parse_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let mut arguments = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen, "',' or ')'")?;
            return Ok(arguments);
        }
    }

    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.current).map(|(token, _)| token)
    }

    fn advance(&mut self) {
        self.current += 1;
    }

    fn eat(&mut self, expected: &Token<'src>) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token<'src>, description: &str) -> ParseResult<()> {
        match self.tokens.get(self.current) {
            Some((token, _)) if token == expected => {
                self.advance();
                Ok(())
            }
            Some((token, span)) => Err(ParseError::unexpected_token(
                span.start,
                description,
                token.to_string(),
            )),
            None => Err(ParseError::UnexpectedEof {
                pos: self.source.len(),
            }),
        }
    }
}

fn binary_op(token: &Token<'_>) -> Option<BinaryOp> {
    match token {
        Token::OrOr => Some(BinaryOp::Or),
        Token::AndAnd => Some(BinaryOp::And),
        Token::EqEq => Some(BinaryOp::Equal),
        Token::NotEq => Some(BinaryOp::NotEqual),
        Token::Lt => Some(BinaryOp::Less),
        Token::LtEq => Some(BinaryOp::LessOrEqual),
        Token::Gt => Some(BinaryOp::Greater),
        Token::GtEq => Some(BinaryOp::GreaterOrEqual),
        Token::Plus => Some(BinaryOp::Add),
        Token::Minus => Some(BinaryOp::Subtract),
        Token::Star => Some(BinaryOp::Multiply),
        Token::Slash => Some(BinaryOp::Divide),
        Token::Percent => Some(BinaryOp::Modulo),
        _ => None,
    }
}

/// Parses the inside of a backtick template. `offset` is the position of
/// `body` within the whole formula, for error reporting.
fn parse_template(body: &str, offset: usize) -> ParseResult<Expression> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    text.push(unescape_char(escaped));
                }
            }
            '$' if chars.peek().map(|(_, next)| *next) == Some('{') => {
                chars.next();
                let start = i + 2;
                let end = matching_brace(body, start).ok_or_else(|| {
                    ParseError::invalid_syntax(offset + i, "unterminated '${' in template")
                })?;
                let inner = parse(&body[start..end]).map_err(|e| {
                    ParseError::invalid_syntax(offset + start, format!("in template: {}", e))
                })?;
                if !text.is_empty() {
                    segments.push(TemplateSegment::Text(std::mem::take(&mut text)));
                }
                segments.push(TemplateSegment::Expr(inner));
                while chars.peek().is_some_and(|(j, _)| *j <= end) {
                    chars.next();
                }
            }
            other => text.push(other),
        }
    }

    if !text.is_empty() {
        segments.push(TemplateSegment::Text(text));
    }
    Ok(Expression::Template(segments))
}

/// Byte position of the '}' closing an expression that starts at `start`.
fn matching_brace(body: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in body[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(unescape_char(escaped));
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn unescape_char(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}
