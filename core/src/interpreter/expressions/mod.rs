//! Expression parsing and evaluation
//!
//! Statement operands are free-form expression text. This module parses that
//! text with a PEST grammar plus a Pratt parser for operator precedence, and
//! evaluates the result against an [`Environment`].

use std::collections::HashMap;
use std::rc::Rc;

use lazy_static::lazy_static;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

use super::env::Environment;
use super::errors::FaultKind;
use super::types::Value;

pub mod builtins;
pub mod eval;

#[cfg(test)]
mod tests;

pub use builtins::{sort_values, Builtin};
pub use eval::{assign, call_named, call_value, evaluate, evaluate_all};

/* ===================== Expression AST ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }
}

/// Parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        value: Box<Expr>,
        lo: Option<Box<Expr>>,
        hi: Option<Box<Expr>>,
    },
    Field {
        value: Box<Expr>,
        field: String,
    },
}

/* ===================== PEST Parser ===================== */

lazy_static! {
    // Precedence is listed lowest to highest.
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::prefix(Rule::not))
        .op(
            Op::infix(Rule::eq, Assoc::Left)
                | Op::infix(Rule::ne, Assoc::Left)
                | Op::infix(Rule::lt, Assoc::Left)
                | Op::infix(Rule::le, Assoc::Left)
                | Op::infix(Rule::gt, Assoc::Left)
                | Op::infix(Rule::ge, Assoc::Left)
                | Op::infix(Rule::in_op, Assoc::Left)
                | Op::infix(Rule::not_in, Assoc::Left)
        )
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(
            Op::infix(Rule::mul, Assoc::Left)
                | Op::infix(Rule::div, Assoc::Left)
                | Op::infix(Rule::floor_div, Assoc::Left)
                | Op::infix(Rule::modulo, Assoc::Left)
        )
        .op(Op::prefix(Rule::neg) | Op::prefix(Rule::pos))
        .op(Op::infix(Rule::pow, Assoc::Right))
        .op(
            Op::postfix(Rule::call_op)
                | Op::postfix(Rule::slice_op)
                | Op::postfix(Rule::index_op)
                | Op::postfix(Rule::field_op)
        );
}

#[derive(Parser)]
#[grammar = "interpreter/expressions/expr.pest"]
struct ExpressionParser;

type PestError = pest::error::Error<Rule>;

fn build_error(pair: &Pair<Rule>, message: &str) -> PestError {
    pest::error::Error::new_from_span(
        pest::error::ErrorVariant::CustomError {
            message: message.to_string(),
        },
        pair.as_span(),
    )
}

fn first_inner<'i>(pair: &Pair<'i, Rule>) -> Result<Pair<'i, Rule>, PestError> {
    pair.clone()
        .into_inner()
        .next()
        .ok_or_else(|| build_error(pair, "missing expected pair in rule"))
}

/// Parse expression text into an [`Expr`]
pub fn parse_expression(text: &str) -> Result<Expr, FaultKind> {
    let syntax_error = |message: String| FaultKind::Syntax {
        expr: text.to_string(),
        message,
    };

    let mut pairs = ExpressionParser::parse(Rule::main, text)
        .map_err(|err| syntax_error(err.variant.message().to_string()))?;
    let main = pairs
        .next()
        .ok_or_else(|| syntax_error("empty expression".to_string()))?;
    build_expr(main).map_err(|err| syntax_error(err.variant.message().to_string()))
}

fn build_expr(pair: Pair<Rule>) -> Result<Expr, PestError> {
    match pair.as_rule() {
        Rule::main | Rule::slice_lo | Rule::slice_hi => build_expr(first_inner(&pair)?),

        Rule::expression => PRATT_PARSER
            .map_primary(build_expr)
            .map_prefix(|op, rhs| {
                let op = match op.as_rule() {
                    Rule::neg => UnaryOp::Neg,
                    Rule::pos => UnaryOp::Pos,
                    Rule::not => UnaryOp::Not,
                    _ => return Err(build_error(&op, "unknown prefix operator")),
                };
                Ok(Expr::Unary {
                    op,
                    expr: Box::new(rhs?),
                })
            })
            .map_infix(|lhs, op, rhs| {
                let op = match op.as_rule() {
                    Rule::or => BinaryOp::Or,
                    Rule::and => BinaryOp::And,
                    Rule::eq => BinaryOp::Eq,
                    Rule::ne => BinaryOp::Ne,
                    Rule::lt => BinaryOp::Lt,
                    Rule::le => BinaryOp::Le,
                    Rule::gt => BinaryOp::Gt,
                    Rule::ge => BinaryOp::Ge,
                    Rule::in_op => BinaryOp::In,
                    Rule::not_in => BinaryOp::NotIn,
                    Rule::add => BinaryOp::Add,
                    Rule::sub => BinaryOp::Sub,
                    Rule::mul => BinaryOp::Mul,
                    Rule::div => BinaryOp::Div,
                    Rule::floor_div => BinaryOp::FloorDiv,
                    Rule::modulo => BinaryOp::Mod,
                    Rule::pow => BinaryOp::Pow,
                    _ => return Err(build_error(&op, "unknown binary operator")),
                };
                Ok(Expr::Binary {
                    op,
                    left: Box::new(lhs?),
                    right: Box::new(rhs?),
                })
            })
            .map_postfix(|lhs, op| match op.as_rule() {
                Rule::call_op => {
                    let args = op.into_inner().map(build_expr).collect::<Result<_, _>>()?;
                    Ok(Expr::Call {
                        callee: Box::new(lhs?),
                        args,
                    })
                }
                Rule::index_op => Ok(Expr::Index {
                    value: Box::new(lhs?),
                    index: Box::new(build_expr(first_inner(&op)?)?),
                }),
                Rule::slice_op => {
                    let mut lo = None;
                    let mut hi = None;
                    for bound in op.into_inner() {
                        let is_lo = bound.as_rule() == Rule::slice_lo;
                        let expr = Some(Box::new(build_expr(bound)?));
                        if is_lo {
                            lo = expr;
                        } else {
                            hi = expr;
                        }
                    }
                    Ok(Expr::Slice {
                        value: Box::new(lhs?),
                        lo,
                        hi,
                    })
                }
                Rule::field_op => Ok(Expr::Field {
                    value: Box::new(lhs?),
                    field: first_inner(&op)?.as_str().to_string(),
                }),
                _ => Err(build_error(&op, "unknown postfix operator")),
            })
            .parse(pair.into_inner()),

        Rule::list => {
            let items = pair.into_inner().map(build_expr).collect::<Result<_, _>>()?;
            Ok(Expr::List(items))
        }

        Rule::dict => {
            let mut entries = Vec::new();
            for entry in pair.into_inner() {
                let mut parts = entry.clone().into_inner();
                let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                    return Err(build_error(&entry, "dict entry needs a key and a value"));
                };
                entries.push((build_expr(key)?, build_expr(value)?));
            }
            Ok(Expr::Dict(entries))
        }

        Rule::integer => pair
            .as_str()
            .parse::<i64>()
            .map(|n| Expr::Literal(Value::Int(n)))
            .map_err(|_| build_error(&pair, "integer literal out of range")),

        Rule::float => pair
            .as_str()
            .parse::<f64>()
            .map(|x| Expr::Literal(Value::Float(x)))
            .map_err(|_| build_error(&pair, "invalid float literal")),

        Rule::string => {
            let inner = first_inner(&pair)?;
            Ok(Expr::Literal(Value::Str(unescape(inner.as_str()))))
        }

        Rule::boolean => Ok(Expr::Literal(Value::Bool(matches!(
            pair.as_str(),
            "True" | "true"
        )))),

        Rule::none => Ok(Expr::Literal(Value::None)),

        Rule::ident => Ok(Expr::Name(pair.as_str().to_string())),

        _ => Err(build_error(&pair, "unexpected expression element")),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/* ===================== Cache ===================== */

/// Parsed expressions keyed by their source text
///
/// Loop bodies evaluate the same operand text many times; each is parsed once per run.
#[derive(Debug, Default)]
pub struct ExprCache {
    parsed: HashMap<String, Rc<Expr>>,
}

impl ExprCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, text: &str) -> Result<Rc<Expr>, FaultKind> {
        if let Some(expr) = self.parsed.get(text) {
            return Ok(Rc::clone(expr));
        }
        let expr = Rc::new(parse_expression(text)?);
        self.parsed.insert(text.to_string(), Rc::clone(&expr));
        Ok(expr)
    }

    pub fn len(&self) -> usize {
        self.parsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
    }
}

/* ===================== Literals ===================== */

/// Evaluate text that may only contain literals: numbers, strings, booleans,
/// None, lists and dicts of those, with unary signs on numbers
pub fn literal_eval(text: &str) -> Result<Value, FaultKind> {
    let expr = parse_expression(text)?;
    if !is_literal(&expr) {
        return Err(FaultKind::Value(format!("malformed literal: {}", text)));
    }
    evaluate(&expr, &mut Environment::new())
}

fn is_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) => true,
        Expr::List(items) => items.iter().all(is_literal),
        Expr::Dict(entries) => entries.iter().all(|(k, v)| is_literal(k) && is_literal(v)),
        Expr::Unary {
            op: UnaryOp::Neg | UnaryOp::Pos,
            expr,
        } => matches!(**expr, Expr::Literal(Value::Int(_) | Value::Float(_))),
        _ => false,
    }
}
