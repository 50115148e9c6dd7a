// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The small expression language used for defaults, checks, binding fields and method
//! bodies.

pub mod eval;
pub mod lexer;
mod parser;
pub mod value;

pub use eval::{Env, Evaluator};
pub use parser::parse_expr;
pub use value::Value;

use crate::errors::ParseError;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
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
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Literal),
    Ident(String),
    SelfValue,
    /// Two or more segments: `Color::Red`, `example1::Monetary`.
    Path(Vec<String>),
    Field {
        base: Box<Expr>,
        name: String,
        optional: bool,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        optional: bool,
    },
    /// `Some(x)`, `RowSequence::new(1)`, `Pretty::fmt(m)`.
    Call {
        callee: Vec<String>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    List(Vec<Expr>),
    StructLit {
        path: Vec<String>,
        fields: Vec<(String, Expr)>,
    },
    /// Callable that stays unevaluated; its body only contributes captured names.
    Closure {
        params: Vec<String>,
        body: Box<Expr>,
        source: String,
    },
}

impl Expr {
    /// Identifiers read by this expression that are not bound inside it.
    pub fn free_idents(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_idents(&mut out);
        out
    }

    fn collect_idents(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Ident(name) => {
                out.insert(name.clone());
            }
            Expr::Field { base, .. } => base.collect_idents(out),
            Expr::MethodCall { receiver, args, .. } => {
                receiver.collect_idents(out);
                args.iter().for_each(|a| a.collect_idents(out));
            }
            Expr::Call { args, .. } => args.iter().for_each(|a| a.collect_idents(out)),
            Expr::Unary { expr, .. } => expr.collect_idents(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_idents(out);
                rhs.collect_idents(out);
            }
            Expr::List(items) => items.iter().for_each(|i| i.collect_idents(out)),
            Expr::StructLit { fields, .. } => {
                fields.iter().for_each(|(_, e)| e.collect_idents(out))
            }
            Expr::Closure { params, body, .. } => out.extend(
                body.free_idents()
                    .into_iter()
                    .filter(|name| !params.contains(name)),
            ),
            Expr::Lit(_) | Expr::SelfValue | Expr::Path(_) => {}
        }
    }

    /// True when the expression contains only literal leaves.
    pub fn is_literal(&self) -> bool {
        match self {
            Expr::Lit(_) => true,
            Expr::Unary { expr, .. } => expr.is_literal(),
            Expr::List(items) => items.iter().all(Expr::is_literal),
            _ => false,
        }
    }
}

/// An expression together with the text it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub source: String,
    pub expr: Expr,
}

impl Snippet {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        Ok(Self {
            source: source.trim().to_string(),
            expr: parse_expr(source)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_idents_skip_paths_and_closure_params() {
        let snippet = Snippet::parse("header.len() == write.len() && Mode::Fast != mode").unwrap();
        let idents: Vec<_> = snippet.expr.free_idents().into_iter().collect();
        assert_eq!(idents, vec!["header", "mode", "write"]);

        let closure = Snippet::parse("[|csv, rec| csv.put(rec.id)]").unwrap();
        assert!(closure.expr.free_idents().is_empty());

        let capturing = Snippet::parse("[|r| r.width + other.width, |a| |b| a + b + c]").unwrap();
        let idents: Vec<_> = capturing.expr.free_idents().into_iter().collect();
        assert_eq!(idents, vec!["c", "other"]);
    }

    #[test]
    fn literal_detection() {
        assert!(parse_expr("-3").unwrap().is_literal());
        assert!(parse_expr("[1, 2]").unwrap().is_literal());
        assert!(!parse_expr("x + 1").unwrap().is_literal());
    }
}
