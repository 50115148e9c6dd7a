// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while parsing and evaluating type strings, signatures and expressions.

use super::diagnostic::ErrorKind;
use thiserror::Error;

/// A syntax error in a type string, signature or expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at offset {offset}: {message}")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Failure while evaluating an expression against the declaration store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown name '{0}'")]
    UnknownName(String),

    #[error("no method '{method}' on '{ty}'")]
    NoMethod { ty: String, method: String },

    #[error("ambiguous call to '{method}' on '{ty}', qualify with one of: {}", .candidates.join(", "))]
    AmbiguousCall {
        ty: String,
        method: String,
        candidates: Vec<String>,
    },

    #[error("{0}")]
    Type(String),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("evaluation exceeded depth {0}")]
    DepthExceeded(usize),

    /// Raised by declared code itself (`unwrap` on `None`); never recovered.
    #[error("{0}")]
    Aborted(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl EvalError {
    /// The diagnostic kind for this failure inside the expression `source_text`.
    pub fn into_kind(self, source_text: &str) -> ErrorKind {
        match self {
            EvalError::UnknownName(name) => ErrorKind::UnresolvedReference { name },
            EvalError::NoMethod { ty, method } => ErrorKind::NoMethod { ty, method },
            EvalError::AmbiguousCall {
                ty,
                method,
                candidates,
            } => ErrorKind::Ambiguous {
                subject: format!("call to '{}' on '{}'", method, ty),
                candidates,
                requires_qualification: true,
            },
            EvalError::Aborted(reason) => ErrorKind::Aborted { reason },
            other => ErrorKind::InvalidExpression {
                source_text: source_text.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_calls_need_qualification() {
        let err = EvalError::AmbiguousCall {
            ty: "Window".into(),
            method: "area".into(),
            candidates: vec!["inherent Window::area".into(), "Geo::area".into()],
        };
        assert_eq!(
            err.into_kind("w.area()"),
            ErrorKind::Ambiguous {
                subject: "call to 'area' on 'Window'".into(),
                candidates: vec!["inherent Window::area".into(), "Geo::area".into()],
                requires_qualification: true,
            }
        );
    }

    #[test]
    fn missing_methods_keep_their_receiver() {
        let err = EvalError::NoMethod {
            ty: "u32".into(),
            method: "shout".into(),
        };
        assert_eq!(
            err.into_kind("x.shout()"),
            ErrorKind::NoMethod {
                ty: "u32".into(),
                method: "shout".into()
            }
        );
        assert!(matches!(
            EvalError::DivisionByZero.into_kind("1 / 0"),
            ErrorKind::InvalidExpression { .. }
        ));
    }
}
