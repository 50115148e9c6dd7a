// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Diagnostics reported while loading declarations, validating parameters and binding pipelines.
//!
//! Every diagnostic carries the [`Location`] of the declaration it originates from: the
//! document it was read from plus the field path inside that document.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Where a diagnostic originates: a document and a field path inside it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub document: String,
    pub path: Vec<String>,
}

impl Location {
    /// Location pointing at a whole document.
    pub fn document(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            path: Vec::new(),
        }
    }

    /// A new location one segment deeper than `self`.
    pub fn at(&self, segment: impl Into<String>) -> Self {
        let mut path = self.path.clone();
        path.push(segment.into());
        Self {
            document: self.document.clone(),
            path,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.document)
        } else {
            write!(f, "{}: {}", self.document, self.path.join("."))
        }
    }
}

/// Namespace a declaration name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Types, traits, components and imported module aliases.
    Type,
    Extension,
    Module,
    Impl,
    Binding,
    Method,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Namespace::Type => "type",
            Namespace::Extension => "extension",
            Namespace::Module => "module",
            Namespace::Impl => "impl",
            Namespace::Binding => "binding",
            Namespace::Method => "method",
        };
        f.write_str(name)
    }
}

/// The kind of fault a [`Diagnostic`] reports.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("duplicate {namespace} declaration '{name}'")]
    DuplicateDeclaration { name: String, namespace: Namespace },

    #[error("unknown import '{path}'")]
    UnknownImport { path: String },

    #[error("'{ty}' does not implement '{trait_ref}'")]
    NotImplemented { ty: String, trait_ref: String },

    #[error("no method '{method}' on '{ty}'")]
    NoMethod { ty: String, method: String },

    #[error("ambiguous {subject}: candidates are {}{}", .candidates.join(", "), qualification_hint(.requires_qualification))]
    Ambiguous {
        subject: String,
        candidates: Vec<String>,
        requires_qualification: bool,
    },

    #[error("missing required parameter '{field}'")]
    MissingRequiredParam { field: String },

    #[error("unknown parameter '{field}'")]
    UnknownParam { field: String },

    #[error("type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },

    #[error("check on '{field}' failed: {predicate}")]
    CheckViolation { field: String, predicate: String },

    #[error("check failed: {predicate}")]
    CrossFieldCheckViolation { predicate: String },

    #[error("unresolved reference '{name}'")]
    UnresolvedReference { name: String },

    #[error("cyclic binding: {} -> {}", .names.join(" -> "), .names.first().map(String::as_str).unwrap_or(""))]
    CyclicBinding { names: Vec<String> },

    #[error("'{producer}' cannot feed '{consumer}': {reason}")]
    PipelineTypeError {
        producer: String,
        consumer: String,
        reason: String,
    },

    #[error("invalid declaration: {reason}")]
    InvalidDeclaration { reason: String },

    #[error("invalid expression '{source_text}': {reason}")]
    InvalidExpression { source_text: String, reason: String },

    #[error("aborted: {reason}")]
    Aborted { reason: String },

    #[error("cannot read document: {reason}")]
    Io { reason: String },

    #[error("cannot parse document: {reason}")]
    Parse { reason: String },
}

fn qualification_hint(required: &bool) -> &'static str {
    if *required {
        " (qualify the call)"
    } else {
        ""
    }
}

impl ErrorKind {
    /// An abort raised by declared code ends processing of the document.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ErrorKind::Aborted { .. })
    }
}

/// A located fault.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{location}: {kind}")]
pub struct Diagnostic {
    pub location: Location,
    pub kind: ErrorKind,
}

impl Diagnostic {
    pub fn new(location: Location, kind: ErrorKind) -> Self {
        Self { location, kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display_includes_field_path() {
        let location = Location::document("example1::main").at("let").at("out");
        assert_eq!(location.to_string(), "example1::main: let.out");
        assert_eq!(Location::document("doc").to_string(), "doc");
    }

    #[test]
    fn cyclic_binding_display_closes_the_cycle() {
        let kind = ErrorKind::CyclicBinding {
            names: vec!["a".into(), "b".into(), "c".into()],
        };
        assert_eq!(kind.to_string(), "cyclic binding: a -> b -> c -> a");
    }

    #[test]
    fn ambiguous_display_mentions_qualification() {
        let kind = ErrorKind::Ambiguous {
            subject: "method 'fmt'".into(),
            candidates: vec!["inherent Monetary".into(), "extension Pretty".into()],
            requires_qualification: true,
        };
        let text = kind.to_string();
        assert!(text.contains("inherent Monetary, extension Pretty"));
        assert!(text.contains("qualify"));
    }

    #[test]
    fn only_aborts_are_terminal() {
        assert!(ErrorKind::Aborted { reason: "x".into() }.is_terminal());
        assert!(!ErrorKind::UnknownImport { path: "a".into() }.is_terminal());
    }
}
