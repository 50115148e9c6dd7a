// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline binding.
//!
//! This module contains message types for logging events related to:
//! * Binding a process document into an execution graph
//! * Concurrent binding of several documents

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Binding of one process document started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct BindingStarted<'a> {
    pub document: &'a str,
    pub binding_count: usize,
    pub pipe_count: usize,
}

impl Display for BindingStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Binding '{}': {} bindings, {} pipes",
            self.document, self.binding_count, self.pipe_count
        )
    }
}

impl StructuredLog for BindingStarted<'_> {
    fn log(&self) {
        tracing::info!(
            document = self.document,
            binding_count = self.binding_count,
            pipe_count = self.pipe_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "binding",
            span_name = name,
            document = self.document,
            binding_count = self.binding_count,
        )
    }
}

/// A process document was bound into an execution graph.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use permute::observability::messages::binder::BindingCompleted;
/// use std::time::Duration;
///
/// let msg = BindingCompleted {
///     document: "example1/main.yaml",
///     step_count: 3,
///     duration: Duration::from_millis(2),
/// };
/// assert!(msg.to_string().starts_with("Bound 'example1/main.yaml'"));
/// ```
pub struct BindingCompleted<'a> {
    pub document: &'a str,
    pub step_count: usize,
    pub duration: Duration,
}

impl Display for BindingCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Bound '{}' into {} steps in {:?}",
            self.document, self.step_count, self.duration
        )
    }
}

impl StructuredLog for BindingCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            document = self.document,
            step_count = self.step_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "binding_completed",
            span_name = name,
            document = self.document,
            step_count = self.step_count,
        )
    }
}

/// Binding of a process document produced diagnostics.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct BindingFailed<'a> {
    pub document: &'a str,
    pub error_count: usize,
}

impl Display for BindingFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Binding '{}' failed with {} errors",
            self.document, self.error_count
        )
    }
}

impl StructuredLog for BindingFailed<'_> {
    fn log(&self) {
        tracing::error!(
            document = self.document,
            error_count = self.error_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "binding_failed",
            span_name = name,
            document = self.document,
            error_count = self.error_count,
        )
    }
}

/// Several documents are being bound concurrently.
///
/// # Log Level
/// `info!` - Important operational event
pub struct BatchBindingStarted {
    pub document_count: usize,
}

impl Display for BatchBindingStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Binding {} documents concurrently", self.document_count)
    }
}

impl StructuredLog for BatchBindingStarted {
    fn log(&self) {
        tracing::info!(document_count = self.document_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "batch_binding",
            span_name = name,
            document_count = self.document_count,
        )
    }
}
