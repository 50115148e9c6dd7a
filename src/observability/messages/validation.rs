// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for parameter validation.
//!
//! This module contains message types for logging events related to:
//! * Schema validation of a binding's parameters
//! * Defaults and implicit conversions applied to parameters
//! * Checks that can only be decided at run time

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Validation of one binding's parameters started.
///
/// # Log Level
/// `debug!` - Detailed progress
pub struct ValidationStarted<'a> {
    pub component: &'a str,
    pub supplied_count: usize,
}

impl Display for ValidationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Validating {} supplied parameters against '{}'",
            self.supplied_count, self.component
        )
    }
}

impl StructuredLog for ValidationStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            component = self.component,
            supplied_count = self.supplied_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::DEBUG,
            "span_name",
            name = name,
            component = self.component,
        )
    }
}

/// A missing parameter took its declared default.
///
/// # Log Level
/// `debug!` - Detailed progress
///
/// # Example
/// ```
/// use permute::observability::messages::validation::DefaultApplied;
///
/// let msg = DefaultApplied {
///     component: "example1::Csv",
///     field: "header",
///     default: "[]",
/// };
/// assert_eq!(msg.to_string(), "example1::Csv.header defaulted to `[]`");
/// ```
pub struct DefaultApplied<'a> {
    pub component: &'a str,
    pub field: &'a str,
    pub default: &'a str,
}

impl Display for DefaultApplied<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}.{} defaulted to `{}`",
            self.component, self.field, self.default
        )
    }
}

impl StructuredLog for DefaultApplied<'_> {
    fn log(&self) {
        tracing::debug!(
            component = self.component,
            field = self.field,
            default = self.default,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::DEBUG,
            "span_name",
            name = name,
            component = self.component,
            field = self.field,
        )
    }
}

/// A supplied value was converted to the parameter type.
///
/// # Log Level
/// `debug!` - Detailed progress
pub struct CoercionApplied<'a> {
    pub field: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    pub via: &'a str,
}

impl Display for CoercionApplied<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Parameter '{}' converted from {} to {} via {}",
            self.field, self.from, self.to, self.via
        )
    }
}

impl StructuredLog for CoercionApplied<'_> {
    fn log(&self) {
        tracing::debug!(
            field = self.field,
            from = self.from,
            to = self.to,
            via = self.via,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::DEBUG,
            "span_name",
            name = name,
            field = self.field,
            via = self.via,
        )
    }
}

/// A check depends on run-time data and was handed to the executor.
///
/// # Log Level
/// `warn!` - Potential issue or degraded behavior
pub struct RuntimeCheckDeferred<'a> {
    pub component: &'a str,
    pub predicate: &'a str,
}

impl Display for RuntimeCheckDeferred<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Check `{}` on '{}' depends on run-time values and is deferred to execution",
            self.predicate, self.component
        )
    }
}

impl StructuredLog for RuntimeCheckDeferred<'_> {
    fn log(&self) {
        tracing::warn!(
            component = self.component,
            predicate = self.predicate,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::WARN,
            "span_name",
            name = name,
            component = self.component,
            predicate = self.predicate,
        )
    }
}

/// Validation of a binding's parameters failed.
///
/// # Log Level
/// `debug!` - the diagnostics themselves are reported to the caller
pub struct ValidationFailed<'a> {
    pub component: &'a str,
    pub error_count: usize,
}

impl Display for ValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Parameters of '{}' failed validation with {} errors",
            self.component, self.error_count
        )
    }
}

impl StructuredLog for ValidationFailed<'_> {
    fn log(&self) {
        tracing::debug!(
            component = self.component,
            error_count = self.error_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::DEBUG,
            "span_name",
            name = name,
            component = self.component,
            error_count = self.error_count,
        )
    }
}
