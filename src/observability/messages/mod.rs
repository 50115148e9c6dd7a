// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for structured logging.
//!
//! Messages are organized by subsystem:
//!
//! * `store` - document collection and store loading
//! * `resolver` - trait and method resolution
//! * `validation` - parameter validation, defaults and coercions
//! * `binder` - pipeline binding and execution graph construction

pub mod binder;
pub mod resolver;
pub mod store;
pub mod validation;

use tracing::Span;

/// A log event that knows its own level and fields.
pub trait StructuredLog {
    /// Emit the event at its level with its fields attached.
    fn log(&self);

    /// A span carrying the same fields, for work done on behalf of the event.
    fn span(&self, name: &str) -> Span;
}
