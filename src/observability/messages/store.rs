// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for document collection and store loading.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A document was fetched from a provider.
///
/// # Log Level
/// `debug!` - Detailed progress
pub struct DocumentFetched<'a> {
    pub module: &'a str,
    pub origin: &'a str,
    pub provider: &'a str,
}

impl Display for DocumentFetched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Fetched module '{}' from {} ({})",
            self.module, self.origin, self.provider
        )
    }
}

impl StructuredLog for DocumentFetched<'_> {
    fn log(&self) {
        tracing::debug!(
            module = self.module,
            origin = self.origin,
            provider = self.provider,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::DEBUG,
            "span_name",
            name = name,
            module = self.module,
            origin = self.origin,
        )
    }
}

/// Store loading started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use permute::observability::messages::store::StoreLoadStarted;
///
/// let msg = StoreLoadStarted { document_count: 4 };
/// assert_eq!(msg.to_string(), "Loading declaration store from 4 documents");
/// ```
pub struct StoreLoadStarted {
    pub document_count: usize,
}

impl Display for StoreLoadStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loading declaration store from {} documents",
            self.document_count
        )
    }
}

impl StructuredLog for StoreLoadStarted {
    fn log(&self) {
        tracing::info!(document_count = self.document_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            document_count = self.document_count,
        )
    }
}

/// Store loaded without diagnostics.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StoreLoaded {
    pub module_count: usize,
    pub type_count: usize,
    pub trait_count: usize,
    pub impl_count: usize,
}

impl Display for StoreLoaded {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Declaration store ready: {} modules, {} types, {} traits, {} impls",
            self.module_count, self.type_count, self.trait_count, self.impl_count
        )
    }
}

impl StructuredLog for StoreLoaded {
    fn log(&self) {
        tracing::info!(
            module_count = self.module_count,
            type_count = self.type_count,
            trait_count = self.trait_count,
            impl_count = self.impl_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            module_count = self.module_count,
            impl_count = self.impl_count,
        )
    }
}

/// Store loading produced diagnostics.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct StoreLoadFailed {
    pub error_count: usize,
}

impl Display for StoreLoadFailed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Declaration store failed to load with {} errors",
            self.error_count
        )
    }
}

impl StructuredLog for StoreLoadFailed {
    fn log(&self) {
        tracing::error!(error_count = self.error_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            error_count = self.error_count,
        )
    }
}

/// The store generated an impl the author did not write.
///
/// # Log Level
/// `debug!` - Detailed progress
pub struct ImplSynthesized<'a> {
    pub implementation: &'a str,
    pub reason: &'a str,
}

impl Display for ImplSynthesized<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Synthesized `{}` ({})", self.implementation, self.reason)
    }
}

impl StructuredLog for ImplSynthesized<'_> {
    fn log(&self) {
        tracing::debug!(
            implementation = self.implementation,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::DEBUG,
            "span_name",
            name = name,
            implementation = self.implementation,
        )
    }
}
