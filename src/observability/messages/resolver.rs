// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for trait and method resolution.
//!
//! Resolution runs once per obligation and per call site, so everything here logs at
//! `trace!` or `debug!`.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A trait obligation was resolved.
///
/// # Log Level
/// `trace!` - Very detailed progress
///
/// # Example
/// ```
/// use permute::observability::messages::resolver::ObligationResolved;
///
/// let msg = ObligationResolved {
///     ty: "example1::Monetary",
///     trait_ref: "PartialEq",
///     outcome: "impl ConstEq for example1::Monetary",
/// };
/// assert!(msg.to_string().contains("PartialEq"));
/// ```
pub struct ObligationResolved<'a> {
    pub ty: &'a str,
    pub trait_ref: &'a str,
    pub outcome: &'a str,
}

impl Display for ObligationResolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: {} resolved to {}",
            self.ty, self.trait_ref, self.outcome
        )
    }
}

impl StructuredLog for ObligationResolved<'_> {
    fn log(&self) {
        tracing::trace!(
            ty = self.ty,
            trait_ref = self.trait_ref,
            outcome = self.outcome,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::TRACE,
            "span_name",
            name = name,
            ty = self.ty,
            trait_ref = self.trait_ref,
        )
    }
}

/// An obligation was cut off by the cycle guard or the depth limit.
///
/// # Log Level
/// `debug!` - Detailed progress
pub struct ObligationAbandoned<'a> {
    pub obligation: &'a str,
    pub depth: usize,
    pub cyclic: bool,
}

impl Display for ObligationAbandoned<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.cyclic {
            write!(f, "Obligation `{}` is cyclic, treated as unsatisfied", self.obligation)
        } else {
            write!(
                f,
                "Obligation `{}` exceeds depth {}, treated as unsatisfied",
                self.obligation, self.depth
            )
        }
    }
}

impl StructuredLog for ObligationAbandoned<'_> {
    fn log(&self) {
        tracing::debug!(
            obligation = self.obligation,
            depth = self.depth,
            cyclic = self.cyclic,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::DEBUG,
            "span_name",
            name = name,
            obligation = self.obligation,
        )
    }
}

/// A method call was resolved to a provider.
///
/// # Log Level
/// `trace!` - Very detailed progress
pub struct MethodResolved<'a> {
    pub receiver: &'a str,
    pub method: &'a str,
    pub provider: &'a str,
    pub const_capable: bool,
}

impl Display for MethodResolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}.{}() resolved to {}{}",
            self.receiver,
            self.method,
            self.provider,
            if self.const_capable { " (const)" } else { "" }
        )
    }
}

impl StructuredLog for MethodResolved<'_> {
    fn log(&self) {
        tracing::trace!(
            receiver = self.receiver,
            method = self.method,
            provider = self.provider,
            const_capable = self.const_capable,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::TRACE,
            "span_name",
            name = name,
            receiver = self.receiver,
            method = self.method,
        )
    }
}
