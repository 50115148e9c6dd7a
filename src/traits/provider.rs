// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::Document;
use crate::errors::ProviderError;

/// A source of declaration documents, addressed by module path.
///
/// Providers do all the I/O; everything after [`DocumentProvider::fetch`] works on
/// parsed documents only.
pub trait DocumentProvider: Send + Sync {
    /// Name used in diagnostics for problems that belong to no single document.
    fn name(&self) -> &str;

    /// Every module path this provider can supply.
    fn modules(&self) -> Result<Vec<String>, ProviderError>;

    /// Fetch and parse one module; `None` when the provider has no such module.
    fn fetch(&self, module: &str) -> Option<Result<Document, ProviderError>>;
}
