// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default limit on nested trait obligations and nested evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 32;
/// Smallest accepted `resolver.max_depth`.
pub const MIN_MAX_DEPTH: usize = 4;
/// Largest accepted `resolver.max_depth`.
pub const MAX_MAX_DEPTH: usize = 1024;

/// Project settings file looked up in the project root.
pub const DEFAULT_CONFIG_FILE: &str = "permute.toml";
/// File extensions recognised as declaration documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["yaml", "yml"];
/// Origin reported for diagnostics inside the bundled prelude.
pub const PRELUDE_ORIGIN: &str = "<prelude>";
