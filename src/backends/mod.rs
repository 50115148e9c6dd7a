// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Document provider backends.
//!
//! Each backend implements [`DocumentProvider`](crate::traits::DocumentProvider) and maps
//! module paths to parsed documents:
//!
//! - **Directory**: YAML files below a project root, one module per file.
//! - **Memory**: YAML text registered in code; used by tests and embedders.
//!
//! ```rust
//! use permute::backends::MemoryProvider;
//! use permute::traits::DocumentProvider;
//!
//! let mut provider = MemoryProvider::new("inline");
//! provider.insert("shop::money", "permute: { version: \"0.1\", type: struct }\n");
//! let doc = provider.fetch("shop::money").unwrap().unwrap();
//! assert_eq!(doc.module, "shop::money");
//! ```

mod filesystem;
mod memory;

pub use filesystem::DirectoryProvider;
pub use memory::MemoryProvider;
