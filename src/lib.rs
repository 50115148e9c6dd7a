// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // document providers
pub mod config;     // document format + project settings
pub mod engine;     // pipeline binding
pub mod errors;     // diagnostics
pub mod expr;       // const expression language
pub mod observability;
pub mod resolve;    // trait and method resolution
pub mod schema;     // parameter validation
pub mod store;      // declaration store
pub mod traits;     // unified abstractions
