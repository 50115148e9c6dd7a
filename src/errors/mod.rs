// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod diagnostic;
mod evaluation;

pub use config::{ConfigError, ProviderError};
pub use diagnostic::{Diagnostic, ErrorKind, Location, Namespace};
pub use evaluation::{EvalError, ParseError};
