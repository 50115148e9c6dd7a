// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors from project settings and document providers.

use std::path::PathBuf;
use thiserror::Error;

/// Failure loading `permute.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid setting '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

/// Failure fetching a document from a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{path} is outside the project root")]
    OutsideRoot { path: PathBuf },
}
