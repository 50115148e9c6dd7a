// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Project settings read from `permute.toml`.
//!
//! Every section is optional:
//!
//! ```toml
//! [project]
//! root = "."
//! entries = ["example1::main"]
//!
//! [logging]
//! level = "info"
//! format = "text"
//!
//! [output]
//! format = "json"
//! pretty = true
//!
//! [resolver]
//! max_depth = 32
//! ```

use super::consts::{DEFAULT_MAX_DEPTH, MAX_MAX_DEPTH, MIN_MAX_DEPTH};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub project: ProjectSection,
    pub logging: LoggingSection,
    pub output: OutputSection,
    pub resolver: ResolverSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSection {
    /// Directory documents are discovered in, relative to the settings file.
    pub root: PathBuf,
    /// Module paths of the process documents to bind; empty binds every `main` document.
    pub entries: Vec<String>,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            entries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(ConfigError::Invalid {
                key: "output.format".to_string(),
                reason: format!("unknown format '{}', expected json or yaml", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            pretty: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverSection {
    /// Limit on nested trait obligations and nested const evaluation.
    pub max_depth: usize,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ProjectConfig {
    /// Parse settings text and check value ranges.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: ProjectConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let depth = self.resolver.max_depth;
        if !(MIN_MAX_DEPTH..=MAX_MAX_DEPTH).contains(&depth) {
            return Err(ConfigError::Invalid {
                key: "resolver.max_depth".to_string(),
                reason: format!(
                    "{} is outside {}..={}",
                    depth, MIN_MAX_DEPTH, MAX_MAX_DEPTH
                ),
            });
        }
        Ok(())
    }
}

/// Load project settings from `path`.
pub fn load_project_config<P: AsRef<Path>>(path: P) -> Result<ProjectConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ProjectConfig::from_toml(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_settings_take_defaults() {
        let config = ProjectConfig::from_toml("", Path::new("permute.toml")).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.resolver.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.project.root, PathBuf::from("."));
    }

    #[test]
    fn loads_every_section_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[project]
root = "docs"
entries = ["example1::main"]

[logging]
level = "permute=debug"
format = "json"

[output]
format = "yaml"
pretty = false

[resolver]
max_depth = 64
"#
        )
        .unwrap();
        let config = load_project_config(file.path()).unwrap();
        assert_eq!(config.project.root, PathBuf::from("docs"));
        assert_eq!(config.project.entries, vec!["example1::main"]);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.output.format, OutputFormat::Yaml);
        assert!(!config.output.pretty);
        assert_eq!(config.resolver.max_depth, 64);
    }

    #[test]
    fn rejects_out_of_range_depth_and_unknown_keys() {
        let shallow = ProjectConfig::from_toml("[resolver]\nmax_depth = 1", Path::new("p.toml"));
        assert!(matches!(shallow, Err(ConfigError::Invalid { ref key, .. }) if key == "resolver.max_depth"));

        let unknown = ProjectConfig::from_toml("[output]\ncolour = true", Path::new("p.toml"));
        assert!(matches!(unknown, Err(ConfigError::Parse { .. })));

        let missing = load_project_config("/definitely/not/here/permute.toml");
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("YAML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
