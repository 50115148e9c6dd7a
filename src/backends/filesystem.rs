// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Documents read from a project directory.
//!
//! A document's module path is its path below the root with the extension dropped and
//! separators turned into `::`, so `example1/Csv.yaml` declares `example1::Csv`.

use crate::config::consts::DOCUMENT_EXTENSIONS;
use crate::config::Document;
use crate::errors::ProviderError;
use crate::traits::DocumentProvider;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    root: PathBuf,
    name: String,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root.display().to_string();
        Self { root, name }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Module path declared by the document at `path`.
    pub fn module_for_path(&self, path: &Path) -> Result<String, ProviderError> {
        let outside = || ProviderError::OutsideRoot {
            path: path.to_path_buf(),
        };
        let relative = path.strip_prefix(&self.root).map_err(|_| outside())?;
        let mut segments = Vec::new();
        for component in relative.with_extension("").components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
                _ => return Err(outside()),
            }
        }
        if segments.is_empty() {
            return Err(outside());
        }
        Ok(segments.join("::"))
    }

    /// The file that holds `module`, if one exists.
    fn path_for_module(&self, module: &str) -> Option<PathBuf> {
        let segments: Vec<&str> = module.split("::").collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains(['/', '\\']))
        {
            return None;
        }
        let base: PathBuf = segments.iter().collect();
        DOCUMENT_EXTENSIONS
            .iter()
            .map(|ext| self.root.join(&base).with_extension(ext))
            .find(|candidate| candidate.is_file())
    }

    fn walk(&self, dir: &Path, out: &mut Vec<String>) -> Result<(), ProviderError> {
        let io = |source| ProviderError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut entries = std::fs::read_dir(dir)
            .map_err(io)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(io)?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden {
                continue;
            }
            if path.is_dir() {
                self.walk(&path, out)?;
                continue;
            }
            let is_document = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e));
            if is_document {
                out.push(self.module_for_path(&path)?);
            }
        }
        Ok(())
    }
}

impl DocumentProvider for DirectoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn modules(&self) -> Result<Vec<String>, ProviderError> {
        let mut modules = Vec::new();
        self.walk(&self.root, &mut modules)?;
        modules.dedup();
        Ok(modules)
    }

    fn fetch(&self, module: &str) -> Option<Result<Document, ProviderError>> {
        let path = self.path_for_module(module)?;
        Some(self.read(module, &path))
    }
}

impl DirectoryProvider {
    fn read(&self, module: &str, path: &Path) -> Result<Document, ProviderError> {
        let io = |source| ProviderError::Io {
            path: path.to_path_buf(),
            source,
        };
        let root = self.root.canonicalize().map_err(io)?;
        let resolved = path.canonicalize().map_err(io)?;
        if !resolved.starts_with(&root) {
            return Err(ProviderError::OutsideRoot {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(&resolved).map_err(io)?;
        let origin = path
            .strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string();
        Document::parse(module, &origin, &text).map_err(|source| ProviderError::Yaml { origin, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const STRUCT_DOC: &str = "permute: { version: \"0.1\", type: struct }\n";

    #[test]
    fn discovers_documents_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("example1/nested")).unwrap();
        fs::create_dir_all(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join("example1/Csv.yaml"), STRUCT_DOC).unwrap();
        fs::write(dir.path().join("example1/nested/money.yml"), STRUCT_DOC).unwrap();
        fs::write(dir.path().join(".hidden/skip.yaml"), STRUCT_DOC).unwrap();
        fs::write(dir.path().join("permute.toml"), "").unwrap();

        let provider = DirectoryProvider::new(dir.path());
        assert_eq!(
            provider.modules().unwrap(),
            vec!["example1::Csv".to_string(), "example1::nested::money".to_string()]
        );
    }

    #[test]
    fn fetch_maps_module_to_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("example1")).unwrap();
        fs::write(dir.path().join("example1/Csv.yaml"), STRUCT_DOC).unwrap();

        let provider = DirectoryProvider::new(dir.path());
        let doc = provider.fetch("example1::Csv").unwrap().unwrap();
        assert_eq!(doc.module, "example1::Csv");
        assert!(doc.origin.ends_with("Csv.yaml"));
        assert!(provider.fetch("example1::Missing").is_none());
        assert!(provider.fetch("..::etc").is_none());
    }

    #[test]
    fn paths_outside_the_root_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let provider = DirectoryProvider::new(dir.path().join("project"));
        let err = provider.module_for_path(&dir.path().join("other.yaml")).unwrap_err();
        assert!(matches!(err, ProviderError::OutsideRoot { .. }));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.yaml"), "permute: [").unwrap();
        let provider = DirectoryProvider::new(dir.path());
        match provider.fetch("broken") {
            Some(Err(ProviderError::Yaml { origin, .. })) => assert_eq!(origin, "broken.yaml"),
            other => panic!("unexpected fetch result: {:?}", other.map(|r| r.is_ok())),
        }
    }
}
