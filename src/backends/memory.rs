// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::Document;
use crate::errors::ProviderError;
use crate::traits::DocumentProvider;
use std::collections::BTreeMap;

/// Documents held as YAML text, keyed by module path.
///
/// Used by tests and by embedders that generate declarations instead of reading them
/// from disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    name: String,
    documents: BTreeMap<String, String>,
}

impl MemoryProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: BTreeMap::new(),
        }
    }

    /// Add or replace the text of `module`.
    pub fn insert(&mut self, module: impl Into<String>, yaml: impl Into<String>) -> &mut Self {
        self.documents.insert(module.into(), yaml.into());
        self
    }

    fn origin(&self, module: &str) -> String {
        format!("{}:{}", self.name, module)
    }
}

impl DocumentProvider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn modules(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.documents.keys().cloned().collect())
    }

    fn fetch(&self, module: &str) -> Option<Result<Document, ProviderError>> {
        let text = self.documents.get(module)?;
        let origin = self.origin(module);
        Some(
            Document::parse(module, &origin, text)
                .map_err(|source| ProviderError::Yaml { origin, source }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetches_inserted_documents() {
        let mut provider = MemoryProvider::new("memory");
        provider.insert("a::b", "permute: { version: \"0.1\", type: struct }\n");
        assert_eq!(provider.modules().unwrap(), vec!["a::b".to_string()]);

        let doc = provider.fetch("a::b").unwrap().unwrap();
        assert_eq!(doc.module, "a::b");
        assert_eq!(doc.origin, "memory:a::b");
        assert!(provider.fetch("a::c").is_none());
    }

    #[test]
    fn reports_yaml_errors_with_origin() {
        let mut provider = MemoryProvider::new("memory");
        provider.insert("bad", "permute: [");
        match provider.fetch("bad") {
            Some(Err(ProviderError::Yaml { origin, .. })) => assert_eq!(origin, "memory:bad"),
            other => panic!("unexpected fetch result: {:?}", other.map(|r| r.is_ok())),
        }
    }
}
