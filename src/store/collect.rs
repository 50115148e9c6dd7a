// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::ty::PRELUDE_MODULE;
use crate::config::Document;
use crate::errors::{Diagnostic, ErrorKind, Location, ProviderError};
use crate::observability::messages::store::DocumentFetched;
use crate::observability::messages::StructuredLog;
use crate::traits::DocumentProvider;
use std::collections::{BTreeSet, VecDeque};

/// Fetch the `entries` modules and every module their imports reach.
///
/// Documents are returned in the order they were first requested. All unknown imports
/// and unreadable documents are reported together.
pub fn collect_documents(
    provider: &dyn DocumentProvider,
    entries: &[String],
) -> Result<Vec<Document>, Vec<Diagnostic>> {
    let available: BTreeSet<String> = provider
        .modules()
        .map_err(|e| vec![provider_diagnostic(provider.name(), e)])?
        .into_iter()
        .collect();

    let mut documents = Vec::new();
    let mut diagnostics = Vec::new();
    let mut requested: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<(String, Location)> = VecDeque::new();

    for entry in entries {
        if available.contains(entry) {
            queue.push_back((entry.clone(), Location::document(provider.name())));
        } else {
            diagnostics.push(Diagnostic::new(
                Location::document(provider.name()),
                ErrorKind::UnknownImport {
                    path: entry.clone(),
                },
            ));
        }
    }

    while let Some((module, requested_at)) = queue.pop_front() {
        if !requested.insert(module.clone()) {
            continue;
        }
        let document = match provider.fetch(&module) {
            Some(Ok(document)) => document,
            Some(Err(e)) => {
                diagnostics.push(provider_diagnostic(&module, e));
                continue;
            }
            None => {
                diagnostics.push(Diagnostic::new(
                    requested_at,
                    ErrorKind::UnknownImport { path: module },
                ));
                continue;
            }
        };
        DocumentFetched {
            module: &document.module,
            origin: &document.origin,
            provider: provider.name(),
        }
        .log();

        let uses_at = document.location().at("permute").at("use");
        for (i, written) in document.file.header.uses.iter().enumerate() {
            let location = uses_at.at(i.to_string());
            match modules_for_import(written, &available) {
                Some(modules) => {
                    for dependency in modules {
                        if !requested.contains(&dependency) {
                            queue.push_back((dependency, location.clone()));
                        }
                    }
                }
                None => diagnostics.push(Diagnostic::new(
                    location,
                    ErrorKind::UnknownImport {
                        path: written.clone(),
                    },
                )),
            }
        }
        documents.push(document);
    }

    if diagnostics.is_empty() {
        Ok(documents)
    } else {
        Err(diagnostics)
    }
}

/// Modules that must be loaded for `use <written>` to resolve.
///
/// The longest prefix of the import path that names a document wins. An import of a
/// directory-like module (`use example1`, `use example1::*`) needs every document below it.
fn modules_for_import(written: &str, available: &BTreeSet<String>) -> Option<Vec<String>> {
    let path = written.split(" as ").next().unwrap_or(written).trim();
    let path = path.strip_suffix("::*").unwrap_or(path);
    let segments: Vec<&str> = path.split("::").collect();
    if segments.first() == Some(&PRELUDE_MODULE) {
        return Some(Vec::new());
    }

    for len in (1..=segments.len()).rev() {
        let prefix = segments[..len].join("::");
        if available.contains(&prefix) {
            return Some(vec![prefix]);
        }
        if len == segments.len() {
            let nested = format!("{}::", prefix);
            let below: Vec<String> = available
                .iter()
                .filter(|m| m.starts_with(&nested))
                .cloned()
                .collect();
            if !below.is_empty() {
                return Some(below);
            }
        }
    }
    None
}

fn provider_diagnostic(origin: &str, error: ProviderError) -> Diagnostic {
    let kind = match &error {
        ProviderError::Yaml { .. } => ErrorKind::Parse {
            reason: error.to_string(),
        },
        ProviderError::Io { .. } | ProviderError::OutsideRoot { .. } => ErrorKind::Io {
            reason: error.to_string(),
        },
    };
    Diagnostic::new(Location::document(origin), kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryProvider;

    fn provider() -> MemoryProvider {
        let mut provider = MemoryProvider::new("memory");
        provider.insert(
            "app::main",
            "permute: { version: \"0.1\", type: main, use: [\"lib::*\", \"shared::money::Monetary\"] }\n",
        );
        provider.insert("lib::Csv", "permute: { version: \"0.1\", type: struct }\n");
        provider.insert("lib::Rows", "permute: { version: \"0.1\", type: struct }\n");
        provider.insert("shared::money", "permute: { version: \"0.1\", type: struct }\n");
        provider.insert("unused", "permute: { version: \"0.1\", type: struct }\n");
        provider
    }

    #[test]
    fn follows_imports_transitively() {
        let documents = collect_documents(&provider(), &["app::main".to_string()]).unwrap();
        let modules: Vec<_> = documents.iter().map(|d| d.module.as_str()).collect();
        assert_eq!(modules, vec!["app::main", "lib::Csv", "lib::Rows", "shared::money"]);
    }

    #[test]
    fn reports_unknown_imports_at_the_use_entry() {
        let mut provider = provider();
        provider.insert(
            "broken",
            "permute: { version: \"0.1\", type: main, use: [\"nowhere::Thing\", \"std::u32\"] }\n",
        );
        let errors = collect_documents(&provider, &["broken".to_string()]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].location.path, vec!["permute", "use", "0"]);
        assert_eq!(
            errors[0].kind,
            ErrorKind::UnknownImport {
                path: "nowhere::Thing".into()
            }
        );
    }

    #[test]
    fn import_paths_map_to_longest_module_prefix() {
        let available: BTreeSet<String> = ["a::b", "a::b::c", "x::y"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            modules_for_import("a::b::c::Thing as T", &available),
            Some(vec!["a::b::c".to_string()])
        );
        assert_eq!(
            modules_for_import("x::*", &available),
            Some(vec!["x::y".to_string()])
        );
        assert_eq!(modules_for_import("x::z", &available), None);
    }
}
