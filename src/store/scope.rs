// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Name resolution inside a module: local declarations, imports, aliases and globs.

use super::ty::{TraitRef, Ty};
use crate::errors::ErrorKind;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SymbolKind {
    Type,
    Trait,
    Module,
}

/// A name in the type namespace bound to a canonical path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub path: String,
}

/// Every declared path in the store, used to resolve absolute and module-relative paths.
#[derive(Debug, Clone, Default)]
pub struct SymbolIndex {
    pub symbols: BTreeMap<String, SymbolKind>,
    pub extensions: BTreeSet<String>,
    /// Module path to the names of its members: declarations, extensions and submodules.
    pub modules: BTreeMap<String, BTreeSet<String>>,
}

impl SymbolIndex {
    pub fn symbol(&self, path: &str) -> Option<Symbol> {
        if let Some(kind) = self.symbols.get(path) {
            return Some(Symbol {
                kind: *kind,
                path: path.to_string(),
            });
        }
        if self.modules.contains_key(path) {
            return Some(Symbol {
                kind: SymbolKind::Module,
                path: path.to_string(),
            });
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unresolved name '{0}'")]
    Unresolved(String),
    #[error("'{0}' is imported by more than one glob: {}", .1.join(", "))]
    Ambiguous(String, Vec<String>),
    #[error("'{0}' is not a type")]
    NotAType(String),
    #[error("'{0}' is not a trait")]
    NotATrait(String),
}

impl From<ResolveError> for ErrorKind {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::Unresolved(name) => ErrorKind::UnresolvedReference { name },
            ResolveError::Ambiguous(name, candidates) => ErrorKind::Ambiguous {
                subject: format!("name '{}'", name),
                candidates,
                requires_qualification: true,
            },
            other => ErrorKind::InvalidDeclaration {
                reason: other.to_string(),
            },
        }
    }
}

/// The names visible inside one module.
#[derive(Debug, Clone, Default)]
pub struct ModuleScope {
    pub module: String,
    pub document: String,
    names: BTreeMap<String, Symbol>,
    extensions: BTreeMap<String, String>,
    ambiguous: BTreeMap<String, BTreeSet<String>>,
}

/// How strongly a name was bound; stronger bindings shadow weaker ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Binding {
    Prelude,
    Glob,
    Explicit,
}

impl ModuleScope {
    pub fn new(module: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            document: document.into(),
            ..Self::default()
        }
    }

    /// Bind `name`; returns the conflicting path when an explicit name is bound twice.
    pub fn bind(
        &mut self,
        name: &str,
        symbol: Symbol,
        strength: Binding,
        strengths: &mut BTreeMap<String, Binding>,
    ) -> Result<(), String> {
        match strengths.get(name).copied() {
            None => {}
            Some(existing) if existing < strength => {}
            Some(existing) if existing > strength => return Ok(()),
            Some(_) => {
                let current = &self.names[name];
                if *current == symbol {
                    return Ok(());
                }
                if strength == Binding::Glob {
                    let paths = self.ambiguous.entry(name.to_string()).or_default();
                    paths.insert(current.path.clone());
                    paths.insert(symbol.path);
                    return Ok(());
                }
                return Err(current.path.clone());
            }
        }
        self.ambiguous.remove(name);
        strengths.insert(name.to_string(), strength);
        self.names.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Make an extension callable by its short name; returns the conflicting path.
    pub fn bind_extension(&mut self, name: &str, path: &str) -> Result<(), String> {
        match self.extensions.get(name) {
            Some(existing) if existing != path => Err(existing.clone()),
            _ => {
                self.extensions.insert(name.to_string(), path.to_string());
                Ok(())
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.names.get(name)
    }

    /// Paths of the extensions visible without qualification.
    pub fn visible_extensions(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self.extensions.values().collect();
        set.into_iter().cloned().collect()
    }

    /// Resolve a written path such as `Monetary`, `money::Monetary` or `example1::Csv`.
    pub fn resolve_path(&self, written: &str, index: &SymbolIndex) -> Result<Symbol, ResolveError> {
        let segments: Vec<&str> = written.split("::").collect();
        if segments.len() == 1 {
            if let Some(paths) = self.ambiguous.get(written) {
                return Err(ResolveError::Ambiguous(
                    written.to_string(),
                    paths.iter().cloned().collect(),
                ));
            }
            return self
                .names
                .get(written)
                .cloned()
                .ok_or_else(|| ResolveError::Unresolved(written.to_string()));
        }
        if let Some(Symbol {
            kind: SymbolKind::Module,
            path,
        }) = self.names.get(segments[0])
        {
            let full = format!("{}::{}", path, segments[1..].join("::"));
            if let Some(symbol) = index.symbol(&full) {
                return Ok(symbol);
            }
        }
        index
            .symbol(written)
            .ok_or_else(|| ResolveError::Unresolved(written.to_string()))
    }

    /// Resolve the path of an extension, by short name or by full path.
    pub fn resolve_extension(&self, written: &str, index: &SymbolIndex) -> Option<String> {
        if let Some(path) = self.extensions.get(written) {
            return Some(path.clone());
        }
        let segments: Vec<&str> = written.split("::").collect();
        if segments.len() > 1 {
            if let Some(Symbol {
                kind: SymbolKind::Module,
                path,
            }) = self.names.get(segments[0])
            {
                let full = format!("{}::{}", path, segments[1..].join("::"));
                if index.extensions.contains(&full) {
                    return Some(full);
                }
            }
            if index.extensions.contains(written) {
                return Some(written.to_string());
            }
        }
        None
    }

    /// Rewrite a written type term into canonical form; `generics` name the parameters
    /// in scope.
    pub fn resolve_ty(
        &self,
        ty: &Ty,
        generics: &[String],
        index: &SymbolIndex,
    ) -> Result<Ty, ResolveError> {
        match ty {
            Ty::Named { path, args } => {
                if args.is_empty() && generics.contains(path) {
                    return Ok(Ty::Param(path.clone()));
                }
                if let Some((head, name)) = path.split_once("::") {
                    if generics.iter().any(|g| g == head) && !name.contains("::") {
                        return Ok(Ty::Projection {
                            base: Box::new(Ty::Param(head.to_string())),
                            name: name.to_string(),
                        });
                    }
                }
                let symbol = self.resolve_path(path, index)?;
                if symbol.kind != SymbolKind::Type {
                    return Err(ResolveError::NotAType(path.clone()));
                }
                let args = args
                    .iter()
                    .map(|a| self.resolve_ty(a, generics, index))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Ty::Named {
                    path: symbol.path,
                    args,
                })
            }
            Ty::Fn { params, ret } => Ok(Ty::Fn {
                params: params
                    .iter()
                    .map(|p| self.resolve_ty(p, generics, index))
                    .collect::<Result<Vec<_>, _>>()?,
                ret: Box::new(self.resolve_ty(ret, generics, index)?),
            }),
            Ty::Impl(trait_ref) => Ok(Ty::Impl(Box::new(
                self.resolve_trait_ref(trait_ref, generics, index)?,
            ))),
            Ty::Projection { base, name } => Ok(Ty::Projection {
                base: Box::new(self.resolve_ty(base, generics, index)?),
                name: name.clone(),
            }),
            other => Ok(other.clone()),
        }
    }

    pub fn resolve_trait_ref(
        &self,
        trait_ref: &TraitRef,
        generics: &[String],
        index: &SymbolIndex,
    ) -> Result<TraitRef, ResolveError> {
        let symbol = self.resolve_path(&trait_ref.path, index)?;
        if symbol.kind != SymbolKind::Trait {
            return Err(ResolveError::NotATrait(trait_ref.path.clone()));
        }
        Ok(TraitRef {
            path: symbol.path,
            args: trait_ref
                .args
                .iter()
                .map(|a| self.resolve_ty(a, generics, index))
                .collect::<Result<Vec<_>, _>>()?,
            assoc: trait_ref
                .assoc
                .iter()
                .map(|(name, ty)| Ok((name.clone(), self.resolve_ty(ty, generics, index)?)))
                .collect::<Result<Vec<_>, ResolveError>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ty::parse_ty;

    fn index() -> SymbolIndex {
        let mut index = SymbolIndex::default();
        index.symbols.insert("std::u32".into(), SymbolKind::Type);
        index.symbols.insert("std::Vec".into(), SymbolKind::Type);
        index.symbols.insert("std::PartialEq".into(), SymbolKind::Trait);
        index.symbols.insert("money::Monetary".into(), SymbolKind::Type);
        index.symbols.insert("other::Monetary".into(), SymbolKind::Type);
        index
            .modules
            .insert("money".into(), ["Monetary".to_string()].into_iter().collect());
        index.extensions.insert("money::Pretty".into());
        index
    }

    fn ty_symbol(path: &str) -> Symbol {
        Symbol {
            kind: SymbolKind::Type,
            path: path.into(),
        }
    }

    #[test]
    fn explicit_names_shadow_globs_and_prelude() {
        let mut scope = ModuleScope::new("main", "main.yaml");
        let mut strengths = BTreeMap::new();
        scope
            .bind("Monetary", ty_symbol("other::Monetary"), Binding::Prelude, &mut strengths)
            .unwrap();
        scope
            .bind("Monetary", ty_symbol("money::Monetary"), Binding::Explicit, &mut strengths)
            .unwrap();
        scope
            .bind("Monetary", ty_symbol("other::Monetary"), Binding::Glob, &mut strengths)
            .unwrap();
        assert_eq!(scope.lookup("Monetary").unwrap().path, "money::Monetary");
    }

    #[test]
    fn conflicting_explicit_imports_are_rejected() {
        let mut scope = ModuleScope::new("main", "main.yaml");
        let mut strengths = BTreeMap::new();
        scope
            .bind("Monetary", ty_symbol("money::Monetary"), Binding::Explicit, &mut strengths)
            .unwrap();
        let err = scope
            .bind("Monetary", ty_symbol("other::Monetary"), Binding::Explicit, &mut strengths)
            .unwrap_err();
        assert_eq!(err, "money::Monetary");
    }

    #[test]
    fn conflicting_globs_are_ambiguous_on_use() {
        let mut scope = ModuleScope::new("main", "main.yaml");
        let mut strengths = BTreeMap::new();
        scope
            .bind("Monetary", ty_symbol("money::Monetary"), Binding::Glob, &mut strengths)
            .unwrap();
        scope
            .bind("Monetary", ty_symbol("other::Monetary"), Binding::Glob, &mut strengths)
            .unwrap();
        assert_eq!(
            scope.resolve_path("Monetary", &index()),
            Err(ResolveError::Ambiguous(
                "Monetary".into(),
                vec!["money::Monetary".into(), "other::Monetary".into()]
            ))
        );
    }

    #[test]
    fn resolves_module_relative_and_absolute_paths() {
        let index = index();
        let mut scope = ModuleScope::new("main", "main.yaml");
        let mut strengths = BTreeMap::new();
        let module = Symbol {
            kind: SymbolKind::Module,
            path: "money".into(),
        };
        scope.bind("m", module, Binding::Explicit, &mut strengths).unwrap();
        assert_eq!(scope.resolve_path("m::Monetary", &index).unwrap().path, "money::Monetary");
        assert_eq!(
            scope.resolve_path("other::Monetary", &index).unwrap().path,
            "other::Monetary"
        );
        assert_eq!(
            scope.resolve_extension("m::Pretty", &index),
            Some("money::Pretty".to_string())
        );
    }

    #[test]
    fn resolve_ty_maps_generics_and_rejects_traits() {
        let index = index();
        let mut scope = ModuleScope::new("std", "prelude");
        let mut strengths = BTreeMap::new();
        scope.bind("Vec", ty_symbol("std::Vec"), Binding::Explicit, &mut strengths).unwrap();
        let trait_symbol = Symbol {
            kind: SymbolKind::Trait,
            path: "std::PartialEq".into(),
        };
        scope
            .bind("PartialEq", trait_symbol, Binding::Explicit, &mut strengths)
            .unwrap();

        let written = parse_ty("Vec<T>").unwrap();
        let resolved = scope.resolve_ty(&written, &["T".to_string()], &index).unwrap();
        assert_eq!(resolved, Ty::std("Vec", vec![Ty::Param("T".into())]));

        let projection = scope.resolve_ty(&parse_ty("T::Item").unwrap(), &["T".to_string()], &index);
        assert!(matches!(projection, Ok(Ty::Projection { .. })));

        let err = scope.resolve_ty(&parse_ty("PartialEq").unwrap(), &[], &index);
        assert_eq!(err, Err(ResolveError::NotAType("PartialEq".into())));
    }
}
