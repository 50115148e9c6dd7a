// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The declaration store.
//!
//! A [`Store`] is built once from a set of parsed documents and is read-only afterwards.
//! Loading registers every declared name, builds one [`ModuleScope`] per document from
//! its imports, lowers the written declarations into canonical form and synthesizes the
//! impls the author does not write (transparent wrappers and component capabilities).
//!
//! ```rust
//! use permute::config::Document;
//! use permute::store::{Store, Ty};
//!
//! let yaml = r#"
//! permute: { version: "0.1", type: struct }
//! types:
//!   Celsius: { inner: f64 }
//! "#;
//! let doc = Document::from_yaml("weather", "weather.yaml", yaml).unwrap();
//! let store = Store::load(vec![doc]).unwrap();
//! assert!(store.type_decl("weather::Celsius").is_some());
//! assert!(store.type_decl("std::u32").is_some());
//! ```

mod collect;
pub mod decl;
mod lower;
mod scope;
pub mod ty;

pub use collect::collect_documents;
pub use decl::{
    parse_signature, AssocDecl, Bound, ComponentKind, ExtensionDecl, FieldDecl, Generic,
    GenericKind, ImplDecl, ImplId, ImplMethod, ImplOrigin, MethodBody, MethodSig, MethodTag,
    Specialization, TraitDecl, TraitMethod, TypeDecl, TypeKind,
};
pub use scope::{Binding, ModuleScope, ResolveError, Symbol, SymbolIndex, SymbolKind};
pub use ty::{parse_trait_ref, parse_ty, Subst, TraitRef, Ty, PRELUDE_MODULE};

use crate::config::consts::DEFAULT_MAX_DEPTH;
use crate::config::Document;
use crate::errors::Diagnostic;
use crate::observability::messages::store::{StoreLoadFailed, StoreLoadStarted, StoreLoaded};
use crate::observability::messages::StructuredLog;
use crate::schema::Schema;
use std::collections::BTreeMap;

/// Paths of prelude items the store, resolvers and validator treat specially.
pub mod lang {
    pub const PARTIAL_EQ: &str = "std::PartialEq";
    pub const FROM: &str = "std::From";
    pub const TRANSPARENT: &str = "std::Transparent";
    pub const SOURCE: &str = "std::Source";
    pub const SINK: &str = "std::Sink";
    pub const TRANSFORM: &str = "std::Transform";
    pub const OPTION: &str = "std::Option";
    pub const VEC: &str = "std::Vec";
    pub const STRING: &str = "std::String";
    pub const BOOL: &str = "std::bool";

    /// Associated type of `Transparent`.
    pub const INNER: &str = "Inner";
    /// Associated type of `Source`.
    pub const ITEM: &str = "Item";
    /// Associated type of `Transform`.
    pub const OUTPUT: &str = "Output";

    pub const INTEGERS: &[&str] = &[
        "std::u8", "std::u16", "std::u32", "std::u64", "std::usize", "std::i8", "std::i16",
        "std::i32", "std::i64", "std::isize",
    ];
    pub const FLOATS: &[&str] = &["std::f32", "std::f64"];
}

/// Source of the bundled `std` module.
pub(crate) const PRELUDE_SOURCE: &str = include_str!("prelude.yaml");

/// Every declaration reachable from the loaded documents.
#[derive(Debug, Clone)]
pub struct Store {
    index: SymbolIndex,
    scopes: BTreeMap<String, ModuleScope>,
    types: BTreeMap<String, TypeDecl>,
    traits: BTreeMap<String, TraitDecl>,
    impls: Vec<ImplDecl>,
    impls_by_trait: BTreeMap<String, Vec<ImplId>>,
    inherent: Vec<ImplId>,
    extensions: BTreeMap<String, ExtensionDecl>,
    schemas: BTreeMap<String, Schema>,
    max_depth: usize,
}

impl Store {
    /// Load `documents` together with the prelude.
    pub fn load(documents: Vec<Document>) -> Result<Store, Vec<Diagnostic>> {
        Self::load_with_depth(documents, DEFAULT_MAX_DEPTH)
    }

    /// Load with an explicit limit for nested obligations and evaluation.
    pub fn load_with_depth(
        documents: Vec<Document>,
        max_depth: usize,
    ) -> Result<Store, Vec<Diagnostic>> {
        StoreLoadStarted {
            document_count: documents.len(),
        }
        .log();

        let result = lower::Loader::default()
            .run(documents)
            .map(|lowered| Store::from_lowered(lowered, max_depth))
            .and_then(|store| {
                let diagnostics = crate::schema::verify_defaults(&store);
                if diagnostics.is_empty() {
                    Ok(store)
                } else {
                    Err(diagnostics)
                }
            });

        match &result {
            Ok(store) => StoreLoaded {
                module_count: store.scopes.len(),
                type_count: store.types.len(),
                trait_count: store.traits.len(),
                impl_count: store.impls.len(),
            }
            .log(),
            Err(diagnostics) => StoreLoadFailed {
                error_count: diagnostics.len(),
            }
            .log(),
        }
        result
    }

    fn from_lowered(lowered: lower::Lowered, max_depth: usize) -> Store {
        let mut impls_by_trait: BTreeMap<String, Vec<ImplId>> = BTreeMap::new();
        let mut inherent = Vec::new();
        for decl in &lowered.impls {
            match &decl.trait_ref {
                Some(trait_ref) => impls_by_trait
                    .entry(trait_ref.path.clone())
                    .or_default()
                    .push(decl.id),
                None => inherent.push(decl.id),
            }
        }
        Store {
            index: lowered.index,
            scopes: lowered.scopes,
            types: lowered.types,
            traits: lowered.traits,
            impls: lowered.impls,
            impls_by_trait,
            inherent,
            extensions: lowered.extensions,
            schemas: lowered.schemas,
            max_depth,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    /// Scope of the document that declared `module`.
    pub fn scope(&self, module: &str) -> Option<&ModuleScope> {
        self.scopes.get(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    pub fn type_decl(&self, path: &str) -> Option<&TypeDecl> {
        self.types.get(path)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.values()
    }

    pub fn trait_decl(&self, path: &str) -> Option<&TraitDecl> {
        self.traits.get(path)
    }

    pub fn traits(&self) -> impl Iterator<Item = &TraitDecl> {
        self.traits.values()
    }

    /// Traits whose `specialization` block specializes `trait_path`.
    pub fn specializations_of<'a>(
        &'a self,
        trait_path: &'a str,
    ) -> impl Iterator<Item = &'a TraitDecl> + 'a {
        self.traits.values().filter(move |t| {
            t.specialization
                .as_ref()
                .is_some_and(|s| s.of.path == trait_path)
        })
    }

    pub fn impls(&self) -> &[ImplDecl] {
        &self.impls
    }

    pub fn impl_decl(&self, id: ImplId) -> Option<&ImplDecl> {
        self.impls.get(id.0)
    }

    /// Impls of `trait_path`, in declaration order.
    pub fn impls_of_trait(&self, trait_path: &str) -> impl Iterator<Item = &ImplDecl> {
        self.impls_by_trait
            .get(trait_path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter_map(|id| self.impl_decl(*id))
    }

    pub fn inherent_impls(&self) -> impl Iterator<Item = &ImplDecl> {
        self.inherent.iter().filter_map(|id| self.impl_decl(*id))
    }

    pub fn extension(&self, path: &str) -> Option<&ExtensionDecl> {
        self.extensions.get(path)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &ExtensionDecl> {
        self.extensions.values()
    }

    /// Parameter schema of a component type.
    pub fn schema(&self, component: &str) -> Option<&Schema> {
        self.schemas.get(component)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    /// Expand type aliases at every level of `ty`.
    pub fn normalize(&self, ty: &Ty) -> Ty {
        self.normalize_at(ty, 0)
    }

    fn normalize_at(&self, ty: &Ty, depth: usize) -> Ty {
        if depth > self.max_depth {
            return ty.clone();
        }
        ty.map(&mut |node| {
            let Ty::Named { path, args } = node else {
                return None;
            };
            let decl = self.types.get(path)?;
            let TypeKind::Alias(target) = &decl.kind else {
                return None;
            };
            let args: Vec<Ty> = args.iter().map(|a| self.normalize_at(a, depth + 1)).collect();
            let subst = decl.subst_for(&Ty::named(path.clone(), args));
            Some(self.normalize_at(&target.substitute(&subst), depth + 1))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(yaml: &str) -> Result<Store, Vec<Diagnostic>> {
        let doc = Document::from_yaml("shapes", "shapes.yaml", yaml).map_err(|d| vec![d])?;
        Store::load(vec![doc])
    }

    #[test]
    fn prelude_is_always_loaded() {
        let store = Store::load(vec![]).unwrap();
        for name in ["bool", "u32", "i64", "f64", "String", "Option", "Vec"] {
            assert!(store.type_decl(&format!("std::{}", name)).is_some(), "{}", name);
        }
        for name in ["PartialEq", "ConstEq", "From", "Default", "Transparent", "Source", "Sink", "Transform"] {
            assert!(store.trait_decl(&format!("std::{}", name)).is_some(), "{}", name);
        }
        let specializations: Vec<_> = store
            .specializations_of("std::PartialEq")
            .map(|t| t.path.as_str())
            .collect();
        assert_eq!(specializations, vec!["std::ConstEq"]);
    }

    #[test]
    fn aliases_normalize_through_arguments() {
        let store = load(
            r#"
permute: { version: "0.1", type: struct }
types:
  Ids: { generics: [T], alias: "Vec<T>" }
  Names: { alias: "Ids<String>" }
"#,
        )
        .unwrap();
        let names = Ty::named("shapes::Names", vec![]);
        assert_eq!(
            store.normalize(&names),
            Ty::std("Vec", vec![Ty::std("String", vec![])])
        );
    }

    #[test]
    fn impls_are_indexed_by_trait() {
        let store = load(
            r#"
permute: { version: "0.1", type: struct }
types:
  Point: { fields: { x: i64, y: i64 } }
impls:
  - for: Point
    trait: ConstEq
    methods:
      eq: self.x == other.x && self.y == other.y
  - for: Point
    methods:
      "const fn sum(self) -> i64": self.x + self.y
"#,
        )
        .unwrap();
        let point = Ty::named("shapes::Point", vec![]);
        assert_eq!(
            store
                .impls_of_trait("std::ConstEq")
                .filter(|i| i.target == point)
                .count(),
            1
        );
        assert!(store
            .inherent_impls()
            .any(|i| i.target == point && i.method("sum").is_some()));
        for (position, decl) in store.impls().iter().enumerate() {
            assert_eq!(decl.id, ImplId(position));
        }
    }
}
