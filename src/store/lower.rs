// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Turning parsed documents into store declarations.
//!
//! Loading runs in phases, and a phase only starts when the previous one reported no
//! diagnostics:
//!
//! 1. **Register** every module and every declared name.
//! 2. **Scope** each document: prelude, local names and imports.
//! 3. **Lower** types, traits, impls, extensions and component schemas into canonical
//!    form.
//! 4. **Finalize** impls against their traits and synthesize the impls authors do not
//!    write.

use super::decl::{
    parse_signature, AssocDecl, Bound, ComponentKind, ExtensionDecl, FieldDecl, Generic,
    GenericKind, ImplDecl, ImplId, ImplMethod, ImplOrigin, MethodBody, MethodSig, MethodTag,
    Specialization, TraitDecl, TraitMethod, TypeDecl, TypeKind,
};
use super::lang;
use super::scope::{Binding, ModuleScope, ResolveError, Symbol, SymbolIndex, SymbolKind};
use super::ty::{parse_generic, parse_trait_ref, parse_ty, parse_where, TraitRef, Ty};
use super::{PRELUDE_MODULE, PRELUDE_SOURCE};
use crate::config::consts::PRELUDE_ORIGIN;
use crate::config::{
    CheckList, Document, DocumentKind, ExtensionDoc, ImplDoc, TraitDoc, TypeDoc,
    SUPPORTED_VERSION,
};
use crate::errors::{Diagnostic, ErrorKind, Location, Namespace, ParseError};
use crate::expr::Snippet;
use crate::observability::messages::store::ImplSynthesized;
use crate::observability::messages::StructuredLog;
use crate::schema::{CheckSpec, ParamSpec, Schema};
use std::collections::{BTreeMap, BTreeSet};

/// Everything the loader produced, ready to be indexed by the store.
pub(super) struct Lowered {
    pub index: SymbolIndex,
    pub scopes: BTreeMap<String, ModuleScope>,
    pub types: BTreeMap<String, TypeDecl>,
    pub traits: BTreeMap<String, TraitDecl>,
    pub impls: Vec<ImplDecl>,
    pub extensions: BTreeMap<String, ExtensionDecl>,
    pub schemas: BTreeMap<String, Schema>,
}

struct PendingImpl {
    decl: ImplDecl,
    /// Methods written by name only; their signatures come from the trait.
    unsigned: BTreeSet<String>,
    location: Location,
}

struct PendingComponent {
    path: String,
    kind: ComponentKind,
    input: Option<Ty>,
    output: Option<Ty>,
    item: Option<Ty>,
    location: Location,
}

#[derive(Default)]
pub(super) struct Loader {
    index: SymbolIndex,
    scopes: BTreeMap<String, ModuleScope>,
    types: BTreeMap<String, TypeDecl>,
    traits: BTreeMap<String, TraitDecl>,
    pending: Vec<PendingImpl>,
    components: Vec<PendingComponent>,
    extensions: BTreeMap<String, ExtensionDecl>,
    schemas: BTreeMap<String, Schema>,
    impls: Vec<ImplDecl>,
    diagnostics: Vec<Diagnostic>,
}

impl Loader {
    pub(super) fn run(mut self, documents: Vec<Document>) -> Result<Lowered, Vec<Diagnostic>> {
        let prelude = Document::from_yaml(PRELUDE_MODULE, PRELUDE_ORIGIN, PRELUDE_SOURCE)
            .map_err(|d| vec![d])?;
        let mut all = Vec::with_capacity(documents.len() + 1);
        all.push(prelude);
        all.extend(documents);

        let registered: Vec<Document> = all.into_iter().filter(|doc| self.register(doc)).collect();
        self.checkpoint()?;

        for doc in &registered {
            self.build_scope(doc);
        }
        self.checkpoint()?;

        for doc in &registered {
            self.lower(doc);
        }
        self.checkpoint()?;

        self.finalize();
        self.checkpoint()?;

        Ok(Lowered {
            index: self.index,
            scopes: self.scopes,
            types: self.types,
            traits: self.traits,
            impls: self.impls,
            extensions: self.extensions,
            schemas: self.schemas,
        })
    }

    fn checkpoint(&mut self) -> Result<(), Vec<Diagnostic>> {
        if self.diagnostics.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.diagnostics))
        }
    }

    fn fail(&mut self, location: Location, kind: ErrorKind) {
        self.diagnostics.push(Diagnostic::new(location, kind));
    }

    fn invalid(&mut self, location: Location, reason: impl Into<String>) {
        self.fail(
            location,
            ErrorKind::InvalidDeclaration {
                reason: reason.into(),
            },
        );
    }

    // --- phase 1 ----------------------------------------------------------------------

    /// Returns false when the document must be skipped entirely.
    fn register(&mut self, doc: &Document) -> bool {
        let location = doc.location();
        let header = &doc.file.header;
        if header.version != SUPPORTED_VERSION {
            self.invalid(
                location.at("permute").at("version"),
                format!(
                    "unsupported document version '{}', expected '{}'",
                    header.version, SUPPORTED_VERSION
                ),
            );
            return false;
        }
        if self.scopes.contains_key(&doc.module) {
            self.fail(
                location,
                ErrorKind::DuplicateDeclaration {
                    name: doc.module.clone(),
                    namespace: Namespace::Module,
                },
            );
            return false;
        }
        for reason in misplaced_sections(doc) {
            self.invalid(location.clone(), reason);
        }

        self.scopes.insert(
            doc.module.clone(),
            ModuleScope::new(doc.module.clone(), doc.origin.clone()),
        );
        self.add_module(&doc.module);

        if component_kind(doc.kind()).is_some() {
            let last = doc.module.rsplit("::").next().unwrap_or(&doc.module);
            if doc.name() != last {
                self.invalid(
                    location.at("name"),
                    format!(
                        "component '{}' must be named after its module '{}'",
                        doc.name(),
                        doc.module
                    ),
                );
            }
            self.declare_path(doc.module.clone(), SymbolKind::Type, location.at("name"));
        }
        for (name, _) in doc.file.types.iter() {
            self.declare(&doc.module, name, SymbolKind::Type, location.at("types").at(name));
        }
        for (name, _) in doc.file.traits.iter() {
            self.declare(&doc.module, name, SymbolKind::Trait, location.at("traits").at(name));
        }
        for (name, _) in doc.file.extensions.iter() {
            let path = join(&doc.module, name);
            if !self.index.extensions.insert(path.clone()) {
                self.fail(
                    location.at("extensions").at(name),
                    ErrorKind::DuplicateDeclaration {
                        name: path,
                        namespace: Namespace::Extension,
                    },
                );
                continue;
            }
            self.member(&doc.module, name);
        }
        true
    }

    fn add_module(&mut self, module: &str) {
        self.index.modules.entry(module.to_string()).or_default();
        let segments: Vec<&str> = module.split("::").collect();
        for i in 1..segments.len() {
            let parent = segments[..i].join("::");
            self.index
                .modules
                .entry(parent)
                .or_default()
                .insert(segments[i].to_string());
        }
    }

    fn member(&mut self, module: &str, name: &str) {
        self.index
            .modules
            .entry(module.to_string())
            .or_default()
            .insert(name.to_string());
    }

    fn declare(&mut self, module: &str, name: &str, kind: SymbolKind, location: Location) {
        if self.declare_path(join(module, name), kind, location) {
            self.member(module, name);
        }
    }

    fn declare_path(&mut self, path: String, kind: SymbolKind, location: Location) -> bool {
        if self.index.symbols.contains_key(&path) {
            self.fail(
                location,
                ErrorKind::DuplicateDeclaration {
                    name: path,
                    namespace: Namespace::Type,
                },
            );
            return false;
        }
        self.index.symbols.insert(path, kind);
        true
    }

    // --- phase 2 ----------------------------------------------------------------------

    fn build_scope(&mut self, doc: &Document) {
        let module = doc.module.as_str();
        let location = doc.location();
        let mut scope = ModuleScope::new(module, doc.origin.clone());
        let mut strengths = BTreeMap::new();
        let mut failures = Vec::new();

        if module != PRELUDE_MODULE {
            if let Some(members) = self.index.modules.get(PRELUDE_MODULE) {
                for name in members {
                    if let Some(symbol) = self.index.symbol(&join(PRELUDE_MODULE, name)) {
                        // Prelude names never conflict; locals and imports shadow them.
                        let _ = scope.bind(name, symbol, Binding::Prelude, &mut strengths);
                    }
                }
            }
        }

        let members = self.index.modules.get(module).cloned().unwrap_or_default();
        for name in &members {
            let path = join(module, name);
            if let Some(symbol) = self.index.symbol(&path) {
                if scope.bind(name, symbol, Binding::Explicit, &mut strengths).is_err() {
                    failures.push((location.clone(), duplicate(name, Namespace::Type)));
                }
            }
            if self.index.extensions.contains(&path)
                && scope.bind_extension(name, &path).is_err()
            {
                failures.push((location.clone(), duplicate(name, Namespace::Extension)));
            }
        }
        if component_kind(doc.kind()).is_some() {
            let own = Symbol {
                kind: SymbolKind::Type,
                path: module.to_string(),
            };
            if scope.bind(doc.name(), own, Binding::Explicit, &mut strengths).is_err() {
                failures.push((location.at("name"), duplicate(doc.name(), Namespace::Type)));
            }
        }

        let uses_at = location.at("permute").at("use");
        for (i, written) in doc.file.header.uses.iter().enumerate() {
            if let Err(kind) = import(&self.index, &mut scope, &mut strengths, written) {
                failures.push((uses_at.at(i.to_string()), kind));
            }
        }

        for (location, kind) in failures {
            self.fail(location, kind);
        }
        self.scopes.insert(module.to_string(), scope);
    }

    // --- phase 3 ----------------------------------------------------------------------

    fn lower(&mut self, doc: &Document) {
        let Some(scope) = self.scopes.get(&doc.module) else {
            return;
        };
        let mut lowering = DocLowering {
            scope,
            index: &self.index,
            module: &doc.module,
            origin: &doc.origin,
            diagnostics: Vec::new(),
        };
        let location = doc.location();

        let mut types = Vec::new();
        for (name, written) in doc.file.types.iter() {
            if let Some(decl) = lowering.type_decl(name, written, location.at("types").at(name)) {
                types.push(decl);
            }
        }
        let mut traits = Vec::new();
        for (name, written) in doc.file.traits.iter() {
            if let Some(decl) = lowering.trait_decl(name, written, location.at("traits").at(name))
            {
                traits.push(decl);
            }
        }
        let mut impls = Vec::new();
        for (i, written) in doc.file.impls.iter().enumerate() {
            if let Some(pending) = lowering.impl_decl(written, location.at("impls").at(i.to_string()))
            {
                impls.push(pending);
            }
        }
        let mut extensions = Vec::new();
        for (name, written) in doc.file.extensions.iter() {
            if let Some(decl) =
                lowering.extension_decl(name, written, location.at("extensions").at(name))
            {
                extensions.push(decl);
            }
        }
        let component = component_kind(doc.kind()).and_then(|kind| lowering.component(doc, kind));

        let DocLowering { diagnostics, .. } = lowering;
        self.diagnostics.extend(diagnostics);
        for decl in types {
            self.types.insert(decl.path.clone(), decl);
        }
        for decl in traits {
            self.traits.insert(decl.path.clone(), decl);
        }
        self.pending.extend(impls);
        for decl in extensions {
            self.extensions.insert(decl.path.clone(), decl);
        }
        if let Some((decl, schema, pending)) = component {
            self.types.insert(decl.path.clone(), decl);
            self.schemas.insert(schema.component.clone(), schema);
            self.components.push(pending);
        }
    }

    // --- phase 4 ----------------------------------------------------------------------

    fn finalize(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        let mut impls = Vec::with_capacity(pending.len());
        for p in pending {
            if let Some(decl) = self.complete_impl(p) {
                impls.push(decl);
            }
        }
        self.synthesize_transparent(&mut impls);
        self.synthesize_components(&mut impls);
        for (position, decl) in impls.iter_mut().enumerate() {
            decl.id = ImplId(position);
        }
        self.reject_duplicate_impls(&impls);
        self.impls = impls;
    }

    fn complete_impl(&mut self, pending: PendingImpl) -> Option<ImplDecl> {
        let PendingImpl {
            mut decl,
            unsigned,
            location,
        } = pending;
        let target = decl.target.clone();

        let Some(written) = decl.trait_ref.clone() else {
            for method in &mut decl.methods {
                method.sig = method.sig.map_types(&mut |ty| self_to(ty, &target));
            }
            return Some(decl);
        };
        let Some(trait_decl) = self.traits.get(&written.path).cloned() else {
            self.fail(
                location.at("trait"),
                ErrorKind::UnresolvedReference { name: written.path },
            );
            return None;
        };

        if written.args.len() > trait_decl.generics.len() {
            self.invalid(
                location.at("trait"),
                format!(
                    "'{}' takes {} arguments, {} given",
                    trait_decl.name,
                    trait_decl.generics.len(),
                    written.args.len()
                ),
            );
            return None;
        }
        let args = trait_decl.complete_args(&target, &written.args);
        if let Some(missing) = trait_decl
            .generics
            .iter()
            .zip(&args)
            .find(|(_, arg)| **arg == Ty::Infer)
        {
            self.invalid(
                location.at("trait"),
                format!("trait parameter '{}' needs an argument", missing.0.name),
            );
            return None;
        }
        for (name, ty) in written.assoc {
            if decl.assoc(&name).is_none() {
                decl.assoc.push((name, ty));
            }
        }
        decl.trait_ref = Some(TraitRef::new(written.path.clone(), args.clone()));

        let mut ok = true;
        for assoc in &trait_decl.assoc {
            if decl.assoc(&assoc.name).is_none() {
                self.invalid(
                    location.at("assoc"),
                    format!("missing associated type '{}' of '{}'", assoc.name, trait_decl.name),
                );
                ok = false;
            }
        }
        for (name, _) in &decl.assoc {
            if !trait_decl.assoc.iter().any(|a| a.name == *name) {
                self.invalid(
                    location.at("assoc").at(name.clone()),
                    format!("'{}' has no associated type '{}'", trait_decl.name, name),
                );
                ok = false;
            }
        }

        let subst = trait_decl.subst_for(&args);
        let assoc = decl.assoc.clone();
        for method in &mut decl.methods {
            let name = method.sig.name.clone();
            let Some(declared) = trait_decl.method(&name) else {
                self.invalid(
                    location.at("methods").at(name.clone()),
                    format!("'{}' is not a method of '{}'", name, trait_decl.name),
                );
                ok = false;
                continue;
            };
            if unsigned.contains(&name) {
                method.sig = declared.sig.map_types(&mut |ty| match ty {
                    Ty::Projection { base, name } if **base == Ty::SelfTy => assoc
                        .iter()
                        .find(|(n, _)| n == name)
                        .map(|(_, ty)| ty.clone()),
                    Ty::SelfTy => Some(target.clone()),
                    Ty::Param(param) => subst.get(param).cloned(),
                    _ => None,
                });
            } else {
                if method.sig.receiver != declared.sig.receiver
                    || method.sig.params.len() != declared.sig.params.len()
                {
                    self.invalid(
                        location.at("methods").at(name.clone()),
                        format!("signature does not match '{}'", declared.sig),
                    );
                    ok = false;
                }
                method.sig = method.sig.map_types(&mut |ty| self_to(ty, &target));
            }
        }
        for declared in &trait_decl.methods {
            let required = declared.default.is_none() && declared.sig.tag != MethodTag::Extern;
            if required && decl.method(&declared.sig.name).is_none() {
                self.invalid(
                    location.at("methods"),
                    format!("missing method '{}' of '{}'", declared.sig.name, trait_decl.name),
                );
                ok = false;
            }
        }

        if written.path == lang::TRANSPARENT {
            ok &= self.check_transparent_impl(&decl, &location);
        }
        ok.then_some(decl)
    }

    fn check_transparent_impl(&mut self, decl: &ImplDecl, location: &Location) -> bool {
        let declared = decl
            .target
            .path()
            .and_then(|path| self.types.get(path))
            .and_then(|ty| match &ty.kind {
                TypeKind::Transparent { inner } => {
                    Some(inner.substitute(&ty.subst_for(&decl.target)))
                }
                _ => None,
            });
        match declared {
            None => {
                self.invalid(
                    location.at("for"),
                    format!("'{}' is not a transparent type", decl.target),
                );
                false
            }
            Some(inner) if decl.assoc(lang::INNER) != Some(&inner) => {
                self.invalid(
                    location.at("assoc").at(lang::INNER),
                    format!("'{}' wraps '{}'", decl.target, inner),
                );
                false
            }
            Some(_) => true,
        }
    }

    fn synthesize_transparent(&mut self, impls: &mut Vec<ImplDecl>) {
        for decl in self.types.values() {
            let TypeKind::Transparent { inner } = &decl.kind else {
                continue;
            };
            let written = impls.iter().any(|i| {
                i.target.path() == Some(decl.path.as_str())
                    && i.trait_ref.as_ref().map(|t| t.path.as_str()) == Some(lang::TRANSPARENT)
            });
            if written {
                continue;
            }
            let synthesized = ImplDecl {
                id: ImplId(0),
                module: decl.module.clone(),
                document: self.document_of(&decl.module),
                generics: decl.generics.clone(),
                target: decl.as_ty(),
                trait_ref: Some(TraitRef::new(lang::TRANSPARENT, vec![])),
                bounds: vec![],
                assoc: vec![(lang::INNER.to_string(), inner.clone())],
                methods: vec![],
                is_const: true,
                origin: ImplOrigin::Synthesized,
            };
            ImplSynthesized {
                implementation: &synthesized.to_string(),
                reason: "transparent type",
            }
            .log();
            impls.push(synthesized);
        }
    }

    fn synthesize_components(&mut self, impls: &mut Vec<ImplDecl>) {
        let components = std::mem::take(&mut self.components);
        for component in components {
            let Some(decl) = self.types.get(&component.path).cloned() else {
                continue;
            };
            let self_ty = decl.as_ty();
            let capability = match component.kind {
                ComponentKind::Source => match (&component.item, decl.fields().is_empty()) {
                    (Some(item), _) => Ok((lang::SOURCE, vec![], Some((lang::ITEM, item.clone())))),
                    (None, false) => Ok((lang::SOURCE, vec![], Some((lang::ITEM, self_ty.clone())))),
                    (None, true) => Err("a source needs `item` or `columns`"),
                },
                ComponentKind::Sink | ComponentKind::Feeder => match &component.input {
                    Some(input) => Ok((lang::SINK, vec![input.clone()], None)),
                    None => Err("a sink needs an `input` type"),
                },
                ComponentKind::Transform => match (&component.input, &component.output) {
                    (Some(input), Some(output)) => Ok((
                        lang::TRANSFORM,
                        vec![input.clone()],
                        Some((lang::OUTPUT, output.clone())),
                    )),
                    _ => Err("a transform needs `input` and `output` types"),
                },
            };
            let (trait_path, args, assoc) = match capability {
                Ok(capability) => capability,
                Err(reason) => {
                    self.invalid(component.location.clone(), reason);
                    continue;
                }
            };
            let written = impls.iter().any(|i| {
                i.target.path() == Some(component.path.as_str())
                    && i.trait_ref.as_ref().map(|t| t.path.as_str()) == Some(trait_path)
            });
            if written {
                continue;
            }
            let synthesized = ImplDecl {
                id: ImplId(0),
                module: decl.module.clone(),
                document: self.document_of(&decl.module),
                generics: decl.generics.clone(),
                target: self_ty,
                trait_ref: Some(TraitRef::new(trait_path, args)),
                bounds: vec![],
                assoc: assoc
                    .into_iter()
                    .map(|(name, ty)| (name.to_string(), ty))
                    .collect(),
                methods: vec![],
                is_const: false,
                origin: ImplOrigin::Synthesized,
            };
            ImplSynthesized {
                implementation: &synthesized.to_string(),
                reason: "component capability",
            }
            .log();
            impls.push(synthesized);
        }
    }

    /// Identical unbounded impls can never be told apart.
    fn reject_duplicate_impls(&mut self, impls: &[ImplDecl]) {
        let mut seen: BTreeMap<(Option<String>, Vec<Ty>), &ImplDecl> = BTreeMap::new();
        let mut methods: BTreeMap<(Ty, String), &ImplDecl> = BTreeMap::new();
        let mut failures = Vec::new();
        for decl in impls {
            match &decl.trait_ref {
                Some(trait_ref) if decl.bounds.is_empty() => {
                    let mut key_tys = vec![decl.target.clone()];
                    key_tys.extend(trait_ref.args.iter().cloned());
                    let key = (Some(trait_ref.path.clone()), canonical(&key_tys));
                    if seen.insert(key, decl).is_some() {
                        failures.push((
                            Location::document(decl.document.clone()),
                            duplicate(&decl.to_string(), Namespace::Impl),
                        ));
                    }
                }
                Some(_) => {}
                None => {
                    let target = canonical(std::slice::from_ref(&decl.target)).remove(0);
                    for method in &decl.methods {
                        let key = (target.clone(), method.sig.name.clone());
                        if methods.insert(key, decl).is_some() {
                            failures.push((
                                Location::document(decl.document.clone()),
                                duplicate(
                                    &format!("{}::{}", decl.target, method.sig.name),
                                    Namespace::Method,
                                ),
                            ));
                        }
                    }
                }
            }
        }
        for (location, kind) in failures {
            self.fail(location, kind);
        }
    }

    fn document_of(&self, module: &str) -> String {
        self.scopes
            .get(module)
            .map(|s| s.document.clone())
            .unwrap_or_else(|| module.to_string())
    }
}

/// Lowering of one document against its scope.
struct DocLowering<'a> {
    scope: &'a ModuleScope,
    index: &'a SymbolIndex,
    module: &'a str,
    origin: &'a str,
    diagnostics: Vec<Diagnostic>,
}

impl DocLowering<'_> {
    fn fail(&mut self, location: Location, kind: ErrorKind) {
        self.diagnostics.push(Diagnostic::new(location, kind));
    }

    fn invalid(&mut self, location: Location, reason: impl Into<String>) {
        self.fail(
            location,
            ErrorKind::InvalidDeclaration {
                reason: reason.into(),
            },
        );
    }

    fn parse_failed(&mut self, location: Location, written: &str, error: ParseError) {
        self.invalid(location, format!("cannot parse `{}`: {}", written, error));
    }

    fn resolve_failed(&mut self, location: Location, error: ResolveError) {
        self.fail(location, error.into());
    }

    fn resolve(&mut self, ty: &Ty, generics: &[String], location: &Location) -> Option<Ty> {
        match self.scope.resolve_ty(ty, generics, self.index) {
            Ok(ty) => Some(ty),
            Err(e) => {
                self.resolve_failed(location.clone(), e);
                None
            }
        }
    }

    fn resolve_trait(
        &mut self,
        trait_ref: &TraitRef,
        generics: &[String],
        location: &Location,
    ) -> Option<TraitRef> {
        match self.scope.resolve_trait_ref(trait_ref, generics, self.index) {
            Ok(trait_ref) => Some(trait_ref),
            Err(e) => {
                self.resolve_failed(location.clone(), e);
                None
            }
        }
    }

    fn ty(&mut self, written: &str, generics: &[String], location: &Location) -> Option<Ty> {
        match parse_ty(written) {
            Ok(ty) => self.resolve(&ty, generics, location),
            Err(e) => {
                self.parse_failed(location.clone(), written, e);
                None
            }
        }
    }

    fn trait_ref(
        &mut self,
        written: &str,
        generics: &[String],
        location: &Location,
    ) -> Option<TraitRef> {
        match parse_trait_ref(written) {
            Ok(trait_ref) => self.resolve_trait(&trait_ref, generics, location),
            Err(e) => {
                self.parse_failed(location.clone(), written, e);
                None
            }
        }
    }

    fn snippet(&mut self, source: &str, location: &Location) -> Option<Snippet> {
        match Snippet::parse(source) {
            Ok(snippet) => Some(snippet),
            Err(e) => {
                self.fail(
                    location.clone(),
                    ErrorKind::InvalidExpression {
                        source_text: source.to_string(),
                        reason: e.to_string(),
                    },
                );
                None
            }
        }
    }

    fn body(&mut self, source: &str, location: &Location) -> Option<MethodBody> {
        if source.trim() == "extern" {
            return Some(MethodBody::Extern);
        }
        self.snippet(source, location).map(MethodBody::Expr)
    }

    fn signature(
        &mut self,
        written: &str,
        generics: &[String],
        location: &Location,
    ) -> Option<MethodSig> {
        let sig = match parse_signature(written) {
            Ok(sig) => sig,
            Err(e) => {
                self.parse_failed(location.clone(), written, e);
                return None;
            }
        };
        let mut params = Vec::with_capacity(sig.params.len());
        for (name, ty) in &sig.params {
            params.push((name.clone(), self.resolve(ty, generics, location)?));
        }
        let ret = self.resolve(&sig.ret, generics, location)?;
        Some(MethodSig {
            params,
            ret,
            ..sig
        })
    }

    /// Generic parameters plus the bounds written inline (`T: PartialEq`).
    fn generics(
        &mut self,
        written: &[String],
        location: &Location,
    ) -> Option<(Vec<Generic>, Vec<Bound>)> {
        let mut parsed = Vec::with_capacity(written.len());
        for (i, text) in written.iter().enumerate() {
            match parse_generic(text) {
                Ok(generic) => parsed.push(generic),
                Err(e) => {
                    self.parse_failed(location.at(i.to_string()), text, e);
                    return None;
                }
            }
        }
        let names: Vec<String> = parsed.iter().map(|g| g.name.clone()).collect();
        let unique: BTreeSet<&String> = names.iter().collect();
        if unique.len() != names.len() {
            self.invalid(location.clone(), "generic parameter declared twice");
            return None;
        }

        let mut generics = Vec::with_capacity(parsed.len());
        let mut bounds = Vec::new();
        for (i, generic) in parsed.iter().enumerate() {
            let at = location.at(i.to_string());
            let kind = match &generic.const_ty {
                Some(ty) => GenericKind::Const(self.resolve(ty, &names, &at)?),
                None => GenericKind::Type,
            };
            let default = match &generic.default {
                Some(ty) => Some(self.resolve(ty, &names, &at)?),
                None => None,
            };
            for bound in &generic.bounds {
                bounds.push(Bound {
                    ty: Ty::Param(generic.name.clone()),
                    trait_ref: self.resolve_trait(&bound.trait_ref, &names, &at)?,
                    const_required: bound.const_required,
                });
            }
            generics.push(Generic {
                name: generic.name.clone(),
                kind,
                default,
            });
        }
        Some((generics, bounds))
    }

    fn where_bounds(
        &mut self,
        written: &[String],
        generics: &[String],
        location: &Location,
    ) -> Option<Vec<Bound>> {
        let mut bounds = Vec::new();
        for (i, text) in written.iter().enumerate() {
            let at = location.at(i.to_string());
            let (bounded, written_bounds) = match parse_where(text) {
                Ok(parsed) => parsed,
                Err(e) => {
                    self.parse_failed(at, text, e);
                    return None;
                }
            };
            let ty = self.resolve(&bounded, generics, &at)?;
            for bound in written_bounds {
                bounds.push(Bound {
                    ty: ty.clone(),
                    trait_ref: self.resolve_trait(&bound.trait_ref, generics, &at)?,
                    const_required: bound.const_required,
                });
            }
        }
        Some(bounds)
    }

    fn unbounded_generics(&mut self, written: &[String], location: &Location) -> Option<Vec<Generic>> {
        let (generics, bounds) = self.generics(written, location)?;
        if !bounds.is_empty() {
            self.invalid(
                location.clone(),
                "bounds belong on impls, not on type parameters",
            );
            return None;
        }
        Some(generics)
    }

    fn checks(&mut self, list: &CheckList, subject: Option<&str>, location: &Location) -> Vec<CheckSpec> {
        let mut checks = Vec::with_capacity(list.0.len());
        for (i, check) in list.0.iter().enumerate() {
            if let Some(snippet) = self.snippet(check.source(), &location.at(i.to_string())) {
                checks.push(CheckSpec {
                    snippet,
                    subject: subject.map(str::to_string),
                    explain: check.explain().map(str::to_string),
                });
            }
        }
        checks
    }

    fn type_decl(&mut self, name: &str, written: &TypeDoc, location: Location) -> Option<TypeDecl> {
        let generics = self.unbounded_generics(&written.generics, &location.at("generics"))?;
        let names = Generic::names(&generics);
        let shapes = [
            !written.fields.is_empty(),
            !written.variants.is_empty(),
            written.inner.is_some(),
            written.alias.is_some(),
        ];
        if shapes.iter().filter(|s| **s).count() > 1 {
            self.invalid(
                location,
                "a type has at most one of `fields`, `variants`, `inner` and `alias`",
            );
            return None;
        }

        let kind = if !written.fields.is_empty() {
            let mut fields = Vec::with_capacity(written.fields.len());
            for (field, doc) in written.fields.iter() {
                let ty = self.ty(doc.ty(), &names, &location.at("fields").at(field))?;
                let (public, explain) = match doc {
                    crate::config::FieldDoc::Short(_) => (true, None),
                    crate::config::FieldDoc::Full { private, explain, .. } => {
                        (!private, explain.clone())
                    }
                };
                fields.push(FieldDecl {
                    name: field.clone(),
                    ty,
                    public,
                    explain,
                });
            }
            TypeKind::Struct { fields }
        } else if !written.variants.is_empty() {
            let unique: BTreeSet<&String> = written.variants.iter().collect();
            if unique.len() != written.variants.len() {
                self.invalid(location.at("variants"), "variant declared twice");
                return None;
            }
            TypeKind::Enum {
                variants: written.variants.clone(),
            }
        } else if let Some(inner) = &written.inner {
            TypeKind::Transparent {
                inner: self.ty(inner, &names, &location.at("inner"))?,
            }
        } else if let Some(alias) = &written.alias {
            TypeKind::Alias(self.ty(alias, &names, &location.at("alias"))?)
        } else {
            TypeKind::Native
        };

        Some(TypeDecl {
            path: join(self.module, name),
            name: name.to_string(),
            module: self.module.to_string(),
            generics,
            kind,
            component: None,
            explain: written.explain.clone(),
        })
    }

    fn trait_decl(&mut self, name: &str, written: &TraitDoc, location: Location) -> Option<TraitDecl> {
        let generics = self.unbounded_generics(&written.generics, &location.at("generics"))?;
        let names = Generic::names(&generics);

        let mut assoc = Vec::with_capacity(written.assoc.len());
        for (assoc_name, bound) in written.assoc.iter() {
            let bound = match bound {
                Some(text) => {
                    Some(self.trait_ref(text, &names, &location.at("assoc").at(assoc_name))?)
                }
                None => None,
            };
            assoc.push(AssocDecl {
                name: assoc_name.clone(),
                bound,
            });
        }

        let mut methods: Vec<TraitMethod> = Vec::with_capacity(written.methods.len());
        for (i, method) in written.methods.iter().enumerate() {
            let at = location.at("methods").at(i.to_string());
            let sig = self.signature(method.sig(), &names, &at)?;
            if methods.iter().any(|m| m.sig.name == sig.name) {
                self.fail(at, duplicate(&format!("{}::{}", name, sig.name), Namespace::Method));
                return None;
            }
            let default = match method.default_body() {
                Some(body) => Some(self.snippet(body, &at)?),
                None => None,
            };
            methods.push(TraitMethod { sig, default });
        }

        let specialization = match &written.specialization {
            Some(spec) => {
                let at = location.at("specialization");
                let of = self.trait_ref(&spec.of, &names, &at.at("of"))?;
                let mut defaults = Vec::with_capacity(spec.defaults.len());
                for (method, body) in spec.defaults.iter() {
                    defaults.push((
                        method.clone(),
                        self.snippet(&body.0, &at.at("defaults").at(method))?,
                    ));
                }
                Some(Specialization { of, defaults })
            }
            None => None,
        };

        Some(TraitDecl {
            path: join(self.module, name),
            name: name.to_string(),
            module: self.module.to_string(),
            generics,
            assoc,
            methods,
            specialization,
            explain: written.explain.clone(),
        })
    }

    fn impl_decl(&mut self, written: &ImplDoc, location: Location) -> Option<PendingImpl> {
        let (generics, mut bounds) = self.generics(&written.generics, &location.at("generics"))?;
        let names = Generic::names(&generics);
        let target = self.ty(&written.target, &names, &location.at("for"))?;
        let trait_ref = match &written.trait_ref {
            Some(text) => Some(self.trait_ref(text, &names, &location.at("trait"))?),
            None => None,
        };
        bounds.extend(self.where_bounds(&written.bounds, &names, &location.at("where"))?);
        if trait_ref.is_none() && !matches!(target, Ty::Named { .. }) {
            self.invalid(location.at("for"), "inherent impls need a named target type");
            return None;
        }

        let mut assoc = Vec::with_capacity(written.assoc.len());
        for (name, text) in written.assoc.iter() {
            assoc.push((name.clone(), self.ty(text, &names, &location.at("assoc").at(name))?));
        }

        let mut methods: Vec<ImplMethod> = Vec::with_capacity(written.methods.len());
        let mut unsigned = BTreeSet::new();
        for (key, body) in written.methods.iter() {
            let at = location.at("methods").at(key);
            let body = self.body(&body.0, &at)?;
            let sig = if key.contains('(') {
                self.signature(key, &names, &at)?
            } else if trait_ref.is_none() {
                self.invalid(at, "inherent methods need a full signature");
                return None;
            } else {
                unsigned.insert(key.clone());
                MethodSig {
                    name: key.clone(),
                    tag: MethodTag::Regular,
                    receiver: true,
                    params: vec![],
                    ret: Ty::Unit,
                }
            };
            if methods.iter().any(|m| m.sig.name == sig.name) {
                self.fail(at, duplicate(&sig.name, Namespace::Method));
                return None;
            }
            methods.push(ImplMethod { sig, body });
        }

        Some(PendingImpl {
            decl: ImplDecl {
                id: ImplId(0),
                module: self.module.to_string(),
                document: self.origin.to_string(),
                generics,
                target,
                trait_ref,
                bounds,
                assoc,
                methods,
                is_const: written.is_const,
                origin: ImplOrigin::Declared,
            },
            unsigned,
            location,
        })
    }

    fn extension_decl(
        &mut self,
        name: &str,
        written: &ExtensionDoc,
        location: Location,
    ) -> Option<ExtensionDecl> {
        let (generics, mut bounds) = self.generics(&written.generics, &location.at("generics"))?;
        let names = Generic::names(&generics);
        let target = self.ty(&written.target, &names, &location.at("for"))?;
        bounds.extend(self.where_bounds(&written.bounds, &names, &location.at("where"))?);

        let mut methods: Vec<ImplMethod> = Vec::with_capacity(written.methods.len());
        for (key, body) in written.methods.iter() {
            let at = location.at("methods").at(key);
            if !key.contains('(') {
                self.invalid(at, "extension methods need a full signature");
                return None;
            }
            let body = self.body(&body.0, &at)?;
            let sig = self
                .signature(key, &names, &at)?
                .map_types(&mut |ty| self_to(ty, &target));
            if methods.iter().any(|m| m.sig.name == sig.name) {
                self.fail(at, duplicate(&sig.name, Namespace::Method));
                return None;
            }
            methods.push(ImplMethod { sig, body });
        }

        Some(ExtensionDecl {
            path: join(self.module, name),
            name: name.to_string(),
            module: self.module.to_string(),
            generics,
            target,
            bounds,
            methods,
        })
    }

    fn component(
        &mut self,
        doc: &Document,
        kind: ComponentKind,
    ) -> Option<(TypeDecl, Schema, PendingComponent)> {
        let location = doc.location();
        let file = &doc.file;
        let generics = self.unbounded_generics(&file.generics, &location.at("generics"))?;
        let names = Generic::names(&generics);

        let mut optional = |written: &Option<String>, section: &str| -> Result<Option<Ty>, ()> {
            match written {
                Some(text) => self.ty(text, &names, &location.at(section)).map(Some).ok_or(()),
                None => Ok(None),
            }
        };
        let input = optional(&file.input, "input").ok()?;
        let output = optional(&file.output, "output").ok()?;
        let item = optional(&file.item, "item").ok()?;

        let mut columns = Vec::with_capacity(file.columns.len());
        let mut runtime_checks = Vec::new();
        for (name, column) in file.columns.iter() {
            let at = location.at("columns").at(name);
            columns.push(FieldDecl {
                name: name.clone(),
                ty: self.ty(&column.ty, &names, &at)?,
                public: true,
                explain: column.explain.clone(),
            });
            runtime_checks.extend(self.checks(&column.check, Some(name), &at.at("check")));
        }
        runtime_checks.extend(self.checks(&file.column_checks, None, &location.at("column_checks")));

        let mut params = Vec::with_capacity(file.params.len());
        for (name, param) in file.params.iter() {
            let at = location.at("params").at(name);
            let ty = self.ty(&param.ty, &names, &at.at("type"))?;
            let default = match &param.default {
                Some(text) => Some(self.snippet(&text.0, &at.at("default"))?),
                None => None,
            };
            params.push(ParamSpec {
                name: name.clone(),
                ty,
                default,
                checks: self.checks(&param.check, Some(name), &at.at("check")),
                explain: param.explain.clone(),
            });
        }
        let checks = self.checks(&file.checks, None, &location.at("checks"));

        let type_kind = if kind == ComponentKind::Source && item.is_none() && !columns.is_empty() {
            TypeKind::Struct { fields: columns }
        } else {
            TypeKind::Native
        };
        let decl = TypeDecl {
            path: self.module.to_string(),
            name: doc.name().to_string(),
            module: self.module.to_string(),
            generics: generics.clone(),
            kind: type_kind,
            component: Some(kind),
            explain: file.explain.clone(),
        };
        let schema = Schema {
            component: self.module.to_string(),
            kind: Some(kind),
            module: self.module.to_string(),
            document: self.origin.to_string(),
            generics,
            params,
            checks,
            runtime_checks,
        };
        let pending = PendingComponent {
            path: self.module.to_string(),
            kind,
            input,
            output,
            item,
            location,
        };
        Some((decl, schema, pending))
    }
}

/// Bind the names one `use` entry brings into `scope`.
fn import(
    index: &SymbolIndex,
    scope: &mut ModuleScope,
    strengths: &mut BTreeMap<String, Binding>,
    written: &str,
) -> Result<(), ErrorKind> {
    let (path, alias) = match written.split_once(" as ") {
        Some((path, alias)) => (path.trim(), Some(alias.trim())),
        None => (written.trim(), None),
    };
    let unknown = || ErrorKind::UnknownImport {
        path: written.to_string(),
    };

    if let Some(module) = path.strip_suffix("::*") {
        if alias.is_some() {
            return Err(ErrorKind::InvalidDeclaration {
                reason: format!("glob import `{}` cannot be renamed", written),
            });
        }
        let members = index.modules.get(module).ok_or_else(unknown)?;
        for name in members {
            let full = join(module, name);
            if let Some(symbol) = index.symbol(&full) {
                scope
                    .bind(name, symbol, Binding::Glob, strengths)
                    .map_err(|_| duplicate(name, Namespace::Type))?;
            }
            if index.extensions.contains(&full) {
                scope
                    .bind_extension(name, &full)
                    .map_err(|_| duplicate(name, Namespace::Extension))?;
            }
        }
        return Ok(());
    }

    let name = alias.unwrap_or_else(|| path.rsplit("::").next().unwrap_or(path));
    let mut found = false;
    if let Some(symbol) = index.symbol(path) {
        scope
            .bind(name, symbol, Binding::Explicit, strengths)
            .map_err(|_| duplicate(name, Namespace::Type))?;
        found = true;
    }
    if index.extensions.contains(path) {
        scope
            .bind_extension(name, path)
            .map_err(|_| duplicate(name, Namespace::Extension))?;
        found = true;
    }
    if found {
        Ok(())
    } else {
        Err(unknown())
    }
}

fn component_kind(kind: DocumentKind) -> Option<ComponentKind> {
    match kind {
        DocumentKind::Source => Some(ComponentKind::Source),
        DocumentKind::Sink => Some(ComponentKind::Sink),
        DocumentKind::Transform => Some(ComponentKind::Transform),
        DocumentKind::Feeder => Some(ComponentKind::Feeder),
        DocumentKind::Main | DocumentKind::Struct => None,
    }
}

/// Sections present in a document whose kind gives them no meaning.
fn misplaced_sections(doc: &Document) -> Vec<String> {
    let file = &doc.file;
    let kind = doc.kind();
    let mut present = Vec::new();
    let schema_sections = [
        ("generics", !file.generics.is_empty()),
        ("params", !file.params.is_empty()),
        ("checks", !file.checks.0.is_empty()),
    ];
    if matches!(kind, DocumentKind::Main | DocumentKind::Struct) {
        present.extend(schema_sections.iter().filter(|(_, p)| *p).map(|(s, _)| *s));
    }
    if kind != DocumentKind::Main {
        if !file.bindings.is_empty() {
            present.push("let");
        }
        if !file.pipes.is_empty() {
            present.push("pipe");
        }
    }
    if kind != DocumentKind::Source {
        if file.item.is_some() {
            present.push("item");
        }
        if !file.columns.is_empty() {
            present.push("columns");
        }
        if !file.column_checks.0.is_empty() {
            present.push("column_checks");
        }
    } else if file.input.is_some() {
        present.push("input");
    }
    if kind != DocumentKind::Transform && file.output.is_some() {
        present.push("output");
    }
    if matches!(kind, DocumentKind::Main | DocumentKind::Struct) && file.input.is_some() {
        present.push("input");
    }
    present
        .into_iter()
        .map(|section| format!("section `{}` is not allowed in a {:?} document", section, kind).to_lowercase())
        .collect()
}

/// Rename generic parameters by order of appearance so alpha-equivalent terms compare equal.
fn canonical(tys: &[Ty]) -> Vec<Ty> {
    let mut renames: BTreeMap<String, String> = BTreeMap::new();
    tys.iter()
        .map(|ty| {
            ty.map(&mut |node| match node {
                Ty::Param(name) => {
                    let next = format!("${}", renames.len());
                    Some(Ty::Param(renames.entry(name.clone()).or_insert(next).clone()))
                }
                _ => None,
            })
        })
        .collect()
}

fn self_to(ty: &Ty, target: &Ty) -> Option<Ty> {
    match ty {
        Ty::SelfTy => Some(target.clone()),
        _ => None,
    }
}

fn duplicate(name: &str, namespace: Namespace) -> ErrorKind {
    ErrorKind::DuplicateDeclaration {
        name: name.to_string(),
        namespace,
    }
}

fn join(module: &str, name: &str) -> String {
    format!("{}::{}", module, name)
}
