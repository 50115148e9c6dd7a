// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Method call resolution.
//!
//! A call `recv.name(..)` is looked up in two tiers:
//!
//! 1. inherent methods of the receiver type together with the visible extensions;
//! 2. methods of traits the receiver implements.
//!
//! More than one provider in a tier is ambiguous and must be re-issued in qualified form
//! (`Ext::name(recv, ..)` or `Trait::name(recv, ..)`), which [`MethodResolver::resolve_qualified`]
//! answers.

use super::traits::{Candidate, CandidateOrigin, Resolution, TraitResolver};
use super::unify::unify;
use crate::observability::messages::resolver::MethodResolved;
use crate::observability::messages::StructuredLog;
use crate::store::{
    Bound, Generic, ImplId, MethodBody, MethodSig, MethodTag, Store, Subst, SymbolKind, TraitDecl,
    TraitRef, Ty,
};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MethodProvider {
    Inherent { impl_id: ImplId },
    Extension { path: String },
    Trait { trait_path: String, candidate: Candidate },
}

impl fmt::Display for MethodProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodProvider::Inherent { impl_id } => write!(f, "inherent impl #{}", impl_id.0),
            MethodProvider::Extension { path } => write!(f, "extension {}", path),
            MethodProvider::Trait { trait_path, .. } => write!(f, "trait {}", trait_path),
        }
    }
}

/// The method a call resolved to, instantiated for the receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRef {
    pub name: String,
    pub provider: MethodProvider,
    pub sig: MethodSig,
    /// `None` when no body exists anywhere (an extern trait method without an impl body).
    pub body: Option<MethodBody>,
    /// Module whose names the body sees.
    pub module: String,
    /// Const-tagged, or provided by a const-specialized impl.
    pub const_capable: bool,
}

impl MethodRef {
    /// A call can be evaluated at declaration time when its arguments are known.
    pub fn is_const_evaluable(&self, args_known: bool) -> bool {
        self.const_capable && args_known
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodResolution {
    Found(MethodRef),
    Ambiguous {
        candidates: Vec<String>,
        requires_qualification: bool,
    },
    NotFound,
}

#[derive(Debug, Clone, Copy)]
pub struct MethodResolver<'s> {
    store: &'s Store,
    traits: TraitResolver<'s>,
}

impl<'s> MethodResolver<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self {
            store,
            traits: TraitResolver::new(store),
        }
    }

    pub fn with_traits(traits: TraitResolver<'s>) -> Self {
        Self {
            store: traits.store(),
            traits,
        }
    }

    /// Resolve `receiver.name(..)` with `visible_extensions` in scope.
    pub fn resolve_call(
        &self,
        receiver: &Ty,
        name: &str,
        visible_extensions: &[String],
    ) -> MethodResolution {
        let receiver = self.store.normalize(receiver);
        let resolution = self.resolve_unlogged(&receiver, name, visible_extensions);
        if let MethodResolution::Found(method) = &resolution {
            MethodResolved {
                receiver: &receiver.to_string(),
                method: name,
                provider: &method.provider.to_string(),
                const_capable: method.const_capable,
            }
            .log();
        }
        resolution
    }

    fn resolve_unlogged(
        &self,
        receiver: &Ty,
        name: &str,
        visible_extensions: &[String],
    ) -> MethodResolution {
        let mut first_tier = self.inherent(receiver, name);
        for path in visible_extensions {
            if let Some(method) = self.extension(receiver, path, name) {
                first_tier.push(method);
            }
        }
        match first_tier.len() {
            0 => {}
            1 => return first_tier.pop().map_or(MethodResolution::NotFound, MethodResolution::Found),
            _ => {
                return MethodResolution::Ambiguous {
                    candidates: first_tier.iter().map(|m| self.describe(m)).collect(),
                    requires_qualification: true,
                }
            }
        }
        self.trait_tier(receiver, name)
    }

    /// Resolve `Qualifier::name(..)`, where `qualifier` is the canonical path of an
    /// extension, a trait or a type. `receiver` is the type of the first argument when
    /// the call has one.
    pub fn resolve_qualified(
        &self,
        receiver: Option<&Ty>,
        qualifier: &str,
        name: &str,
    ) -> MethodResolution {
        let receiver = receiver.map(|r| self.store.normalize(r));
        if self.store.extension(qualifier).is_some() {
            let Some(receiver) = receiver else {
                return MethodResolution::NotFound;
            };
            return self
                .extension(&receiver, qualifier, name)
                .map_or(MethodResolution::NotFound, MethodResolution::Found);
        }
        match self.store.index().symbol(qualifier).map(|s| s.kind) {
            Some(SymbolKind::Trait) => {
                let (Some(receiver), Some(trait_decl)) = (receiver, self.store.trait_decl(qualifier))
                else {
                    return MethodResolution::NotFound;
                };
                match self.via_trait(&receiver, trait_decl, name) {
                    Some(Ok(method)) => MethodResolution::Found(method),
                    Some(Err(candidates)) => MethodResolution::Ambiguous {
                        candidates,
                        requires_qualification: false,
                    },
                    None => MethodResolution::NotFound,
                }
            }
            Some(SymbolKind::Type) => {
                // `Type::function(..)`: the receiver is the type itself, arguments unknown.
                let Some(decl) = self.store.type_decl(qualifier) else {
                    return MethodResolution::NotFound;
                };
                let self_ty = Ty::named(decl.path.clone(), vec![Ty::Infer; decl.generics.len()]);
                let resolution = self.inherent(&self_ty, name);
                match resolution.len() {
                    0 => self.trait_tier(&self_ty, name),
                    1 => resolution
                        .into_iter()
                        .next()
                        .map_or(MethodResolution::NotFound, MethodResolution::Found),
                    _ => MethodResolution::Ambiguous {
                        candidates: resolution.iter().map(|m| self.describe(m)).collect(),
                        requires_qualification: true,
                    },
                }
            }
            _ => MethodResolution::NotFound,
        }
    }

    fn inherent(&self, receiver: &Ty, name: &str) -> Vec<MethodRef> {
        let mut out = Vec::new();
        for decl in self.store.inherent_impls() {
            let Some(method) = decl.method(name) else {
                continue;
            };
            let Some(subst) = self.instantiate(&decl.generics, &decl.target, &decl.bounds, receiver)
            else {
                continue;
            };
            out.push(MethodRef {
                name: name.to_string(),
                provider: MethodProvider::Inherent { impl_id: decl.id },
                sig: substitute_sig(&method.sig, &subst),
                body: Some(method.body.clone()),
                module: decl.module.clone(),
                const_capable: method.sig.tag == MethodTag::Const || decl.is_const,
            });
        }
        out
    }

    fn extension(&self, receiver: &Ty, path: &str, name: &str) -> Option<MethodRef> {
        let decl = self.store.extension(path)?;
        let method = decl.method(name)?;
        let subst = self.instantiate(&decl.generics, &decl.target, &decl.bounds, receiver)?;
        Some(MethodRef {
            name: name.to_string(),
            provider: MethodProvider::Extension {
                path: path.to_string(),
            },
            sig: substitute_sig(&method.sig, &subst),
            body: Some(method.body.clone()),
            module: decl.module.clone(),
            const_capable: method.sig.tag == MethodTag::Const,
        })
    }

    /// Bindings making `target` match `receiver` with every bound satisfied.
    fn instantiate(
        &self,
        generics: &[Generic],
        target: &Ty,
        bounds: &[Bound],
        receiver: &Ty,
    ) -> Option<Subst> {
        let vars: BTreeSet<String> = Generic::names(generics).into_iter().collect();
        let mut subst = Subst::new();
        if !unify(&self.store.normalize(target), receiver, &vars, &mut subst) {
            return None;
        }
        let holds = bounds.iter().all(|bound| {
            let ty = bound.ty.substitute(&subst);
            if !ty.is_concrete() {
                // Nothing to check against while the receiver is partly unknown.
                return true;
            }
            match self.traits.resolve(&ty, &bound.trait_ref.substitute(&subst)) {
                Resolution::Candidate(c) => !bound.const_required || c.is_const,
                _ => false,
            }
        });
        holds.then_some(subst)
    }

    fn trait_tier(&self, receiver: &Ty, name: &str) -> MethodResolution {
        let mut found: Vec<(&TraitDecl, MethodRef)> = Vec::new();
        let mut ambiguous = Vec::new();
        for trait_decl in self.store.traits() {
            match self.via_trait(receiver, trait_decl, name) {
                Some(Ok(method)) => found.push((trait_decl, method)),
                Some(Err(candidates)) => ambiguous.extend(candidates),
                None => {}
            }
        }
        if !ambiguous.is_empty() {
            return MethodResolution::Ambiguous {
                candidates: ambiguous,
                requires_qualification: false,
            };
        }

        // A const-specialized trait hides the trait it specializes.
        let hidden: BTreeSet<String> = found
            .iter()
            .filter_map(|(t, _)| t.specialization.as_ref().map(|s| s.of.path.clone()))
            .collect();
        let mut visible: Vec<MethodRef> = found
            .into_iter()
            .filter(|(t, _)| !hidden.contains(&t.path))
            .map(|(_, method)| method)
            .collect();
        match visible.len() {
            0 => MethodResolution::NotFound,
            1 => visible.pop().map_or(MethodResolution::NotFound, MethodResolution::Found),
            _ => MethodResolution::Ambiguous {
                candidates: visible.iter().map(|m| self.describe(m)).collect(),
                requires_qualification: true,
            },
        }
    }

    /// The method `name` of `trait_decl` for `receiver`; `Err` lists tied impls.
    fn via_trait(
        &self,
        receiver: &Ty,
        trait_decl: &TraitDecl,
        name: &str,
    ) -> Option<Result<MethodRef, Vec<String>>> {
        let declared = trait_decl.method(name)?;
        let args = trait_decl.complete_args(receiver, &[]);
        let query = TraitRef::new(trait_decl.path.clone(), args.clone());
        let candidate = match self.traits.resolve(receiver, &query) {
            Resolution::Candidate(candidate) => candidate,
            Resolution::Ambiguous(candidates) => {
                return Some(Err(candidates
                    .iter()
                    .map(|c| c.describe(self.store))
                    .collect()))
            }
            Resolution::NotImplemented => return None,
        };

        let decl = candidate.impl_id.and_then(|id| self.store.impl_decl(id));
        let specialized_by = match &candidate.origin {
            CandidateOrigin::Specialization { via } => self.store.trait_decl(via),
            _ => None,
        };
        let trait_subst = trait_decl.subst_for(&args);
        let assoc = candidate.assoc.clone();
        let instantiate = |sig: &MethodSig| {
            sig.map_types(&mut |ty| match ty {
                Ty::Projection { base, name } if **base == Ty::SelfTy => assoc
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, t)| t.clone()),
                Ty::SelfTy => Some(receiver.clone()),
                Ty::Param(param) => trait_subst.get(param).cloned(),
                _ => None,
            })
        };

        // Impl body, then the specializing trait's default, then the trait's own default.
        let own = decl.and_then(|d| d.method(name).map(|m| (d, m)));
        let specialized_default =
            specialized_by.and_then(|t| t.specialization_default(name).map(|body| (t, body)));
        let (sig, body, module) = match (own, specialized_default) {
            (Some((d, m)), _) => (
                substitute_sig(&m.sig, &candidate.subst),
                Some(m.body.clone()),
                d.module.clone(),
            ),
            (None, Some((spec_trait, default))) => (
                instantiate(&declared.sig),
                Some(MethodBody::Expr(default.clone())),
                spec_trait.module.clone(),
            ),
            (None, None) => (
                instantiate(&declared.sig),
                declared.default.clone().map(MethodBody::Expr),
                trait_decl.module.clone(),
            ),
        };
        let const_capable = sig.tag == MethodTag::Const || candidate.is_const;
        Some(Ok(MethodRef {
            name: name.to_string(),
            provider: MethodProvider::Trait {
                trait_path: trait_decl.path.clone(),
                candidate,
            },
            sig,
            body,
            module,
            const_capable,
        }))
    }

    fn describe(&self, method: &MethodRef) -> String {
        match &method.provider {
            MethodProvider::Inherent { impl_id } => match self.store.impl_decl(*impl_id) {
                Some(decl) => format!("inherent {}::{}", decl.target, method.name),
                None => format!("inherent {}", method.name),
            },
            MethodProvider::Extension { path } => format!("{}::{}", path, method.name),
            MethodProvider::Trait { trait_path, .. } => format!("{}::{}", trait_path, method.name),
        }
    }
}

fn substitute_sig(sig: &MethodSig, subst: &Subst) -> MethodSig {
    sig.map_types(&mut |ty| match ty {
        Ty::Param(name) => subst.get(name).cloned(),
        _ => None,
    })
}
