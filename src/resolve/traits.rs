// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Trait resolution: which impl makes a type implement a trait.
//!
//! Candidates are gathered in three tiers, and the first tier with any match decides:
//!
//! 1. impls of a const-specialized trait whose `specialization` block derives the
//!    queried trait, when every bound of the impl holds;
//! 2. impls whose target is not a bare parameter;
//! 3. blanket impls.
//!
//! Within a tier more than one match is [`Resolution::Ambiguous`]. Declaration order
//! never breaks a tie.

use super::unify::{types_match, unify};
use crate::observability::messages::resolver::{ObligationAbandoned, ObligationResolved};
use crate::observability::messages::StructuredLog;
use crate::store::{Generic, ImplDecl, ImplId, Store, Subst, TraitDecl, TraitRef, Ty};
use std::collections::BTreeSet;
use std::fmt;

/// How a candidate came to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOrigin {
    Direct,
    Blanket,
    /// Derived from an impl of the const-specialized trait `via`.
    Specialization { via: String },
    /// The type is an opaque `impl Trait` that promises the trait itself.
    Opaque,
}

/// One way a type implements a trait.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// `None` for opaque types.
    pub impl_id: Option<ImplId>,
    /// The trait that was queried.
    pub trait_path: String,
    pub origin: CandidateOrigin,
    /// Bindings of the impl's generic parameters.
    pub subst: Subst,
    /// Usable by `~const` bounds and const evaluation.
    pub is_const: bool,
    /// Associated types, instantiated.
    pub assoc: Vec<(String, Ty)>,
}

impl Candidate {
    pub fn assoc(&self, name: &str) -> Option<&Ty> {
        self.assoc.iter().find(|(n, _)| n == name).map(|(_, ty)| ty)
    }

    /// Human-readable form used in diagnostics.
    pub fn describe(&self, store: &Store) -> String {
        let decl = self.impl_id.and_then(|id| store.impl_decl(id));
        match (&self.origin, decl) {
            (CandidateOrigin::Opaque, _) | (_, None) => format!("opaque {}", short(&self.trait_path)),
            (CandidateOrigin::Specialization { .. }, Some(decl)) => {
                format!("{} (specialized) in {}", decl, decl.document)
            }
            (_, Some(decl)) => format!("{} in {}", decl, decl.document),
        }
    }
}

fn short(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Candidate(Candidate),
    Ambiguous(Vec<Candidate>),
    NotImplemented,
}

impl Resolution {
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Resolution::Candidate(candidate) => Some(candidate),
            _ => None,
        }
    }

    fn from_tier(mut tier: Vec<Candidate>) -> Option<Resolution> {
        match tier.len() {
            0 => None,
            1 => tier.pop().map(Resolution::Candidate),
            _ => Some(Resolution::Ambiguous(tier)),
        }
    }

    fn describe(&self, store: &Store) -> String {
        match self {
            Resolution::Candidate(c) => c.describe(store),
            Resolution::Ambiguous(cs) => format!("ambiguous between {} candidates", cs.len()),
            Resolution::NotImplemented => "not implemented".to_string(),
        }
    }
}

type Obligation = (Ty, TraitRef);

/// Answers trait obligations against a [`Store`].
///
/// Resolution is a pure function of the store and the query; a resolver holds no state
/// between calls and can be shared by threads.
#[derive(Debug, Clone, Copy)]
pub struct TraitResolver<'s> {
    store: &'s Store,
    max_depth: usize,
}

impl<'s> TraitResolver<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self {
            store,
            max_depth: store.max_depth(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn store(&self) -> &'s Store {
        self.store
    }

    /// Resolve `ty: trait_ref`. Omitted trait arguments take their declared defaults.
    pub fn resolve(&self, ty: &Ty, trait_ref: &TraitRef) -> Resolution {
        let mut stack = Vec::new();
        let resolution = self.resolve_in(ty, trait_ref, &mut stack);
        ObligationResolved {
            ty: &ty.to_string(),
            trait_ref: &trait_ref.to_string(),
            outcome: &resolution.describe(self.store),
        }
        .log();
        resolution
    }

    /// True when exactly one candidate applies.
    pub fn implements(&self, ty: &Ty, trait_ref: &TraitRef) -> bool {
        matches!(self.resolve(ty, trait_ref), Resolution::Candidate(_))
    }

    /// The associated type `name` of `ty` under the trait `trait_path`.
    pub fn project(&self, ty: &Ty, trait_path: &str, name: &str) -> Option<Ty> {
        match self.resolve(ty, &TraitRef::new(trait_path, vec![])) {
            Resolution::Candidate(candidate) => candidate.assoc(name).cloned(),
            _ => None,
        }
    }

    fn resolve_in(&self, ty: &Ty, trait_ref: &TraitRef, stack: &mut Vec<Obligation>) -> Resolution {
        let Some(trait_decl) = self.store.trait_decl(&trait_ref.path) else {
            return Resolution::NotImplemented;
        };
        let ty = self.store.normalize(ty);
        let query = TraitRef {
            path: trait_ref.path.clone(),
            args: trait_decl
                .complete_args(&ty, &trait_ref.args)
                .iter()
                .map(|a| self.store.normalize(a))
                .collect(),
            assoc: trait_ref
                .assoc
                .iter()
                .map(|(name, t)| (name.clone(), self.store.normalize(t)))
                .collect(),
        };

        let obligation = (ty.clone(), query.clone());
        let cyclic = stack.contains(&obligation);
        if cyclic || stack.len() >= self.max_depth {
            ObligationAbandoned {
                obligation: &format!("{}: {}", ty, query),
                depth: stack.len(),
                cyclic,
            }
            .log();
            return Resolution::NotImplemented;
        }

        stack.push(obligation);
        let resolution = self.select(&ty, &query, trait_decl, stack);
        stack.pop();
        resolution
    }

    fn select(
        &self,
        ty: &Ty,
        query: &TraitRef,
        trait_decl: &TraitDecl,
        stack: &mut Vec<Obligation>,
    ) -> Resolution {
        if let Ty::Impl(promised) = ty {
            if let Some(candidate) = self.opaque(promised, query) {
                return Resolution::Candidate(candidate);
            }
        }

        let derived = self.specialized(ty, query, stack);
        if let Some(resolution) = Resolution::from_tier(derived) {
            return resolution;
        }

        let specializing = trait_decl.specialization.is_some();
        let (blanket, direct): (Vec<&ImplDecl>, Vec<&ImplDecl>) = self
            .store
            .impls_of_trait(&query.path)
            .partition(|decl| decl.is_blanket());

        let direct: Vec<Candidate> = direct
            .into_iter()
            .filter_map(|decl| {
                self.match_impl(decl, ty, &decl_args(decl), query, stack)
                    .map(|(subst, assoc)| Candidate {
                        impl_id: Some(decl.id),
                        trait_path: query.path.clone(),
                        origin: CandidateOrigin::Direct,
                        subst,
                        is_const: decl.is_const || specializing,
                        assoc,
                    })
            })
            .collect();
        if let Some(resolution) = Resolution::from_tier(direct) {
            return resolution;
        }

        let blanket: Vec<Candidate> = blanket
            .into_iter()
            .filter_map(|decl| {
                self.match_impl(decl, ty, &decl_args(decl), query, stack)
                    .map(|(subst, assoc)| Candidate {
                        impl_id: Some(decl.id),
                        trait_path: query.path.clone(),
                        origin: CandidateOrigin::Blanket,
                        subst,
                        is_const: decl.is_const || specializing,
                        assoc,
                    })
            })
            .collect();
        Resolution::from_tier(blanket).unwrap_or(Resolution::NotImplemented)
    }

    /// An `impl Trait` type satisfies its own trait and whatever that trait specializes.
    fn opaque(&self, promised: &TraitRef, query: &TraitRef) -> Option<Candidate> {
        let (args, is_const) = if promised.path == query.path {
            (promised.args.clone(), false)
        } else {
            let promised_decl = self.store.trait_decl(&promised.path)?;
            let spec = promised_decl.specialization.as_ref()?;
            if spec.of.path != query.path {
                return None;
            }
            let derived = spec.of.substitute(&promised_decl.subst_for(&promised.args));
            (derived.args, true)
        };
        // Arguments the promise leaves out are unconstrained.
        let args_match = args
            .iter()
            .zip(&query.args)
            .all(|(promised_arg, wanted)| types_match(promised_arg, wanted));
        if !args_match || !assoc_satisfies(&promised.assoc, &query.assoc) {
            return None;
        }
        Some(Candidate {
            impl_id: None,
            trait_path: query.path.clone(),
            origin: CandidateOrigin::Opaque,
            subst: Subst::new(),
            is_const,
            assoc: promised.assoc.clone(),
        })
    }

    /// Candidates derived from impls of traits that specialize the queried trait.
    fn specialized(&self, ty: &Ty, query: &TraitRef, stack: &mut Vec<Obligation>) -> Vec<Candidate> {
        let mut out = Vec::new();
        for specializing in self.store.specializations_of(&query.path) {
            let Some(spec) = &specializing.specialization else {
                continue;
            };
            for decl in self.store.impls_of_trait(&specializing.path) {
                let own_args = decl_args(decl);
                let derived = spec.of.substitute(&specializing.subst_for(&own_args));
                if let Some((subst, assoc)) = self.match_impl(decl, ty, &derived.args, query, stack) {
                    out.push(Candidate {
                        impl_id: Some(decl.id),
                        trait_path: query.path.clone(),
                        origin: CandidateOrigin::Specialization {
                            via: specializing.path.clone(),
                        },
                        subst,
                        is_const: true,
                        assoc,
                    });
                }
            }
        }
        out
    }

    /// Match one impl, presenting `args` as its trait arguments, against the query.
    fn match_impl(
        &self,
        decl: &ImplDecl,
        ty: &Ty,
        args: &[Ty],
        query: &TraitRef,
        stack: &mut Vec<Obligation>,
    ) -> Option<(Subst, Vec<(String, Ty)>)> {
        let vars: BTreeSet<String> = Generic::names(&decl.generics).into_iter().collect();
        let mut subst = Subst::new();
        if !unify(&self.store.normalize(&decl.target), ty, &vars, &mut subst) {
            return None;
        }
        if args.len() != query.args.len() {
            return None;
        }
        for (arg, wanted) in args.iter().zip(&query.args) {
            if !unify(&self.store.normalize(arg), wanted, &vars, &mut subst) {
                return None;
            }
        }

        let assoc: Vec<(String, Ty)> = decl
            .assoc
            .iter()
            .map(|(name, t)| (name.clone(), self.store.normalize(&t.substitute(&subst))))
            .collect();
        if !assoc_satisfies(&assoc, &query.assoc) {
            return None;
        }

        for bound in &decl.bounds {
            let bound_ty = bound.ty.substitute(&subst);
            let bound_trait = bound.trait_ref.substitute(&subst);
            let satisfied = match self.resolve_in(&bound_ty, &bound_trait, stack) {
                Resolution::Candidate(c) => !bound.const_required || c.is_const,
                Resolution::Ambiguous(cs) => !bound.const_required || cs.iter().all(|c| c.is_const),
                Resolution::NotImplemented => false,
            };
            if !satisfied {
                return None;
            }
        }
        Some((subst, assoc))
    }
}

/// Trait arguments of an impl as finalized by the store.
fn decl_args(decl: &ImplDecl) -> Vec<Ty> {
    decl.trait_ref
        .as_ref()
        .map(|t| t.args.clone())
        .unwrap_or_default()
}

/// Every associated type the query constrains is provided and matches.
fn assoc_satisfies(provided: &[(String, Ty)], wanted: &[(String, Ty)]) -> bool {
    wanted.iter().all(|(name, ty)| {
        provided
            .iter()
            .find(|(n, _)| n == name)
            .is_some_and(|(_, found)| types_match(found, ty))
    })
}

impl fmt::Display for CandidateOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateOrigin::Direct => f.write_str("direct"),
            CandidateOrigin::Blanket => f.write_str("blanket"),
            CandidateOrigin::Specialization { via } => write!(f, "specialized via {}", via),
            CandidateOrigin::Opaque => f.write_str("opaque"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Document;
    use crate::store::lang;

    fn store(yaml: &str) -> Store {
        let doc = Document::from_yaml("t", "t.yaml", yaml).unwrap();
        Store::load(vec![doc]).unwrap()
    }

    fn named(name: &str) -> Ty {
        Ty::named(format!("t::{}", name), vec![])
    }

    fn partial_eq() -> TraitRef {
        TraitRef::new(lang::PARTIAL_EQ, vec![])
    }

    const EQUALITY: &str = r#"
permute: { version: "0.1", type: struct }
types:
  Money: { fields: { cents: u64 } }
  Meters: { fields: { value: f64 } }
impls:
  - for: Money
    trait: PartialEq
    methods:
      eq: self.cents == other.cents
  - for: Money
    trait: ConstEq
    methods:
      eq: self.cents == other.cents
  - for: Meters
    trait: PartialEq
    methods:
      eq: self.value == other.value
"#;

    #[test]
    fn specialization_wins_over_direct_impl() {
        let store = store(EQUALITY);
        let resolver = TraitResolver::new(&store);
        let candidate = resolver.resolve(&named("Money"), &partial_eq()).candidate().cloned().unwrap();
        assert_eq!(
            candidate.origin,
            CandidateOrigin::Specialization {
                via: "std::ConstEq".into()
            }
        );
        assert!(candidate.is_const);

        let meters = resolver.resolve(&named("Meters"), &partial_eq()).candidate().cloned().unwrap();
        assert_eq!(meters.origin, CandidateOrigin::Direct);
        assert!(!meters.is_const);
    }

    #[test]
    fn resolution_is_deterministic() {
        let store = store(EQUALITY);
        let resolver = TraitResolver::new(&store);
        let first = resolver.resolve(&named("Meters"), &partial_eq());
        for _ in 0..10 {
            assert_eq!(resolver.resolve(&named("Meters"), &partial_eq()), first);
        }
    }

    #[test]
    fn scalars_are_const_comparable() {
        let store = store("permute: { version: \"0.1\", type: struct }\n");
        let resolver = TraitResolver::new(&store);
        let candidate = resolver.resolve(&Ty::std("u32", vec![]), &partial_eq());
        assert!(candidate.candidate().unwrap().is_const);
        assert_eq!(
            resolver.resolve(&Ty::std("Vec", vec![Ty::std("u8", vec![])]), &partial_eq()),
            Resolution::NotImplemented
        );
    }

    #[test]
    fn two_matching_blanket_impls_are_ambiguous() {
        let store = store(
            r#"
permute: { version: "0.1", type: struct }
types:
  Thing: {}
traits:
  Describe: {}
  Loud: {}
  Quiet: {}
impls:
  - { for: Thing, trait: Loud }
  - { for: Thing, trait: Quiet }
  - { for: T, generics: [T], trait: Describe, where: ["T: Loud"] }
  - { for: T, generics: [T], trait: Describe, where: ["T: Quiet"] }
"#,
        );
        let resolver = TraitResolver::new(&store);
        match resolver.resolve(&named("Thing"), &TraitRef::new("t::Describe", vec![])) {
            Resolution::Ambiguous(candidates) => {
                assert_eq!(candidates.len(), 2);
                assert!(candidates.iter().all(|c| c.origin == CandidateOrigin::Blanket));
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn blanket_impls_are_tried_after_direct_impls() {
        let store = store(
            r#"
permute: { version: "0.1", type: struct }
types:
  Thing: {}
  Other: {}
traits:
  Describe: {}
impls:
  - { for: Thing, trait: Describe }
  - { for: T, generics: [T], trait: Describe, where: ["T: Default"] }
  - for: Thing
    trait: Default
    methods: { default: "Thing {}" }
  - for: Other
    trait: Default
    methods: { default: "Other {}" }
"#,
        );
        let resolver = TraitResolver::new(&store);
        let describe = TraitRef::new("t::Describe", vec![]);
        let thing = resolver.resolve(&named("Thing"), &describe);
        assert_eq!(thing.candidate().unwrap().origin, CandidateOrigin::Direct);
        let other = resolver.resolve(&named("Other"), &describe);
        assert_eq!(other.candidate().unwrap().origin, CandidateOrigin::Blanket);
        assert!(!resolver.implements(&Ty::std("u8", vec![]), &describe));
    }

    #[test]
    fn const_bounds_need_const_candidates() {
        let store = store(
            r#"
permute: { version: "0.1", type: struct }
types:
  Money: { fields: { cents: u64 } }
  Meters: { fields: { value: f64 } }
  Boxed: { generics: [T], fields: { value: T } }
traits:
  Cheap: {}
impls:
  - for: Money
    trait: ConstEq
    methods: { eq: self.cents == other.cents }
  - for: Meters
    trait: PartialEq
    methods: { eq: self.value == other.value }
  - for: "Boxed<T>"
    generics: ["T: ~const PartialEq"]
    trait: Cheap
"#,
        );
        let resolver = TraitResolver::new(&store);
        let cheap = TraitRef::new("t::Cheap", vec![]);
        let boxed = |inner| Ty::named("t::Boxed", vec![inner]);
        assert!(resolver.implements(&boxed(named("Money")), &cheap));
        assert!(resolver.implements(&boxed(Ty::std("u8", vec![])), &cheap));
        assert!(!resolver.implements(&boxed(named("Meters")), &cheap));
    }

    #[test]
    fn associated_type_constraints_filter_candidates() {
        let store = store(
            r#"
permute: { version: "0.1", type: struct }
types:
  Numbers: {}
impls:
  - { for: Numbers, trait: Source, assoc: { Item: u32 } }
"#,
        );
        let resolver = TraitResolver::new(&store);
        let source = |item| TraitRef::new(lang::SOURCE, vec![]).with_assoc(lang::ITEM, item);
        assert!(resolver.implements(&named("Numbers"), &source(Ty::std("u32", vec![]))));
        assert!(!resolver.implements(&named("Numbers"), &source(Ty::std("String", vec![]))));
        assert_eq!(
            resolver.project(&named("Numbers"), lang::SOURCE, lang::ITEM),
            Some(Ty::std("u32", vec![]))
        );
    }

    #[test]
    fn opaque_types_satisfy_their_promise() {
        let store = store("permute: { version: \"0.1\", type: struct }\n");
        let resolver = TraitResolver::new(&store);
        let opaque = Ty::Impl(Box::new(
            TraitRef::new(lang::SOURCE, vec![]).with_assoc(lang::ITEM, Ty::std("u8", vec![])),
        ));
        let candidate = resolver.resolve(&opaque, &TraitRef::new(lang::SOURCE, vec![]));
        assert_eq!(candidate.candidate().unwrap().origin, CandidateOrigin::Opaque);
        assert!(!resolver.implements(&opaque, &TraitRef::new(lang::TRANSPARENT, vec![])));
    }

    #[test]
    fn cyclic_obligations_are_unsatisfied() {
        let store = store(
            r#"
permute: { version: "0.1", type: struct }
types:
  Thing: {}
traits:
  Ping: {}
  Pong: {}
impls:
  - { for: T, generics: [T], trait: Ping, where: ["T: Pong"] }
  - { for: T, generics: [T], trait: Pong, where: ["T: Ping"] }
"#,
        );
        let resolver = TraitResolver::new(&store).with_max_depth(8);
        assert_eq!(
            resolver.resolve(&named("Thing"), &TraitRef::new("t::Ping", vec![])),
            Resolution::NotImplemented
        );
    }
}
