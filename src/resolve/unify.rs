// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! One-sided unification of declaration-side type patterns against query types.

use crate::store::{Subst, TraitRef, Ty};
use std::collections::BTreeSet;

/// Match `pattern` against `target`, binding the parameters named in `vars`.
///
/// Only `vars` are variables; every other [`Ty::Param`] on either side is rigid and only
/// matches itself. `_` on either side matches anything. A variable bound twice must be
/// bound to matching types both times. On failure `subst` may hold partial bindings and
/// should be discarded.
pub fn unify(pattern: &Ty, target: &Ty, vars: &BTreeSet<String>, subst: &mut Subst) -> bool {
    match (pattern, target) {
        (Ty::Param(var), _) if vars.contains(var) => match subst.get(var).cloned() {
            Some(bound) => unify(&bound, target, &BTreeSet::new(), &mut Subst::new()),
            None => {
                if *target != Ty::Infer {
                    subst.insert(var.clone(), target.clone());
                }
                true
            }
        },
        (Ty::Infer, _) | (_, Ty::Infer) => true,
        (
            Ty::Named { path, args },
            Ty::Named {
                path: other_path,
                args: other_args,
            },
        ) => {
            path == other_path
                && args.len() == other_args.len()
                && args
                    .iter()
                    .zip(other_args)
                    .all(|(a, b)| unify(a, b, vars, subst))
        }
        (
            Ty::Fn { params, ret },
            Ty::Fn {
                params: other_params,
                ret: other_ret,
            },
        ) => {
            params.len() == other_params.len()
                && params
                    .iter()
                    .zip(other_params)
                    .all(|(a, b)| unify(a, b, vars, subst))
                && unify(ret, other_ret, vars, subst)
        }
        (Ty::Impl(a), Ty::Impl(b)) => unify_trait_refs(a, b, vars, subst),
        (
            Ty::Projection { base, name },
            Ty::Projection {
                base: other_base,
                name: other_name,
            },
        ) => name == other_name && unify(base, other_base, vars, subst),
        (Ty::Param(a), Ty::Param(b)) => a == b,
        (Ty::Const(a), Ty::Const(b)) => a == b,
        (Ty::SelfTy, Ty::SelfTy) | (Ty::Unit, Ty::Unit) => true,
        _ => false,
    }
}

/// Match two trait references: same trait, matching arguments, and every associated
/// type constrained by both sides matching.
pub fn unify_trait_refs(
    pattern: &TraitRef,
    target: &TraitRef,
    vars: &BTreeSet<String>,
    subst: &mut Subst,
) -> bool {
    if pattern.path != target.path || pattern.args.len() != target.args.len() {
        return false;
    }
    if !pattern
        .args
        .iter()
        .zip(&target.args)
        .all(|(a, b)| unify(a, b, vars, subst))
    {
        return false;
    }
    pattern.assoc.iter().all(|(name, ty)| {
        match target.assoc.iter().find(|(other, _)| other == name) {
            Some((_, other)) => unify(ty, other, vars, subst),
            None => true,
        }
    })
}

/// True when `a` and `b` are the same type up to `_`.
pub fn types_match(a: &Ty, b: &Ty) -> bool {
    unify(a, b, &BTreeSet::new(), &mut Subst::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn u8() -> Ty {
        Ty::std("u8", vec![])
    }

    fn vec_of(ty: Ty) -> Ty {
        Ty::std("Vec", vec![ty])
    }

    #[test]
    fn binds_variables_consistently() {
        let pair = |a, b| Ty::named("m::Pair", vec![a, b]);
        let pattern = pair(Ty::Param("T".into()), Ty::Param("T".into()));
        let mut subst = Subst::new();
        assert!(unify(&pattern, &pair(u8(), u8()), &vars(&["T"]), &mut subst));
        assert_eq!(subst.get("T"), Some(&u8()));

        let mut subst = Subst::new();
        let mixed = pair(u8(), Ty::std("String", vec![]));
        assert!(!unify(&pattern, &mixed, &vars(&["T"]), &mut subst));
    }

    #[test]
    fn rigid_parameters_only_match_themselves() {
        let pattern = vec_of(Ty::Param("T".into()));
        let query = vec_of(Ty::Param("T".into()));
        assert!(!unify(&pattern, &vec_of(u8()), &vars(&[]), &mut Subst::new()));
        assert!(unify(&pattern, &query, &vars(&[]), &mut Subst::new()));
    }

    #[test]
    fn infer_is_a_wildcard_and_leaves_variables_unbound() {
        let mut subst = Subst::new();
        let pattern = vec_of(Ty::Param("T".into()));
        assert!(unify(&pattern, &vec_of(Ty::Infer), &vars(&["T"]), &mut subst));
        assert!(subst.is_empty());
        assert!(types_match(&vec_of(Ty::Infer), &vec_of(u8())));
        assert!(!types_match(&vec_of(u8()), &Ty::std("Option", vec![u8()])));
    }

    #[test]
    fn trait_refs_compare_shared_associated_types() {
        let item = |ty| TraitRef::new("std::Source", vec![]).with_assoc("Item", ty);
        let mut subst = Subst::new();
        assert!(unify_trait_refs(
            &item(Ty::Param("I".into())),
            &item(u8()),
            &vars(&["I"]),
            &mut subst
        ));
        assert_eq!(subst.get("I"), Some(&u8()));
        assert!(!unify_trait_refs(&item(u8()), &item(Ty::std("bool", vec![])), &vars(&[]), &mut Subst::new()));
        assert!(unify_trait_refs(
            &TraitRef::new("std::Source", vec![]),
            &item(u8()),
            &vars(&[]),
            &mut Subst::new()
        ));
    }
}
