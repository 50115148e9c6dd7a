// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Type terms and their textual syntax.
//!
//! Type strings are parsed into *written* terms whose names are exactly as the author
//! wrote them. [`ModuleScope`](super::ModuleScope) later rewrites those names into canonical
//! paths and generic parameters.

use crate::errors::ParseError;
use crate::expr::lexer::{Token, TokenStream};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Module whose declarations are visible everywhere without import.
pub const PRELUDE_MODULE: &str = "std";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ty {
    /// A declared type applied to arguments, e.g. `std::Vec<std::u32>`.
    Named { path: String, args: Vec<Ty> },
    /// A generic parameter of the enclosing declaration.
    Param(String),
    /// A const-generic argument.
    Const(String),
    /// `fn(A, B) -> R`
    Fn { params: Vec<Ty>, ret: Box<Ty> },
    /// An opaque type known only by one capability, e.g. `impl Source<Item = Row>`.
    Impl(Box<TraitRef>),
    /// An associated type of a type, e.g. `Self::Item`.
    Projection { base: Box<Ty>, name: String },
    /// `Self` inside trait and impl declarations.
    SelfTy,
    /// `_`, unifies with anything.
    Infer,
    /// `()`
    Unit,
}

/// A trait applied to arguments with optional associated-type constraints.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraitRef {
    pub path: String,
    pub args: Vec<Ty>,
    pub assoc: Vec<(String, Ty)>,
}

/// Substitution of generic parameter names.
pub type Subst = BTreeMap<String, Ty>;

impl Ty {
    pub fn named(path: impl Into<String>, args: Vec<Ty>) -> Self {
        Ty::Named {
            path: path.into(),
            args,
        }
    }

    /// A type from the prelude, e.g. `Ty::std("u32", vec![])`.
    pub fn std(name: &str, args: Vec<Ty>) -> Self {
        Ty::named(format!("{}::{}", PRELUDE_MODULE, name), args)
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Ty::Named { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn args(&self) -> &[Ty] {
        match self {
            Ty::Named { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_param(&self) -> bool {
        matches!(self, Ty::Param(_))
    }

    /// Replace generic parameters bound in `subst`.
    pub fn substitute(&self, subst: &Subst) -> Ty {
        self.map(&mut |ty| match ty {
            Ty::Param(name) => subst.get(name).cloned(),
            _ => None,
        })
    }

    /// Replace `Self` with `self_ty`.
    pub fn with_self(&self, self_ty: &Ty) -> Ty {
        self.map(&mut |ty| match ty {
            Ty::SelfTy => Some(self_ty.clone()),
            _ => None,
        })
    }

    /// Rebuild the term bottom-up, letting `f` replace any node.
    pub fn map(&self, f: &mut dyn FnMut(&Ty) -> Option<Ty>) -> Ty {
        if let Some(replaced) = f(self) {
            return replaced;
        }
        match self {
            Ty::Named { path, args } => Ty::Named {
                path: path.clone(),
                args: args.iter().map(|a| a.map(f)).collect(),
            },
            Ty::Fn { params, ret } => Ty::Fn {
                params: params.iter().map(|p| p.map(f)).collect(),
                ret: Box::new(ret.map(f)),
            },
            Ty::Impl(trait_ref) => Ty::Impl(Box::new(trait_ref.map(f))),
            Ty::Projection { base, name } => Ty::Projection {
                base: Box::new(base.map(f)),
                name: name.clone(),
            },
            other => other.clone(),
        }
    }

    /// Names of generic parameters mentioned anywhere in the term.
    pub fn params(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.map(&mut |ty| {
            if let Ty::Param(name) = ty {
                out.insert(name.clone());
            }
            None
        });
        out
    }

    /// True when no parameter, `Self` or `_` remains.
    pub fn is_concrete(&self) -> bool {
        let mut concrete = true;
        self.map(&mut |ty| {
            if matches!(ty, Ty::Param(_) | Ty::SelfTy | Ty::Infer) {
                concrete = false;
            }
            None
        });
        concrete
    }
}

impl TraitRef {
    pub fn new(path: impl Into<String>, args: Vec<Ty>) -> Self {
        Self {
            path: path.into(),
            args,
            assoc: Vec::new(),
        }
    }

    pub fn with_assoc(mut self, name: impl Into<String>, ty: Ty) -> Self {
        self.assoc.push((name.into(), ty));
        self
    }

    pub fn map(&self, f: &mut dyn FnMut(&Ty) -> Option<Ty>) -> TraitRef {
        TraitRef {
            path: self.path.clone(),
            args: self.args.iter().map(|a| a.map(f)).collect(),
            assoc: self
                .assoc
                .iter()
                .map(|(name, ty)| (name.clone(), ty.map(f)))
                .collect(),
        }
    }

    pub fn substitute(&self, subst: &Subst) -> TraitRef {
        self.map(&mut |ty| match ty {
            Ty::Param(name) => subst.get(name).cloned(),
            _ => None,
        })
    }

    pub fn with_self(&self, self_ty: &Ty) -> TraitRef {
        self.map(&mut |ty| match ty {
            Ty::SelfTy => Some(self_ty.clone()),
            _ => None,
        })
    }
}

/// Paths print without the prelude prefix.
fn short_path(path: &str) -> &str {
    path.strip_prefix(PRELUDE_MODULE)
        .and_then(|rest| rest.strip_prefix("::"))
        .unwrap_or(path)
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Ty]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Named { path, args } => {
                f.write_str(short_path(path))?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    write_list(f, args)?;
                    f.write_str(">")?;
                }
                Ok(())
            }
            Ty::Param(name) => f.write_str(name),
            Ty::Const(value) => f.write_str(value),
            Ty::Fn { params, ret } => {
                f.write_str("fn(")?;
                write_list(f, params)?;
                f.write_str(")")?;
                if **ret != Ty::Unit {
                    write!(f, " -> {}", ret)?;
                }
                Ok(())
            }
            Ty::Impl(trait_ref) => write!(f, "impl {}", trait_ref),
            Ty::Projection { base, name } => write!(f, "{}::{}", base, name),
            Ty::SelfTy => f.write_str("Self"),
            Ty::Infer => f.write_str("_"),
            Ty::Unit => f.write_str("()"),
        }
    }
}

impl fmt::Display for TraitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(short_path(&self.path))?;
        if self.args.is_empty() && self.assoc.is_empty() {
            return Ok(());
        }
        f.write_str("<")?;
        write_list(f, &self.args)?;
        for (i, (name, ty)) in self.assoc.iter().enumerate() {
            if i > 0 || !self.args.is_empty() {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", name, ty)?;
        }
        f.write_str(">")
    }
}

impl Serialize for Ty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for TraitRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A generic parameter declaration as written: `T`, `T: Bound + Other`, `Rhs = Self`,
/// `const N: usize`.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenGeneric {
    pub name: String,
    pub const_ty: Option<Ty>,
    pub bounds: Vec<WrittenBound>,
    pub default: Option<Ty>,
}

/// One trait of a `where` bound, with the `~const` marker.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenBound {
    pub trait_ref: TraitRef,
    pub const_required: bool,
}

/// Parse a complete type string.
pub fn parse_ty(source: &str) -> Result<Ty, ParseError> {
    let mut stream = TokenStream::new(source)?;
    let ty = ty(&mut stream)?;
    stream.expect_end()?;
    Ok(ty)
}

/// Parse a complete trait reference string such as `Source<Item = Row>`.
pub fn parse_trait_ref(source: &str) -> Result<TraitRef, ParseError> {
    let mut stream = TokenStream::new(source)?;
    let trait_ref = trait_ref(&mut stream)?;
    stream.expect_end()?;
    Ok(trait_ref)
}

pub fn parse_generic(source: &str) -> Result<WrittenGeneric, ParseError> {
    let mut stream = TokenStream::new(source)?;
    let generic = if stream.eat_keyword("const") {
        let name = stream.expect_ident()?;
        stream.expect(&Token::Colon)?;
        WrittenGeneric {
            name,
            const_ty: Some(ty(&mut stream)?),
            bounds: Vec::new(),
            default: None,
        }
    } else {
        let name = stream.expect_ident()?;
        let bounds = if stream.eat(&Token::Colon) {
            bound_list(&mut stream)?
        } else {
            Vec::new()
        };
        let default = if stream.eat(&Token::Eq) {
            Some(ty(&mut stream)?)
        } else {
            None
        };
        WrittenGeneric {
            name,
            const_ty: None,
            bounds,
            default,
        }
    };
    stream.expect_end()?;
    Ok(generic)
}

/// Parse a `where` predicate: `T: ~const PartialEq + Default`.
pub fn parse_where(source: &str) -> Result<(Ty, Vec<WrittenBound>), ParseError> {
    let mut stream = TokenStream::new(source)?;
    let bounded = ty(&mut stream)?;
    stream.expect(&Token::Colon)?;
    let bounds = bound_list(&mut stream)?;
    stream.expect_end()?;
    Ok((bounded, bounds))
}

fn bound_list(stream: &mut TokenStream) -> Result<Vec<WrittenBound>, ParseError> {
    let mut bounds = Vec::new();
    loop {
        let const_required = if stream.eat(&Token::Tilde) {
            if !stream.eat_keyword("const") {
                return Err(stream.unexpected("'const' after '~'"));
            }
            true
        } else {
            false
        };
        bounds.push(WrittenBound {
            trait_ref: trait_ref(stream)?,
            const_required,
        });
        if !stream.eat(&Token::Plus) {
            return Ok(bounds);
        }
    }
}

fn path(stream: &mut TokenStream) -> Result<String, ParseError> {
    let mut segments = vec![stream.expect_ident()?];
    while stream.eat(&Token::PathSep) {
        segments.push(stream.expect_ident()?);
    }
    Ok(segments.join("::"))
}

pub(crate) fn ty(stream: &mut TokenStream) -> Result<Ty, ParseError> {
    match stream.peek() {
        Some(Token::LParen) => {
            stream.advance();
            stream.expect(&Token::RParen)?;
            Ok(Ty::Unit)
        }
        Some(Token::Int(n)) => {
            let value = n.to_string();
            stream.advance();
            Ok(Ty::Const(value))
        }
        Some(Token::Ident(word)) if word == "_" => {
            stream.advance();
            Ok(Ty::Infer)
        }
        Some(Token::Ident(word)) if word == "impl" => {
            stream.advance();
            Ok(Ty::Impl(Box::new(trait_ref(stream)?)))
        }
        Some(Token::Ident(word)) if word == "fn" => {
            stream.advance();
            stream.expect(&Token::LParen)?;
            let mut params = Vec::new();
            while !stream.eat(&Token::RParen) {
                params.push(ty(stream)?);
                if !stream.eat(&Token::Comma) {
                    stream.expect(&Token::RParen)?;
                    break;
                }
            }
            let ret = if stream.eat(&Token::Arrow) {
                ty(stream)?
            } else {
                Ty::Unit
            };
            Ok(Ty::Fn {
                params,
                ret: Box::new(ret),
            })
        }
        Some(Token::Ident(_)) => {
            let written = path(stream)?;
            if written == "Self" {
                return Ok(Ty::SelfTy);
            }
            if let Some(name) = written.strip_prefix("Self::") {
                return Ok(Ty::Projection {
                    base: Box::new(Ty::SelfTy),
                    name: name.to_string(),
                });
            }
            let (args, _) = generic_args(stream, false)?;
            Ok(Ty::Named {
                path: written,
                args,
            })
        }
        _ => Err(stream.unexpected("a type")),
    }
}

fn trait_ref(stream: &mut TokenStream) -> Result<TraitRef, ParseError> {
    let written = path(stream)?;
    let (args, assoc) = generic_args(stream, true)?;
    Ok(TraitRef {
        path: written,
        args,
        assoc,
    })
}

#[allow(clippy::type_complexity)]
fn generic_args(
    stream: &mut TokenStream,
    allow_assoc: bool,
) -> Result<(Vec<Ty>, Vec<(String, Ty)>), ParseError> {
    let mut args = Vec::new();
    let mut assoc = Vec::new();
    if !stream.eat(&Token::Lt) {
        return Ok((args, assoc));
    }
    loop {
        let is_assoc = matches!(
            (stream.peek(), stream.peek_nth(1)),
            (Some(Token::Ident(_)), Some(Token::Eq))
        );
        if is_assoc {
            if !allow_assoc {
                return Err(stream.unexpected("a type argument"));
            }
            let name = stream.expect_ident()?;
            stream.expect(&Token::Eq)?;
            assoc.push((name, ty(stream)?));
        } else {
            if !assoc.is_empty() {
                return Err(stream.unexpected("an associated type binding"));
            }
            args.push(ty(stream)?);
        }
        if stream.eat(&Token::Gt) {
            return Ok((args, assoc));
        }
        stream.expect(&Token::Comma)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(path: &str, args: Vec<Ty>) -> Ty {
        Ty::named(path, args)
    }

    #[test]
    fn parses_nested_generic_types() {
        let ty = parse_ty("Vec<Option<u32>>").unwrap();
        assert_eq!(
            ty,
            named("Vec", vec![named("Option", vec![named("u32", vec![])])])
        );
    }

    #[test]
    fn parses_function_and_opaque_types() {
        assert_eq!(
            parse_ty("fn(T, u8) -> String").unwrap(),
            Ty::Fn {
                params: vec![named("T", vec![]), named("u8", vec![])],
                ret: Box::new(named("String", vec![])),
            }
        );
        let opaque = parse_ty("impl Source<Item = Row>").unwrap();
        assert_eq!(
            opaque,
            Ty::Impl(Box::new(
                TraitRef::new("Source", vec![]).with_assoc("Item", named("Row", vec![]))
            ))
        );
    }

    #[test]
    fn parses_self_projection_and_infer() {
        assert_eq!(
            parse_ty("Self::Item").unwrap(),
            Ty::Projection {
                base: Box::new(Ty::SelfTy),
                name: "Item".into()
            }
        );
        assert_eq!(parse_ty("_").unwrap(), Ty::Infer);
        assert_eq!(parse_ty("()").unwrap(), Ty::Unit);
    }

    #[test]
    fn parses_generic_declarations() {
        let rhs = parse_generic("Rhs = Self").unwrap();
        assert_eq!(rhs.default, Some(Ty::SelfTy));

        let bounded = parse_generic("T: ~const PartialEq + Default").unwrap();
        assert_eq!(bounded.bounds.len(), 2);
        assert!(bounded.bounds[0].const_required);
        assert!(!bounded.bounds[1].const_required);

        let konst = parse_generic("const N: usize").unwrap();
        assert_eq!(konst.const_ty, Some(named("usize", vec![])));
    }

    #[test]
    fn parses_where_predicates() {
        let (bounded, bounds) = parse_where("Vec<T>: Sink<T>").unwrap();
        assert_eq!(bounded, named("Vec", vec![named("T", vec![])]));
        assert_eq!(bounds[0].trait_ref.args, vec![named("T", vec![])]);
    }

    #[test]
    fn rejects_trailing_input() {
        assert!(parse_ty("u32 u32").is_err());
        assert!(parse_ty("Vec<u32").is_err());
    }

    #[test]
    fn display_hides_prelude_prefix() {
        let ty = Ty::std("Option", vec![Ty::named("example1::Monetary", vec![])]);
        assert_eq!(ty.to_string(), "Option<example1::Monetary>");
        let trait_ref = TraitRef::new("std::Source", vec![]).with_assoc("Item", Ty::std("u8", vec![]));
        assert_eq!(trait_ref.to_string(), "Source<Item = u8>");
    }

    #[test]
    fn substitution_replaces_parameters_only() {
        let ty = Ty::std("Vec", vec![Ty::Param("T".into())]);
        let mut subst = Subst::new();
        subst.insert("T".into(), Ty::std("u8", vec![]));
        assert_eq!(ty.substitute(&subst), Ty::std("Vec", vec![Ty::std("u8", vec![])]));
        assert!(ty.substitute(&subst).is_concrete());
        assert!(!ty.is_concrete());
    }
}
