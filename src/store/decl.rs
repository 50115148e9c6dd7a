// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lowered declarations held by the [`Store`](super::Store).
//!
//! All type terms in these structures are canonical: names are full paths and generic
//! parameters are [`Ty::Param`].

use super::ty::{self, Subst, TraitRef, Ty};
use crate::errors::ParseError;
use crate::expr::lexer::{Token, TokenStream};
use crate::expr::Snippet;
use serde::Serialize;
use std::fmt;

/// Index of an impl in the store; stable for the lifetime of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ImplId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum GenericKind {
    Type,
    Const(Ty),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generic {
    pub name: String,
    pub kind: GenericKind,
    pub default: Option<Ty>,
}

impl Generic {
    pub fn names(generics: &[Generic]) -> Vec<String> {
        generics.iter().map(|g| g.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: Ty,
    pub public: bool,
    pub explain: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Implemented outside the declaration layer.
    Native,
    Struct { fields: Vec<FieldDecl> },
    Enum { variants: Vec<String> },
    /// A wrapper with exactly one `Inner` type.
    Transparent { inner: Ty },
    Alias(Ty),
}

/// Pipeline role of a component type declared by a schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Source,
    Sink,
    Transform,
    Feeder,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::Source => "source",
            ComponentKind::Sink => "sink",
            ComponentKind::Transform => "transform",
            ComponentKind::Feeder => "feeder",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub path: String,
    pub name: String,
    pub module: String,
    pub generics: Vec<Generic>,
    pub kind: TypeKind,
    pub component: Option<ComponentKind>,
    pub explain: Option<String>,
}

impl TypeDecl {
    /// The declared type applied to its own parameters.
    pub fn as_ty(&self) -> Ty {
        Ty::named(
            self.path.clone(),
            self.generics.iter().map(|g| Ty::Param(g.name.clone())).collect(),
        )
    }

    pub fn fields(&self) -> &[FieldDecl] {
        match &self.kind {
            TypeKind::Struct { fields } => fields,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Substitution mapping this type's parameters to the arguments of `ty`.
    pub fn subst_for(&self, ty: &Ty) -> Subst {
        self.generics
            .iter()
            .zip(ty.args())
            .map(|(g, arg)| (g.name.clone(), arg.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodTag {
    Regular,
    /// Evaluable at declaration time when its arguments are known.
    Const,
    /// Always implemented outside the declaration layer.
    Extern,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodSig {
    pub name: String,
    pub tag: MethodTag,
    /// Takes `self`.
    pub receiver: bool,
    pub params: Vec<(String, Ty)>,
    pub ret: Ty,
}

impl MethodSig {
    pub fn map_types(&self, f: &mut dyn FnMut(&Ty) -> Option<Ty>) -> MethodSig {
        MethodSig {
            name: self.name.clone(),
            tag: self.tag,
            receiver: self.receiver,
            params: self
                .params
                .iter()
                .map(|(name, ty)| (name.clone(), ty.map(f)))
                .collect(),
            ret: self.ret.map(f),
        }
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            MethodTag::Regular => {}
            MethodTag::Const => f.write_str("const ")?,
            MethodTag::Extern => f.write_str("extern ")?,
        }
        write!(f, "fn {}(", self.name)?;
        let mut first = true;
        if self.receiver {
            f.write_str("self")?;
            first = false;
        }
        for (name, ty) in &self.params {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, ty)?;
            first = false;
        }
        f.write_str(")")?;
        if self.ret != Ty::Unit {
            write!(f, " -> {}", self.ret)?;
        }
        Ok(())
    }
}

/// Parse `[const|extern] fn name(self, a: T) -> R`; types are left as written.
pub fn parse_signature(source: &str) -> Result<MethodSig, ParseError> {
    let mut stream = TokenStream::new(source)?;
    let tag = if stream.eat_keyword("const") {
        MethodTag::Const
    } else if stream.eat_keyword("extern") {
        MethodTag::Extern
    } else {
        MethodTag::Regular
    };
    if !stream.eat_keyword("fn") {
        return Err(stream.unexpected("'fn'"));
    }
    let name = stream.expect_ident()?;
    stream.expect(&Token::LParen)?;

    let mut receiver = false;
    let mut params = Vec::new();
    loop {
        if stream.eat(&Token::RParen) {
            break;
        }
        if params.is_empty() && !receiver && stream.eat_keyword("self") {
            receiver = true;
        } else {
            let param = stream.expect_ident()?;
            stream.expect(&Token::Colon)?;
            params.push((param, ty::ty(&mut stream)?));
        }
        if !stream.eat(&Token::Comma) {
            stream.expect(&Token::RParen)?;
            break;
        }
    }
    let ret = if stream.eat(&Token::Arrow) {
        ty::ty(&mut stream)?
    } else {
        Ty::Unit
    };
    stream.expect_end()?;
    Ok(MethodSig {
        name,
        tag,
        receiver,
        params,
        ret,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitMethod {
    pub sig: MethodSig,
    pub default: Option<Snippet>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssocDecl {
    pub name: String,
    pub bound: Option<TraitRef>,
}

/// Marks a trait as the const-specialized form of another trait.
#[derive(Debug, Clone, PartialEq)]
pub struct Specialization {
    /// The trait being specialized, in terms of this trait's parameters.
    pub of: TraitRef,
    /// Bodies supplied to the specialized trait's methods.
    pub defaults: Vec<(String, Snippet)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitDecl {
    pub path: String,
    pub name: String,
    pub module: String,
    pub generics: Vec<Generic>,
    pub assoc: Vec<AssocDecl>,
    pub methods: Vec<TraitMethod>,
    pub specialization: Option<Specialization>,
    pub explain: Option<String>,
}

impl TraitDecl {
    pub fn method(&self, name: &str) -> Option<&TraitMethod> {
        self.methods.iter().find(|m| m.sig.name == name)
    }

    pub fn specialization_default(&self, name: &str) -> Option<&Snippet> {
        self.specialization
            .as_ref()
            .and_then(|s| s.defaults.iter().find(|(n, _)| n == name))
            .map(|(_, body)| body)
    }

    /// Fill omitted trait arguments from declared defaults (with `Self` = `self_ty`) or `_`.
    pub fn complete_args(&self, self_ty: &Ty, args: &[Ty]) -> Vec<Ty> {
        let mut out = args.to_vec();
        for generic in self.generics.iter().skip(args.len()) {
            let arg = match &generic.default {
                Some(default) => {
                    let subst: Subst = self
                        .generics
                        .iter()
                        .zip(out.iter())
                        .map(|(g, a)| (g.name.clone(), a.clone()))
                        .collect();
                    default.with_self(self_ty).substitute(&subst)
                }
                None => Ty::Infer,
            };
            out.push(arg);
        }
        out
    }

    /// Substitution mapping this trait's parameters to `args`.
    pub fn subst_for(&self, args: &[Ty]) -> Subst {
        self.generics
            .iter()
            .zip(args)
            .map(|(g, a)| (g.name.clone(), a.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub ty: Ty,
    pub trait_ref: TraitRef,
    /// `~const`: only a const-specialized implementation satisfies the bound.
    pub const_required: bool,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.const_required { "~const " } else { "" };
        write!(f, "{}: {}{}", self.ty, marker, self.trait_ref)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodBody {
    Expr(Snippet),
    /// Implemented outside the declaration layer, trusted to match its signature.
    Extern,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImplMethod {
    pub sig: MethodSig,
    pub body: MethodBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplOrigin {
    Declared,
    /// Generated by the store for transparent types and components.
    Synthesized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImplDecl {
    pub id: ImplId,
    pub module: String,
    pub document: String,
    pub generics: Vec<Generic>,
    pub target: Ty,
    /// `None` for inherent impls.
    pub trait_ref: Option<TraitRef>,
    pub bounds: Vec<Bound>,
    pub assoc: Vec<(String, Ty)>,
    pub methods: Vec<ImplMethod>,
    pub is_const: bool,
    pub origin: ImplOrigin,
}

impl ImplDecl {
    /// An impl whose target is a bare generic parameter applies to every type.
    pub fn is_blanket(&self) -> bool {
        self.target.is_param()
    }

    pub fn method(&self, name: &str) -> Option<&ImplMethod> {
        self.methods.iter().find(|m| m.sig.name == name)
    }

    pub fn assoc(&self, name: &str) -> Option<&Ty> {
        self.assoc.iter().find(|(n, _)| n == name).map(|(_, ty)| ty)
    }
}

impl fmt::Display for ImplDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("impl")?;
        if !self.generics.is_empty() {
            write!(f, "<{}>", Generic::names(&self.generics).join(", "))?;
        }
        match &self.trait_ref {
            Some(trait_ref) => write!(f, " {} for {}", trait_ref, self.target)?,
            None => write!(f, " {}", self.target)?,
        }
        if !self.bounds.is_empty() {
            let bounds: Vec<String> = self.bounds.iter().map(|b| b.to_string()).collect();
            write!(f, " where {}", bounds.join(", "))?;
        }
        Ok(())
    }
}

/// `impl Type as Name`: methods in their own namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionDecl {
    pub path: String,
    pub name: String,
    pub module: String,
    pub generics: Vec<Generic>,
    pub target: Ty,
    pub bounds: Vec<Bound>,
    pub methods: Vec<ImplMethod>,
}

impl ExtensionDecl {
    pub fn method(&self, name: &str) -> Option<&ImplMethod> {
        self.methods.iter().find(|m| m.sig.name == name)
    }
}
