// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declaration-time evaluation.
//!
//! Expressions are evaluated against the store: names resolve through the scope of the
//! module the expression was written in, method calls go through the [`MethodResolver`]
//! and const-capable bodies run when every argument is known. Anything else becomes a
//! [`Value::Deferred`] carrying the type the call would produce at run time.

use super::{BinaryOp, Expr, Literal, Snippet, UnaryOp, Value};
use crate::errors::EvalError;
use crate::resolve::{MethodRef, MethodResolution, MethodResolver, TraitResolver};
use crate::resolve::unify;
use crate::store::{
    lang, MethodBody, ModuleScope, Store, Subst, Symbol, SymbolKind, Ty, TypeDecl, TypeKind,
    PRELUDE_MODULE,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Names visible to an expression.
#[derive(Debug, Clone, Default)]
pub struct Env {
    /// Module whose scope resolves type and extension names.
    pub module: String,
    pub self_value: Option<Value>,
    /// Type `Self` refers to inside a method body.
    pub self_ty: Option<Ty>,
    pub vars: BTreeMap<String, Value>,
}

impl Env {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }

    pub fn with_self(mut self, value: Value) -> Self {
        self.self_ty = Some(value.ty());
        self.self_value = Some(value);
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, value: Value) -> Self {
        self.vars.insert(name.into(), value);
        self
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'s> {
    store: &'s Store,
    methods: MethodResolver<'s>,
    max_depth: usize,
}

impl<'s> Evaluator<'s> {
    pub fn new(store: &'s Store) -> Self {
        let traits = TraitResolver::new(store);
        Self {
            store,
            methods: MethodResolver::with_traits(traits),
            max_depth: store.max_depth(),
        }
    }

    pub fn store(&self) -> &'s Store {
        self.store
    }

    pub fn eval(&self, expr: &Expr, env: &Env) -> Result<Value, EvalError> {
        self.eval_at(expr, env, 0)
    }

    pub fn eval_snippet(&self, snippet: &Snippet, env: &Env) -> Result<Value, EvalError> {
        self.eval_at(&snippet.expr, env, 0)
    }

    /// Call `receiver.name(args)` as if written in `env`.
    pub fn call_method(
        &self,
        receiver: Value,
        name: &str,
        args: Vec<Value>,
        env: &Env,
    ) -> Result<Value, EvalError> {
        self.method_call(receiver, name, args, env, 0)
    }

    fn eval_at(&self, expr: &Expr, env: &Env, depth: usize) -> Result<Value, EvalError> {
        match expr {
            Expr::Lit(literal) => Ok(match literal {
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(x) => Value::Float(*x),
                Literal::Str(s) => Value::Str(s.clone()),
                Literal::None => Value::Option(None),
            }),
            Expr::Ident(name) => env
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UnknownName(name.clone())),
            Expr::SelfValue => env
                .self_value
                .clone()
                .ok_or_else(|| EvalError::UnknownName("self".to_string())),
            Expr::Path(segments) => self.variant(segments, env),
            Expr::Field {
                base,
                name,
                optional,
            } => {
                let base = self.eval_at(base, env, depth)?;
                if *optional {
                    chain(base, |inner| self.field(inner, name, env))
                } else {
                    self.field(base, name, env)
                }
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
                optional,
            } => {
                let receiver = self.eval_at(receiver, env, depth)?;
                let args = self.eval_all(args, env, depth)?;
                if *optional {
                    chain(receiver, |inner| {
                        self.method_call(inner, method, args, env, depth)
                    })
                } else {
                    self.method_call(receiver, method, args, env, depth)
                }
            }
            Expr::Call { callee, args } => self.call(callee, args, env, depth),
            Expr::Unary { op, expr } => {
                let value = self.eval_at(expr, env, depth)?;
                unary(*op, value)
            }
            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs, env, depth),
            Expr::List(items) => Ok(Value::List(self.eval_all(items, env, depth)?)),
            Expr::StructLit { path, fields } => self.struct_literal(path, fields, env, depth),
            Expr::Closure { params, source, .. } => Ok(Value::Closure {
                params: params.clone(),
                source: source.clone(),
            }),
        }
    }

    fn eval_all(&self, exprs: &[Expr], env: &Env, depth: usize) -> Result<Vec<Value>, EvalError> {
        exprs.iter().map(|e| self.eval_at(e, env, depth)).collect()
    }

    fn scope(&self, env: &Env) -> Option<&'s ModuleScope> {
        self.store
            .scope(&env.module)
            .or_else(|| self.store.scope(PRELUDE_MODULE))
    }

    fn symbol(&self, segments: &[String], env: &Env) -> Option<Symbol> {
        if let [only] = segments {
            if only == "Self" {
                let path = env.self_ty.as_ref()?.path()?.to_string();
                return Some(Symbol {
                    kind: SymbolKind::Type,
                    path,
                });
            }
        }
        let written = segments.join("::");
        match self.scope(env) {
            Some(scope) => scope.resolve_path(&written, self.store.index()).ok(),
            None => self.store.index().symbol(&written),
        }
    }

    fn type_decl(&self, segments: &[String], env: &Env) -> Option<&'s TypeDecl> {
        match self.symbol(segments, env)? {
            Symbol {
                kind: SymbolKind::Type,
                path,
            } => self.store.type_decl(&path),
            _ => None,
        }
    }

    fn variant(&self, segments: &[String], env: &Env) -> Result<Value, EvalError> {
        let unknown = || EvalError::UnknownName(segments.join("::"));
        let (variant, owner) = segments.split_last().ok_or_else(unknown)?;
        let decl = self.type_decl(owner, env).ok_or_else(unknown)?;
        match &decl.kind {
            TypeKind::Enum { variants } if variants.contains(variant) => Ok(Value::Enum {
                ty: decl.as_ty(),
                variant: variant.clone(),
            }),
            _ => Err(unknown()),
        }
    }

    fn field(&self, base: Value, name: &str, env: &Env) -> Result<Value, EvalError> {
        let ty = self.store.normalize(&base.ty());
        let decl = ty.path().and_then(|p| self.store.type_decl(p));
        if let Some(field) = decl.and_then(|d| d.field(name)) {
            if let Some(decl) = decl {
                if !field.public && decl.module != env.module {
                    return Err(EvalError::Type(format!(
                        "field '{}' of '{}' is private",
                        name, decl.path
                    )));
                }
            }
        }
        match base {
            Value::Struct { fields, .. } => fields
                .into_iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v)
                .ok_or_else(|| no_field(&ty, name)),
            unknown @ (Value::Ref { .. } | Value::Deferred { .. }) => {
                let decl = decl.ok_or_else(|| no_field(&ty, name))?;
                let field = decl.field(name).ok_or_else(|| no_field(&ty, name))?;
                let field_ty = field.ty.substitute(&decl.subst_for(&ty));
                Ok(Value::deferred(field_ty, format!("{}.{}", unknown, name)))
            }
            _ => Err(no_field(&ty, name)),
        }
    }

    fn visible_extensions(&self, env: &Env) -> Vec<String> {
        self.scope(env)
            .map(ModuleScope::visible_extensions)
            .unwrap_or_default()
    }

    fn method_call(
        &self,
        receiver: Value,
        name: &str,
        args: Vec<Value>,
        env: &Env,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let ty = receiver.ty();
        let visible = self.visible_extensions(env);
        match self.methods.resolve_call(&ty, name, &visible) {
            MethodResolution::Found(method) => {
                self.invoke(&method, Some(ty), Some(receiver), args, depth)
            }
            MethodResolution::Ambiguous { candidates, .. } => Err(EvalError::AmbiguousCall {
                ty: ty.to_string(),
                method: name.to_string(),
                candidates,
            }),
            MethodResolution::NotFound => Err(EvalError::NoMethod {
                ty: ty.to_string(),
                method: name.to_string(),
            }),
        }
    }

    /// `Some(x)`, `Ext::f(recv, ..)`, `Trait::f(recv, ..)` and `Type::f(..)`.
    fn call(
        &self,
        callee: &[String],
        args: &[Expr],
        env: &Env,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let mut values = self.eval_all(args, env, depth)?;
        if let [only] = callee {
            return match (only.as_str(), values.len()) {
                ("Some", 1) => Ok(Value::some(values.remove(0))),
                _ => Err(EvalError::UnknownName(only.clone())),
            };
        }
        let (name, qualifier) = callee
            .split_last()
            .ok_or_else(|| EvalError::UnknownName(callee.join("::")))?;
        let written = qualifier.join("::");
        let no_method = || EvalError::NoMethod {
            ty: written.clone(),
            method: name.clone(),
        };

        let extension = self
            .scope(env)
            .and_then(|scope| scope.resolve_extension(&written, self.store.index()));
        let (canonical, receiver_first) = match (extension, self.symbol(qualifier, env)) {
            (Some(path), _) => (path, true),
            (
                None,
                Some(Symbol {
                    kind: SymbolKind::Trait,
                    path,
                }),
            ) => (path, true),
            (
                None,
                Some(Symbol {
                    kind: SymbolKind::Type,
                    path,
                }),
            ) => (path, false),
            _ => return Err(EvalError::UnknownName(written.clone())),
        };

        let receiver_ty = if receiver_first {
            Some(values.first().ok_or_else(no_method)?.ty())
        } else {
            None
        };
        let resolution = self
            .methods
            .resolve_qualified(receiver_ty.as_ref(), &canonical, name);
        let method = match resolution {
            MethodResolution::Found(method) => method,
            MethodResolution::Ambiguous { candidates, .. } => {
                return Err(EvalError::AmbiguousCall {
                    ty: written,
                    method: name.clone(),
                    candidates,
                })
            }
            MethodResolution::NotFound => return Err(no_method()),
        };

        if method.sig.receiver {
            if values.is_empty() {
                return Err(no_method());
            }
            let receiver = values.remove(0);
            let self_ty = receiver.ty();
            self.invoke(&method, Some(self_ty), Some(receiver), values, depth)
        } else {
            let self_ty = receiver_ty.or_else(|| {
                self.store
                    .type_decl(&canonical)
                    .map(|decl| Ty::named(decl.path.clone(), vec![Ty::Infer; decl.generics.len()]))
            });
            self.invoke(&method, self_ty, None, values, depth)
        }
    }

    fn invoke(
        &self,
        method: &MethodRef,
        self_ty: Option<Ty>,
        receiver: Option<Value>,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Value, EvalError> {
        if depth >= self.max_depth {
            return Err(EvalError::DepthExceeded(self.max_depth));
        }
        if args.len() != method.sig.params.len() {
            return Err(EvalError::Type(format!(
                "'{}' takes {} argument(s), {} given",
                method.name,
                method.sig.params.len(),
                args.len()
            )));
        }

        let known = receiver.as_ref().map_or(true, Value::is_known) && args.iter().all(Value::is_known);
        let deferred = || {
            let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
            let call = match &receiver {
                Some(r) => format!("{}.{}({})", r, method.name, rendered.join(", ")),
                None => format!("{}({})", method.name, rendered.join(", ")),
            };
            Value::deferred(method.sig.ret.clone(), call)
        };
        if !method.is_const_evaluable(known) {
            return Ok(deferred());
        }

        match &method.body {
            Some(MethodBody::Expr(snippet)) => {
                let mut env = Env::new(method.module.clone());
                env.self_ty = self_ty;
                env.self_value = receiver;
                for ((param, _), value) in method.sig.params.iter().zip(args) {
                    env.bind(param.clone(), value);
                }
                self.eval_at(&snippet.expr, &env, depth + 1)
            }
            Some(MethodBody::Extern) | None => {
                builtin(&method.name, receiver.as_ref(), &args).unwrap_or_else(|| Ok(deferred()))
            }
        }
    }

    fn binary(
        &self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        env: &Env,
        depth: usize,
    ) -> Result<Value, EvalError> {
        match op {
            BinaryOp::And | BinaryOp::Or => self.logical(op, lhs, rhs, env, depth),
            BinaryOp::Eq | BinaryOp::Ne => {
                let l = self.eval_at(lhs, env, depth)?;
                let r = self.eval_at(rhs, env, depth)?;
                self.equality(op, l, r, env, depth)
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let l = self.eval_at(lhs, env, depth)?;
                let r = self.eval_at(rhs, env, depth)?;
                compare(op, l, r)
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                let l = self.eval_at(lhs, env, depth)?;
                let r = self.eval_at(rhs, env, depth)?;
                arithmetic(op, l, r)
            }
        }
    }

    fn logical(
        &self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        env: &Env,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let short = op == BinaryOp::Or;
        let l = self.eval_at(lhs, env, depth)?;
        let l_known = as_bool(&l, op)?;
        if l_known == Some(short) {
            return Ok(Value::Bool(short));
        }
        let r = self.eval_at(rhs, env, depth)?;
        let r_known = as_bool(&r, op)?;
        match (l_known, r_known) {
            (_, Some(b)) if b == short => Ok(Value::Bool(short)),
            (Some(_), Some(b)) => Ok(Value::Bool(b)),
            _ => Ok(Value::deferred(
                bool_ty(),
                format!("{} {} {}", l, op.symbol(), r),
            )),
        }
    }

    fn equality(
        &self,
        op: BinaryOp,
        l: Value,
        r: Value,
        env: &Env,
        depth: usize,
    ) -> Result<Value, EvalError> {
        if !l.is_known() || !r.is_known() {
            return Ok(Value::deferred(
                bool_ty(),
                format!("{} {} {}", l, op.symbol(), r),
            ));
        }
        if is_structural(&l) && is_structural(&r) {
            let equal = values_equal(&l, &r);
            return Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }));
        }
        let name = if op == BinaryOp::Eq { "eq" } else { "ne" };
        self.method_call(l, name, vec![r], env, depth)
    }

    fn struct_literal(
        &self,
        path: &[String],
        fields: &[(String, Expr)],
        env: &Env,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let written = path.join("::");
        let decl = self
            .type_decl(path, env)
            .ok_or_else(|| EvalError::UnknownName(written.clone()))?;
        if !matches!(decl.kind, TypeKind::Struct { .. }) {
            return Err(EvalError::Type(format!("'{}' is not a struct", decl.path)));
        }

        let mut given: BTreeMap<&str, Value> = BTreeMap::new();
        for (name, expr) in fields {
            let field = decl.field(name).ok_or_else(|| no_field(&decl.as_ty(), name))?;
            if !field.public && decl.module != env.module {
                return Err(EvalError::Type(format!(
                    "field '{}' of '{}' is private",
                    name, decl.path
                )));
            }
            if given.contains_key(name.as_str()) {
                return Err(EvalError::Type(format!("field '{}' given twice", name)));
            }
            given.insert(name, self.eval_at(expr, env, depth)?);
        }

        let vars: BTreeSet<String> = decl.generics.iter().map(|g| g.name.clone()).collect();
        let mut subst = Subst::new();
        let mut out = Vec::with_capacity(decl.fields().len());
        for field in decl.fields() {
            let value = given.remove(field.name.as_str()).ok_or_else(|| {
                EvalError::Type(format!("missing field '{}' in '{}'", field.name, decl.path))
            })?;
            unify(&field.ty, &value.ty(), &vars, &mut subst);
            out.push((field.name.clone(), value));
        }
        let args = decl
            .generics
            .iter()
            .map(|g| subst.get(&g.name).cloned().unwrap_or(Ty::Infer))
            .collect();
        Ok(Value::Struct {
            ty: Ty::named(decl.path.clone(), args),
            fields: out,
        })
    }
}

fn bool_ty() -> Ty {
    Ty::named(lang::BOOL, vec![])
}

fn no_field(ty: &Ty, name: &str) -> EvalError {
    EvalError::Type(format!("no field '{}' on '{}'", name, ty))
}

/// Apply `step` through an optional value: `None` stays `None`, `Some(x)` feeds `x`.
fn chain(
    base: Value,
    step: impl FnOnce(Value) -> Result<Value, EvalError>,
) -> Result<Value, EvalError> {
    match base {
        Value::Option(None) => Ok(Value::Option(None)),
        Value::Option(Some(inner)) => Ok(into_option(step(*inner)?)),
        unknown @ (Value::Ref { .. } | Value::Deferred { .. }) => {
            let ty = unknown.ty();
            if ty.path() != Some(lang::OPTION) {
                return Err(EvalError::Type(format!(
                    "'?.' needs an Option, found '{}'",
                    ty
                )));
            }
            let inner_ty = ty.args().first().cloned().unwrap_or(Ty::Infer);
            let result = step(Value::deferred(inner_ty, unknown.to_string()))?;
            let result_ty = match result.ty() {
                option @ Ty::Named { .. } if option.path() == Some(lang::OPTION) => option,
                other => Ty::named(lang::OPTION, vec![other]),
            };
            Ok(Value::deferred(result_ty, result.to_string()))
        }
        other => Err(EvalError::Type(format!(
            "'?.' needs an Option, found '{}'",
            other.ty()
        ))),
    }
}

fn into_option(value: Value) -> Value {
    match value {
        option @ Value::Option(_) => option,
        other => Value::some(other),
    }
}

/// `Some(b)` for a known bool, `None` for an unknown one.
fn as_bool(value: &Value, op: BinaryOp) -> Result<Option<bool>, EvalError> {
    match value {
        Value::Bool(b) => Ok(Some(*b)),
        unknown if !unknown.is_known() && unknown.ty() == bool_ty() => Ok(None),
        other => Err(EvalError::Type(format!(
            "'{}' needs bool operands, found '{}'",
            op.symbol(),
            other.ty()
        ))),
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (op, unknown) if !unknown.is_known() => {
            let symbol = if op == UnaryOp::Not { "!" } else { "-" };
            Ok(Value::deferred(unknown.ty(), format!("{}{}", symbol, unknown)))
        }
        (UnaryOp::Not, other) => Err(EvalError::Type(format!(
            "'!' needs a bool, found '{}'",
            other.ty()
        ))),
        (UnaryOp::Neg, other) => Err(EvalError::Type(format!(
            "'-' needs a number, found '{}'",
            other.ty()
        ))),
    }
}

fn compare(op: BinaryOp, l: Value, r: Value) -> Result<Value, EvalError> {
    if !l.is_known() || !r.is_known() {
        return Ok(Value::deferred(
            bool_ty(),
            format!("{} {} {}", l, op.symbol(), r),
        ));
    }
    let ordering = match (&l, &r) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match (as_float(&l), as_float(&r)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(EvalError::Type(format!(
                    "cannot compare '{}' with '{}'",
                    l.ty(),
                    r.ty()
                )))
            }
        },
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    }))
}

fn arithmetic(op: BinaryOp, l: Value, r: Value) -> Result<Value, EvalError> {
    if !l.is_known() || !r.is_known() {
        let ty = if l.is_known() { r.ty() } else { l.ty() };
        return Ok(Value::deferred(ty, format!("{} {} {}", l, op.symbol(), r)));
    }
    match (&l, &r) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                BinaryOp::Mul => a.checked_mul(*b),
                BinaryOp::Div | BinaryOp::Rem if *b == 0 => {
                    return Err(EvalError::DivisionByZero)
                }
                BinaryOp::Div => a.checked_div(*b),
                _ => a.checked_rem(*b),
            };
            result.map(Value::Int).ok_or(EvalError::Overflow)
        }
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => Ok(Value::Str(format!("{}{}", a, b))),
        _ => match (as_float(&l), as_float(&r)) {
            (Some(a), Some(b)) => {
                if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                let result = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    _ => a % b,
                };
                if result.is_finite() {
                    Ok(Value::Float(result))
                } else {
                    Err(EvalError::Overflow)
                }
            }
            _ => Err(EvalError::Type(format!(
                "'{}' is not defined for '{}' and '{}'",
                op.symbol(),
                l.ty(),
                r.ty()
            ))),
        },
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

/// Values compared field by field without consulting `PartialEq`.
fn is_structural(value: &Value) -> bool {
    match value {
        Value::Unit
        | Value::Bool(_)
        | Value::Int(_)
        | Value::Float(_)
        | Value::Str(_)
        | Value::Enum { .. }
        | Value::Option(None) => true,
        Value::List(items) => items.iter().all(is_structural),
        Value::Option(Some(inner)) => is_structural(inner),
        _ => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| values_equal(p, q))
        }
        (Value::Option(Some(x)), Value::Option(Some(y))) => values_equal(x, y),
        (Value::Wrapped { inner: x, .. }, Value::Wrapped { inner: y, .. }) => {
            a.ty() == b.ty() && values_equal(x, y)
        }
        (Value::Struct { fields: x, .. }, Value::Struct { fields: y, .. }) => {
            a.ty() == b.ty()
                && x.len() == y.len()
                && x.iter().zip(y).all(|((n, p), (m, q))| n == m && values_equal(p, q))
        }
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
            as_float(a) == as_float(b)
        }
        _ => a == b,
    }
}

/// Bodies of the prelude's extern const methods. `None` when the receiver and arguments
/// do not have the shape the builtin works on.
fn builtin(name: &str, receiver: Option<&Value>, args: &[Value]) -> Option<Result<Value, EvalError>> {
    let receiver = receiver?;
    let value = match (name, receiver, args) {
        ("eq", _, [other]) => Value::Bool(values_equal(receiver, other)),
        ("ne", _, [other]) => Value::Bool(!values_equal(receiver, other)),
        ("len", Value::Str(s), []) => Value::Int(s.chars().count() as i64),
        ("len", Value::List(items), []) => Value::Int(items.len() as i64),
        ("is_empty", Value::Str(s), []) => Value::Bool(s.is_empty()),
        ("is_empty", Value::List(items), []) => Value::Bool(items.is_empty()),
        ("contains", Value::Str(s), [Value::Str(p)]) => Value::Bool(s.contains(p.as_str())),
        ("contains", Value::List(items), [item]) => {
            Value::Bool(items.iter().any(|i| values_equal(i, item)))
        }
        ("starts_with", Value::Str(s), [Value::Str(p)]) => Value::Bool(s.starts_with(p.as_str())),
        ("ends_with", Value::Str(s), [Value::Str(p)]) => Value::Bool(s.ends_with(p.as_str())),
        ("is_some", Value::Option(v), []) => Value::Bool(v.is_some()),
        ("is_none", Value::Option(v), []) => Value::Bool(v.is_none()),
        ("unwrap", Value::Option(Some(v)), []) => (**v).clone(),
        ("unwrap", Value::Option(None), []) => {
            return Some(Err(EvalError::Aborted(
                "called 'unwrap' on a 'None' value".to_string(),
            )))
        }
        ("unwrap_or", Value::Option(v), [default]) => match v {
            Some(v) => (**v).clone(),
            None => default.clone(),
        },
        _ => return None,
    };
    Some(Ok(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Document;

    const SHOP: &str = r#"
permute: { version: "0.1", type: struct }
types:
  Money:
    fields: { dollar: u32, cent: u8 }
  Meters:
    fields: { value: f64 }
  Counter:
    fields:
      start: u64
      _seen: { type: u64, private: true }
  Mode:
    variants: [Fast, Slow]
impls:
  - for: Money
    trait: ConstEq
    methods:
      eq: self.dollar == other.dollar && self.cent == other.cent
  - for: Meters
    trait: PartialEq
    methods:
      eq: extern
  - for: Counter
    methods:
      "const fn new(start: u64) -> Self": "Self { start: start, _seen: 0 }"
      "const fn spin(self) -> u64": self.spin()
"#;

    const OTHER: &str = r#"
permute: { version: "0.1", type: struct }
"#;

    fn store() -> Store {
        let shop = Document::from_yaml("shop", "shop.yaml", SHOP).unwrap();
        let other = Document::from_yaml("other", "other.yaml", OTHER).unwrap();
        Store::load(vec![shop, other]).unwrap()
    }

    fn eval_in(store: &Store, env: &Env, source: &str) -> Result<Value, EvalError> {
        let snippet = Snippet::parse(source).unwrap();
        Evaluator::new(store).eval_snippet(&snippet, env)
    }

    fn eval(source: &str) -> Result<Value, EvalError> {
        eval_in(&store(), &Env::new("shop"), source)
    }

    #[test]
    fn arithmetic_is_checked() {
        assert_eq!(eval("1 + 2 * 3"), Ok(Value::Int(7)));
        assert_eq!(eval("7 % 4 - 10"), Ok(Value::Int(-7)));
        assert_eq!(eval("9223372036854775807 + 1"), Err(EvalError::Overflow));
        assert_eq!(eval("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval(r#""ab" + "cd""#), Ok(Value::Str("abcd".into())));
        assert_eq!(eval("1 < 1.5"), Ok(Value::Bool(true)));
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(eval("false && missing"), Ok(Value::Bool(false)));
        assert_eq!(eval("true || missing"), Ok(Value::Bool(true)));
        assert_eq!(eval("true && missing"), Err(EvalError::UnknownName("missing".into())));
    }

    #[test]
    fn const_eq_impls_run_at_declaration_time() {
        let equal = "Money { dollar: 3, cent: 50 } == Money { dollar: 3, cent: 50 }";
        assert_eq!(eval(equal), Ok(Value::Bool(true)));
        let differ = "Money { dollar: 3, cent: 50 } != Money { dollar: 3, cent: 5 }";
        assert_eq!(eval(differ), Ok(Value::Bool(true)));
    }

    #[test]
    fn non_const_equality_is_deferred() {
        let value = eval("Meters { value: 1.0 } == Meters { value: 2.0 }").unwrap();
        assert!(matches!(value, Value::Deferred { ref ty, .. } if *ty == bool_ty()));
    }

    #[test]
    fn unknown_values_defer_calls() {
        let store = store();
        let names = Value::Ref {
            binding: "names".into(),
            ty: Ty::std("Vec", vec![Ty::std("String", vec![])]),
        };
        let env = Env::new("shop").with_var("names", names);
        let len = eval_in(&store, &env, "names.len()").unwrap();
        assert_eq!(len, Value::deferred(Ty::std("usize", vec![]), "names.len()"));
        let check = eval_in(&store, &env, "names.len() == 2").unwrap();
        assert_eq!(check.ty(), bool_ty());
        assert!(!check.is_known());
    }

    #[test]
    fn builtins_on_known_values() {
        assert_eq!(eval(r#""hello".len()"#), Ok(Value::Int(5)));
        assert_eq!(eval(r#"["a", "b"].contains("b")"#), Ok(Value::Bool(true)));
        assert_eq!(eval("Some(3).unwrap_or(4)"), Ok(Value::Int(3)));
        assert!(matches!(eval("None.unwrap()"), Err(EvalError::Aborted(_))));
    }

    #[test]
    fn optional_chaining() {
        let store = store();
        let env = Env::new("shop")
            .with_var("none", Value::Option(None))
            .with_var("some", Value::some(Value::Str("ab".into())));
        assert_eq!(eval_in(&store, &env, "none?.len()"), Ok(Value::Option(None)));
        assert_eq!(
            eval_in(&store, &env, "some?.len()"),
            Ok(Value::some(Value::Int(2)))
        );
    }

    #[test]
    fn associated_functions_and_private_fields() {
        assert_eq!(eval("Counter::new(5).start"), Ok(Value::Int(5)));
        assert_eq!(eval("Mode::Fast == Mode::Slow"), Ok(Value::Bool(false)));

        let store = store();
        let other = Env::new("other");
        assert_eq!(eval_in(&store, &other, "shop::Counter::new(5).start"), Ok(Value::Int(5)));
        let private = eval_in(&store, &other, "shop::Counter::new(5)._seen");
        assert!(matches!(private, Err(EvalError::Type(ref m)) if m.contains("private")));
    }

    #[test]
    fn struct_literals_require_every_field() {
        let missing = eval("Money { dollar: 3 }");
        assert!(matches!(missing, Err(EvalError::Type(ref m)) if m.contains("missing field 'cent'")));
        let unknown = eval("Money { dollar: 3, cent: 1, mills: 2 }");
        assert!(matches!(unknown, Err(EvalError::Type(ref m)) if m.contains("mills")));
    }

    #[test]
    fn runaway_recursion_hits_the_depth_limit() {
        let store = store();
        let result = eval_in(&store, &Env::new("shop"), "Counter::new(1).spin()");
        assert_eq!(result, Err(EvalError::DepthExceeded(store.max_depth())));
    }
}
