// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::{CheckSpec, Schema};
use crate::errors::{Diagnostic, ErrorKind, EvalError, Location};
use crate::expr::{Env, Evaluator, Snippet, Value};
use crate::observability::messages::validation::{
    CoercionApplied, DefaultApplied, RuntimeCheckDeferred, ValidationFailed, ValidationStarted,
};
use crate::observability::messages::StructuredLog;
use crate::resolve::{types_match, unify, TraitResolver};
use crate::store::{lang, Generic, Store, Subst, TraitRef, Ty, TypeDecl, TypeKind};
use serde::Serialize;
use std::collections::BTreeSet;

/// How a validated parameter got its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamOrigin {
    Supplied,
    Default,
    /// Converted into the declared type; `via` names the conversion.
    Coerced { via: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedParam {
    pub name: String,
    pub value: Value,
    pub origin: ParamOrigin,
}

/// Parameters that satisfied a schema, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedParams {
    pub component: String,
    /// The component type, with generic arguments inferred from the values.
    pub ty: Ty,
    pub params: Vec<ValidatedParam>,
    /// Check predicates that depend on run-time values.
    pub runtime_checks: Vec<String>,
}

impl ValidatedParams {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// The validated values in the shape [`SchemaValidator::validate`] accepts.
    pub fn to_supplied(&self) -> Vec<(String, Value)> {
        self.params
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }
}

/// Validate `supplied` against `schema` with a fresh validator.
pub fn validate(
    store: &Store,
    schema: &Schema,
    supplied: &[(String, Value)],
    base: &Location,
) -> Result<ValidatedParams, Vec<Diagnostic>> {
    SchemaValidator::new(store).validate(schema, supplied, base)
}

/// Every declared default conforms to the type of its parameter.
pub fn verify_defaults(store: &Store) -> Vec<Diagnostic> {
    let validator = SchemaValidator::new(store);
    let mut diagnostics = Vec::new();
    for schema in store.schemas() {
        let env = Env::new(schema.module.clone());
        for param in &schema.params {
            let Some(default) = &param.default else {
                continue;
            };
            let at = Location::document(schema.document.clone())
                .at("params")
                .at(&param.name)
                .at("default");
            let value = match validator.eval.eval_snippet(default, &env) {
                Ok(value) => value,
                Err(err) => {
                    diagnostics.push(eval_failure(&at, default, err));
                    continue;
                }
            };
            if !param.ty.params().is_empty() {
                continue;
            }
            if validator.conform(value.clone(), &param.ty, &at).is_err() {
                diagnostics.push(Diagnostic::new(
                    at,
                    ErrorKind::TypeMismatch {
                        expected: param.ty.to_string(),
                        found: value.ty().to_string(),
                    },
                ));
            }
        }
    }
    diagnostics
}

enum Verdict {
    Holds,
    Fails,
    Deferred,
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator<'s> {
    store: &'s Store,
    traits: TraitResolver<'s>,
    eval: Evaluator<'s>,
}

impl<'s> SchemaValidator<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self {
            store,
            traits: TraitResolver::new(store),
            eval: Evaluator::new(store),
        }
    }

    /// Check `supplied` against `schema`. Every independent fault is reported; an abort
    /// raised by declared code stops validation at once.
    pub fn validate(
        &self,
        schema: &Schema,
        supplied: &[(String, Value)],
        base: &Location,
    ) -> Result<ValidatedParams, Vec<Diagnostic>> {
        ValidationStarted {
            component: &schema.component,
            supplied_count: supplied.len(),
        }
        .log();
        let result = self.run(schema, supplied, base);
        if let Err(diagnostics) = &result {
            ValidationFailed {
                component: &schema.component,
                error_count: diagnostics.len(),
            }
            .log();
        }
        result
    }

    /// Validate `fields` as a value of the struct type `ty` against its public fields.
    pub fn validate_record(
        &self,
        fields: &[(String, Value)],
        ty: &Ty,
        base: &Location,
    ) -> Result<Value, Vec<Diagnostic>> {
        ValidationStarted {
            component: &ty.to_string(),
            supplied_count: fields.len(),
        }
        .log();
        let result = self.record(fields, &self.store.normalize(ty), base);
        if let Err(diagnostics) = &result {
            ValidationFailed {
                component: &ty.to_string(),
                error_count: diagnostics.len(),
            }
            .log();
        }
        result
    }

    fn run(
        &self,
        schema: &Schema,
        supplied: &[(String, Value)],
        base: &Location,
    ) -> Result<ValidatedParams, Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();
        for (name, _) in supplied {
            if schema.param(name).is_none() {
                diagnostics.push(Diagnostic::new(
                    base.at(name),
                    ErrorKind::UnknownParam { field: name.clone() },
                ));
            }
        }

        let mut params = Vec::with_capacity(schema.params.len());
        let mut runtime_checks = Vec::new();
        for spec in &schema.params {
            let at = base.at(&spec.name);
            let given = supplied.iter().find(|(n, _)| *n == spec.name);
            let (raw, origin) = match (given, &spec.default) {
                (Some((_, value)), _) => (value.clone(), ParamOrigin::Supplied),
                (None, Some(default)) => {
                    match self.eval.eval_snippet(default, &Env::new(schema.module.clone())) {
                        Ok(value) => {
                            DefaultApplied {
                                component: &schema.component,
                                field: &spec.name,
                                default: &default.source,
                            }
                            .log();
                            (value, ParamOrigin::Default)
                        }
                        Err(err) => {
                            let abort = matches!(err, EvalError::Aborted(_));
                            diagnostics.push(eval_failure(&at.at("default"), default, err));
                            if abort {
                                return Err(diagnostics);
                            }
                            continue;
                        }
                    }
                }
                (None, None) => {
                    diagnostics.push(Diagnostic::new(
                        at,
                        ErrorKind::MissingRequiredParam {
                            field: spec.name.clone(),
                        },
                    ));
                    continue;
                }
            };

            let (value, origin) = match self.conform(raw, &spec.ty, &at) {
                Ok((value, Some(via))) => (value, ParamOrigin::Coerced { via }),
                Ok((value, None)) => (value, origin),
                Err(mut faults) => {
                    diagnostics.append(&mut faults);
                    continue;
                }
            };

            let env = Env::new(schema.module.clone())
                .with_self(value.clone())
                .with_var(spec.name.clone(), value.clone());
            for check in &spec.checks {
                match self.check(check, &env, &at) {
                    Ok(Verdict::Holds) => {}
                    Ok(Verdict::Fails) => diagnostics.push(Diagnostic::new(
                        at.clone(),
                        ErrorKind::CheckViolation {
                            field: spec.name.clone(),
                            predicate: check.source().to_string(),
                        },
                    )),
                    Ok(Verdict::Deferred) => {
                        RuntimeCheckDeferred {
                            component: &schema.component,
                            predicate: check.source(),
                        }
                        .log();
                        runtime_checks.push(check.source().to_string());
                    }
                    Err(fault) => {
                        let terminal = fault.kind.is_terminal();
                        diagnostics.push(fault);
                        if terminal {
                            return Err(diagnostics);
                        }
                    }
                }
            }
            params.push(ValidatedParam {
                name: spec.name.clone(),
                value,
                origin,
            });
        }

        // Cross-field checks need a value for every declared parameter.
        if params.len() == schema.params.len() {
            let mut env = Env::new(schema.module.clone());
            for param in &params {
                env.bind(param.name.clone(), param.value.clone());
            }
            let at = base.at("checks");
            for check in &schema.checks {
                match self.check(check, &env, &at) {
                    Ok(Verdict::Holds) => {}
                    Ok(Verdict::Fails) => diagnostics.push(Diagnostic::new(
                        at.clone(),
                        ErrorKind::CrossFieldCheckViolation {
                            predicate: check.source().to_string(),
                        },
                    )),
                    Ok(Verdict::Deferred) => {
                        RuntimeCheckDeferred {
                            component: &schema.component,
                            predicate: check.source(),
                        }
                        .log();
                        runtime_checks.push(check.source().to_string());
                    }
                    Err(fault) => {
                        let terminal = fault.kind.is_terminal();
                        diagnostics.push(fault);
                        if terminal {
                            return Err(diagnostics);
                        }
                    }
                }
            }
        }

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }
        Ok(ValidatedParams {
            component: schema.component.clone(),
            ty: self.infer_ty(schema, &params),
            params,
            runtime_checks,
        })
    }

    fn check(&self, check: &CheckSpec, env: &Env, at: &Location) -> Result<Verdict, Diagnostic> {
        match self.eval.eval_snippet(&check.snippet, env) {
            Ok(Value::Bool(true)) => Ok(Verdict::Holds),
            Ok(Value::Bool(false)) => Ok(Verdict::Fails),
            Ok(unknown) if !unknown.is_known() && unknown.ty().path() == Some(lang::BOOL) => {
                Ok(Verdict::Deferred)
            }
            Ok(other) => Err(Diagnostic::new(
                at.clone(),
                ErrorKind::TypeMismatch {
                    expected: Ty::named(lang::BOOL, vec![]).to_string(),
                    found: other.ty().to_string(),
                },
            )),
            Err(err) => Err(eval_failure(at, &check.snippet, err)),
        }
    }

    fn infer_ty(&self, schema: &Schema, params: &[ValidatedParam]) -> Ty {
        let vars: BTreeSet<String> = Generic::names(&schema.generics).into_iter().collect();
        let mut subst = Subst::new();
        for param in params {
            if let Some(spec) = schema.param(&param.name) {
                unify(&spec.ty, &param.value.ty(), &vars, &mut subst);
            }
        }
        let args = schema
            .generics
            .iter()
            .map(|g| subst.get(&g.name).cloned().unwrap_or(Ty::Infer))
            .collect();
        Ty::named(schema.component.clone(), args)
    }

    /// `value` in the shape of `expected`, and the conversion used to get there.
    fn conform(
        &self,
        value: Value,
        expected: &Ty,
        at: &Location,
    ) -> Result<(Value, Option<String>), Vec<Diagnostic>> {
        let expected = self.store.normalize(expected);
        if let Value::Struct {
            ty: Ty::Infer,
            fields,
        } = &value
        {
            return self.record(fields, &expected, at).map(|v| (v, None));
        }
        if let Some(accepted) = self.accepts(&value, &expected) {
            return Ok((accepted, None));
        }
        match self.coerce(&value, &expected, at)? {
            Some((coerced, via)) => {
                CoercionApplied {
                    field: &at.to_string(),
                    from: &value.ty().to_string(),
                    to: &expected.to_string(),
                    via: &via,
                }
                .log();
                Ok((coerced, Some(via)))
            }
            None => Err(vec![Diagnostic::new(
                at.clone(),
                ErrorKind::TypeMismatch {
                    expected: expected.to_string(),
                    found: value.ty().to_string(),
                },
            )]),
        }
    }

    /// `Some` when `value` already has type `expected`; integers widen to floats.
    fn accepts(&self, value: &Value, expected: &Ty) -> Option<Value> {
        let expected = self.store.normalize(expected);
        match (&expected, value) {
            (Ty::Infer | Ty::Param(_), _) => Some(value.clone()),
            (Ty::Impl(bound), _) => self
                .traits
                .implements(&value.ty(), bound)
                .then(|| value.clone()),
            (_, Value::Ref { ty, .. } | Value::Deferred { ty, .. }) => {
                (*ty == Ty::Infer || types_match(ty, &expected)).then(|| value.clone())
            }
            (Ty::Unit, Value::Unit) => Some(Value::Unit),
            (Ty::Fn { params, .. }, Value::Closure { params: written, .. }) => {
                (params.len() == written.len()).then(|| value.clone())
            }
            (Ty::Named { path, args }, _) => {
                let path = path.as_str();
                let elem = args.first().cloned().unwrap_or(Ty::Infer);
                match value {
                    Value::Int(n) if lang::INTEGERS.contains(&path) => {
                        int_fits(path, *n).then(|| value.clone())
                    }
                    Value::Int(n) if lang::FLOATS.contains(&path) => Some(Value::Float(*n as f64)),
                    Value::Float(_) if lang::FLOATS.contains(&path) => Some(value.clone()),
                    Value::Bool(_) if path == lang::BOOL => Some(value.clone()),
                    Value::Str(_) if path == lang::STRING => Some(value.clone()),
                    Value::List(items) if path == lang::VEC => items
                        .iter()
                        .map(|item| self.accepts(item, &elem))
                        .collect::<Option<Vec<_>>>()
                        .map(Value::List),
                    Value::Option(None) if path == lang::OPTION => Some(value.clone()),
                    Value::Option(Some(inner)) if path == lang::OPTION => {
                        self.accepts(inner, &elem).map(Value::some)
                    }
                    Value::Struct { ty, .. } | Value::Enum { ty, .. } | Value::Wrapped { ty, .. } => {
                        types_match(ty, &expected).then(|| value.clone())
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Implicit `Some`, then a transparent wrapper, then a unique `From` impl.
    fn coerce(
        &self,
        value: &Value,
        expected: &Ty,
        at: &Location,
    ) -> Result<Option<(Value, String)>, Vec<Diagnostic>> {
        if expected.path() == Some(lang::OPTION) {
            if let Some(elem) = expected.args().first() {
                if let Ok((inner, _)) = self.conform(value.clone(), elem, at) {
                    return Ok(Some((Value::some(inner), "Some".to_string())));
                }
            }
        }

        if let Some(inner_ty) = self.traits.project(expected, lang::TRANSPARENT, lang::INNER) {
            if let Some(inner) = self.accepts(value, &inner_ty) {
                let wrapped = Value::Wrapped {
                    ty: expected.clone(),
                    inner: Box::new(inner),
                };
                return Ok(Some((wrapped, "Transparent".to_string())));
            }
        }

        let mut conversions = self.conversions(value, expected);
        match conversions.len() {
            0 => Ok(None),
            1 => {
                let (source, inner) = conversions.remove(0);
                let wrapped = Value::Wrapped {
                    ty: expected.clone(),
                    inner: Box::new(inner),
                };
                Ok(Some((wrapped, format!("From<{}>", source))))
            }
            _ => Err(vec![Diagnostic::new(
                at.clone(),
                ErrorKind::Ambiguous {
                    subject: format!("conversion of '{}' into '{}'", value.ty(), expected),
                    candidates: conversions
                        .iter()
                        .map(|(source, _)| format!("From<{}> for {}", source, expected))
                        .collect(),
                    requires_qualification: false,
                },
            )]),
        }
    }

    /// `From` sources of `expected` that accept `value`.
    fn conversions(&self, value: &Value, expected: &Ty) -> Vec<(Ty, Value)> {
        let mut found: Vec<(Ty, Value)> = Vec::new();
        for decl in self.store.impls_of_trait(lang::FROM) {
            let Some(source) = decl.trait_ref.as_ref().and_then(|t| t.args.first()) else {
                continue;
            };
            let vars: BTreeSet<String> = Generic::names(&decl.generics).into_iter().collect();
            let mut subst = Subst::new();
            if !unify(&decl.target, expected, &vars, &mut subst) {
                continue;
            }
            let source = source.substitute(&subst);
            let Some(inner) = self.accepts(value, &source) else {
                continue;
            };
            let query = TraitRef::new(lang::FROM, vec![source.clone()]);
            if self.traits.implements(expected, &query) && !found.iter().any(|(s, _)| *s == source) {
                found.push((source, inner));
            }
        }
        found
    }

    /// A nested record validated against the public fields of the struct `expected`.
    fn record(
        &self,
        fields: &[(String, Value)],
        expected: &Ty,
        at: &Location,
    ) -> Result<Value, Vec<Diagnostic>> {
        let decl = expected
            .path()
            .and_then(|p| self.store.type_decl(p))
            .filter(|d| matches!(d.kind, TypeKind::Struct { .. }))
            .ok_or_else(|| {
                vec![Diagnostic::new(
                    at.clone(),
                    ErrorKind::TypeMismatch {
                        expected: expected.to_string(),
                        found: "record".to_string(),
                    },
                )]
            })?;

        let private: Vec<Diagnostic> = fields
            .iter()
            .filter(|(name, _)| decl.field(name).is_some_and(|f| !f.public))
            .map(|(name, _)| {
                Diagnostic::new(
                    at.at(name),
                    ErrorKind::InvalidDeclaration {
                        reason: format!("field '{}' of '{}' is private", name, decl.path),
                    },
                )
            })
            .collect();
        if !private.is_empty() {
            return Err(private);
        }

        let schema = Schema::for_struct(decl).instantiate(expected.args());
        let validated = self.run(&schema, fields, at)?;
        Ok(Value::Struct {
            ty: record_ty(decl, expected, &validated),
            fields: validated
                .params
                .into_iter()
                .map(|p| (p.name, p.value))
                .collect(),
        })
    }
}

fn record_ty(decl: &TypeDecl, expected: &Ty, validated: &ValidatedParams) -> Ty {
    if expected.args().len() == decl.generics.len() && expected.is_concrete() {
        expected.clone()
    } else {
        validated.ty.clone()
    }
}

fn eval_failure(at: &Location, snippet: &Snippet, err: EvalError) -> Diagnostic {
    Diagnostic::new(at.clone(), err.into_kind(&snippet.source))
}

fn int_fits(path: &str, n: i64) -> bool {
    let (min, max): (i128, i128) = match path {
        "std::u8" => (0, u8::MAX as i128),
        "std::u16" => (0, u16::MAX as i128),
        "std::u32" => (0, u32::MAX as i128),
        "std::u64" | "std::usize" => (0, u64::MAX as i128),
        "std::i8" => (i8::MIN as i128, i8::MAX as i128),
        "std::i16" => (i16::MIN as i128, i16::MAX as i128),
        "std::i32" => (i32::MIN as i128, i32::MAX as i128),
        _ => (i64::MIN as i128, i64::MAX as i128),
    };
    (min..=max).contains(&(n as i128))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Document;

    const MONEY: &str = r#"
permute: { version: "0.1", type: struct }
types:
  Label: { inner: String }
  Cents: { fields: { value: u64 } }
  Point:
    fields:
      x: i64
      y: i64
      _tag: { type: String, private: true }
impls:
  - for: Cents
    trait: From<u32>
    methods:
      from: extern
"#;

    const CSV: &str = r#"
permute: { version: "0.1", type: sink }
generics: [T]
input: T
params:
  path: { type: String, check: "self.ends_with(\".csv\")" }
  header: { type: "Vec<String>", default: "[]" }
  write: { type: "Vec<String>", default: "[]" }
  label: { type: "Option<money::Label>", default: None }
  limit: { type: u8, default: 10 }
checks:
  - header.len() == 0 || header.len() == write.len()
"#;

    fn store() -> Store {
        let money = Document::from_yaml("money", "money.yaml", MONEY).unwrap();
        let csv = Document::from_yaml("out::Csv", "out/Csv.yaml", CSV).unwrap();
        Store::load(vec![money, csv]).unwrap()
    }

    fn strs(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Value::Str(s.to_string())).collect())
    }

    fn supplied(pairs: &[(&str, Value)]) -> Vec<(String, Value)> {
        pairs.iter().map(|(n, v)| (n.to_string(), v.clone())).collect()
    }

    fn kinds(result: Result<ValidatedParams, Vec<Diagnostic>>) -> Vec<ErrorKind> {
        result.unwrap_err().into_iter().map(|d| d.kind).collect()
    }

    fn base() -> Location {
        Location::document("main.yaml").at("let").at("out")
    }

    #[test]
    fn missing_required_params_are_reported() {
        let store = store();
        let schema = store.schema("out::Csv").unwrap();
        let errors = kinds(validate(&store, schema, &[], &base()));
        assert_eq!(
            errors,
            vec![ErrorKind::MissingRequiredParam {
                field: "path".into()
            }]
        );
    }

    #[test]
    fn defaults_fill_optional_params() {
        let store = store();
        let schema = store.schema("out::Csv").unwrap();
        let given = supplied(&[("path", Value::Str("out.csv".into()))]);
        let validated = validate(&store, schema, &given, &base()).unwrap();
        assert_eq!(validated.get("header"), Some(&Value::List(vec![])));
        assert_eq!(validated.get("limit"), Some(&Value::Int(10)));
        let origins: Vec<&ParamOrigin> = validated.params.iter().map(|p| &p.origin).collect();
        assert_eq!(origins[0], &ParamOrigin::Supplied);
        assert_eq!(origins[1], &ParamOrigin::Default);
    }

    #[test]
    fn cross_field_checks_compare_lengths() {
        let store = store();
        let schema = store.schema("out::Csv").unwrap();
        let mismatched = supplied(&[
            ("path", Value::Str("out.csv".into())),
            ("header", strs(&["a", "b"])),
            ("write", strs(&["x", "y", "z"])),
        ]);
        let errors = kinds(validate(&store, schema, &mismatched, &base()));
        assert!(matches!(errors[..], [ErrorKind::CrossFieldCheckViolation { .. }]));

        let matched = supplied(&[
            ("path", Value::Str("out.csv".into())),
            ("header", strs(&["a", "b"])),
            ("write", strs(&["x", "y"])),
        ]);
        assert!(validate(&store, schema, &matched, &base()).is_ok());
    }

    #[test]
    fn cross_field_checks_run_beside_unknown_params() {
        let store = store();
        let schema = store.schema("out::Csv").unwrap();
        let given = supplied(&[
            ("path", Value::Str("out.csv".into())),
            ("header", strs(&["a", "b"])),
            ("write", strs(&["x", "y", "z"])),
            ("colour", Value::Str("red".into())),
        ]);
        let errors = kinds(validate(&store, schema, &given, &base()));
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&ErrorKind::UnknownParam {
            field: "colour".into()
        }));
        assert!(errors
            .iter()
            .any(|k| matches!(k, ErrorKind::CrossFieldCheckViolation { .. })));
    }

    #[test]
    fn field_checks_and_unknown_params_are_batched() {
        let store = store();
        let schema = store.schema("out::Csv").unwrap();
        let given = supplied(&[
            ("path", Value::Str("out.txt".into())),
            ("colour", Value::Str("red".into())),
            ("limit", Value::Int(300)),
        ]);
        let errors = kinds(validate(&store, schema, &given, &base()));
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ErrorKind::UnknownParam {
            field: "colour".into()
        }));
        assert!(errors.contains(&ErrorKind::CheckViolation {
            field: "path".into(),
            predicate: "self.ends_with(\".csv\")".into()
        }));
        assert!(errors.contains(&ErrorKind::TypeMismatch {
            expected: "u8".into(),
            found: "i64".into()
        }));
    }

    #[test]
    fn strings_coerce_into_optional_wrappers() {
        let store = store();
        let schema = store.schema("out::Csv").unwrap();
        let given = supplied(&[
            ("path", Value::Str("out.csv".into())),
            ("label", Value::Str("daily".into())),
        ]);
        let validated = validate(&store, schema, &given, &base()).unwrap();
        let label = &validated.params[3];
        assert_eq!(label.origin, ParamOrigin::Coerced { via: "Some".into() });
        assert_eq!(
            label.value,
            Value::some(Value::Wrapped {
                ty: Ty::named("money::Label", vec![]),
                inner: Box::new(Value::Str("daily".into())),
            })
        );
    }

    #[test]
    fn revalidation_is_idempotent() {
        let store = store();
        let schema = store.schema("out::Csv").unwrap();
        let given = supplied(&[
            ("path", Value::Str("out.csv".into())),
            ("label", Value::Str("daily".into())),
        ]);
        let first = validate(&store, schema, &given, &base()).unwrap();
        let second = validate(&store, schema, &first.to_supplied(), &base()).unwrap();
        assert_eq!(first.to_supplied(), second.to_supplied());
    }

    #[test]
    fn from_impls_convert_values() {
        let store = store();
        let validator = SchemaValidator::new(&store);
        let cents = Ty::named("money::Cents", vec![]);
        let (value, via) = validator.conform(Value::Int(250), &cents, &base()).unwrap();
        assert_eq!(via.as_deref(), Some("From<u32>"));
        assert_eq!(value.ty(), cents);
    }

    #[test]
    fn records_validate_against_public_fields() {
        let store = store();
        let validator = SchemaValidator::new(&store);
        let point = Ty::named("money::Point", vec![]);
        let record = Value::Struct {
            ty: Ty::Infer,
            fields: vec![("x".into(), Value::Int(1)), ("y".into(), Value::Int(2))],
        };
        let (value, _) = validator.conform(record, &point, &base()).unwrap();
        assert_eq!(value.ty(), point);
        assert_eq!(value.field("y"), Some(&Value::Int(2)));

        let private = Value::Struct {
            ty: Ty::Infer,
            fields: vec![
                ("x".into(), Value::Int(1)),
                ("y".into(), Value::Int(2)),
                ("_tag".into(), Value::Str("t".into())),
            ],
        };
        let errors = validator.conform(private, &point, &base()).unwrap_err();
        assert!(matches!(errors[0].kind, ErrorKind::InvalidDeclaration { .. }));
    }

    #[test]
    fn defaults_must_match_their_declared_type() {
        let bad = r#"
permute: { version: "0.1", type: sink }
input: String
params:
  retries: { type: u8, default: "\"three\"" }
"#;
        let doc = Document::from_yaml("out::Bad", "out/Bad.yaml", bad).unwrap();
        let errors = Store::load(vec![doc]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].kind, ErrorKind::TypeMismatch { .. }));
        assert_eq!(errors[0].location.path, vec!["params", "retries", "default"]);
    }

    #[test]
    fn unwrap_of_none_aborts_validation() {
        let aborting = r#"
permute: { version: "0.1", type: sink }
input: String
params:
  first: { type: "Option<u8>", default: None, check: "self.unwrap() > 1" }
  second: { type: u8 }
"#;
        let doc = Document::from_yaml("out::Abort", "out/Abort.yaml", aborting).unwrap();
        let store = Store::load(vec![doc]).unwrap();
        let schema = store.schema("out::Abort").unwrap();
        let errors = kinds(validate(&store, schema, &[], &base()));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_terminal());
    }
}
