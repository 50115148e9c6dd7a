// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::store::Ty;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// Result of evaluating an expression at declaration time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Option(Option<Box<Value>>),
    /// A struct value; `ty` is `_` for a nested record whose type is not yet known.
    Struct { ty: Ty, fields: Vec<(String, Value)> },
    Enum { ty: Ty, variant: String },
    /// A value converted into a wrapper or `From` target type.
    Wrapped { ty: Ty, inner: Box<Value> },
    Closure { params: Vec<String>, source: String },
    /// Another binding of the same pipeline document.
    Ref { binding: String, ty: Ty },
    /// Only known at run time: the result of a call the declaration layer cannot evaluate.
    Deferred { ty: Ty, call: String },
}

impl Value {
    /// Type of the value, as far as the declaration layer knows it.
    pub fn ty(&self) -> Ty {
        match self {
            Value::Unit => Ty::Unit,
            Value::Bool(_) => Ty::std("bool", vec![]),
            Value::Int(_) => Ty::std("i64", vec![]),
            Value::Float(_) => Ty::std("f64", vec![]),
            Value::Str(_) => Ty::std("String", vec![]),
            Value::List(items) => {
                let elem = items.first().map(Value::ty).unwrap_or(Ty::Infer);
                Ty::std("Vec", vec![elem])
            }
            Value::Option(inner) => {
                let elem = inner.as_ref().map(|v| v.ty()).unwrap_or(Ty::Infer);
                Ty::std("Option", vec![elem])
            }
            Value::Struct { ty, .. }
            | Value::Enum { ty, .. }
            | Value::Wrapped { ty, .. }
            | Value::Ref { ty, .. }
            | Value::Deferred { ty, .. } => ty.clone(),
            Value::Closure { params, .. } => Ty::Fn {
                params: vec![Ty::Infer; params.len()],
                ret: Box::new(Ty::Infer),
            },
        }
    }

    /// True when the value (and everything inside it) is known at declaration time.
    pub fn is_known(&self) -> bool {
        match self {
            Value::Ref { .. } | Value::Deferred { .. } => false,
            Value::List(items) => items.iter().all(Value::is_known),
            Value::Option(Some(inner)) => inner.is_known(),
            Value::Struct { fields, .. } => fields.iter().all(|(_, v)| v.is_known()),
            Value::Wrapped { inner, .. } => inner.is_known(),
            _ => true,
        }
    }

    /// Names of bindings this value refers to.
    pub fn refs(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs(&self, out: &mut Vec<String>) {
        match self {
            Value::Ref { binding, .. } => {
                if !out.contains(binding) {
                    out.push(binding.clone());
                }
            }
            Value::List(items) => items.iter().for_each(|v| v.collect_refs(out)),
            Value::Option(Some(inner)) | Value::Wrapped { inner, .. } => inner.collect_refs(out),
            Value::Struct { fields, .. } => fields.iter().for_each(|(_, v)| v.collect_refs(out)),
            _ => {}
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct { fields, .. } => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn some(value: Value) -> Value {
        Value::Option(Some(Box::new(value)))
    }

    pub fn deferred(ty: Ty, call: impl Into<String>) -> Value {
        Value::Deferred {
            ty,
            call: call.into(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Option(None) => f.write_str("None"),
            Value::Option(Some(inner)) => write!(f, "Some({})", inner),
            Value::Struct { ty, fields } => {
                write!(f, "{} {{", ty)?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {}: {}", name, value)?;
                }
                f.write_str(" }")
            }
            Value::Enum { ty, variant } => write!(f, "{}::{}", ty, variant),
            Value::Wrapped { ty, inner } => write!(f, "{}({})", ty, inner),
            Value::Closure { source, .. } => f.write_str(source),
            Value::Ref { binding, .. } => f.write_str(binding),
            Value::Deferred { call, .. } => f.write_str(call),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Unit => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Option(None) => serializer.serialize_none(),
            Value::Option(Some(inner)) => serializer.serialize_some(inner.as_ref()),
            Value::Struct { ty, fields } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", ty)?;
                map.serialize_entry("fields", &FieldMap(fields))?;
                map.end()
            }
            Value::Enum { .. } => serializer.collect_str(self),
            Value::Wrapped { ty, inner } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", ty)?;
                map.serialize_entry("value", inner.as_ref())?;
                map.end()
            }
            Value::Closure { source, .. } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("closure", source)?;
                map.end()
            }
            Value::Ref { binding, .. } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("ref", binding)?;
                map.end()
            }
            Value::Deferred { ty, call } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("deferred", call)?;
                map.serialize_entry("type", ty)?;
                map.end()
            }
        }
    }
}

struct FieldMap<'a>(&'a [(String, Value)]);

impl Serialize for FieldMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
