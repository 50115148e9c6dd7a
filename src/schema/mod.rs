// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Parameter schemas of components and records, and their validation.

mod validator;

pub use validator::{
    validate, verify_defaults, ParamOrigin, SchemaValidator, ValidatedParam, ValidatedParams,
};

use crate::expr::Snippet;
use crate::store::{ComponentKind, Generic, Subst, Ty, TypeDecl};

/// A boolean predicate over a bound value or over all parameters of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckSpec {
    pub snippet: Snippet,
    /// The parameter or column bound to `self`; `None` for document-level checks.
    pub subject: Option<String>,
    pub explain: Option<String>,
}

impl CheckSpec {
    pub fn source(&self) -> &str {
        &self.snippet.source
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: Ty,
    pub default: Option<Snippet>,
    pub checks: Vec<CheckSpec>,
    pub explain: Option<String>,
}

/// The declared shape a binding's parameters must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Path of the type the schema constructs.
    pub component: String,
    /// `None` for plain struct records.
    pub kind: Option<ComponentKind>,
    /// Module whose names are visible to defaults and checks.
    pub module: String,
    pub document: String,
    pub generics: Vec<Generic>,
    /// In declaration order.
    pub params: Vec<ParamSpec>,
    /// Cross-field checks over all parameters.
    pub checks: Vec<CheckSpec>,
    /// Checks over produced items, evaluated by the executor.
    pub runtime_checks: Vec<CheckSpec>,
}

impl Schema {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Schema of a plain struct: one required parameter per public field.
    pub fn for_struct(decl: &TypeDecl) -> Schema {
        Schema {
            component: decl.path.clone(),
            kind: None,
            module: decl.module.clone(),
            document: decl.module.clone(),
            generics: decl.generics.clone(),
            params: decl
                .fields()
                .iter()
                .filter(|f| f.public)
                .map(|f| ParamSpec {
                    name: f.name.clone(),
                    ty: f.ty.clone(),
                    default: None,
                    checks: vec![],
                    explain: f.explain.clone(),
                })
                .collect(),
            checks: vec![],
            runtime_checks: vec![],
        }
    }

    /// The schema for one instantiation of a generic component.
    pub fn instantiate(&self, args: &[Ty]) -> Schema {
        let subst: Subst = self
            .generics
            .iter()
            .zip(args)
            .map(|(g, a)| (g.name.clone(), a.clone()))
            .collect();
        let mut schema = self.clone();
        for param in &mut schema.params {
            param.ty = param.ty.substitute(&subst);
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GenericKind;

    #[test]
    fn instantiate_substitutes_parameter_types() {
        let schema = Schema {
            component: "example1::Csv".into(),
            kind: Some(ComponentKind::Sink),
            module: "example1::Csv".into(),
            document: "example1/Csv.yaml".into(),
            generics: vec![Generic {
                name: "T".into(),
                kind: GenericKind::Type,
                default: None,
            }],
            params: vec![ParamSpec {
                name: "write".into(),
                ty: Ty::std("Vec", vec![Ty::Param("T".into())]),
                default: None,
                checks: vec![],
                explain: None,
            }],
            checks: vec![],
            runtime_checks: vec![],
        };
        let row = Ty::named("example1::Row", vec![]);
        let concrete = schema.instantiate(&[row.clone()]);
        assert_eq!(concrete.param("write").unwrap().ty, Ty::std("Vec", vec![row]));
        assert!(schema.param("missing").is_none());
    }
}
