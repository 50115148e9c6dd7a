// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Binding a process document into an [`ExecutionGraph`].
//!
//! ## Phases
//!
//! 1. **Types**: every `let` entry's declared type is resolved in the document's scope;
//!    omitted generic arguments take their declared defaults
//! 2. **Parameters**: field values are evaluated with every binding in scope as a reference,
//!    then validated against the component schema (or the struct's public fields); each
//!    binding named inside a value becomes a dependency
//! 3. **Pipes**: `a -> b -> c` checks that each stage accepts the items the previous
//!    stage produces, and makes every consumer depend on its producer
//! 4. **Ordering**: the graph is checked for cycles and sorted dependencies-first, ties
//!    broken by document order
//!
//! All faults of independent bindings are reported together. An abort raised by
//! declared code stops the document at once.
//!
//! # Examples
//!
//! ```rust
//! use permute::config::Document;
//! use permute::engine::bind;
//! use permute::store::Store;
//!
//! let lib = Document::from_yaml("app::Lines", "app/Lines.yaml", r#"
//! permute: { version: "0.1", type: source }
//! item: String
//! params:
//!   path: { type: String }
//! "#).unwrap();
//! let printer = Document::from_yaml("app::Print", "app/Print.yaml", r#"
//! permute: { version: "0.1", type: sink }
//! input: String
//! "#).unwrap();
//! let main = Document::from_yaml("app::main", "app/main.yaml", r#"
//! permute: { version: "0.1", type: main, use: ["app::*"] }
//! let:
//!   print: { Print: {} }
//!   lines: { Lines: { path: '"in.txt"' } }
//! pipe: ["lines -> print"]
//! "#).unwrap();
//!
//! let store = Store::load(vec![lib, printer, main.clone()]).unwrap();
//! let graph = bind(&store, &main).unwrap();
//! assert_eq!(graph.order(), vec!["lines", "print"]);
//! ```

use super::execution_graph::{ConstructionPlan, ExecutionGraph, ExecutionStep, PipeEdge, PlannedParam};
use super::topological::topological_order;
use crate::config::{validate_binding_graph, BindingBody, BindingGraph, Document, DocumentKind};
use crate::errors::{Diagnostic, ErrorKind, EvalError, Location};
use crate::expr::{Env, Evaluator, Snippet, Value};
use crate::observability::messages::binder::{BindingCompleted, BindingFailed, BindingStarted};
use crate::observability::messages::StructuredLog;
use crate::resolve::TraitResolver;
use crate::schema::SchemaValidator;
use crate::store::{lang, parse_ty, ModuleScope, Store, Subst, TraitRef, Ty, TypeKind};
use serde_yaml::Value as Yaml;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Bind `document` against `store` with a fresh binder.
pub fn bind(store: &Store, document: &Document) -> Result<ExecutionGraph, Vec<Diagnostic>> {
    Binder::new(store).bind(document)
}

/// Links the bindings of process documents into execution graphs.
///
/// A binder only borrows the store; binding one document never affects another.
#[derive(Debug, Clone, Copy)]
pub struct Binder<'s> {
    store: &'s Store,
    traits: TraitResolver<'s>,
    validator: SchemaValidator<'s>,
    eval: Evaluator<'s>,
}

impl<'s> Binder<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self {
            store,
            traits: TraitResolver::new(store),
            validator: SchemaValidator::new(store),
            eval: Evaluator::new(store),
        }
    }

    pub fn bind(&self, document: &Document) -> Result<ExecutionGraph, Vec<Diagnostic>> {
        BindingStarted {
            document: &document.origin,
            binding_count: document.file.bindings.len(),
            pipe_count: document.file.pipes.len(),
        }
        .log();
        let started = Instant::now();

        let result = self.run(document);
        match &result {
            Ok(graph) => BindingCompleted {
                document: &document.origin,
                step_count: graph.steps.len(),
                duration: started.elapsed(),
            }
            .log(),
            Err(diagnostics) => BindingFailed {
                document: &document.origin,
                error_count: diagnostics.len(),
            }
            .log(),
        }
        result
    }

    fn run(&self, document: &Document) -> Result<ExecutionGraph, Vec<Diagnostic>> {
        let root = document.location();
        if document.kind() != DocumentKind::Main {
            return Err(vec![Diagnostic::new(
                root.at("permute").at("type"),
                ErrorKind::InvalidDeclaration {
                    reason: format!(
                        "'{}' is not a main document and declares no pipeline",
                        document.module
                    ),
                },
            )]);
        }
        let scope = self.store.scope(&document.module).ok_or_else(|| {
            vec![Diagnostic::new(
                root.clone(),
                ErrorKind::InvalidDeclaration {
                    reason: format!("module '{}' is not loaded", document.module),
                },
            )]
        })?;

        let lets = root.at("let");
        let mut diagnostics = Vec::new();

        // Phase 1: declared types
        let mut declared: Vec<(String, Option<Ty>)> = Vec::new();
        for (name, binding) in document.file.bindings.iter() {
            match self.binding_ty(scope, &binding.ty, &lets.at(name).at("type")) {
                Ok(ty) => declared.push((name.clone(), Some(ty))),
                Err(fault) => {
                    diagnostics.push(fault);
                    declared.push((name.clone(), None));
                }
            }
        }
        let types: BTreeMap<&str, &Ty> = declared
            .iter()
            .filter_map(|(name, ty)| ty.as_ref().map(|ty| (name.as_str(), ty)))
            .collect();

        let mut env = Env::new(document.module.clone());
        for (name, ty) in &declared {
            env.bind(
                name.clone(),
                Value::Ref {
                    binding: name.clone(),
                    ty: ty.clone().unwrap_or(Ty::Infer),
                },
            );
        }

        // Phase 2: parameters and the references inside them
        let mut graph = BindingGraph::new();
        for (name, _) in &declared {
            graph.add_binding(name.clone());
        }
        let mut plans: BTreeMap<String, ConstructionPlan> = BTreeMap::new();
        for (name, binding) in document.file.bindings.iter() {
            let Some(ty) = types.get(name.as_str()) else {
                continue;
            };
            let at = lets.at(name);
            let fields = match &binding.body {
                BindingBody::Host(code) => {
                    plans.insert(name.clone(), ConstructionPlan::Host { code: code.clone() });
                    continue;
                }
                BindingBody::Fields(fields) => fields,
            };

            let mut supplied = Vec::with_capacity(fields.len());
            let mut faults = Vec::new();
            for (field, raw) in fields.iter() {
                let mut idents = BTreeSet::new();
                match self.field_value(raw, &env, &at.at(field), &mut idents) {
                    Ok(value) => supplied.push((field.clone(), value)),
                    Err(fault) => faults.push(fault),
                }
                let sibling: Vec<String> =
                    idents.into_iter().filter(|i| graph.contains(i)).collect();
                for ident in sibling {
                    graph.add_dependency(name, &ident);
                }
            }
            if faults.iter().any(|f| f.kind.is_terminal()) {
                diagnostics.append(&mut faults);
                return Err(diagnostics);
            }
            if !faults.is_empty() {
                diagnostics.append(&mut faults);
                continue;
            }

            match self.construct(name, ty, &supplied, &at) {
                Ok(plan) => {
                    plans.insert(name.clone(), plan);
                }
                Err(mut faults) => {
                    let terminal = faults.iter().any(|f| f.kind.is_terminal());
                    diagnostics.append(&mut faults);
                    if terminal {
                        return Err(diagnostics);
                    }
                }
            }
        }

        // Phase 3: pipes
        let mut pipes = Vec::new();
        for (i, pipe) in document.file.pipes.iter().enumerate() {
            let at = root.at("pipe").at(i.to_string());
            match self.pipe(pipe, &types, &graph, &at) {
                Ok(edges) => {
                    for edge in edges {
                        graph.add_dependency(&edge.to, &edge.from);
                        pipes.push(edge);
                    }
                }
                Err(mut faults) => diagnostics.append(&mut faults),
            }
        }

        // Phase 4: structure and order
        if let Err(kinds) = validate_binding_graph(&graph) {
            for kind in kinds {
                let at = match &kind {
                    ErrorKind::CyclicBinding { names } => names
                        .first()
                        .map(|first| lets.at(first))
                        .unwrap_or_else(|| lets.clone()),
                    _ => lets.clone(),
                };
                diagnostics.push(Diagnostic::new(at, kind));
            }
        }
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let order = topological_order(&graph).map_err(|names| {
            vec![Diagnostic::new(lets.clone(), ErrorKind::CyclicBinding { names })]
        })?;

        let mut steps = Vec::with_capacity(order.len());
        for name in order {
            let (Some(ty), Some(plan)) = (types.get(name.as_str()), plans.remove(&name)) else {
                continue;
            };
            let mut depends_on: Vec<String> = graph.dependencies_of(&name).to_vec();
            depends_on.sort_by_key(|d| graph.position(d));
            steps.push(ExecutionStep {
                name,
                ty: (*ty).clone(),
                plan,
                depends_on,
            });
        }

        Ok(ExecutionGraph {
            document: document.origin.clone(),
            module: document.module.clone(),
            name: document.name().to_string(),
            steps,
            pipes,
        })
    }

    /// The declared type of a binding, with defaulted generic arguments filled in.
    fn binding_ty(
        &self,
        scope: &ModuleScope,
        written: &str,
        at: &Location,
    ) -> Result<Ty, Diagnostic> {
        let parsed = parse_ty(written).map_err(|e| {
            Diagnostic::new(
                at.clone(),
                ErrorKind::InvalidExpression {
                    source_text: written.to_string(),
                    reason: e.to_string(),
                },
            )
        })?;
        let ty = scope
            .resolve_ty(&parsed, &[], self.store.index())
            .map_err(|e| Diagnostic::new(at.clone(), e.into()))?;

        let Ty::Named { path, mut args } = ty else {
            return Ok(ty);
        };
        let Some(decl) = self.store.type_decl(&path) else {
            return Ok(Ty::Named { path, args });
        };
        if args.len() > decl.generics.len() {
            return Err(Diagnostic::new(
                at.clone(),
                ErrorKind::InvalidDeclaration {
                    reason: format!(
                        "'{}' takes {} generic arguments, found {}",
                        path,
                        decl.generics.len(),
                        args.len()
                    ),
                },
            ));
        }
        for generic in decl.generics.iter().skip(args.len()) {
            let Some(default) = &generic.default else {
                return Err(Diagnostic::new(
                    at.clone(),
                    ErrorKind::InvalidDeclaration {
                        reason: format!(
                            "'{}' needs an explicit argument for '{}'",
                            path, generic.name
                        ),
                    },
                ));
            };
            let subst: Subst = decl
                .generics
                .iter()
                .zip(&args)
                .map(|(g, a)| (g.name.clone(), a.clone()))
                .collect();
            args.push(default.substitute(&subst));
        }
        Ok(Ty::Named { path, args })
    }

    /// Evaluate one written field value; names read by expressions land in `idents`.
    ///
    /// Strings are expressions, so a string literal is written `'"text"'`. Mappings are
    /// nested records whose type comes from the field they are supplied for.
    fn field_value(
        &self,
        raw: &Yaml,
        env: &Env,
        at: &Location,
        idents: &mut BTreeSet<String>,
    ) -> Result<Value, Diagnostic> {
        match raw {
            Yaml::Null => Ok(Value::Option(None)),
            Yaml::Bool(b) => Ok(Value::Bool(*b)),
            Yaml::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Value::Int(i)),
                (None, Some(x)) => Ok(Value::Float(x)),
                (None, None) => Err(invalid(at, &n.to_string(), "number out of range")),
            },
            Yaml::String(source) => {
                let snippet = Snippet::parse(source)
                    .map_err(|e| invalid(at, source, &e.to_string()))?;
                idents.extend(snippet.expr.free_idents());
                self.eval
                    .eval_snippet(&snippet, env)
                    .map_err(|e| eval_failure(at, source, e))
            }
            Yaml::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.field_value(item, env, &at.at(i.to_string()), idents))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Yaml::Mapping(mapping) => {
                let mut fields = Vec::with_capacity(mapping.len());
                for (key, value) in mapping {
                    let Some(key) = key.as_str() else {
                        return Err(invalid(at, "record", "record field names must be strings"));
                    };
                    let value = self.field_value(value, env, &at.at(key), idents)?;
                    fields.push((key.to_string(), value));
                }
                Ok(Value::Struct {
                    ty: Ty::Infer,
                    fields,
                })
            }
            Yaml::Tagged(tagged) => Err(invalid(
                at,
                &tagged.tag.to_string(),
                "tagged values are not supported",
            )),
        }
    }

    /// Validate the supplied fields of binding `name` and plan its construction.
    fn construct(
        &self,
        name: &str,
        ty: &Ty,
        supplied: &[(String, Value)],
        at: &Location,
    ) -> Result<ConstructionPlan, Vec<Diagnostic>> {
        let path = ty.path().unwrap_or_default();
        if let Some(schema) = self.store.schema(path) {
            let schema = schema.instantiate(ty.args());
            let validated = self
                .validator
                .validate(&schema, supplied, at)
                .map_err(|faults| self.reference_faults(faults, name, supplied, at))?;
            return Ok(ConstructionPlan::Component {
                component: validated.component,
                params: validated
                    .params
                    .into_iter()
                    .map(|p| PlannedParam {
                        const_evaluated: p.value.is_known(),
                        name: p.name,
                        value: p.value,
                        origin: p.origin,
                    })
                    .collect(),
                runtime_checks: validated.runtime_checks,
            });
        }

        let is_struct = self
            .store
            .type_decl(path)
            .is_some_and(|decl| matches!(decl.kind, TypeKind::Struct { .. }));
        if is_struct {
            let value = self
                .validator
                .validate_record(supplied, ty, at)
                .map_err(|faults| self.reference_faults(faults, name, supplied, at))?;
            return Ok(ConstructionPlan::Record { value });
        }

        Err(vec![Diagnostic::new(
            at.at("type"),
            ErrorKind::InvalidDeclaration {
                reason: format!(
                    "'{}' has no parameters to bind; construct it with host code",
                    ty
                ),
            },
        )])
    }

    /// A type mismatch on a field that holds another binding is a pipeline type error.
    fn reference_faults(
        &self,
        faults: Vec<Diagnostic>,
        consumer: &str,
        supplied: &[(String, Value)],
        at: &Location,
    ) -> Vec<Diagnostic> {
        faults
            .into_iter()
            .map(|fault| {
                let ErrorKind::TypeMismatch { expected, found } = &fault.kind else {
                    return fault;
                };
                let producers = supplied
                    .iter()
                    .find(|(field, _)| fault.location == at.at(field))
                    .map(|(_, value)| value.refs())
                    .unwrap_or_default();
                if producers.is_empty() {
                    return fault;
                }
                let kind = ErrorKind::PipelineTypeError {
                    producer: producers.join(", "),
                    consumer: consumer.to_string(),
                    reason: format!("expected '{}', found '{}'", expected, found),
                };
                Diagnostic::new(fault.location, kind)
            })
            .collect()
    }

    /// Check one `a -> b -> c` chain and return its edges.
    fn pipe(
        &self,
        written: &str,
        types: &BTreeMap<&str, &Ty>,
        graph: &BindingGraph,
        at: &Location,
    ) -> Result<Vec<PipeEdge>, Vec<Diagnostic>> {
        let stages: Vec<&str> = written.split("->").map(str::trim).collect();
        if stages.len() < 2 || stages.iter().any(|s| s.is_empty()) {
            return Err(vec![invalid(
                at,
                written,
                "a pipe needs at least two stages separated by '->'",
            )]);
        }

        let unknown: Vec<Diagnostic> = stages
            .iter()
            .filter(|stage| !graph.contains(stage))
            .map(|stage| {
                Diagnostic::new(
                    at.clone(),
                    ErrorKind::UnresolvedReference {
                        name: stage.to_string(),
                    },
                )
            })
            .collect();
        if !unknown.is_empty() {
            return Err(unknown);
        }

        let mut edges = Vec::with_capacity(stages.len() - 1);
        let mut incoming: Option<Ty> = None;
        for pair in stages.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            // A stage whose type failed to resolve was already reported
            let (Some(from_ty), Some(to_ty)) = (types.get(from), types.get(to)) else {
                return Ok(edges);
            };
            let Some(item) = self.produced_item(from_ty, incoming.as_ref()) else {
                return Err(vec![Diagnostic::new(
                    at.clone(),
                    ErrorKind::PipelineTypeError {
                        producer: from.to_string(),
                        consumer: to.to_string(),
                        reason: format!(
                            "'{}' produces no items: it is neither a source nor a transform",
                            from_ty
                        ),
                    },
                )]);
            };
            if !self.accepts_items(to_ty, &item) {
                return Err(vec![Diagnostic::new(
                    at.clone(),
                    ErrorKind::PipelineTypeError {
                        producer: from.to_string(),
                        consumer: to.to_string(),
                        reason: format!("'{}' does not accept items of type '{}'", to_ty, item),
                    },
                )]);
            }
            edges.push(PipeEdge {
                from: from.to_string(),
                to: to.to_string(),
                item: item.clone(),
            });
            incoming = Some(item);
        }
        Ok(edges)
    }

    /// `Source::Item` of a source, or `Transform::Output` of a transform fed `input`.
    fn produced_item(&self, ty: &Ty, input: Option<&Ty>) -> Option<Ty> {
        if let Some(item) = self.traits.project(ty, lang::SOURCE, lang::ITEM) {
            return Some(item);
        }
        let query = TraitRef::new(lang::TRANSFORM, input.cloned().into_iter().collect());
        self.traits
            .resolve(ty, &query)
            .candidate()
            .and_then(|c| c.assoc(lang::OUTPUT).cloned())
    }

    fn accepts_items(&self, ty: &Ty, item: &Ty) -> bool {
        let sink = TraitRef::new(lang::SINK, vec![item.clone()]);
        let transform = TraitRef::new(lang::TRANSFORM, vec![item.clone()]);
        self.traits.implements(ty, &sink) || self.traits.implements(ty, &transform)
    }
}

fn invalid(at: &Location, source: &str, reason: &str) -> Diagnostic {
    Diagnostic::new(
        at.clone(),
        ErrorKind::InvalidExpression {
            source_text: source.to_string(),
            reason: reason.to_string(),
        },
    )
}

fn eval_failure(at: &Location, source: &str, err: EvalError) -> Diagnostic {
    Diagnostic::new(at.clone(), err.into_kind(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = r#"
permute: { version: "0.1", type: source }
columns:
  id: { type: u32 }
  name: { type: String }
params:
  since: { type: u32, default: 2000 }
"#;

    const TABLE: &str = r#"
permute: { version: "0.1", type: sink }
generics: [T]
input: T
params:
  path: { type: String, check: "!self.is_empty()" }
  header: { type: "Vec<String>", default: "[]" }
  write: { type: "Vec<fn(T) -> String>", default: "[]" }
check: header.len() == write.len()
"#;

    const UPPER: &str = r#"
permute: { version: "0.1", type: transform }
input: String
output: String
"#;

    const LINES: &str = r#"
permute: { version: "0.1", type: source }
item: String
"#;

    const SHAPES: &str = r#"
permute: { version: "0.1", type: struct }
types:
  Window:
    fields:
      width: u32
      height: u32
      _id: { type: u64, private: true }
  Clock: {}
impls:
  - for: Window
    methods:
      "const fn area(self) -> u32": self.width * self.height
extensions:
  Geo:
    for: Window
    methods:
      "fn area(self) -> u32": extern
"#;

    fn store_with(main: &str) -> (Store, Document) {
        let docs = vec![
            Document::from_yaml("app::Rows", "app/Rows.yaml", ROWS).unwrap(),
            Document::from_yaml("app::Table", "app/Table.yaml", TABLE).unwrap(),
            Document::from_yaml("app::Upper", "app/Upper.yaml", UPPER).unwrap(),
            Document::from_yaml("app::Lines", "app/Lines.yaml", LINES).unwrap(),
            Document::from_yaml("app::shapes", "app/shapes.yaml", SHAPES).unwrap(),
        ];
        let main = Document::from_yaml("app::main", "app/main.yaml", main).unwrap();
        let mut all = docs;
        all.push(main.clone());
        (Store::load(all).unwrap(), main)
    }

    fn kinds(result: Result<ExecutionGraph, Vec<Diagnostic>>) -> Vec<ErrorKind> {
        result.unwrap_err().into_iter().map(|d| d.kind).collect()
    }

    #[test]
    fn binds_components_records_and_host_code() {
        let (store, main) = store_with(
            r#"
permute: { version: "0.1", type: main, use: ["app::*", "app::shapes::*"] }
name: report
let:
  out:
    Table<Rows>:
      path: '"out.csv"'
      header: ['"id"', '"name"']
      write: ["|r| r.id", "|r| r.name"]
  rows: { Rows: { since: 2010 } }
  window: { Window: { width: 80, height: 24 } }
  clock: { Clock: "Clock::system()" }
pipe: ["rows -> out"]
"#,
        );
        let graph = bind(&store, &main).unwrap();
        assert_eq!(graph.name, "report");
        assert_eq!(graph.order(), vec!["rows", "out", "window", "clock"]);
        assert_eq!(graph.step("out").unwrap().depends_on, vec!["rows"]);
        assert_eq!(
            graph.pipes,
            vec![PipeEdge {
                from: "rows".into(),
                to: "out".into(),
                item: Ty::named("app::Rows", vec![]),
            }]
        );
        assert!(matches!(graph.step("clock").unwrap().plan, ConstructionPlan::Host { .. }));
        match &graph.step("window").unwrap().plan {
            ConstructionPlan::Record { value } => {
                assert_eq!(value.field("width"), Some(&Value::Int(80)))
            }
            other => panic!("unexpected plan {:?}", other),
        }
        match &graph.step("rows").unwrap().plan {
            ConstructionPlan::Component { params, .. } => {
                assert_eq!(params[0].value, Value::Int(2010));
                assert!(params[0].const_evaluated);
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn transforms_chain_items_through_pipes() {
        let (store, main) = store_with(
            r#"
permute: { version: "0.1", type: main, use: ["app::*"] }
let:
  lines: { Lines: {} }
  upper: { Upper: {} }
  out: { "Table<String>": { path: '"upper.txt"' } }
pipe: ["lines -> upper -> out"]
"#,
        );
        let graph = bind(&store, &main).unwrap();
        assert_eq!(graph.order(), vec!["lines", "upper", "out"]);
        assert_eq!(graph.pipes.len(), 2);
        assert_eq!(graph.pipes[1].item, Ty::std("String", vec![]));
        assert_eq!(graph.step("out").unwrap().depends_on, vec!["upper"]);
    }

    #[test]
    fn pipe_stages_must_accept_the_items_they_receive() {
        let (store, main) = store_with(
            r#"
permute: { version: "0.1", type: main, use: ["app::*"] }
let:
  rows: { Rows: {} }
  upper: { Upper: {} }
  out: { "Table<String>": { path: '"upper.txt"' } }
pipe: ["rows -> upper -> out"]
"#,
        );
        let errors = bind(&store, &main).unwrap_err();
        assert_eq!(errors.len(), 1);
        match &errors[0].kind {
            ErrorKind::PipelineTypeError { producer, consumer, .. } => {
                assert_eq!(producer, "rows");
                assert_eq!(consumer, "upper");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn independent_faults_are_reported_together() {
        let (store, main) = store_with(
            r#"
permute: { version: "0.1", type: main, use: ["app::*", "app::shapes::Window"] }
let:
  out: { "Table<Rows>": { path: '""', header: ['"id"'] } }
  window: { Window: { width: 80, _id: 3 } }
  ghost: { Phantom: {} }
  table: { Table: { path: '"x"' } }
"#,
        );
        let found = kinds(bind(&store, &main));
        assert!(found.contains(&ErrorKind::CheckViolation {
            field: "path".into(),
            predicate: "!self.is_empty()".into(),
        }));
        assert!(found.iter().any(|k| matches!(k, ErrorKind::InvalidDeclaration { reason } if reason.contains("private"))));
        assert!(found.contains(&ErrorKind::UnresolvedReference {
            name: "Phantom".into()
        }));
        assert!(found.iter().any(|k| matches!(k, ErrorKind::InvalidDeclaration { reason } if reason.contains("explicit argument"))));
    }

    #[test]
    fn cyclic_references_are_rejected() {
        let (store, main) = store_with(
            r#"
permute: { version: "0.1", type: main, use: ["app::shapes::*"] }
let:
  a: { Window: { width: b.width, height: 1 } }
  b: { Window: { width: c.width, height: 1 } }
  c: { Window: { width: a.width, height: 1 } }
"#,
        );
        assert_eq!(
            kinds(bind(&store, &main)),
            vec![ErrorKind::CyclicBinding {
                names: vec!["a".into(), "b".into(), "c".into()]
            }]
        );
    }

    #[test]
    fn closures_depend_on_the_bindings_they_capture() {
        let (store, main) = store_with(
            r#"
permute: { version: "0.1", type: main, use: ["app::*", "app::shapes::Window"] }
let:
  out:
    Table<Rows>:
      path: '"out.csv"'
      header: ['"padded"']
      write: ["|r| r.id + win.width"]
  rows: { Rows: {} }
  win: { Window: { width: 4, height: 1 } }
"#,
        );
        let graph = bind(&store, &main).unwrap();
        assert_eq!(graph.order(), vec!["rows", "win", "out"]);
        assert_eq!(graph.step("out").unwrap().depends_on, vec!["win"]);
    }

    #[test]
    fn disjoint_cycles_are_reported_together() {
        let (store, main) = store_with(
            r#"
permute: { version: "0.1", type: main, use: ["app::shapes::*"] }
let:
  a: { Window: { width: b.width, height: 1 } }
  b: { Window: { width: a.width, height: 1 } }
  x: { Window: { width: y.width, height: 1 } }
  y: { Window: { width: x.width, height: 1 } }
"#,
        );
        assert_eq!(
            kinds(bind(&store, &main)),
            vec![
                ErrorKind::CyclicBinding {
                    names: vec!["a".into(), "b".into()]
                },
                ErrorKind::CyclicBinding {
                    names: vec!["x".into(), "y".into()]
                },
            ]
        );
    }

    #[test]
    fn inherent_and_imported_extension_methods_need_qualification() {
        let main = r#"
permute: { version: "0.1", type: main, use: ["app::shapes::Window", "app::shapes::Geo"] }
let:
  win: { Window: { width: 2, height: 3 } }
  twin: { Window: { width: win.area(), height: 1 } }
"#;
        let (store, doc) = store_with(main);
        match &kinds(bind(&store, &doc))[0] {
            ErrorKind::Ambiguous {
                candidates,
                requires_qualification,
                ..
            } => {
                assert!(requires_qualification);
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("unexpected error {:?}", other),
        }

        let (store, doc) = store_with(&main.replace("win.area()", "Geo::area(win)"));
        let graph = bind(&store, &doc).unwrap();
        assert_eq!(graph.order(), vec!["win", "twin"]);
    }

    #[test]
    fn unknown_names_in_values_are_unresolved_references() {
        let (store, main) = store_with(
            r#"
permute: { version: "0.1", type: main, use: ["app::*"] }
let:
  out: { "Table<String>": { path: nowhere } }
pipe: ["out -> sink"]
"#,
        );
        let found = kinds(bind(&store, &main));
        assert!(found.contains(&ErrorKind::UnresolvedReference {
            name: "nowhere".into()
        }));
        assert!(found.contains(&ErrorKind::UnresolvedReference { name: "sink".into() }));
    }

    #[test]
    fn only_main_documents_bind() {
        let (store, _) = store_with("permute: { version: \"0.1\", type: main }\n");
        let rows = Document::from_yaml("app::Rows", "app/Rows.yaml", ROWS).unwrap();
        assert!(matches!(
            kinds(bind(&store, &rows))[0],
            ErrorKind::InvalidDeclaration { .. }
        ));
    }
}
