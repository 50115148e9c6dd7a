// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod dependency_graph;
mod loader;
mod project;
mod validation;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use dependency_graph::BindingGraph;
pub use loader::{
    BindingBody, BindingDoc, CheckDoc, CheckList, ColumnDoc, Document, DocumentFile,
    DocumentKind, ExprText, ExtensionDoc, FieldDoc, Header, ImplDoc, MethodBodies, MethodDoc,
    Ordered, ParamDoc, SpecializationDoc, TraitDoc, TypeDoc, SUPPORTED_VERSION,
};
pub use project::{
    load_project_config, LogFormat, LoggingSection, OutputFormat, OutputSection, ProjectConfig,
    ProjectSection, ResolverSection,
};
pub use validation::{find_cycle, find_cycles, validate_binding_graph};
