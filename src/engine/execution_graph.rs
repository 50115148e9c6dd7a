// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The bound form of a process document, handed to an external executor.

use crate::expr::Value;
use crate::schema::ParamOrigin;
use crate::store::Ty;
use serde::Serialize;

/// Steps in construction order plus the item flow between them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionGraph {
    /// Where the process document came from.
    pub document: String,
    pub module: String,
    pub name: String,
    pub steps: Vec<ExecutionStep>,
    pub pipes: Vec<PipeEdge>,
}

impl ExecutionGraph {
    pub fn step(&self, name: &str) -> Option<&ExecutionStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Binding names in construction order.
    pub fn order(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionStep {
    pub name: String,
    pub ty: Ty,
    pub plan: ConstructionPlan,
    /// Bindings that must be constructed before this one, in document order.
    pub depends_on: Vec<String>,
}

/// How the executor builds one binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstructionPlan {
    /// A component constructed from validated parameters.
    Component {
        component: String,
        params: Vec<PlannedParam>,
        /// Checks the executor evaluates once run-time values exist.
        runtime_checks: Vec<String>,
    },
    /// A plain struct value.
    Record { value: Value },
    /// Opaque construction code, trusted to return the declared type.
    Host { code: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedParam {
    pub name: String,
    pub value: Value,
    pub origin: ParamOrigin,
    /// False when the value still depends on other bindings or run-time calls.
    pub const_evaluated: bool,
}

/// Items produced by `from` flow into `to`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipeEdge {
    pub from: String,
    pub to: String,
    pub item: Ty,
}
