// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline binding: process documents in, ordered execution graphs out.

mod binder;
mod execution_graph;
mod parallel;
mod topological;

#[cfg(test)]
mod integration_tests;

pub use binder::{bind, Binder};
pub use execution_graph::{ConstructionPlan, ExecutionGraph, ExecutionStep, PipeEdge, PlannedParam};
pub use parallel::{bind_documents, BoundDocument};
pub use topological::topological_order;
