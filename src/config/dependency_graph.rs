// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

/// Dependencies between the bindings of one process document.
///
/// Bindings keep the order they were written in; every traversal (dependents, topological
/// order, cycle reporting) follows that order so results do not depend on hashing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingGraph {
    order: Vec<String>,
    dependencies: BTreeMap<String, Vec<String>>,
}

impl BindingGraph {
    /// Create a new empty binding graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding; adding a name twice keeps its first position.
    pub fn add_binding(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.dependencies.contains_key(&name) {
            self.order.push(name.clone());
            self.dependencies.insert(name, Vec::new());
        }
    }

    /// Record that `dependent` needs `dependency` to be constructed first.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) {
        self.add_binding(dependent);
        if let Some(deps) = self.dependencies.get_mut(dependent) {
            if !deps.iter().any(|d| d == dependency) {
                deps.push(dependency.to_string());
            }
        }
    }

    /// Bindings `name` refers to, in the order they were recorded.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.dependencies.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bindings that refer to `name`, in document order.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|n| self.dependencies_of(n).iter().any(|d| d == name))
            .map(String::as_str)
            .collect()
    }

    /// All bindings in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl From<Vec<(String, Vec<String>)>> for BindingGraph {
    fn from(entries: Vec<(String, Vec<String>)>) -> Self {
        let mut graph = BindingGraph::new();
        for (name, _) in &entries {
            graph.add_binding(name.clone());
        }
        for (name, deps) in &entries {
            for dep in deps {
                graph.add_dependency(name, dep);
            }
        }
        graph
    }
}
