// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Construction order of the bindings of one document.
//!
//! Kahn's algorithm over the binding graph: a binding becomes ready once every binding it
//! depends on has been placed. Among ready bindings the one written first is placed next,
//! so the order is a pure function of the graph.

use crate::config::BindingGraph;
use std::collections::{BTreeMap, BTreeSet};

/// Bindings ordered dependencies-first, ties broken by document order.
///
/// # Errors
///
/// Returns the bindings that could not be placed (in document order) when the graph has
/// a cycle. Dependencies on names outside the graph are ignored.
pub fn topological_order(graph: &BindingGraph) -> Result<Vec<String>, Vec<String>> {
    let names: Vec<&str> = graph.names().collect();

    // Count only edges between members of the graph
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    for name in &names {
        let count = graph
            .dependencies_of(name)
            .iter()
            .filter(|d| graph.contains(d))
            .count();
        in_degree.insert(name, count);
    }

    let mut ready: BTreeSet<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, name)| in_degree.get(*name).copied() == Some(0))
        .map(|(position, _)| position)
        .collect();

    let mut order = Vec::with_capacity(names.len());
    while let Some(position) = ready.pop_first() {
        let current = names[position];
        order.push(current.to_string());

        for dependent in graph.dependents_of(current) {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    if let Some(p) = graph.position(dependent) {
                        ready.insert(p);
                    }
                }
            }
        }
    }

    if order.len() == names.len() {
        Ok(order)
    } else {
        Err(names
            .into_iter()
            .filter(|name| !order.iter().any(|placed| placed == name))
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(entries: &[(&str, &[&str])]) -> BindingGraph {
        entries
            .iter()
            .map(|(n, deps)| (n.to_string(), deps.iter().map(|d| d.to_string()).collect()))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn dependencies_come_first() {
        let g = graph(&[("out", &["rows"]), ("rows", &["seq"]), ("seq", &[])]);
        assert_eq!(topological_order(&g).unwrap(), vec!["seq", "rows", "out"]);
    }

    #[test]
    fn ties_follow_document_order() {
        let g = graph(&[("c", &[]), ("a", &[]), ("sink", &["a", "c"]), ("b", &[])]);
        assert_eq!(topological_order(&g).unwrap(), vec!["c", "a", "sink", "b"]);
    }

    #[test]
    fn newly_ready_binding_keeps_its_document_position() {
        // `b` becomes ready once `z` is placed and, written before `y`, goes next.
        let g = graph(&[("z", &[]), ("b", &["z"]), ("y", &[])]);
        assert_eq!(topological_order(&g).unwrap(), vec!["z", "b", "y"]);
    }

    #[test]
    fn cycles_leave_members_unplaced() {
        let g = graph(&[("free", &[]), ("a", &["b"]), ("b", &["a"])]);
        assert_eq!(topological_order(&g).unwrap_err(), vec!["a", "b"]);
    }
}
