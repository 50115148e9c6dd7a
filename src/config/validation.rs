// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of a binding graph.
//!
//! Two checks run in order:
//!
//! 1. **Reference Validation**: every dependency names a binding of the graph
//! 2. **Cycle Detection**: DFS with a recursion stack finds every dependency cycle
//!
//! Cycle detection needs a graph whose edges all resolve, so it only runs once reference
//! validation passed.
//!
//! ## Cycle Detection Algorithm
//! Uses **Depth-First Search (DFS) with recursion stack**, starting from each binding in
//! document order:
//! - **Time Complexity**: O(V + E) where V = bindings, E = references
//! - **Detection Method**: reaching a node that is still on the recursion path (gray)
//! - **Reporting**: the search continues after a hit, so disjoint cycles are all
//!   reported. Each cycle is rotated to start at the binding written first, so
//!   `a -> b -> c -> a` is reported as `[a, b, c]` whichever node the search entered by
//!
//! # Examples
//!
//! ```rust
//! use permute::config::{validate_binding_graph, BindingGraph};
//! use permute::errors::ErrorKind;
//!
//! let mut graph = BindingGraph::new();
//! for name in ["a", "b", "c"] {
//!     graph.add_binding(name);
//! }
//! graph.add_dependency("a", "b");
//! graph.add_dependency("b", "c");
//! graph.add_dependency("c", "a");
//!
//! let errors = validate_binding_graph(&graph).unwrap_err();
//! assert_eq!(
//!     errors,
//!     vec![ErrorKind::CyclicBinding {
//!         names: vec!["a".into(), "b".into(), "c".into()]
//!     }]
//! );
//! ```

use super::BindingGraph;
use crate::errors::ErrorKind;
use std::collections::BTreeSet;

/// Validates a binding graph for resolvable references and the absence of cycles.
///
/// # Returns
///
/// * `Ok(())` - every reference resolves and the graph is acyclic
/// * `Err(Vec<ErrorKind>)` - every unresolved reference, or one `CyclicBinding` per cycle
///
/// Unresolved references are all reported at once; cycle detection is skipped while any
/// remain.
pub fn validate_binding_graph(graph: &BindingGraph) -> Result<(), Vec<ErrorKind>> {
    validate_dependency_references(graph)?;
    let cycles = find_cycles(graph);
    if cycles.is_empty() {
        Ok(())
    } else {
        Err(cycles
            .into_iter()
            .map(|names| ErrorKind::CyclicBinding { names })
            .collect())
    }
}

/// Every dependency must name a binding of the graph.
fn validate_dependency_references(graph: &BindingGraph) -> Result<(), Vec<ErrorKind>> {
    let mut errors = Vec::new();
    for name in graph.names() {
        for dependency in graph.dependencies_of(name) {
            if !graph.contains(dependency) {
                errors.push(ErrorKind::UnresolvedReference {
                    name: dependency.clone(),
                });
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// The first cycle reachable from a binding in document order, without the closing
/// repetition and rotated to start at its earliest-written member.
pub fn find_cycle(graph: &BindingGraph) -> Option<Vec<String>> {
    find_cycles(graph).into_iter().next()
}

/// Every cycle the search closes, each rotated to its earliest-written member and ordered
/// by that member. Cycles with the same members are reported once.
pub fn find_cycles(graph: &BindingGraph) -> Vec<Vec<String>> {
    let mut visited = BTreeSet::new();
    let mut rec_stack = BTreeSet::new();
    let mut path = Vec::new();
    let mut found = Vec::new();

    for name in graph.names() {
        if !visited.contains(name) {
            dfs_cycle_detection(name, graph, &mut visited, &mut rec_stack, &mut path, &mut found);
        }
    }

    let mut seen: BTreeSet<BTreeSet<String>> = BTreeSet::new();
    let mut cycles: Vec<Vec<String>> = found
        .into_iter()
        .filter(|cycle| seen.insert(cycle.iter().cloned().collect()))
        .map(|cycle| rotate_to_earliest(cycle, graph))
        .collect();
    cycles.sort_by_key(|cycle| cycle.first().and_then(|n| graph.position(n)));
    cycles
}

/// Depth-first search along dependency edges.
///
/// ## State Transitions
/// 1. **White → Gray**: mark visited and push onto the recursion stack
/// 2. **Gray → Black**: pop from the recursion stack once all dependencies are explored
/// 3. **Cycle**: a dependency that is gray closes a cycle; the path from that
///    dependency to the current node is recorded and the search goes on
fn dfs_cycle_detection(
    node: &str,
    graph: &BindingGraph,
    visited: &mut BTreeSet<String>,
    rec_stack: &mut BTreeSet<String>,
    path: &mut Vec<String>,
    found: &mut Vec<Vec<String>>,
) {
    visited.insert(node.to_string());
    rec_stack.insert(node.to_string());
    path.push(node.to_string());

    for dependency in graph.dependencies_of(node) {
        if !visited.contains(dependency) {
            dfs_cycle_detection(dependency, graph, visited, rec_stack, path, found);
        } else if rec_stack.contains(dependency) {
            if let Some(start) = path.iter().position(|n| n == dependency) {
                found.push(path[start..].to_vec());
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
}

fn rotate_to_earliest(mut cycle: Vec<String>, graph: &BindingGraph) -> Vec<String> {
    let earliest = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, name)| graph.position(name).unwrap_or(usize::MAX))
        .map(|(i, _)| i)
        .unwrap_or(0);
    cycle.rotate_left(earliest);
    cycle
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

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_empty_graph() {
        assert!(validate_binding_graph(&BindingGraph::new()).is_ok());
    }

    #[test]
    fn test_valid_chain() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["b", "a"])]);
        assert!(validate_binding_graph(&g).is_ok());
    }

    #[test]
    fn test_unresolved_references_are_all_reported() {
        let g = graph(&[("a", &["ghost"]), ("b", &["phantom", "a"])]);
        let errors = validate_binding_graph(&g).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ErrorKind::UnresolvedReference {
                    name: "ghost".into()
                },
                ErrorKind::UnresolvedReference {
                    name: "phantom".into()
                },
            ]
        );
    }

    #[test]
    fn test_self_reference() {
        let g = graph(&[("a", &["a"])]);
        assert_eq!(find_cycle(&g), Some(names(&["a"])));
    }

    #[test]
    fn test_cycle_is_rotated_to_first_written_binding() {
        // The search enters at `x`, which is not part of the cycle, then reaches `c`.
        let g = graph(&[("x", &["c"]), ("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        assert_eq!(find_cycle(&g), Some(names(&["a", "b", "c"])));
    }

    #[test]
    fn test_disjoint_cycles_are_all_reported() {
        let g = graph(&[("a", &["b"]), ("b", &["a"]), ("m", &[]), ("x", &["y"]), ("y", &["x"])]);
        assert_eq!(
            validate_binding_graph(&g).unwrap_err(),
            vec![
                ErrorKind::CyclicBinding { names: names(&["a", "b"]) },
                ErrorKind::CyclicBinding { names: names(&["x", "y"]) },
            ]
        );
    }

    #[test]
    fn test_cycles_sharing_a_binding_are_reported_separately() {
        // The search enters at `y`; `a` sits on both cycles.
        let g = graph(&[("y", &["a"]), ("a", &["b", "c"]), ("b", &["a"]), ("c", &["a"])]);
        assert_eq!(
            find_cycles(&g),
            vec![names(&["a", "b"]), names(&["a", "c"])]
        );
    }

    #[test]
    fn test_removing_the_back_edge_breaks_the_cycle() {
        let cyclic = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        assert!(find_cycle(&cyclic).is_some());
        let acyclic = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        assert!(find_cycle(&acyclic).is_none());
    }
}
