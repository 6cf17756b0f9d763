//! Dependency graph and stable topological ordering.
//!
//! Extensions (and, in `zkit-core`, tasks) declare the ids they depend on.
//! This module turns those declarations into a graph and produces a
//! dependency-first order. When several nodes become ready at the same time
//! the one inserted first wins, so the same input always yields the same
//! output.
//!
//! # Example
//!
//! ```
//! use zkit_extensions::dependency::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node("wallet").unwrap();
//! graph.add_node("compiler").unwrap();
//! graph.add_edge("wallet", "compiler");
//!
//! let order = graph.topological_sort().unwrap();
//! assert_eq!(order, vec!["compiler", "wallet"]);
//! ```

use std::collections::{BTreeSet, HashMap};

use crate::error::{Error, Result};

/// Directed graph of dependencies between named nodes.
///
/// Edges point from dependent to dependency: if A depends on B, the edge
/// is `A -> B` and B sorts before A.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node ids in insertion order.
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    /// `edges[i]` holds what node `i` depends on, in declaration order.
    edges: Vec<Vec<String>>,
}

impl DependencyGraph {
    /// Create an empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the graph.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateExtension` if a node with the same id exists.
    pub fn add_node(&mut self, id: impl Into<String>) -> Result<()> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(Error::DuplicateExtension { id });
        }
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(id);
        self.edges.push(Vec::new());
        Ok(())
    }

    /// Declare that `from` depends on `to`.
    ///
    /// `from` must already be a node; an edge from an unknown node is ignored
    /// and `false` is returned. `to` may be added later. A target that never
    /// becomes a node surfaces as `Error::MissingDependency` during the sort.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        let Some(&i) = self.index.get(from) else {
            return false;
        };
        if !self.edges[i].iter().any(|existing| existing == to) {
            self.edges[i].push(to.to_string());
        }
        true
    }

    /// Return the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Whether a node with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Get the direct dependencies of a node, in declaration order.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.index
            .get(id)
            .map(|&i| self.edges[i].iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Sort the graph and return node ids in dependency-first order.
    ///
    /// # Errors
    ///
    /// - `Error::MissingDependency` if an edge targets an id that is not a node
    /// - `Error::DependencyCycle` if no valid order exists
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        Ok(self
            .topological_indices()?
            .into_iter()
            .map(|i| self.nodes[i].clone())
            .collect())
    }

    /// Same as [`topological_sort`](Self::topological_sort) but returns
    /// insertion indices, which lets callers reorder their own items.
    pub fn topological_indices(&self) -> Result<Vec<usize>> {
        let n = self.nodes.len();

        let mut deps: Vec<Vec<usize>> = Vec::with_capacity(n);
        for (i, targets) in self.edges.iter().enumerate() {
            let mut resolved = Vec::with_capacity(targets.len());
            for target in targets {
                let Some(&j) = self.index.get(target) else {
                    return Err(Error::MissingDependency {
                        extension: self.nodes[i].clone(),
                        dependency: target.clone(),
                    });
                };
                resolved.push(j);
            }
            deps.push(resolved);
        }

        // Kahn's algorithm; the ready set is ordered by insertion index.
        let mut pending: Vec<usize> = deps.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, targets) in deps.iter().enumerate() {
            for &j in targets {
                dependents[j].push(i);
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(current) = ready.pop_first() {
            order.push(current);
            for &dependent in &dependents[current] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != n {
            let mut remaining = vec![true; n];
            for &i in &order {
                remaining[i] = false;
            }
            let cycle = self.cycle_path(&deps, &remaining);
            tracing::debug!(cycle = ?cycle, "dependency cycle detected");
            return Err(Error::DependencyCycle { cycle });
        }

        Ok(order)
    }

    /// Walk unsorted nodes along their unsorted dependencies until a node
    /// repeats. Every unsorted node has at least one unsorted dependency, so
    /// the walk always closes a loop.
    fn cycle_path(&self, deps: &[Vec<usize>], remaining: &[bool]) -> Vec<String> {
        let start = remaining.iter().position(|&r| r).unwrap_or_default();
        let mut path = vec![start];
        let mut seen: HashMap<usize, usize> = HashMap::from([(start, 0)]);
        let mut current = start;

        while let Some(&next) = deps[current].iter().find(|&&d| remaining[d]) {
            if let Some(&pos) = seen.get(&next) {
                let mut cycle: Vec<String> =
                    path[pos..].iter().map(|&i| self.nodes[i].clone()).collect();
                cycle.push(self.nodes[next].clone());
                return cycle;
            }
            seen.insert(next, path.len());
            path.push(next);
            current = next;
        }

        path.into_iter().map(|i| self.nodes[i].clone()).collect()
    }
}
