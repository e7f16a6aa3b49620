//! Generic directed acyclic graph of build actions.
//!
//! [`BuildGraph`] stores each vertex together with the set of vertices it
//! feeds. Vertices are kept in insertion order so every query (roots, sinks,
//! traversal) is deterministic, which keeps assembled plans and their DOT
//! renderings stable across runs.
//!
//! Graphs are assembled incrementally: vertices and edges are added one at a
//! time, independent branches are unioned with [`BuildGraph::add_subgraph`],
//! and whole phases are sequenced with [`BuildGraph::append_graph`]. Root and
//! sink queries are only meaningful once assembly has finished; a vertex
//! whose incoming edge has not been wired yet still reports as a root.
//!
//! # Examples
//!
//! ```
//! use sidlbuild::graph::BuildGraph;
//!
//! let mut graph = BuildGraph::new();
//! graph.add_edges(Some(&"tag"), ["compile"]).expect("acyclic");
//! graph.add_edges(Some(&"compile"), ["close"]).expect("acyclic");
//! assert_eq!(graph.roots(), vec!["tag"]);
//! assert_eq!(graph.depth_first_visit(&"tag"), vec!["tag", "compile", "close"]);
//! ```

mod cycle;
mod dot;

use std::fmt::Display;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::debug;

pub use dot::Dot;

/// Errors raised while assembling or validating a [`BuildGraph`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The graph contains a cycle. The first vertex is repeated at the end.
    #[error("circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency {
        /// Vertices on the cycle, rendered with their display form.
        cycle: Vec<String>,
    },
    /// Vertices that no entry point can reach.
    #[error("vertices unreachable from the entry points: {}", vertices.join(", "))]
    Unreachable {
        /// Vertices that cannot be reached, rendered with their display form.
        vertices: Vec<String>,
    },
}

/// A directed graph whose edges mean "produces input for".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildGraph<V>
where
    V: Hash + Eq,
{
    edges: IndexMap<V, IndexSet<V>>,
}

impl<V> Default for BuildGraph<V>
where
    V: Hash + Eq,
{
    fn default() -> Self {
        Self {
            edges: IndexMap::new(),
        }
    }
}

impl<V> BuildGraph<V>
where
    V: Clone + Hash + Eq + Display,
{
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph holding `vertices` with no edges between them.
    #[must_use]
    pub fn from_vertices(vertices: impl IntoIterator<Item = V>) -> Self {
        let mut graph = Self::new();
        for vertex in vertices {
            graph.add_vertex(vertex);
        }
        graph
    }

    /// Insert `vertex` with no outgoing edges unless it is already present.
    pub fn add_vertex(&mut self, vertex: V) {
        self.edges.entry(vertex).or_default();
    }

    /// Add an edge from `source` to each of `outputs`.
    ///
    /// With no source the outputs are inserted as unconnected vertices, which
    /// remain roots until another edge points at them.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CircularDependency`] when an edge would close a
    /// cycle. Edges added before the offending one are kept.
    pub fn add_edges(
        &mut self,
        source: Option<&V>,
        outputs: impl IntoIterator<Item = V>,
    ) -> Result<(), GraphError> {
        let Some(origin) = source else {
            for output in outputs {
                self.add_vertex(output);
            }
            return Ok(());
        };
        self.add_vertex(origin.clone());
        for output in outputs {
            if &output == origin || self.reaches(&output, origin) {
                let mut cycle: Vec<String> = self
                    .path_between(&output, origin)
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                cycle.push(output.to_string());
                return Err(GraphError::CircularDependency { cycle });
            }
            self.add_vertex(output.clone());
            if let Some(targets) = self.edges.get_mut(origin) {
                targets.insert(output);
            }
        }
        Ok(())
    }

    /// Union the vertices and edges of `other` into this graph.
    ///
    /// No edges are added between the two graphs; the caller wires roots and
    /// sinks afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CircularDependency`] if the union is cyclic. The
    /// graph is left unchanged in that case.
    pub fn add_subgraph(&mut self, other: Self) -> Result<(), GraphError> {
        let mut merged = self.clone();
        merged.union(other);
        merged.check_acyclic()?;
        *self = merged;
        Ok(())
    }

    /// Sequence `other` after this graph.
    ///
    /// Every current sink gains an edge to every root of `other`. When this
    /// graph is empty the result is simply `other`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CircularDependency`] if the result is cyclic. The
    /// graph is left unchanged in that case.
    pub fn append_graph(&mut self, other: Self) -> Result<(), GraphError> {
        let sinks = self.sinks();
        let roots = other.roots();
        debug!(
            sinks = sinks.len(),
            roots = roots.len(),
            "appending graph in sequence"
        );
        let mut merged = self.clone();
        merged.union(other);
        for sink in &sinks {
            if let Some(targets) = merged.edges.get_mut(sink) {
                targets.extend(roots.iter().cloned());
            }
        }
        merged.check_acyclic()?;
        *self = merged;
        Ok(())
    }

    fn union(&mut self, other: Self) {
        for (vertex, targets) in other.edges {
            self.edges
                .entry(vertex)
                .or_default()
                .extend(targets.iter().cloned());
            for target in targets {
                self.add_vertex(target);
            }
        }
    }

    /// Vertices with no incoming edge, in insertion order.
    #[must_use]
    pub fn roots(&self) -> Vec<V> {
        let targets: IndexSet<&V> = self.edges.values().flatten().collect();
        self.edges
            .keys()
            .filter(|vertex| !targets.contains(vertex))
            .cloned()
            .collect()
    }

    /// Vertices with no outgoing edge, in insertion order.
    #[must_use]
    pub fn sinks(&self) -> Vec<V> {
        self.edges
            .iter()
            .filter(|(_, targets)| targets.is_empty())
            .map(|(vertex, _)| vertex.clone())
            .collect()
    }

    /// Vertices reachable from `start`, in depth-first pre-order.
    ///
    /// Each vertex appears at most once and `start` comes first. A `start`
    /// that is not part of the graph yields an empty sequence.
    #[must_use]
    pub fn depth_first_visit(&self, start: &V) -> Vec<V> {
        let mut order = Vec::new();
        if !self.edges.contains_key(start) {
            return order;
        }
        let mut seen: IndexSet<&V> = IndexSet::new();
        let mut stack = vec![start];
        while let Some(vertex) = stack.pop() {
            if !seen.insert(vertex) {
                continue;
            }
            order.push(vertex.clone());
            if let Some(targets) = self.edges.get(vertex) {
                stack.extend(targets.iter().rev().filter(|t| !seen.contains(t)));
            }
        }
        order
    }

    /// Direct successors of `vertex`.
    pub fn successors<'a>(&'a self, vertex: &V) -> impl Iterator<Item = &'a V> + use<'a, V> {
        self.edges.get(vertex).into_iter().flatten()
    }

    /// Direct predecessors of `vertex`, in insertion order.
    #[must_use]
    pub fn predecessors(&self, vertex: &V) -> Vec<&V> {
        self.edges
            .iter()
            .filter(|(_, targets)| targets.contains(vertex))
            .map(|(source, _)| source)
            .collect()
    }

    /// Whether `vertex` is part of the graph.
    #[must_use]
    pub fn contains(&self, vertex: &V) -> bool {
        self.edges.contains_key(vertex)
    }

    /// Whether an edge `source → target` exists.
    #[must_use]
    pub fn has_edge(&self, source: &V, target: &V) -> bool {
        self.edges
            .get(source)
            .is_some_and(|targets| targets.contains(target))
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(IndexSet::len).sum()
    }

    /// All vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &V> {
        self.edges.keys()
    }

    /// All edges as `(source, target)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&V, &V)> {
        self.edges
            .iter()
            .flat_map(|(source, targets)| targets.iter().map(move |target| (source, target)))
    }

    /// Check that the finished graph is acyclic and that every vertex can be
    /// reached from one of `entries`, the vertices execution starts at.
    ///
    /// A vertex with no incoming edge that is not an entry is dangling: an
    /// edge meant to reach it was never added.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CircularDependency`] for cyclic graphs and
    /// [`GraphError::Unreachable`] for dangling vertices.
    pub fn validate(&self, entries: &[V]) -> Result<(), GraphError> {
        self.check_acyclic()?;
        let mut reached: IndexSet<V> = IndexSet::new();
        for entry in entries {
            reached.extend(self.depth_first_visit(entry));
        }
        let dangling: Vec<String> = self
            .edges
            .keys()
            .filter(|vertex| !reached.contains(*vertex))
            .map(ToString::to_string)
            .collect();
        if dangling.is_empty() {
            Ok(())
        } else {
            Err(GraphError::Unreachable { vertices: dangling })
        }
    }

    fn check_acyclic(&self) -> Result<(), GraphError> {
        match cycle::find_cycle(&self.edges) {
            Some(found) => Err(GraphError::CircularDependency {
                cycle: found.iter().map(ToString::to_string).collect(),
            }),
            None => Ok(()),
        }
    }

    fn reaches(&self, from: &V, to: &V) -> bool {
        self.depth_first_visit(from).iter().any(|vertex| vertex == to)
    }

    /// A path `from → … → to`, assuming `to` is reachable from `from`.
    fn path_between(&self, from: &V, to: &V) -> Vec<V> {
        let mut path = vec![from.clone()];
        let mut seen: IndexSet<V> = IndexSet::new();
        if self.extend_path(to, &mut path, &mut seen) {
            path
        } else {
            vec![from.clone()]
        }
    }

    fn extend_path(&self, to: &V, path: &mut Vec<V>, seen: &mut IndexSet<V>) -> bool {
        let Some(current) = path.last().cloned() else {
            return false;
        };
        if &current == to {
            return true;
        }
        if !seen.insert(current.clone()) {
            return false;
        }
        for next in self.successors(&current) {
            path.push(next.clone());
            if self.extend_path(to, path, seen) {
                return true;
            }
            path.pop();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(names: &[&'static str]) -> BuildGraph<&'static str> {
        let mut graph = BuildGraph::new();
        let mut last: Option<&'static str> = None;
        for name in names {
            graph.add_edges(last.as_ref(), [*name]).expect("acyclic");
            last = Some(*name);
        }
        graph
    }

    #[test]
    fn add_vertex_is_idempotent() {
        let mut graph = BuildGraph::new();
        graph.add_vertex("a");
        graph.add_edges(Some(&"a"), ["b"]).expect("acyclic");
        graph.add_vertex("a");
        assert_eq!(graph.len(), 2);
        assert!(graph.has_edge(&"a", &"b"));
    }

    #[test]
    fn self_edge_is_rejected() {
        let mut graph = BuildGraph::new();
        let err = graph.add_edges(Some(&"a"), ["a"]).expect_err("cycle");
        assert_eq!(
            err,
            GraphError::CircularDependency {
                cycle: vec!["a".into(), "a".into()],
            }
        );
    }

    #[test]
    fn closing_edge_reports_path() {
        let mut graph = chain(&["a", "b", "c"]);
        let err = graph.add_edges(Some(&"c"), ["a"]).expect_err("cycle");
        assert_eq!(
            err,
            GraphError::CircularDependency {
                cycle: vec!["a".into(), "b".into(), "c".into(), "a".into()],
            }
        );
        assert!(!graph.has_edge(&"c", &"a"));
    }

    #[test]
    fn cyclic_union_leaves_graph_untouched() {
        let mut graph = chain(&["a", "b"]);
        let other = chain(&["b", "a"]);
        assert!(graph.add_subgraph(other).is_err());
        assert_eq!(graph, chain(&["a", "b"]));
    }

    #[test]
    fn append_to_empty_graph_yields_other() {
        let mut graph = BuildGraph::new();
        graph.append_graph(chain(&["x", "y"])).expect("acyclic");
        assert_eq!(graph, chain(&["x", "y"]));
    }

    #[test]
    fn path_between_follows_edges() {
        let graph = chain(&["a", "b", "c"]);
        assert_eq!(graph.path_between(&"a", &"c"), vec!["a", "b", "c"]);
    }
}
