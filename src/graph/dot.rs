//! Graphviz rendering for [`BuildGraph`].
//!
//! Vertices are numbered in insertion order (`n0`, `n1`, ...) and labelled
//! with their display form, so the output is deterministic and suitable for
//! snapshot tests.

use std::fmt::{self, Display, Formatter};
use std::hash::Hash;

use indexmap::IndexMap;

use super::BuildGraph;

/// Wrapper that renders a [`BuildGraph`] in DOT format via [`Display`].
pub struct Dot<'a, V>
where
    V: Hash + Eq,
{
    graph: &'a BuildGraph<V>,
    name: &'a str,
}

impl<V> BuildGraph<V>
where
    V: Clone + Hash + Eq + Display,
{
    /// Render the graph as a DOT digraph called `name`.
    #[must_use]
    pub const fn to_dot<'a>(&'a self, name: &'a str) -> Dot<'a, V> {
        Dot { graph: self, name }
    }
}

impl<V> Display for Dot<'_, V>
where
    V: Clone + Hash + Eq + Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let ids: IndexMap<&V, usize> = self
            .graph
            .vertices()
            .enumerate()
            .map(|(idx, vertex)| (vertex, idx))
            .collect();
        writeln!(f, "digraph \"{}\" {{", escape(self.name))?;
        for (vertex, idx) in &ids {
            writeln!(f, "  n{idx} [label=\"{}\"];", escape(&vertex.to_string()))?;
        }
        for (source, target) in self.graph.edges() {
            if let (Some(from), Some(to)) = (ids.get(source), ids.get(target)) {
                writeln!(f, "  n{from} -> n{to};")?;
            }
        }
        writeln!(f, "}}")
    }
}

/// Escape a string for use inside a double-quoted DOT identifier.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
