//! Cycle detection for [`super::BuildGraph`] adjacency maps.

use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};

/// Tracks the visitation state of a vertex during cycle detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum VisitState {
    Visiting,
    Visited,
}

/// Return the first cycle found, with its first vertex repeated at the end.
///
/// Vertices are explored in insertion order so the reported cycle is stable
/// for a given graph.
pub(super) fn find_cycle<V>(edges: &IndexMap<V, IndexSet<V>>) -> Option<Vec<V>>
where
    V: Clone + Hash + Eq,
{
    let mut detector = CycleDetector::new(edges);
    for vertex in edges.keys() {
        if detector.is_visited(vertex) {
            continue;
        }
        if let Some(found) = detector.visit(vertex) {
            return Some(found);
        }
    }
    None
}

struct CycleDetector<'a, V>
where
    V: Hash + Eq,
{
    edges: &'a IndexMap<V, IndexSet<V>>,
    stack: Vec<&'a V>,
    states: IndexMap<&'a V, VisitState>,
}

impl<'a, V> CycleDetector<'a, V>
where
    V: Clone + Hash + Eq,
{
    fn new(edges: &'a IndexMap<V, IndexSet<V>>) -> Self {
        Self {
            edges,
            stack: Vec::new(),
            states: IndexMap::new(),
        }
    }

    fn is_visited(&self, vertex: &V) -> bool {
        matches!(self.states.get(vertex), Some(VisitState::Visited))
    }

    fn visit(&mut self, vertex: &'a V) -> Option<Vec<V>> {
        match self.states.get(vertex) {
            Some(VisitState::Visited) => return None,
            Some(VisitState::Visiting) => {
                let idx = self
                    .stack
                    .iter()
                    .position(|v| *v == vertex)
                    .unwrap_or_else(|| {
                        debug_assert!(false, "visiting vertex must be on the stack");
                        0
                    });
                let mut cycle: Vec<V> = self.stack.iter().skip(idx).map(|v| (*v).clone()).collect();
                cycle.push(vertex.clone());
                return Some(cycle);
            }
            None => {
                self.states.insert(vertex, VisitState::Visiting);
            }
        }

        self.stack.push(vertex);

        if let Some(targets) = self.edges.get(vertex) {
            for target in targets {
                if let Some(cycle) = self.visit(target) {
                    return Some(cycle);
                }
            }
        }

        self.stack.pop();
        self.states.insert(vertex, VisitState::Visited);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(pairs: &[(&'static str, &[&'static str])]) -> IndexMap<&'static str, IndexSet<&'static str>> {
        pairs
            .iter()
            .map(|(source, targets)| (*source, targets.iter().copied().collect()))
            .collect()
    }

    #[test]
    fn detects_self_edge_cycle() {
        let edges = graph(&[("a", &["a"])]);
        assert_eq!(find_cycle(&edges), Some(vec!["a", "a"]));
    }

    #[test]
    fn identifies_two_vertex_cycle() {
        let edges = graph(&[("a", &["b"]), ("b", &["a"])]);
        assert_eq!(find_cycle(&edges), Some(vec!["a", "b", "a"]));
    }

    #[test]
    fn reports_only_the_cycle_portion_of_the_path() {
        let edges = graph(&[("entry", &["a"]), ("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        assert_eq!(find_cycle(&edges), Some(vec!["a", "b", "c", "a"]));
    }

    #[test]
    fn diamond_is_acyclic() {
        let edges = graph(&[("a", &["b", "c"]), ("b", &["d"]), ("c", &["d"]), ("d", &[])]);
        assert_eq!(find_cycle(&edges), None);
    }

    #[test]
    fn marks_vertices_visited_after_traversal() {
        let edges = graph(&[("a", &["b"]), ("b", &[])]);
        let mut detector = CycleDetector::new(&edges);
        let start = edges.keys().next().expect("vertex");
        assert!(detector.visit(start).is_none());
        assert!(detector.is_visited(&"a"));
        assert!(detector.is_visited(&"b"));
        assert!(
            detector.stack.is_empty(),
            "stack should be empty after complete traversal",
        );
    }
}
