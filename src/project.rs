//! Projects and the project dependency graph.
//!
//! Projects form their own [`BuildGraph`] where an edge `p → q` means
//! "`p` depends on `q`". The dependency resolver walks this graph to find
//! the roots of every project whose interfaces a compilation step must be able
//! to see.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};

use crate::graph::BuildGraph;

/// A project with a filesystem root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Project {
    name: String,
    root: Utf8PathBuf,
}

impl Project {
    /// Create a project called `name` rooted at `root`.
    #[must_use]
    pub fn new(name: impl Into<String>, root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// The project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The project root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Dependency graph over projects; edges point from dependent to dependency.
pub type ProjectGraph = BuildGraph<Project>;

/// Roots of every project `project` depends on, directly or transitively.
///
/// Projects are listed in depth-first pre-order, each once, with `project`
/// itself excluded. The traversal visits every project at most once, so it
/// terminates even if the dependency graph is cyclic.
///
/// ```
/// use camino::Utf8PathBuf;
/// use sidlbuild::project::{Project, ProjectGraph, repository_dirs};
///
/// let app = Project::new("app", "/ws/app");
/// let core = Project::new("core", "/ws/core");
/// let mut graph = ProjectGraph::new();
/// graph.add_edges(Some(&app), [core]).expect("acyclic");
/// assert_eq!(repository_dirs(&graph, &app), vec![Utf8PathBuf::from("/ws/core")]);
/// ```
#[must_use]
pub fn repository_dirs(graph: &ProjectGraph, project: &Project) -> Vec<Utf8PathBuf> {
    graph
        .depth_first_visit(project)
        .into_iter()
        .filter(|dependency| dependency != project)
        .map(|dependency| dependency.root)
        .collect()
}
