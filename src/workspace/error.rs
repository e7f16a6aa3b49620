//! Errors raised while loading a workspace manifest.

// miette/thiserror derives trip `unused_assignments` on some toolchains only,
// so `#[expect]` cannot be used here.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::io;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

use crate::graph::GraphError;

/// Errors raised while loading a workspace.
#[derive(Debug, Error, Diagnostic)]
pub enum WorkspaceError {
    /// The manifest could not be read.
    #[error("failed to read workspace manifest {path}")]
    #[diagnostic(code(sidlbuild::workspace::read))]
    Read {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The manifest is not valid YAML of the expected shape.
    #[error("workspace manifest parse error")]
    #[diagnostic(code(sidlbuild::workspace::parse))]
    Parse {
        /// Detailed YAML diagnostic.
        #[source]
        #[diagnostic_source]
        source: Box<dyn Diagnostic + Send + Sync + 'static>,
    },
    /// Two projects share a name.
    #[error("project `{name}` is declared more than once")]
    #[diagnostic(code(sidlbuild::workspace::duplicate_project))]
    DuplicateProject {
        /// Repeated name.
        name: String,
    },
    /// A project depends on a project the manifest does not declare.
    #[error("project `{project}` depends on unknown project `{dependency}`")]
    #[diagnostic(
        code(sidlbuild::workspace::unknown_dependency),
        help("declare `{dependency}` under `projects` or remove it from `depends_on`")
    )]
    UnknownDependency {
        /// Dependent project.
        project: String,
        /// Missing dependency.
        dependency: String,
    },
    /// A requested project is not declared.
    #[error("unknown project `{name}`")]
    #[diagnostic(code(sidlbuild::workspace::unknown_project))]
    UnknownProject {
        /// Requested name.
        name: String,
    },
    /// Project dependencies form a cycle.
    #[error("project dependencies are circular")]
    #[diagnostic(code(sidlbuild::workspace::dependency_cycle))]
    DependencyCycle {
        /// Cycle reported by the dependency graph.
        #[source]
        source: GraphError,
    },
}
