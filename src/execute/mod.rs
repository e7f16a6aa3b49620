//! Execution of assembled plans.
//!
//! A [`Plan`] is an immutable, validated graph of [`Vertex`] values. The
//! [`Executor`] walks it in topological waves: a vertex runs only once all of
//! its predecessors completed, receiving the merged [`FileSet`] they produced.
//!
//! When a vertex fails, every vertex downstream of it is skipped while
//! unrelated branches keep running. Setting the cancellation flag stops new
//! vertices from starting; work already done is not rolled back.

mod actions;
mod session;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::action::{FileSet, Session, Vertex, VertexId};
use crate::compiler::{CompileError, Compiler};
use crate::graph::{BuildGraph, GraphError};
use crate::language::Language;
use crate::store::{FileStateStore, StoreError};

use session::SessionTracker;

/// Errors raised while executing a single vertex.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The compiler failed.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// The file-state store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A session for this language is already open.
    #[error("compilation session for {language} is already open")]
    SessionOverlap {
        /// Language of the session.
        language: Language,
    },
    /// No session for this language is open.
    #[error("compilation session for {language} is not open")]
    SessionNotOpen {
        /// Language of the session.
        language: Language,
    },
    /// A source reached a compile step with no output directory assigned.
    #[error("no output directory for {source_file} when compiling {language}")]
    MissingOutputRoot {
        /// Source file lacking a directory.
        source_file: Utf8PathBuf,
        /// Language being compiled.
        language: Language,
    },
}

/// Collaborators available to actions during execution.
pub struct ExecContext<'a> {
    store: &'a mut dyn FileStateStore,
    compiler: &'a dyn Compiler,
    sessions: SessionTracker,
}

impl<'a> ExecContext<'a> {
    /// Bundle the collaborators for one execution.
    pub fn new(store: &'a mut dyn FileStateStore, compiler: &'a dyn Compiler) -> Self {
        Self {
            store,
            compiler,
            sessions: SessionTracker::default(),
        }
    }
}

/// A validated plan ready for execution.
#[derive(Debug, Clone)]
pub struct Plan {
    graph: BuildGraph<Vertex>,
}

impl Plan {
    /// Validate `graph` and take ownership of it.
    ///
    /// A plan has a single entry point, the first vertex inserted without an
    /// incoming edge. Every other vertex must be reachable from it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the graph is cyclic or has vertices the entry
    /// point cannot reach.
    pub fn new(graph: BuildGraph<Vertex>) -> Result<Self, GraphError> {
        let entry: Vec<Vertex> = graph.roots().into_iter().take(1).collect();
        graph.validate(&entry)?;
        Ok(Self { graph })
    }

    /// The underlying graph.
    #[must_use]
    pub const fn graph(&self) -> &BuildGraph<Vertex> {
        &self.graph
    }

    /// Vertices grouped into waves; every vertex's predecessors lie in
    /// earlier waves, and vertices within a wave are independent.
    #[must_use]
    pub fn waves(&self) -> Vec<Vec<Vertex>> {
        let mut in_degree: IndexMap<&Vertex, usize> =
            self.graph.vertices().map(|vertex| (vertex, 0)).collect();
        for (_, target) in self.graph.edges() {
            if let Some(degree) = in_degree.get_mut(target) {
                *degree += 1;
            }
        }
        let mut waves = Vec::new();
        let mut ready: Vec<&Vertex> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(vertex, _)| *vertex)
            .collect();
        while !ready.is_empty() {
            let mut next = Vec::new();
            for vertex in &ready {
                for successor in self.graph.successors(vertex) {
                    if let Some(degree) = in_degree.get_mut(successor) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            next.push(successor);
                        }
                    }
                }
            }
            waves.push(ready.into_iter().cloned().collect());
            ready = next;
        }
        waves
    }

    /// Vertices in the order the executor runs them.
    #[must_use]
    pub fn execution_order(&self) -> Vec<Vertex> {
        self.waves().into_iter().flatten().collect()
    }
}

/// Outcome of executing a plan.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Vertices that completed, in execution order.
    pub completed: Vec<VertexId>,
    /// Vertices that failed, with their errors.
    pub failed: Vec<(VertexId, ActionError)>,
    /// Vertices skipped because an upstream vertex failed, mapped to that
    /// failed vertex.
    pub skipped: IndexMap<VertexId, VertexId>,
    /// Vertices never started because execution was cancelled.
    pub cancelled: Vec<VertexId>,
    /// Sessions opened but never closed.
    pub unclosed_sessions: Vec<Session>,
}

impl ExecutionReport {
    /// Whether every vertex completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
            && self.skipped.is_empty()
            && self.cancelled.is_empty()
            && self.unclosed_sessions.is_empty()
    }
}

/// Runs plans against a file-state store and a compiler.
#[derive(Debug, Default, Clone)]
pub struct Executor {
    cancel: Arc<AtomicBool>,
}

impl Executor {
    /// Create an executor with a fresh cancellation flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an externally owned cancellation flag.
    #[must_use]
    pub const fn with_cancel_flag(cancel: Arc<AtomicBool>) -> Self {
        Self { cancel }
    }

    /// Handle that stops execution before the next vertex when set.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Execute `plan`.
    pub fn run(
        &self,
        plan: &Plan,
        store: &mut dyn FileStateStore,
        compiler: &dyn Compiler,
    ) -> ExecutionReport {
        let mut ctx = ExecContext::new(store, compiler);
        let mut report = ExecutionReport::default();
        let mut outputs: IndexMap<VertexId, FileSet> = IndexMap::new();
        let mut failed_by: IndexMap<VertexId, VertexId> = IndexMap::new();

        for vertex in plan.execution_order() {
            let id = vertex.id();
            if self.cancel.load(Ordering::SeqCst) {
                report.cancelled.push(id);
                continue;
            }
            let predecessors = plan.graph.predecessors(&vertex);
            if let Some(cause) = predecessors
                .iter()
                .find_map(|pred| failed_by.get(&pred.id()).copied())
            {
                warn!(vertex = %vertex, failed = %cause, "skipping vertex after upstream failure");
                failed_by.insert(id, cause);
                report.skipped.insert(id, cause);
                continue;
            }
            let mut input = FileSet::new();
            for pred in &predecessors {
                if let Some(files) = outputs.get(&pred.id()) {
                    input.merge(files.clone());
                }
            }
            debug!(vertex = %vertex, files = input.len(), "executing vertex");
            match vertex.action().execute(input, &mut ctx) {
                Ok(output) => {
                    outputs.insert(id, output);
                    report.completed.push(id);
                }
                Err(err) => {
                    warn!(vertex = %vertex, error = %err, "vertex failed");
                    failed_by.insert(id, id);
                    report.failed.push((id, err));
                }
            }
        }

        report.unclosed_sessions = ctx.sessions.into_unclosed();
        for session in &report.unclosed_sessions {
            warn!(language = %session.language, "compilation session left open");
        }
        report
    }
}
