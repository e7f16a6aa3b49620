//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! loads the workspace, assembles a plan per project and either prints it or
//! executes it.

mod error;
mod path_helpers;

pub use error::RunnerError;

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::cli::{Cli, Commands};
use crate::execute::{Executor, Plan};
use crate::project::Project;
use crate::store::SnapshotStore;
use crate::workspace::Workspace;

use path_helpers::{ensure_manifest_exists, resolve_manifest_path};

/// Execute the parsed [`Cli`] command.
///
/// # Errors
///
/// Returns an error if the workspace cannot be loaded, a plan cannot be
/// assembled, or a build action fails.
pub fn run(cli: &Cli) -> Result<()> {
    let manifest_path = resolve_manifest_path(cli)?;
    ensure_manifest_exists(&manifest_path)?;
    let workspace = Workspace::load(&manifest_path)
        .with_context(|| format!("loading workspace manifest {manifest_path}"))?;
    let projects = selected_projects(cli, &workspace)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command.unwrap_or(Commands::Build) {
        Commands::Build => handle_build(&workspace, &projects),
        Commands::Plan => write_plan(&workspace, &projects, &mut out),
        Commands::Graph => write_graph(&workspace, &projects, &mut out),
    }
}

/// The projects a command applies to: the one named on the command line, or
/// every project with dependencies first.
fn selected_projects(cli: &Cli, workspace: &Workspace) -> Result<Vec<Project>> {
    match &cli.project {
        Some(name) => Ok(vec![workspace.project(name)?.clone()]),
        None => Ok(workspace.build_order()),
    }
}

/// Assemble and validate the plan for `project`.
///
/// # Errors
///
/// Returns an error if the project is unknown or its graph is malformed.
pub fn assemble(workspace: &Workspace, project: &Project) -> Result<Plan> {
    let mut template = workspace.template(project.name())?;
    let graph = template
        .target()
        .with_context(|| format!("assembling build graph for {project}"))?;
    Plan::new(graph).with_context(|| format!("validating build graph for {project}"))
}

/// Write each project's actions in execution order, one per line.
///
/// # Errors
///
/// Returns an error if assembly fails or `out` cannot be written.
pub fn write_plan(workspace: &Workspace, projects: &[Project], out: &mut dyn Write) -> Result<()> {
    for project in projects {
        let plan = assemble(workspace, project)?;
        for vertex in plan.execution_order() {
            writeln!(out, "{project}: {vertex}").context("writing plan")?;
        }
    }
    Ok(())
}

/// Write each project's build graph in DOT format.
///
/// # Errors
///
/// Returns an error if assembly fails or `out` cannot be written.
pub fn write_graph(workspace: &Workspace, projects: &[Project], out: &mut dyn Write) -> Result<()> {
    for project in projects {
        let plan = assemble(workspace, project)?;
        write!(out, "{}", plan.graph().to_dot(project.name())).context("writing graph")?;
    }
    Ok(())
}

/// Build `projects` in order, stopping at the first project that fails.
fn handle_build(workspace: &Workspace, projects: &[Project]) -> Result<()> {
    let compiler = workspace.compiler();
    let executor = Executor::new();
    let snapshot = workspace.dir().join(workspace.state_file());
    for project in projects {
        let plan = assemble(workspace, project)?;
        let mut store = SnapshotStore::open(project.root(), &snapshot)
            .with_context(|| format!("opening file-state snapshot {snapshot}"))?
            .with_excluded(workspace.nested_roots(project));
        if let Some(languages) = workspace.languages(project.name()) {
            info!(
                %project,
                server = ?languages.server,
                client = ?languages.client,
                actions = plan.graph().len(),
                "building project"
            );
        }
        let report = executor.run(&plan, &mut store, &compiler);
        for (vertex, err) in &report.failed {
            error!(%project, %vertex, error = %err, "build action failed");
        }
        if !report.is_success() {
            return Err(RunnerError::BuildFailed {
                project: project.name().to_owned(),
                failed: report.failed.len(),
                skipped: report.skipped.len(),
            }
            .into());
        }
    }
    Ok(())
}
