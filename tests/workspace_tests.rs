//! Tests for loading workspace manifests from disk.

use anyhow::{Context, Result, ensure};
use miette::Diagnostic;
use rstest::rstest;
use sidlbuild::language::Language;
use sidlbuild::project::Project;
use sidlbuild::workspace::{Workspace, WorkspaceError};
use tempfile::tempdir;
use test_support::{utf8_dir, write_file};

const MANIFEST: &str = include_str!("data/workspace.yml");

#[rstest]
fn loads_projects_relative_to_manifest() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    let root = utf8_dir(&temp).canonicalize_utf8().context("canonical temp dir")?;
    let manifest = write_file(&root, "sidlbuild.yml", MANIFEST);

    let workspace = Workspace::load(&manifest).context("load workspace")?;
    ensure!(workspace.dir() == root, "dir was {}", workspace.dir());
    let solvers = workspace.project("solvers").context("solvers project")?;
    ensure!(solvers.root() == root.join("solvers"), "root was {}", solvers.root());
    let order = workspace.build_order();
    let names: Vec<&str> = order.iter().map(Project::name).collect();
    ensure!(names == ["core", "solvers"], "build order was {names:?}");
    Ok(())
}

#[rstest]
fn repository_dirs_come_from_dependencies() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    let root = utf8_dir(&temp).canonicalize_utf8().context("canonical temp dir")?;
    let manifest = write_file(&root, "sidlbuild.yml", MANIFEST);

    let workspace = Workspace::load(&manifest).context("load workspace")?;
    let template = workspace.template("solvers").context("solvers template")?;
    ensure!(
        template.repository_dirs() == [root.join("core")],
        "repository dirs were {:?}",
        template.repository_dirs()
    );
    Ok(())
}

#[rstest]
fn languages_are_normalised_and_deduplicated() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    let root = utf8_dir(&temp);
    let manifest = write_file(&root, "sidlbuild.yml", MANIFEST);

    let workspace = Workspace::load(&manifest).context("load workspace")?;
    let core = workspace.languages("core").context("core languages")?;
    ensure!(
        core.server == [Language::new("cxx"), Language::new("python")],
        "server languages were {:?}",
        core.server
    );
    Ok(())
}

#[rstest]
fn missing_manifest_reports_read_error() {
    let temp = tempdir().expect("temp dir");
    let path = utf8_dir(&temp).join("absent.yml");
    let err = Workspace::load(&path).expect_err("missing manifest");
    assert!(matches!(err, WorkspaceError::Read { .. }));
    assert_eq!(
        err.code().map(|code| code.to_string()).as_deref(),
        Some("sidlbuild::workspace::read")
    );
}

#[rstest]
#[case("compiler: {command: babel}\nprojects: [", "sidlbuild::workspace::parse")]
#[case(
    "compiler: {command: babel}\nprojects:\n  - {name: a, root: a, depends_on: [b]}\n",
    "sidlbuild::workspace::unknown_dependency"
)]
#[case(
    "compiler: {command: babel}\nprojects:\n  - {name: a, root: a}\n  - {name: a, root: b}\n",
    "sidlbuild::workspace::duplicate_project"
)]
fn invalid_manifests_carry_diagnostic_codes(#[case] yaml: &str, #[case] code: &str) {
    let temp = tempdir().expect("temp dir");
    let manifest = write_file(&utf8_dir(&temp), "sidlbuild.yml", yaml);
    let err = Workspace::load(&manifest).expect_err("invalid manifest");
    assert_eq!(err.code().map(|c| c.to_string()).as_deref(), Some(code));
}
