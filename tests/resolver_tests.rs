//! Tests for resolving the repository directories of dependent projects.

use camino::Utf8PathBuf;
use rstest::rstest;
use sidlbuild::project::{Project, ProjectGraph, repository_dirs};

fn project(name: &str) -> Project {
    Project::new(name, format!("/ws/{name}"))
}

fn roots(names: &[&str]) -> Vec<Utf8PathBuf> {
    names
        .iter()
        .map(|name| Utf8PathBuf::from(format!("/ws/{name}")))
        .collect()
}

#[rstest]
fn project_without_dependencies_has_no_repositories() {
    let p = project("p");
    let graph = ProjectGraph::from_vertices([p.clone()]);
    assert!(repository_dirs(&graph, &p).is_empty());
}

#[rstest]
fn diamond_dependencies_are_listed_once() {
    let (p, q, r) = (project("p"), project("q"), project("r"));
    let mut graph = ProjectGraph::new();
    graph.add_edges(Some(&p), [q.clone(), r.clone()]).expect("acyclic");
    graph.add_edges(Some(&q), [r]).expect("acyclic");
    assert_eq!(repository_dirs(&graph, &p), roots(&["q", "r"]));
    assert_eq!(repository_dirs(&graph, &q), roots(&["r"]));
}

#[rstest]
fn transitive_dependencies_follow_depth_first_order() {
    let (app, ui, core, util) = (project("app"), project("ui"), project("core"), project("util"));
    let mut graph = ProjectGraph::new();
    graph.add_edges(Some(&app), [ui.clone(), util.clone()]).expect("acyclic");
    graph.add_edges(Some(&ui), [core.clone()]).expect("acyclic");
    graph.add_edges(Some(&core), [util]).expect("acyclic");
    assert_eq!(repository_dirs(&graph, &app), roots(&["ui", "core", "util"]));
}

#[rstest]
fn unknown_project_has_no_repositories() {
    let graph = ProjectGraph::from_vertices([project("p")]);
    assert!(repository_dirs(&graph, &project("stranger")).is_empty());
}
