//! Workspace manifest loading.
//!
//! A workspace is described by a YAML file (by default `sidlbuild.yml`)
//! listing its projects, the languages each one generates, and the command
//! used to invoke the interface compiler:
//!
//! ```yaml
//! compiler:
//!   command: "babel --{direction}={language} --output-directory={output} {repository} {source}"
//! projects:
//!   - name: core
//!     root: core
//!     server: [cxx]
//!   - name: solvers
//!     root: solvers
//!     depends_on: [core]
//!     client: [python]
//! ```
//!
//! Project roots are resolved against the directory holding the manifest.

mod diagnostics;
mod error;

pub use error::WorkspaceError;

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use tracing::debug;

use crate::compiler::{CommandCompiler, DEFAULT_REPOSITORY_FLAG};
use crate::language::{Language, LanguageSettings};
use crate::project::{Project, ProjectGraph};
use crate::template::{DEFAULT_EXTENSION, SidlTemplate};

/// Manifest file name looked up when none is given.
pub const DEFAULT_MANIFEST: &str = "sidlbuild.yml";

/// Default location of the file-state snapshot, relative to the workspace.
pub const DEFAULT_STATE_FILE: &str = ".sidlbuild/state.json";

/// Compiler invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerSettings {
    /// Command template; see [`CommandCompiler`] for placeholders.
    pub command: String,
    /// Expansion of each repository directory.
    #[serde(default = "default_repository_flag")]
    pub repository_flag: String,
}

/// One project entry of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectEntry {
    /// Unique project name.
    pub name: String,
    /// Project root, relative to the manifest directory.
    pub root: Utf8PathBuf,
    /// Languages to generate server implementations for.
    #[serde(default)]
    pub server: Vec<Language>,
    /// Languages to generate client bindings for.
    #[serde(default)]
    pub client: Vec<Language>,
    /// Names of projects whose interfaces this one uses.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Parsed workspace manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceManifest {
    /// Extension of interface sources.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// File-state snapshot path, relative to the manifest directory.
    #[serde(default = "default_state_file")]
    pub state_file: Utf8PathBuf,
    /// Compiler settings.
    pub compiler: CompilerSettings,
    /// Declared projects.
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_owned()
}

fn default_state_file() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_STATE_FILE)
}

fn default_repository_flag() -> String {
    DEFAULT_REPOSITORY_FLAG.to_owned()
}

/// A loaded workspace: projects, their dependencies and language settings.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: Utf8PathBuf,
    manifest: WorkspaceManifest,
    projects: ProjectGraph,
    members: IndexMap<String, (Project, LanguageSettings)>,
}

impl Workspace {
    /// Load the manifest at `path`; project roots resolve against its
    /// canonical parent directory.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] if the file cannot be read or describes an
    /// invalid workspace.
    pub fn load(path: &Utf8Path) -> Result<Self, WorkspaceError> {
        let yaml = fs::read_to_string(path).map_err(|source| WorkspaceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let dir = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."))
            .canonicalize_utf8()
            .map_err(|source| WorkspaceError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_str_named(&yaml, path.as_str(), &dir)
    }

    /// Parse a manifest held in memory.
    ///
    /// `name` labels diagnostics and `dir` anchors relative project roots.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] for malformed YAML, duplicate projects,
    /// unknown or circular dependencies.
    pub fn from_str_named(yaml: &str, name: &str, dir: &Utf8Path) -> Result<Self, WorkspaceError> {
        let manifest: WorkspaceManifest =
            serde_saphyr::from_str(yaml).map_err(|err| WorkspaceError::Parse {
                source: diagnostics::map_yaml_error(err, yaml, name),
            })?;
        Self::from_manifest(manifest, dir)
    }

    /// Build a workspace from an already parsed manifest.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError`] for duplicate projects, unknown or circular
    /// dependencies.
    pub fn from_manifest(manifest: WorkspaceManifest, dir: &Utf8Path) -> Result<Self, WorkspaceError> {
        let mut members = IndexMap::new();
        let mut projects = ProjectGraph::new();
        for entry in &manifest.projects {
            let project = Project::new(entry.name.clone(), dir.join(&entry.root));
            let mut settings = LanguageSettings::default();
            for language in &entry.server {
                settings.add_server(language.clone());
            }
            for language in &entry.client {
                settings.add_client(language.clone());
            }
            projects.add_vertex(project.clone());
            if members
                .insert(entry.name.clone(), (project, settings))
                .is_some()
            {
                return Err(WorkspaceError::DuplicateProject {
                    name: entry.name.clone(),
                });
            }
        }
        for entry in &manifest.projects {
            let Some((project, _)) = members.get(&entry.name) else {
                continue;
            };
            for dependency in &entry.depends_on {
                let (target, _) =
                    members
                        .get(dependency)
                        .ok_or_else(|| WorkspaceError::UnknownDependency {
                            project: entry.name.clone(),
                            dependency: dependency.clone(),
                        })?;
                projects
                    .add_edges(Some(project), [target.clone()])
                    .map_err(|source| WorkspaceError::DependencyCycle { source })?;
            }
        }
        debug!(
            projects = projects.len(),
            dependencies = projects.edge_count(),
            "loaded workspace"
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            projects,
            members,
        })
    }

    /// Directory holding the manifest.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Extension of interface sources.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.manifest.extension
    }

    /// File-state snapshot path relative to [`Workspace::dir`].
    #[must_use]
    pub fn state_file(&self) -> &Utf8Path {
        &self.manifest.state_file
    }

    /// Look up a project by name.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::UnknownProject`] if no project has `name`.
    pub fn project(&self, name: &str) -> Result<&Project, WorkspaceError> {
        self.members
            .get(name)
            .map(|(project, _)| project)
            .ok_or_else(|| WorkspaceError::UnknownProject {
                name: name.to_owned(),
            })
    }

    /// Language settings of the project called `name`.
    #[must_use]
    pub fn languages(&self, name: &str) -> Option<&LanguageSettings> {
        self.members.get(name).map(|(_, settings)| settings)
    }

    /// Roots of other projects nested inside `project`'s root.
    ///
    /// Their sources belong to those projects, so scanning `project` skips
    /// them.
    #[must_use]
    pub fn nested_roots(&self, project: &Project) -> Vec<Utf8PathBuf> {
        self.members
            .values()
            .map(|(member, _)| member.root())
            .filter(|root| *root != project.root() && root.starts_with(project.root()))
            .map(Utf8Path::to_path_buf)
            .collect()
    }

    /// Every project, each after the projects it depends on.
    #[must_use]
    pub fn build_order(&self) -> Vec<Project> {
        let mut order: IndexSet<Project> = IndexSet::new();
        for project in self.projects.vertices() {
            self.visit_dependencies_first(project, &mut order);
        }
        order.into_iter().collect()
    }

    fn visit_dependencies_first(&self, project: &Project, order: &mut IndexSet<Project>) {
        if order.contains(project) {
            return;
        }
        for dependency in self.projects.successors(project) {
            self.visit_dependencies_first(dependency, order);
        }
        order.insert(project.clone());
    }

    /// Compiler described by the manifest.
    #[must_use]
    pub fn compiler(&self) -> CommandCompiler {
        let settings = &self.manifest.compiler;
        CommandCompiler::new(settings.command.clone())
            .with_repository_flag(settings.repository_flag.clone())
    }

    /// Pipeline template for the project called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::UnknownProject`] if no project has `name`.
    pub fn template(&self, name: &str) -> Result<SidlTemplate<LanguageSettings>, WorkspaceError> {
        let (project, settings) =
            self.members
                .get(name)
                .ok_or_else(|| WorkspaceError::UnknownProject {
                    name: name.to_owned(),
                })?;
        Ok(
            SidlTemplate::new(project.clone(), &self.projects, settings.clone())
                .with_extension(self.manifest.extension.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
compiler:
  command: "babel {source}"
projects:
  - name: app
    root: app
    depends_on: [core]
    client: [Python, python]
  - name: core
    root: core
    server: [cxx]
"#;

    fn workspace(yaml: &str) -> Result<Workspace, WorkspaceError> {
        Workspace::from_str_named(yaml, "sidlbuild.yml", Utf8Path::new("/ws"))
    }

    #[test]
    fn resolves_roots_and_defaults() {
        let ws = workspace(YAML).expect("workspace");
        assert_eq!(ws.project("core").expect("core").root().as_str(), "/ws/core");
        assert_eq!(ws.extension(), "sidl");
        assert_eq!(ws.state_file().as_str(), DEFAULT_STATE_FILE);
        assert_eq!(ws.manifest.compiler.repository_flag, "-R{dir}");
        let app = ws.languages("app").expect("app languages");
        assert_eq!(app.client, vec![Language::new("python")]);
    }

    #[test]
    fn nested_project_roots_are_reported_for_their_parent() {
        let yaml = "compiler: {command: babel}\nprojects:\n  - {name: top, root: .}\n  - {name: core, root: core}\n  - {name: lib, root: lib}\n";
        let ws = workspace(yaml).expect("workspace");
        let top = ws.project("top").expect("top");
        assert_eq!(
            ws.nested_roots(top),
            vec![Utf8PathBuf::from("/ws/core"), Utf8PathBuf::from("/ws/lib")]
        );
        let core = ws.project("core").expect("core");
        assert!(ws.nested_roots(core).is_empty());
    }

    #[test]
    fn dependencies_build_first() {
        let ws = workspace(YAML).expect("workspace");
        let names: Vec<String> = ws
            .build_order()
            .iter()
            .map(|project| project.name().to_owned())
            .collect();
        assert_eq!(names, ["core", "app"]);
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let yaml = "compiler: {command: babel}\nprojects:\n  - {name: app, root: app, depends_on: [nope]}\n";
        let err = workspace(yaml).expect_err("unknown dependency");
        assert!(matches!(err, WorkspaceError::UnknownDependency { ref dependency, .. } if dependency == "nope"));
    }

    #[test]
    fn duplicate_projects_are_rejected() {
        let yaml = "compiler: {command: babel}\nprojects:\n  - {name: a, root: a}\n  - {name: a, root: b}\n";
        let err = workspace(yaml).expect_err("duplicate");
        assert!(matches!(err, WorkspaceError::DuplicateProject { .. }));
    }

    #[test]
    fn circular_dependencies_are_rejected() {
        let yaml = "compiler: {command: babel}\nprojects:\n  - {name: a, root: a, depends_on: [b]}\n  - {name: b, root: b, depends_on: [a]}\n";
        let err = workspace(yaml).expect_err("cycle");
        assert!(matches!(err, WorkspaceError::DependencyCycle { .. }));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let yaml = "compiler: {command: babel}\nlanguages: [cxx]\n";
        let err = workspace(yaml).expect_err("unknown key");
        assert!(matches!(err, WorkspaceError::Parse { .. }));
    }

    #[test]
    fn template_uses_workspace_extension() {
        let yaml = "extension: idl\ncompiler: {command: babel}\nprojects:\n  - {name: a, root: a}\n";
        let ws = workspace(yaml).expect("workspace");
        let mut template = ws.template("a").expect("template");
        let target = template.target().expect("target");
        let root = target.roots().into_iter().next().expect("root");
        assert_eq!(root.action().to_string(), "classify *.idl as interface-source");
    }
}
