//! Pipeline template: assembles the plan for one project.
//!
//! Server bindings are produced by a bracketed chain per language:
//!
//! ```text
//! tag [source, stale] -> open -> compile server -> tag [updated, stale] -> close
//! ```
//!
//! Client bindings are a single compile vertex per language. A classifier
//! feeds every branch and an update vertex runs once all branches finish.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::action::{
    Action, ClassifyAction, CompileAction, Direction, FileTag, RootFn, Session, TagAction, Vertex,
    VertexIds,
};
use crate::graph::{BuildGraph, GraphError};
use crate::language::{Language, LanguageConfig};
use crate::project::{Project, ProjectGraph, repository_dirs};

/// Extension of interface-definition sources.
pub const DEFAULT_EXTENSION: &str = "sidl";

/// Assembles build graphs for a single project.
///
/// ```
/// use sidlbuild::language::LanguageSettings;
/// use sidlbuild::project::{Project, ProjectGraph};
/// use sidlbuild::template::SidlTemplate;
///
/// let project = Project::new("core", "/ws/core");
/// let projects = ProjectGraph::from_vertices([project.clone()]);
/// let settings = LanguageSettings::default().with_server("cxx");
/// let mut template = SidlTemplate::new(project, &projects, settings);
/// let target = template.target().expect("acyclic");
/// assert_eq!(target.len(), 7);
/// ```
#[derive(Debug)]
pub struct SidlTemplate<C> {
    project: Project,
    repository_dirs: Vec<Utf8PathBuf>,
    config: Arc<C>,
    extension: String,
    ids: VertexIds,
}

impl<C> SidlTemplate<C>
where
    C: LanguageConfig + Send + Sync + 'static,
{
    /// Create a template for `project`, resolving its dependencies in
    /// `projects` once up front.
    pub fn new(project: Project, projects: &ProjectGraph, config: C) -> Self {
        let repository_dirs = repository_dirs(projects, &project);
        Self {
            project,
            repository_dirs,
            config: Arc::new(config),
            extension: DEFAULT_EXTENSION.to_owned(),
            ids: VertexIds::default(),
        }
    }

    /// Classify sources by `extension` instead of the default.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// The project being assembled.
    #[must_use]
    pub const fn project(&self) -> &Project {
        &self.project
    }

    /// Roots of every project this one depends on.
    #[must_use]
    pub fn repository_dirs(&self) -> &[Utf8PathBuf] {
        &self.repository_dirs
    }

    /// Independent bracketed chains, one per server language.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if merging the chains produced a cycle.
    pub fn server_target(&mut self) -> Result<BuildGraph<Vertex>, GraphError> {
        let mut target = BuildGraph::new();
        let languages = self.config.server_languages().to_vec();
        for language in languages {
            let chain = self.server_chain(&language)?;
            target.add_subgraph(chain)?;
        }
        Ok(target)
    }

    fn server_chain(&mut self, language: &Language) -> Result<BuildGraph<Vertex>, GraphError> {
        let root = self.server_root(language);
        let session = Session {
            language: language.clone(),
        };
        let steps = [
            Action::Tag(TagAction {
                root: root.clone(),
                input: vec![FileTag::Source, FileTag::Stale],
            }),
            Action::Open(session.clone()),
            Action::Compile(self.compile_action(language, Direction::Server, None)),
            Action::Tag(TagAction {
                root,
                input: vec![FileTag::Updated, FileTag::Stale],
            }),
            Action::Close(session),
        ];
        let vertices: Vec<Vertex> = steps
            .into_iter()
            .map(|action| self.ids.vertex(action))
            .collect();
        let mut chain = BuildGraph::new();
        for (source, target) in vertices.iter().zip(vertices.iter().skip(1)) {
            chain.add_edges(Some(source), [target.clone()])?;
        }
        debug!(project = %self.project, %language, "assembled server chain");
        Ok(chain)
    }

    /// One unconnected compile vertex per client language.
    pub fn client_target(&mut self) -> BuildGraph<Vertex> {
        let languages = self.config.client_languages().to_vec();
        let mut target = BuildGraph::new();
        for language in languages {
            let root = self.client_root(&language);
            let action =
                Action::Compile(self.compile_action(&language, Direction::Client, Some(root)));
            target.add_vertex(self.ids.vertex(action));
        }
        target
    }

    /// The complete plan: classify, every language branch, then update.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if assembly produced a cycle.
    pub fn target(&mut self) -> Result<BuildGraph<Vertex>, GraphError> {
        let mut target = BuildGraph::new();
        let classifier = self.ids.vertex(Action::GenericTag(ClassifyAction {
            tag: FileTag::Source,
            extension: self.extension.clone(),
        }));
        target.add_vertex(classifier.clone());

        let client = self.client_target();
        let server = self.server_target()?;
        let branch_roots: Vec<Vertex> = client.roots().into_iter().chain(server.roots()).collect();
        target.add_subgraph(client)?;
        target.add_subgraph(server)?;
        target.add_edges(Some(&classifier), branch_roots)?;

        let update = self.ids.vertex(Action::Update);
        target.append_graph(BuildGraph::from_vertices([update]))?;
        debug!(
            project = %self.project,
            vertices = target.len(),
            edges = target.edge_count(),
            "assembled target"
        );
        Ok(target)
    }

    fn compile_action(
        &self,
        language: &Language,
        direction: Direction,
        output_root: Option<RootFn>,
    ) -> CompileAction {
        CompileAction {
            language: language.clone(),
            direction,
            project_root: self.project.root().to_path_buf(),
            repository_dirs: self.repository_dirs.clone(),
            output_root,
        }
    }

    fn server_root(&self, language: &Language) -> RootFn {
        let config = Arc::clone(&self.config);
        let bound = language.clone();
        let project_root = self.project.root().to_path_buf();
        RootFn::new(move |source| {
            project_root.join(config.server_root_dir(&bound, base_name(source)))
        })
    }

    fn client_root(&self, language: &Language) -> RootFn {
        let config = Arc::clone(&self.config);
        let bound = language.clone();
        let project_root = self.project.root().to_path_buf();
        RootFn::new(move |source| {
            project_root.join(config.client_root_dir(&bound, base_name(source)))
        })
    }
}

fn base_name(source: &Utf8Path) -> &str {
    source.file_stem().unwrap_or_else(|| source.as_str())
}
