//! Build actions: the vertices of an assembled plan.
//!
//! Each [`Vertex`] pairs a unique [`VertexId`] with an [`Action`]. Identity is
//! carried by the id alone, so two tagging steps with identical parameters in
//! different language chains remain distinct vertices.
//!
//! Files travel along the graph as a [`FileSet`]: every file carries one of
//! three [`FileTag`] states describing its staleness.

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

use crate::language::Language;

/// Staleness state of an interface source file.
///
/// States are ordered by progress through a build; when two branches report
/// different states for the same file the later state wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileTag {
    /// Unchanged since the stored snapshot; replayed from the prior revision.
    Stale,
    /// Modified since the stored snapshot and awaiting compilation.
    Source,
    /// Compiled during this build; its snapshot entry needs refreshing.
    Updated,
}

impl FileTag {
    /// The tag name as understood by the file-state store.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stale => "stale-from-prior-revision",
            Self::Source => "interface-source",
            Self::Updated => "interface-source-updated",
        }
    }
}

impl fmt::Display for FileTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A file flowing through the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedFile {
    /// Current staleness state.
    pub tag: FileTag,
    /// Output root directory assigned by a tagging step, if any.
    pub root: Option<Utf8PathBuf>,
}

/// Files handed from one vertex to the next, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: IndexMap<Utf8PathBuf, TaggedFile>,
}

impl FileSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `path` with `tag`, keeping the more advanced tag if present.
    pub fn insert(&mut self, path: Utf8PathBuf, tag: FileTag) {
        self.insert_file(path, TaggedFile { tag, root: None });
    }

    fn insert_file(&mut self, path: Utf8PathBuf, file: TaggedFile) {
        match self.files.get_mut(&path) {
            Some(existing) if existing.tag > file.tag => {}
            Some(existing) => {
                existing.tag = file.tag;
                if file.root.is_some() {
                    existing.root = file.root;
                }
            }
            None => {
                self.files.insert(path, file);
            }
        }
    }

    /// Merge `other` into this set; the more advanced tag wins per file.
    pub fn merge(&mut self, other: Self) {
        for (path, file) in other.files {
            self.insert_file(path, file);
        }
    }

    /// Files carrying `tag`.
    pub fn with_tag(&self, tag: FileTag) -> impl Iterator<Item = &Utf8Path> {
        self.files
            .iter()
            .filter(move |(_, file)| file.tag == tag)
            .map(|(path, _)| path.as_path())
    }

    /// Look up a file.
    #[must_use]
    pub fn get(&self, path: &Utf8Path) -> Option<&TaggedFile> {
        self.files.get(path)
    }

    /// Iterate over every file.
    pub fn iter(&self) -> impl Iterator<Item = (&Utf8Path, &TaggedFile)> {
        self.files.iter().map(|(path, file)| (path.as_path(), file))
    }

    /// Keep only files whose tag satisfies `keep`, then assign roots via
    /// `root`.
    #[must_use]
    pub fn select(self, keep: impl Fn(FileTag) -> bool, root: &RootFn) -> Self {
        let files = self
            .files
            .into_iter()
            .filter(|(_, file)| keep(file.tag))
            .map(|(path, file)| {
                let dir = root.resolve(&path);
                (
                    path,
                    TaggedFile {
                        tag: file.tag,
                        root: Some(dir),
                    },
                )
            })
            .collect();
        Self { files }
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<(Utf8PathBuf, FileTag)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (Utf8PathBuf, FileTag)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (path, tag) in iter {
            set.insert(path, tag);
        }
        set
    }
}

/// Maps an interface source file to the directory its generated code lives
/// in.
#[derive(Clone)]
pub struct RootFn(Arc<dyn Fn(&Utf8Path) -> Utf8PathBuf + Send + Sync>);

impl RootFn {
    /// Wrap a root-directory function.
    pub fn new(f: impl Fn(&Utf8Path) -> Utf8PathBuf + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Output directory for `source`.
    #[must_use]
    pub fn resolve(&self, source: &Utf8Path) -> Utf8PathBuf {
        (self.0)(source)
    }
}

impl fmt::Debug for RootFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootFn(..)")
    }
}

/// Whether a compile step produces server implementations or client
/// bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Server implementation skeletons.
    Server,
    /// Client bindings.
    Client,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Server => "server",
            Self::Client => "client",
        })
    }
}

/// Key of a bracketed compilation session.
///
/// Sessions for the same language must not overlap; sessions for different
/// languages are independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session {
    /// Language whose server chain the session brackets.
    pub language: Language,
}

/// Classification of source files by extension.
#[derive(Debug, Clone)]
pub struct ClassifyAction {
    /// Tag applied to modified files; unmodified files become
    /// [`FileTag::Stale`].
    pub tag: FileTag,
    /// Extension selecting interface sources, without the leading dot.
    pub extension: String,
}

/// Selection of files ready for the next stage.
#[derive(Debug, Clone)]
pub struct TagAction {
    /// Output root for each selected file.
    pub root: RootFn,
    /// Tags selecting the files to pass on.
    pub input: Vec<FileTag>,
}

/// Invocation of the external interface compiler.
#[derive(Debug, Clone)]
pub struct CompileAction {
    /// Target language.
    pub language: Language,
    /// Server or client generation.
    pub direction: Direction,
    /// Root of the project being compiled.
    pub project_root: Utf8PathBuf,
    /// Roots of depended-upon projects made visible to the compiler.
    pub repository_dirs: Vec<Utf8PathBuf>,
    /// Output directory for each source file that arrives without one.
    ///
    /// Server compiles receive their directories from the preceding tag
    /// step; client compiles have no tag step and resolve their own.
    pub output_root: Option<RootFn>,
}

/// A build action.
#[derive(Debug, Clone)]
pub enum Action {
    /// Classify source files into a tag category.
    GenericTag(ClassifyAction),
    /// Select tagged files for the next stage.
    Tag(TagAction),
    /// Begin a bracketed compilation session.
    Open(Session),
    /// Compile interface sources for one language and direction.
    Compile(CompileAction),
    /// End a bracketed compilation session.
    Close(Session),
    /// Persist the file-state snapshot.
    Update,
}

impl Action {
    /// Short kind name used in logs and plan listings.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::GenericTag(_) => "classify",
            Self::Tag(_) => "tag",
            Self::Open(_) => "open",
            Self::Compile(_) => "compile",
            Self::Close(_) => "close",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenericTag(classify) => {
                write!(f, "classify *.{} as {}", classify.extension, classify.tag)
            }
            Self::Tag(tag) => {
                let names: Vec<&str> = tag.input.iter().map(|t| t.name()).collect();
                write!(f, "tag [{}]", names.join(", "))
            }
            Self::Open(session) => write!(f, "open {}", session.language),
            Self::Compile(compile) => {
                write!(f, "compile {} {}", compile.direction, compile.language)
            }
            Self::Close(session) => write!(f, "close {}", session.language),
            Self::Update => f.write_str("update"),
        }
    }
}

/// Unique identity of a vertex within one assembled plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(u32);

impl VertexId {
    /// Create an id from its raw value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An action with identity, as stored in a plan graph.
#[derive(Debug, Clone)]
pub struct Vertex {
    id: VertexId,
    action: Arc<Action>,
}

impl Vertex {
    /// Create a vertex.
    #[must_use]
    pub fn new(id: VertexId, action: Action) -> Self {
        Self {
            id,
            action: Arc::new(action),
        }
    }

    /// The vertex identity.
    #[must_use]
    pub const fn id(&self) -> VertexId {
        self.id
    }

    /// The action performed by this vertex.
    #[must_use]
    pub fn action(&self) -> &Action {
        &self.action
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Vertex {}

impl std::hash::Hash for Vertex {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.action)
    }
}

/// Hands out consecutive vertex ids.
#[derive(Debug, Default)]
pub struct VertexIds {
    next: u32,
}

impl VertexIds {
    /// Create a vertex for `action` with the next free id.
    pub fn vertex(&mut self, action: Action) -> Vertex {
        let id = VertexId::new(self.next);
        self.next = self.next.saturating_add(1);
        Vertex::new(id, action)
    }
}
