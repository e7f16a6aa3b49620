//! In-memory file-state store.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::{IndexMap, IndexSet};
use sidlbuild::action::FileTag;
use sidlbuild::store::{FileStateStore, StoreError};

/// A [`FileStateStore`] whose files and modification state live in memory.
///
/// `update` marks every updated file as unmodified, mimicking a snapshot
/// refresh.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    files: Vec<Utf8PathBuf>,
    modified: IndexSet<Utf8PathBuf>,
    tags: IndexMap<Utf8PathBuf, FileTag>,
    /// Files persisted by each `update` call, in call order.
    pub updates: Vec<Vec<Utf8PathBuf>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path`, flagged as modified or not.
    pub fn with_file(mut self, path: &str, modified: bool) -> Self {
        let file = Utf8PathBuf::from(path);
        if modified {
            self.modified.insert(file.clone());
        }
        self.files.push(file);
        self
    }

    /// Flag `path` as modified again.
    pub fn touch(&mut self, path: &str) {
        self.modified.insert(Utf8PathBuf::from(path));
    }

    /// Current tag of `path`.
    pub fn tag_of(&self, path: &str) -> Option<FileTag> {
        self.tags.get(Utf8Path::new(path)).copied()
    }
}

impl FileStateStore for MemoryStore {
    fn files_with_extension(&self, extension: &str) -> Result<Vec<Utf8PathBuf>, StoreError> {
        Ok(self
            .files
            .iter()
            .filter(|path| path.extension() == Some(extension))
            .cloned()
            .collect())
    }

    fn is_modified(&mut self, path: &Utf8Path) -> Result<bool, StoreError> {
        Ok(self.modified.contains(path))
    }

    fn tag(&mut self, files: &[Utf8PathBuf], tag: FileTag) {
        for file in files {
            self.tags.insert(file.clone(), tag);
        }
    }

    fn tagged(&self, tag: FileTag) -> Vec<Utf8PathBuf> {
        self.tags
            .iter()
            .filter(|(_, t)| **t == tag)
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn update(&mut self) -> Result<usize, StoreError> {
        let updated = self.tagged(FileTag::Updated);
        for path in &updated {
            self.modified.shift_remove(path);
        }
        let count = updated.len();
        self.updates.push(updated);
        Ok(count)
    }
}
