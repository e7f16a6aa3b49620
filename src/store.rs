//! File-state store: which interface sources changed and which were rebuilt.
//!
//! The [`FileStateStore`] trait is the contract the executor relies on.
//! [`SnapshotStore`] implements it by comparing SHA-256 digests of files
//! against a JSON snapshot written after each successful build.
//!
//! ```no_run
//! use camino::Utf8Path;
//! use sidlbuild::store::{FileStateStore, SnapshotStore};
//!
//! # fn main() -> Result<(), sidlbuild::store::StoreError> {
//! let mut store = SnapshotStore::open(Utf8Path::new("."), Utf8Path::new(".sidlbuild/state.json"))?;
//! for file in store.files_with_extension("sidl")? {
//!     if store.is_modified(&file)? {
//!         // needs compiling
//!     }
//! }
//! # Ok(()) }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::action::FileTag;

/// Errors raised by file-state stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The snapshot file is not valid JSON of the expected shape.
    #[error("invalid snapshot {path}: {source}")]
    Snapshot {
        /// Snapshot file.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// Walking the source tree failed.
    #[error("failed to scan {root}: {source}")]
    Walk {
        /// Directory being scanned.
        root: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: walkdir::Error,
    },
    /// A path under the source tree is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },
}

/// Tracks modification state and tags of source files.
pub trait FileStateStore {
    /// Every tracked file with `extension`, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the source tree cannot be scanned.
    fn files_with_extension(&self, extension: &str) -> Result<Vec<Utf8PathBuf>, StoreError>;

    /// Whether `path` changed since the last persisted snapshot.
    ///
    /// The state observed here is what [`FileStateStore::update`] later
    /// persists, so edits made while a build runs are picked up next time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the file cannot be read.
    fn is_modified(&mut self, path: &Utf8Path) -> Result<bool, StoreError>;

    /// Mark `files` with `tag`, replacing any previous tag.
    fn tag(&mut self, files: &[Utf8PathBuf], tag: FileTag);

    /// Files currently carrying `tag`.
    fn tagged(&self, tag: FileTag) -> Vec<Utf8PathBuf>;

    /// Persist the snapshot for every file tagged [`FileTag::Updated`],
    /// forget files that no longer exist, and return how many entries were
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a file cannot be hashed or the snapshot
    /// cannot be written.
    fn update(&mut self) -> Result<usize, StoreError>;
}

/// SHA-256 digest of `path`'s contents, as lowercase hex.
///
/// # Errors
///
/// Returns [`StoreError::Io`] when the file cannot be read.
pub fn digest_file(path: &Utf8Path) -> Result<String, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// File-state store backed by a JSON snapshot of content digests.
///
/// Several stores may share one snapshot file; each only prunes entries
/// under its own root.
#[derive(Debug)]
pub struct SnapshotStore {
    root: Utf8PathBuf,
    excluded: Vec<Utf8PathBuf>,
    snapshot_path: Utf8PathBuf,
    snapshot: BTreeMap<Utf8PathBuf, String>,
    observed: BTreeMap<Utf8PathBuf, String>,
    tags: IndexMap<Utf8PathBuf, FileTag>,
}

impl SnapshotStore {
    /// Open the store for the tree under `root`, loading `snapshot_path`
    /// (relative paths are resolved against `root`) when it exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the snapshot exists but cannot be read or
    /// parsed.
    pub fn open(root: &Utf8Path, snapshot: &Utf8Path) -> Result<Self, StoreError> {
        let snapshot_path = root.join(snapshot);
        let entries = match fs::read_to_string(&snapshot_path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| StoreError::Snapshot {
                path: snapshot_path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %snapshot_path, "no snapshot yet; every source is modified");
                BTreeMap::new()
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: snapshot_path,
                    source,
                });
            }
        };
        Ok(Self {
            root: root.to_path_buf(),
            excluded: Vec::new(),
            snapshot_path,
            snapshot: entries,
            observed: BTreeMap::new(),
            tags: IndexMap::new(),
        })
    }

    /// Leave the directories in `dirs` out of the scan, typically the roots
    /// of other projects nested inside this one.
    #[must_use]
    pub fn with_excluded(mut self, dirs: impl IntoIterator<Item = Utf8PathBuf>) -> Self {
        self.excluded.extend(dirs);
        self
    }

    fn is_excluded(&self, entry: &walkdir::DirEntry) -> bool {
        entry.depth() > 0
            && self
                .excluded
                .iter()
                .any(|dir| entry.path() == dir.as_std_path())
    }

    /// Drop entries under this store's root whose files are gone.
    fn prune_missing(&mut self) -> usize {
        let before = self.snapshot.len();
        let root = &self.root;
        self.snapshot
            .retain(|path, _| !path.starts_with(root) || path.is_file());
        before.saturating_sub(self.snapshot.len())
    }

    /// Number of entries in the loaded snapshot.
    #[must_use]
    pub fn snapshot_len(&self) -> usize {
        self.snapshot.len()
    }

    fn write_snapshot(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.snapshot_path.clone(),
            source,
        };
        let dir = self
            .snapshot_path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or(self.root.as_path());
        fs::create_dir_all(dir).map_err(io_err)?;
        let json = serde_json::to_string_pretty(&self.snapshot).map_err(|source| {
            StoreError::Snapshot {
                path: self.snapshot_path.clone(),
                source,
            }
        })?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.persist(&self.snapshot_path)
            .map_err(|err| io_err(err.error))?;
        Ok(())
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

impl FileStateStore for SnapshotStore {
    fn files_with_extension(&self, extension: &str) -> Result<Vec<Utf8PathBuf>, StoreError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry) && !self.is_excluded(entry))
        {
            let dir_entry = entry.map_err(|source| StoreError::Walk {
                root: self.root.clone(),
                source,
            })?;
            if !dir_entry.file_type().is_file() {
                continue;
            }
            let path = Utf8PathBuf::from_path_buf(dir_entry.into_path()).map_err(|raw| {
                StoreError::NonUtf8Path {
                    path: raw.to_string_lossy().into_owned(),
                }
            })?;
            if path.extension() == Some(extension) {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn is_modified(&mut self, path: &Utf8Path) -> Result<bool, StoreError> {
        let digest = digest_file(path)?;
        let modified = self.snapshot.get(path) != Some(&digest);
        self.observed.insert(path.to_path_buf(), digest);
        Ok(modified)
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
            let digest = self
                .observed
                .get(path)
                .cloned()
                .map_or_else(|| digest_file(path), Ok)?;
            self.snapshot.insert(path.clone(), digest);
        }
        let pruned = self.prune_missing();
        self.write_snapshot()?;
        info!(
            entries = updated.len(),
            pruned,
            path = %self.snapshot_path,
            "persisted file-state snapshot"
        );
        Ok(updated.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("utf8 temp path")
    }

    #[test]
    fn digest_is_stable_sha256() {
        let dir = tempdir().expect("temp dir");
        let file = utf8(dir.path()).join("a.sidl");
        fs::write(&file, "").expect("write");
        assert_eq!(
            digest_file(&file).expect("digest"),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn missing_snapshot_marks_everything_modified() {
        let dir = tempdir().expect("temp dir");
        let root = utf8(dir.path());
        fs::write(root.join("a.sidl"), "package a;").expect("write");
        let mut store =
            SnapshotStore::open(&root, Utf8Path::new(".state/state.json")).expect("open");
        assert_eq!(store.snapshot_len(), 0);
        assert!(store.is_modified(&root.join("a.sidl")).expect("check"));
    }

    #[test]
    fn update_persists_only_updated_files() {
        let dir = tempdir().expect("temp dir");
        let root = utf8(dir.path());
        let a = root.join("a.sidl");
        let b = root.join("b.sidl");
        fs::write(&a, "package a;").expect("write");
        fs::write(&b, "package b;").expect("write");
        let snapshot = Utf8Path::new(".state/state.json");

        let mut store = SnapshotStore::open(&root, snapshot).expect("open");
        store.tag(&[a.clone()], FileTag::Updated);
        store.tag(&[b.clone()], FileTag::Stale);
        assert_eq!(store.update().expect("update"), 1);

        let mut reopened = SnapshotStore::open(&root, snapshot).expect("reopen");
        assert!(!reopened.is_modified(&a).expect("check a"));
        assert!(reopened.is_modified(&b).expect("check b"));

        fs::write(&a, "package a2;").expect("rewrite");
        assert!(reopened.is_modified(&a).expect("check a again"));
    }

    #[test]
    fn scan_skips_hidden_directories_and_other_extensions() {
        let dir = tempdir().expect("temp dir");
        let root = utf8(dir.path());
        fs::create_dir_all(root.join(".hidden")).expect("mkdir");
        fs::create_dir_all(root.join("sub")).expect("mkdir");
        fs::write(root.join(".hidden/x.sidl"), "").expect("write");
        fs::write(root.join("sub/y.sidl"), "").expect("write");
        fs::write(root.join("z.txt"), "").expect("write");
        let store = SnapshotStore::open(&root, Utf8Path::new("state.json")).expect("open");
        assert_eq!(
            store.files_with_extension("sidl").expect("scan"),
            vec![root.join("sub/y.sidl")]
        );
    }

    #[test]
    fn edits_during_a_build_stay_modified() {
        let dir = tempdir().expect("temp dir");
        let root = utf8(dir.path());
        let a = root.join("a.sidl");
        fs::write(&a, "package a;").expect("write");
        let snapshot = Utf8Path::new("state.json");

        let mut store = SnapshotStore::open(&root, snapshot).expect("open");
        assert!(store.is_modified(&a).expect("classify"));
        fs::write(&a, "package a; // saved mid-build").expect("edit");
        store.tag(&[a.clone()], FileTag::Updated);
        store.update().expect("update");

        let mut reopened = SnapshotStore::open(&root, snapshot).expect("reopen");
        assert!(reopened.is_modified(&a).expect("check"));
    }

    #[test]
    fn deleted_files_leave_the_snapshot_of_their_root_only() {
        let dir = tempdir().expect("temp dir");
        let base = utf8(dir.path());
        let state = base.join("state.json");
        let a = base.join("p/a.sidl");
        let b = base.join("q/b.sidl");
        for file in [&a, &b] {
            fs::create_dir_all(file.parent().expect("parent")).expect("mkdir");
            fs::write(file, "package x;").expect("write");
        }
        for (root, file) in [(base.join("p"), &a), (base.join("q"), &b)] {
            let mut store = SnapshotStore::open(&root, &state).expect("open");
            store.tag(&[file.clone()], FileTag::Updated);
            store.update().expect("update");
        }
        fs::remove_file(&a).expect("delete");

        let mut other = SnapshotStore::open(&base.join("q"), &state).expect("open q");
        other.update().expect("update q");
        assert_eq!(other.snapshot_len(), 2);

        let mut owner = SnapshotStore::open(&base.join("p"), &state).expect("open p");
        owner.update().expect("update p");
        let reopened = SnapshotStore::open(&base, &state).expect("reopen");
        assert_eq!(reopened.snapshot_len(), 1);
    }

    #[test]
    fn scan_skips_excluded_directories() {
        let dir = tempdir().expect("temp dir");
        let root = utf8(dir.path());
        fs::create_dir_all(root.join("nested/sub")).expect("mkdir");
        fs::write(root.join("top.sidl"), "").expect("write");
        fs::write(root.join("nested/sub/inner.sidl"), "").expect("write");
        let store = SnapshotStore::open(&root, Utf8Path::new("state.json"))
            .expect("open")
            .with_excluded([root.join("nested/sub")]);
        assert_eq!(
            store.files_with_extension("sidl").expect("scan"),
            vec![root.join("top.sidl")]
        );
    }

    #[test]
    fn corrupt_snapshot_is_reported() {
        let dir = tempdir().expect("temp dir");
        let root = utf8(dir.path());
        fs::write(root.join("state.json"), "not json").expect("write");
        let err = SnapshotStore::open(&root, Utf8Path::new("state.json")).expect_err("corrupt");
        assert!(matches!(err, StoreError::Snapshot { .. }));
    }
}
