//! Test utilities for sidlbuild.
//!
//! In-memory stand-ins for the file-state store and the compiler, plus
//! helpers for laying out throwaway workspaces with a fake compiler script.

pub mod compiler;
pub mod store;

pub use compiler::{FailingCompiler, RecordedCompile, RecordingCompiler};
pub use store::MemoryStore;

use std::fs::{self, File};
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// Convert a temporary directory path to UTF-8.
pub fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp path")
}

/// Create a fake compiler script in `dir` that appends its arguments to
/// `calls.log` next to it and exits with `exit_code`.
///
/// Returns the path to the executable.
pub fn fake_compiler(dir: &Utf8Path, exit_code: i32) -> Utf8PathBuf {
    let path = dir.join("fake-babel");
    let log = dir.join("calls.log");
    let mut file = File::create(&path).expect("script");
    writeln!(file, "#!/bin/sh\necho \"$@\" >> '{log}'\nexit {exit_code}").expect("write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path).expect("meta").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("perms");
    }
    path
}

/// Lines logged by a [`fake_compiler`] in `dir`, or nothing if it never ran.
pub fn compiler_calls(dir: &Utf8Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .map(|log| log.lines().map(str::to_owned).collect())
        .unwrap_or_default()
}

/// Write `contents` to `dir/relative`, creating parent directories.
pub fn write_file(dir: &Utf8Path, relative: &str, contents: &str) -> Utf8PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(&path, contents).expect("write file");
    path
}
