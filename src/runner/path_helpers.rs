//! Path resolution helpers for the runner module.

use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};

use super::RunnerError;
use crate::cli::Cli;

fn utf8(path: &Path) -> Result<Utf8PathBuf, RunnerError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|raw| RunnerError::NonUtf8Path { path: raw })
}

/// Determine the manifest path respecting the CLI's directory option.
///
/// # Errors
///
/// Returns [`RunnerError::NonUtf8Path`] when the CLI `file` or `directory`
/// paths are not valid UTF-8.
pub(super) fn resolve_manifest_path(cli: &Cli) -> Result<Utf8PathBuf, RunnerError> {
    let file = utf8(&cli.file)?;
    match &cli.directory {
        Some(dir) => Ok(utf8(dir)?.join(file)),
        None => Ok(file),
    }
}

pub(super) fn ensure_manifest_exists(manifest_path: &Utf8Path) -> Result<(), RunnerError> {
    if manifest_path.is_file() {
        Ok(())
    } else {
        Err(RunnerError::ManifestNotFound {
            path: manifest_path.as_std_path().to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn directory_option_prefixes_manifest() {
        let cli = Cli {
            directory: Some(PathBuf::from("work")),
            ..Cli::default()
        };
        assert_eq!(
            resolve_manifest_path(&cli).expect("utf8"),
            Utf8PathBuf::from("work/sidlbuild.yml")
        );
    }

    #[test]
    fn missing_manifest_is_reported() {
        let err = ensure_manifest_exists(Utf8Path::new("does/not/exist.yml"))
            .expect_err("missing manifest");
        assert!(matches!(err, RunnerError::ManifestNotFound { .. }));
    }
}
