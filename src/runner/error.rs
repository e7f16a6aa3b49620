//! Error types for the runner module.
//!
//! Kept apart so the lint suppression for derive-macro expansion stays
//! narrowly scoped.

// miette/thiserror derives trip `unused_assignments` on some toolchains only,
// so `#[expect]` cannot be used here.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The manifest file does not exist at the expected path.
    #[error("workspace manifest {} not found", path.display())]
    #[diagnostic(
        code(sidlbuild::runner::manifest_not_found),
        help("create the manifest or pass its location with --file")
    )]
    ManifestNotFound {
        /// The path that was attempted.
        path: PathBuf,
    },
    /// A path given on the command line is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", path.display())]
    #[diagnostic(code(sidlbuild::runner::non_utf8_path))]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },
    /// At least one build action did not complete.
    #[error("build of project `{project}` failed: {failed} failed, {skipped} skipped")]
    #[diagnostic(code(sidlbuild::runner::build_failed))]
    BuildFailed {
        /// Project whose build failed.
        project: String,
        /// Number of failed actions.
        failed: usize,
        /// Number of actions skipped because a dependency failed.
        skipped: usize,
    },
}
