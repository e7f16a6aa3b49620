//! Interface compiler contract and a command-line implementation.
//!
//! The executor hands every compile vertex's work to a [`Compiler`] as a
//! [`CompileRequest`]. [`CommandCompiler`] runs an external program once per
//! source file, expanding placeholders in a configured command template.

use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::action::Direction;
use crate::language::Language;

/// Errors reported by a [`Compiler`].
#[derive(Debug, Error)]
pub enum CompileError {
    /// The command template expands to nothing.
    #[error("compiler command is empty")]
    EmptyCommand,
    /// The command template cannot be split into arguments.
    #[error("compiler command has unbalanced quoting: {template}")]
    InvalidTemplate {
        /// The offending template.
        template: String,
    },
    /// The compiler process could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program being started.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The compiler exited unsuccessfully.
    #[error("compiling {source_file} for {language} {direction} failed ({status}): {stderr}")]
    Failed {
        /// Source file being compiled.
        source_file: Utf8PathBuf,
        /// Target language.
        language: Language,
        /// Server or client generation.
        direction: Direction,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },
}

/// A single source file and where its generated code goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    /// Interface source file.
    pub source: Utf8PathBuf,
    /// Directory receiving the generated code.
    pub output_dir: Utf8PathBuf,
}

/// Everything a compiler needs for one language and direction.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// Target language.
    pub language: &'a Language,
    /// Server or client generation.
    pub direction: Direction,
    /// Root of the project being compiled.
    pub project_root: &'a Utf8Path,
    /// Roots of depended-upon projects whose interfaces must be visible.
    pub repository_dirs: &'a [Utf8PathBuf],
    /// Files to compile.
    pub units: &'a [CompileUnit],
}

/// Generates code from interface definitions.
pub trait Compiler {
    /// Compile every unit of `request`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] when code generation fails for any unit.
    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), CompileError>;
}

/// Runs an external compiler described by a command template.
///
/// Placeholders: `{language}`, `{direction}`, `{project}`, `{output}`,
/// `{source}`, and `{repository}`. The last expands to one
/// `repository_flag` argument per repository directory, where the flag's
/// `{dir}` placeholder receives the directory.
///
/// ```
/// use sidlbuild::compiler::CommandCompiler;
///
/// let compiler = CommandCompiler::new("babel --{direction}={language} {repository} {source}");
/// assert_eq!(compiler.template(), "babel --{direction}={language} {repository} {source}");
/// ```
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    template: String,
    repository_flag: String,
}

/// Default expansion of each repository directory.
pub const DEFAULT_REPOSITORY_FLAG: &str = "-R{dir}";

impl CommandCompiler {
    /// Create a compiler from `template` with the default repository flag.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            repository_flag: DEFAULT_REPOSITORY_FLAG.into(),
        }
    }

    /// Use `flag` to pass each repository directory.
    #[must_use]
    pub fn with_repository_flag(mut self, flag: impl Into<String>) -> Self {
        self.repository_flag = flag.into();
        self
    }

    /// The command template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Expand the template into program arguments for `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidTemplate`] for unbalanced quoting and
    /// [`CompileError::EmptyCommand`] when nothing remains after expansion.
    pub fn command_line(
        &self,
        request: &CompileRequest<'_>,
        unit: &CompileUnit,
    ) -> Result<Vec<String>, CompileError> {
        let words = shlex::split(&self.template).ok_or_else(|| CompileError::InvalidTemplate {
            template: self.template.clone(),
        })?;
        let mut args = Vec::with_capacity(words.len());
        for word in words {
            if word == "{repository}" {
                args.extend(
                    request
                        .repository_dirs
                        .iter()
                        .map(|dir| self.repository_flag.replace("{dir}", dir.as_str())),
                );
                continue;
            }
            args.push(
                word.replace("{language}", request.language.as_str())
                    .replace("{direction}", &request.direction.to_string())
                    .replace("{project}", request.project_root.as_str())
                    .replace("{output}", unit.output_dir.as_str())
                    .replace("{source}", unit.source.as_str()),
            );
        }
        if args.is_empty() {
            return Err(CompileError::EmptyCommand);
        }
        Ok(args)
    }

    fn run_unit(&self, request: &CompileRequest<'_>, unit: &CompileUnit) -> Result<(), CompileError> {
        let args = self.command_line(request, unit)?;
        let Some((program, rest)) = args.split_first() else {
            return Err(CompileError::EmptyCommand);
        };
        info!(
            "Running command: {} {}",
            program,
            redact_sensitive_args(rest).join(" ")
        );
        let output = Command::new(program)
            .args(rest)
            .current_dir(request.project_root)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CompileError::Spawn {
                program: program.clone(),
                source,
            })?;
        if output.status.success() {
            debug!(source = %unit.source, output = %unit.output_dir, "compiled");
            Ok(())
        } else {
            Err(CompileError::Failed {
                source_file: unit.source.clone(),
                language: request.language.clone(),
                direction: request.direction,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

impl Compiler for CommandCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), CompileError> {
        for unit in request.units {
            self.run_unit(request, unit)?;
        }
        Ok(())
    }
}

/// Check if `arg` contains a sensitive keyword.
fn contains_sensitive_keyword(arg: &str) -> bool {
    let lower = arg.to_lowercase();
    lower.contains("password") || lower.contains("token") || lower.contains("secret")
}

/// Redact sensitive information in a single argument.
///
/// Sensitive values are replaced with `***REDACTED***`, preserving keys.
fn redact_argument(arg: &str) -> String {
    if contains_sensitive_keyword(arg) {
        arg.split_once('=').map_or_else(
            || "***REDACTED***".to_owned(),
            |(key, _)| format!("{key}=***REDACTED***"),
        )
    } else {
        arg.to_owned()
    }
}

fn redact_sensitive_args(args: &[String]) -> Vec<String> {
    args.iter().map(|arg| redact_argument(arg)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(
        language: &'a Language,
        repository_dirs: &'a [Utf8PathBuf],
        units: &'a [CompileUnit],
    ) -> CompileRequest<'a> {
        CompileRequest {
            language,
            direction: Direction::Server,
            project_root: Utf8Path::new("/ws/app"),
            repository_dirs,
            units,
        }
    }

    #[test]
    fn expands_placeholders_and_repository_flags() {
        let language = Language::new("cxx");
        let repos = vec![Utf8PathBuf::from("/ws/core"), Utf8PathBuf::from("/ws/util")];
        let unit = CompileUnit {
            source: Utf8PathBuf::from("/ws/app/solver.sidl"),
            output_dir: Utf8PathBuf::from("/ws/app/server-cxx-solver"),
        };
        let units = [unit.clone()];
        let compiler = CommandCompiler::new(
            "babel --{direction}={language} --output-directory='{output}' {repository} {source}",
        );
        let args = compiler
            .command_line(&request(&language, &repos, &units), &unit)
            .expect("expand");
        assert_eq!(
            args,
            vec![
                "babel",
                "--server=cxx",
                "--output-directory=/ws/app/server-cxx-solver",
                "-R/ws/core",
                "-R/ws/util",
                "/ws/app/solver.sidl",
            ]
        );
    }

    #[test]
    fn custom_repository_flag() {
        let language = Language::new("python");
        let repos = vec![Utf8PathBuf::from("/ws/core")];
        let unit = CompileUnit {
            source: Utf8PathBuf::from("a.sidl"),
            output_dir: Utf8PathBuf::from("out"),
        };
        let units = [unit.clone()];
        let compiler = CommandCompiler::new("babel {repository}").with_repository_flag("--repository={dir}");
        let args = compiler
            .command_line(&request(&language, &repos, &units), &unit)
            .expect("expand");
        assert_eq!(args, vec!["babel", "--repository=/ws/core"]);
    }

    #[test]
    fn unbalanced_quotes_are_rejected() {
        let language = Language::new("cxx");
        let unit = CompileUnit {
            source: Utf8PathBuf::from("a.sidl"),
            output_dir: Utf8PathBuf::from("out"),
        };
        let units = [unit.clone()];
        let err = CommandCompiler::new("babel 'oops")
            .command_line(&request(&language, &[], &units), &unit)
            .expect_err("invalid");
        assert!(matches!(err, CompileError::InvalidTemplate { .. }));
    }

    #[test]
    fn empty_template_is_rejected() {
        let language = Language::new("cxx");
        let unit = CompileUnit {
            source: Utf8PathBuf::from("a.sidl"),
            output_dir: Utf8PathBuf::from("out"),
        };
        let units = [unit.clone()];
        let err = CommandCompiler::new("   ")
            .command_line(&request(&language, &[], &units), &unit)
            .expect_err("empty");
        assert!(matches!(err, CompileError::EmptyCommand));
    }

    #[test]
    fn redacts_sensitive_arguments() {
        assert_eq!(redact_argument("token=abc"), "token=***REDACTED***");
        assert_eq!(redact_argument("path=/tmp"), "path=/tmp");
        assert_eq!(redact_argument("secret"), "***REDACTED***");
    }
}
