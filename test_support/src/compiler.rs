//! Compiler doubles that record or reject requests.

use std::cell::RefCell;

use camino::Utf8PathBuf;
use sidlbuild::action::Direction;
use sidlbuild::compiler::{CompileError, CompileRequest, Compiler};
use sidlbuild::language::Language;

/// One compile request as seen by a [`RecordingCompiler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCompile {
    /// Target language.
    pub language: Language,
    /// Server or client generation.
    pub direction: Direction,
    /// Source files, in request order.
    pub sources: Vec<Utf8PathBuf>,
    /// Output directory per source file.
    pub output_dirs: Vec<Utf8PathBuf>,
    /// Repository directories passed along.
    pub repository_dirs: Vec<Utf8PathBuf>,
}

fn record(request: &CompileRequest<'_>) -> RecordedCompile {
    RecordedCompile {
        language: request.language.clone(),
        direction: request.direction,
        sources: request.units.iter().map(|unit| unit.source.clone()).collect(),
        output_dirs: request
            .units
            .iter()
            .map(|unit| unit.output_dir.clone())
            .collect(),
        repository_dirs: request.repository_dirs.to_vec(),
    }
}

/// A compiler that succeeds and remembers every request.
#[derive(Debug, Default)]
pub struct RecordingCompiler {
    calls: RefCell<Vec<RecordedCompile>>,
}

impl RecordingCompiler {
    /// Create a compiler with no recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<RecordedCompile> {
        self.calls.borrow().clone()
    }
}

impl Compiler for RecordingCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), CompileError> {
        self.calls.borrow_mut().push(record(request));
        Ok(())
    }
}

/// A compiler that fails for one language and direction and records the
/// rest.
#[derive(Debug)]
pub struct FailingCompiler {
    language: Language,
    direction: Direction,
    inner: RecordingCompiler,
}

impl FailingCompiler {
    /// Fail every request for `language` in `direction`.
    pub fn new(language: &str, direction: Direction) -> Self {
        Self {
            language: Language::new(language),
            direction,
            inner: RecordingCompiler::new(),
        }
    }

    /// Requests that succeeded.
    pub fn calls(&self) -> Vec<RecordedCompile> {
        self.inner.calls()
    }
}

impl Compiler for FailingCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<(), CompileError> {
        if *request.language == self.language && request.direction == self.direction {
            let source_file = request
                .units
                .first()
                .map(|unit| unit.source.clone())
                .unwrap_or_default();
            return Err(CompileError::Failed {
                source_file,
                language: self.language.clone(),
                direction: self.direction,
                status: "exit status: 1".to_owned(),
                stderr: "syntax error".to_owned(),
            });
        }
        self.inner.compile(request)
    }
}
