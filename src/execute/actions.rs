//! Execution behaviour of each [`Action`] variant.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use super::{ActionError, ExecContext};
use crate::action::{Action, ClassifyAction, CompileAction, Direction, FileSet, FileTag};
use crate::compiler::{CompileRequest, CompileUnit};

impl Action {
    /// Run this action on the files produced by its predecessors and return
    /// the files handed to its successors.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] when a collaborator fails or a session
    /// bracket is misused.
    pub fn execute(&self, input: FileSet, ctx: &mut ExecContext<'_>) -> Result<FileSet, ActionError> {
        match self {
            Self::GenericTag(classify) => classify_files(classify, input, ctx),
            Self::Tag(tag) => Ok(input.select(|t| tag.input.contains(&t), &tag.root)),
            Self::Open(session) => {
                ctx.sessions.open(session)?;
                Ok(input)
            }
            Self::Compile(compile) => compile_files(compile, input, ctx),
            Self::Close(session) => {
                ctx.sessions.close(session)?;
                Ok(input)
            }
            Self::Update => {
                let written = ctx.store.update()?;
                debug!(written, "file-state snapshot updated");
                Ok(input)
            }
        }
    }
}

fn classify_files(
    classify: &ClassifyAction,
    mut input: FileSet,
    ctx: &mut ExecContext<'_>,
) -> Result<FileSet, ActionError> {
    let mut fresh = Vec::new();
    let mut stale = Vec::new();
    for file in ctx.store.files_with_extension(&classify.extension)? {
        if ctx.store.is_modified(&file)? {
            fresh.push(file);
        } else {
            stale.push(file);
        }
    }
    debug!(
        extension = %classify.extension,
        fresh = fresh.len(),
        stale = stale.len(),
        "classified interface sources"
    );
    ctx.store.tag(&fresh, classify.tag);
    ctx.store.tag(&stale, FileTag::Stale);
    input.merge(
        fresh
            .into_iter()
            .map(|path| (path, classify.tag))
            .chain(stale.into_iter().map(|path| (path, FileTag::Stale)))
            .collect(),
    );
    Ok(input)
}

fn compile_files(
    compile: &CompileAction,
    mut input: FileSet,
    ctx: &mut ExecContext<'_>,
) -> Result<FileSet, ActionError> {
    let sources: Vec<Utf8PathBuf> = match compile.direction {
        Direction::Server => input.with_tag(FileTag::Source).map(ToOwned::to_owned).collect(),
        Direction::Client => input.iter().map(|(path, _)| path.to_owned()).collect(),
    };
    if sources.is_empty() {
        debug!(
            language = %compile.language,
            direction = %compile.direction,
            "nothing to compile"
        );
        return Ok(input);
    }
    let units = sources
        .iter()
        .map(|source| {
            output_dir(compile, &input, source).map(|dir| CompileUnit {
                source: source.clone(),
                output_dir: dir,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let request = CompileRequest {
        language: &compile.language,
        direction: compile.direction,
        project_root: &compile.project_root,
        repository_dirs: &compile.repository_dirs,
        units: &units,
    };
    ctx.compiler.compile(&request)?;
    ctx.store.tag(&sources, FileTag::Updated);
    for source in sources {
        input.insert(source, FileTag::Updated);
    }
    Ok(input)
}

/// The directory a tag step assigned to `source`, else the compile action's
/// own root function.
fn output_dir(
    compile: &CompileAction,
    input: &FileSet,
    source: &Utf8Path,
) -> Result<Utf8PathBuf, ActionError> {
    if let Some(root) = input.get(source).and_then(|file| file.root.clone()) {
        return Ok(root);
    }
    compile
        .output_root
        .as_ref()
        .map(|root| root.resolve(source))
        .ok_or_else(|| ActionError::MissingOutputRoot {
            source_file: source.to_path_buf(),
            language: compile.language.clone(),
        })
}
