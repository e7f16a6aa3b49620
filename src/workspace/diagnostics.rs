//! Diagnostics for workspace manifest parse failures.
//!
//! `serde_saphyr` reports a line and column; these helpers turn that into a
//! [`miette`] source span and attach a hint for common YAML mistakes.

// miette/thiserror derives trip `unused_assignments` on some toolchains only,
// so `#[expect]` cannot be used here.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_saphyr::{Error as YamlError, Location};
use thiserror::Error;

const YAML_HINTS: [(&str, &str); 4] = [
    (
        "did not find expected '-'",
        "Start list items with '-' and ensure proper indentation.",
    ),
    (
        "expected ':'",
        "Ensure each key is followed by ':' separating key and value.",
    ),
    (
        "unknown field",
        "Valid keys are extension, state_file, compiler and projects; projects accept name, root, server, client and depends_on.",
    ),
    (
        "missing field",
        "Every project needs a name and a root, and the compiler needs a command.",
    ),
];

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(sidlbuild::workspace::yaml))]
struct YamlDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("parse error here")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    #[source]
    source: YamlError,
    message: String,
}

/// Byte offset of a one-based `line` and `column` in `src`, clamped to the
/// end of the line or source.
fn byte_index(src: &str, line: u64, column: u64) -> usize {
    let target_line = usize::try_from(line.saturating_sub(1)).unwrap_or(usize::MAX);
    let target_column = usize::try_from(column.saturating_sub(1)).unwrap_or(usize::MAX);
    let mut offset = 0usize;
    for (idx, segment) in src.split_inclusive('\n').enumerate() {
        if idx == target_line {
            let text = segment.trim_end_matches(['\n', '\r']);
            let column_offset = text
                .char_indices()
                .nth(target_column)
                .map_or(text.len(), |(byte_idx, _)| byte_idx);
            return offset + column_offset;
        }
        offset += segment.len();
    }
    src.len()
}

fn to_span(src: &str, loc: Location) -> SourceSpan {
    let at = byte_index(src, loc.line(), loc.column());
    let len = usize::from(src.as_bytes().get(at).is_some_and(|b| *b != b'\n'));
    SourceSpan::new(at.into(), len)
}

fn hint_for(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    YAML_HINTS
        .iter()
        .find(|(needle, _)| lower.contains(*needle))
        .map(|(_, hint)| (*hint).to_owned())
}

/// Wrap a YAML error with the manifest source and a span pointing at it.
pub(super) fn map_yaml_error(
    err: YamlError,
    src: &str,
    name: &str,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let loc = err.location();
    let (line, column, span) = loc.map_or((1, 1, None), |l| {
        (l.line(), l.column(), Some(to_span(src, l)))
    });
    let err_str = err.to_string();
    let help = hint_for(&err_str);
    Box::new(YamlDiagnostic {
        src: NamedSource::new(name, src.to_owned()),
        span,
        help,
        source: err,
        message: format!("YAML parse error at line {line}, column {column}: {err_str}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_index_tracks_lines_and_columns() {
        let src = "a: 1\nbb: 2\n";
        assert_eq!(byte_index(src, 2, 2), 6);
        assert_eq!(byte_index(src, 1, 40), 4);
        assert_eq!(byte_index(src, 9, 1), src.len());
    }

    #[test]
    fn unknown_fields_get_a_hint() {
        let hint = hint_for("unknown field `lang`, expected one of `name`");
        assert!(hint.is_some_and(|h| h.contains("depends_on")));
    }

    #[test]
    fn parse_errors_mention_position() {
        let src = "projects: [";
        let err = serde_saphyr::from_str::<serde_json::Value>(src).expect_err("invalid yaml");
        let diag = map_yaml_error(err, src, "sidlbuild.yml");
        assert!(diag.to_string().starts_with("YAML parse error at line"));
    }
}
