//! Malformed-fixture diagnostics.
//!
//! Every problem found while scanning a fixture is a [`FixtureError`]. A fixture with one or more errors is
//! reported as a [`MalformedFixture`]: it is excluded from execution, but never aborts the run.
//! `MalformedFixture` implements [`miette::Diagnostic`] with the fixture text attached, so each error renders
//! with a labelled source snippet.

use std::path::{Path, PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};
use svconform_core::{FormatError, LiteralError};
use thiserror::Error;

use crate::scanner::line_of;

/// One problem in a fixture's metadata or directives.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum FixtureError {
    #[error("fixture is not valid UTF-8")]
    #[diagnostic(code(svconform::fixture::encoding))]
    NotUtf8,

    #[error("metadata block has no `:name:` entry")]
    #[diagnostic(
        code(svconform::fixture::missing_name),
        help("add a `:name: <identifier>` line to the header comment")
    )]
    MissingName {
        #[label("metadata block")]
        span: SourceSpan,
    },

    #[error("metadata key `:{key}:` declared more than once")]
    #[diagnostic(code(svconform::fixture::duplicate_key))]
    DuplicateKey {
        key: String,
        #[label("first declared here")]
        first: SourceSpan,
        #[label("declared again here")]
        second: SourceSpan,
    },

    #[error("unknown phase `{token}` in `:type:`")]
    #[diagnostic(
        code(svconform::fixture::unknown_phase),
        help("valid phases are: parsing, elaboration, simulation")
    )]
    UnknownPhase {
        token: String,
        #[label("not a phase")]
        span: SourceSpan,
    },

    #[error("invalid `:timeout:` value `{value}`")]
    #[diagnostic(code(svconform::fixture::timeout), help("use a positive number of seconds"))]
    InvalidTimeout {
        value: String,
        #[label("expected seconds")]
        span: SourceSpan,
    },

    #[error("assertion directive call is never closed")]
    #[diagnostic(code(svconform::directive::unterminated))]
    UnterminatedDirective {
        #[label("call starts here")]
        span: SourceSpan,
    },

    #[error("assertion directive string is never closed")]
    #[diagnostic(code(svconform::directive::unterminated_string))]
    UnterminatedString {
        #[label("string starts here")]
        span: SourceSpan,
    },

    #[error("empty argument in assertion directive")]
    #[diagnostic(code(svconform::directive::empty_argument))]
    EmptyArgument {
        #[label("argument expected")]
        span: SourceSpan,
    },

    #[error("assertion template must be a single string literal")]
    #[diagnostic(code(svconform::directive::template_literal))]
    TemplateNotLiteral {
        #[label("template expression")]
        span: SourceSpan,
    },

    #[error("unsupported literal in assertion directive: {reason}")]
    #[diagnostic(code(svconform::directive::literal))]
    Literal {
        reason: LiteralError,
        #[label("this argument")]
        span: SourceSpan,
    },

    #[error("invalid assertion template: {reason}")]
    #[diagnostic(code(svconform::directive::template))]
    Template {
        reason: FormatError,
        #[label("in this directive")]
        span: SourceSpan,
    },
}

impl FixtureError {
    /// Byte offset the error points at, when it has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            FixtureError::NotUtf8 => None,
            FixtureError::MissingName { span }
            | FixtureError::UnknownPhase { span, .. }
            | FixtureError::InvalidTimeout { span, .. }
            | FixtureError::UnterminatedDirective { span }
            | FixtureError::UnterminatedString { span }
            | FixtureError::EmptyArgument { span }
            | FixtureError::TemplateNotLiteral { span }
            | FixtureError::Literal { span, .. }
            | FixtureError::Template { span, .. } => Some(span.offset()),
            FixtureError::DuplicateKey { second, .. } => Some(second.offset()),
        }
    }
}

/// A fixture that could not be turned into a runnable descriptor.
#[derive(Debug, Error, Diagnostic)]
#[error("malformed fixture `{name}` ({})", .path.display())]
#[diagnostic(code(svconform::fixture::malformed))]
pub struct MalformedFixture {
    /// Declared name, or the name derived from the path when none was declared.
    pub name: String,
    pub path: PathBuf,
    /// Tags declared before the error was found; used for per-tag totals.
    pub tags: Vec<String>,
    #[source_code]
    pub source_code: NamedSource<String>,
    #[related]
    pub errors: Vec<FixtureError>,
    text: String,
}

impl MalformedFixture {
    pub fn new(name: String, path: &Path, source: &str, tags: Vec<String>, errors: Vec<FixtureError>) -> Self {
        Self {
            name,
            path: path.to_path_buf(),
            tags,
            source_code: NamedSource::new(path.display().to_string(), source.to_string()),
            errors,
            text: source.to_string(),
        }
    }

    /// One human-readable reason per error, prefixed with its line when known.
    pub fn reasons(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|err| match err.offset() {
                Some(offset) => format!("line {}: {}", line_of(&self.text, offset), err),
                None => err.to_string(),
            })
            .collect()
    }
}

/// Build a span from a byte range.
pub(crate) fn span(offset: usize, len: usize) -> SourceSpan {
    SourceSpan::from((offset, len))
}
