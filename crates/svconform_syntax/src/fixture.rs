//! Test-case descriptor assembly.
//!
//! [`extract`] is the Metadata Extractor entry point: header metadata plus body directives, validated together
//! so that every problem in a fixture is reported at once.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use svconform_core::Phase;
use svconform_core::lang::metadata::{self, MetadataKey, ValueShape};
use svconform_core::lang::phases;

use crate::diagnostics::{FixtureError, MalformedFixture, span};
use crate::directive::{AssertionDirective, extract_directives};
use crate::header::{HeaderEntry, parse_header};

/// Everything the harness knows about one fixture. Immutable once extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseDescriptor {
    pub path: PathBuf,
    pub name: String,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
    /// Phases the fixture declares itself valid for. Empty when `:type:` is absent.
    pub declared_types: BTreeSet<Phase>,
    /// Unmodified fixture text.
    pub body: String,
    pub directives: Vec<AssertionDirective>,
    /// Set when the front end is expected to reject the fixture.
    pub should_fail_because: Option<String>,
    pub incdirs: Vec<String>,
    pub defines: Vec<String>,
    pub top_module: Option<String>,
    pub timeout: Option<Duration>,
    /// Header keys the harness does not interpret.
    pub extra: BTreeMap<String, String>,
    /// False for bare fixtures (no `:key:` lines at all).
    pub has_metadata: bool,
}

impl TestCaseDescriptor {
    /// Whether the fixture declared any phase.
    pub fn is_typed(&self) -> bool {
        !self.declared_types.is_empty()
    }

    /// Whether the front end is expected to reject this fixture.
    pub fn expects_rejection(&self) -> bool {
        self.should_fail_because.is_some()
    }

    /// Include directories resolved against the fixture's directory.
    pub fn resolved_incdirs(&self) -> Vec<PathBuf> {
        let base = self.path.parent().unwrap_or_else(|| Path::new(""));
        self.incdirs.iter().map(|dir| base.join(dir)).collect()
    }
}

/// Name used for bare fixtures and for reporting fixtures whose header has no name.
pub fn derived_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extract a descriptor from raw file bytes.
pub fn extract_bytes(path: &Path, bytes: &[u8]) -> Result<TestCaseDescriptor, MalformedFixture> {
    match std::str::from_utf8(bytes) {
        Ok(source) => extract(path, source),
        Err(_) => {
            let lossy = String::from_utf8_lossy(bytes);
            Err(MalformedFixture::new(
                derived_name(path),
                path,
                &lossy,
                Vec::new(),
                vec![FixtureError::NotUtf8],
            ))
        }
    }
}

/// Extract a descriptor from fixture text.
///
/// ## Notes
/// - A fixture with no `:key:` lines is a bare fixture: its name is the file stem and it declares no phases.
/// - A header with keys but no `:name:` is malformed.
/// - Every error found (header and directives) is collected into the returned [`MalformedFixture`].
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn extract(path: &Path, source: &str) -> Result<TestCaseDescriptor, MalformedFixture> {
    let header = parse_header(source);
    let mut errors = Vec::new();

    let mut descriptor = TestCaseDescriptor {
        path: path.to_path_buf(),
        name: String::new(),
        description: None,
        tags: BTreeSet::new(),
        declared_types: BTreeSet::new(),
        body: source.to_string(),
        directives: Vec::new(),
        should_fail_because: None,
        incdirs: Vec::new(),
        defines: Vec::new(),
        top_module: None,
        timeout: None,
        extra: BTreeMap::new(),
        has_metadata: header.has_metadata(),
    };

    let mut seen: BTreeMap<MetadataKey, &HeaderEntry> = BTreeMap::new();
    for entry in &header.entries {
        let Some(key) = metadata::from_str(&entry.key) else {
            descriptor.extra.insert(entry.key.clone(), entry.value.clone());
            continue;
        };

        if key.shape() == ValueShape::Scalar {
            if let Some(first) = seen.get(&key) {
                errors.push(FixtureError::DuplicateKey {
                    key: entry.key.clone(),
                    first: span(first.offset, first.len),
                    second: span(entry.offset, entry.len),
                });
                continue;
            }
            seen.insert(key, entry);
        }

        apply_entry(&mut descriptor, key, entry, &mut errors);
    }

    if descriptor.name.is_empty() {
        if header.has_metadata() {
            errors.push(FixtureError::MissingName {
                span: span(header.start, header.end - header.start),
            });
        }
        descriptor.name = derived_name(path);
    }

    let (directives, directive_errors) = extract_directives(source);
    descriptor.directives = directives;
    errors.extend(directive_errors);

    if !errors.is_empty() {
        tracing::debug!(name = %descriptor.name, errors = errors.len(), "malformed fixture");
        return Err(MalformedFixture::new(
            descriptor.name,
            path,
            source,
            descriptor.tags.into_iter().collect(),
            errors,
        ));
    }

    Ok(descriptor)
}

fn apply_entry(descriptor: &mut TestCaseDescriptor, key: MetadataKey, entry: &HeaderEntry, errors: &mut Vec<FixtureError>) {
    let value = entry.value.as_str();
    let words = value.split_whitespace().map(str::to_string);
    match key {
        MetadataKey::Name => descriptor.name = value.to_string(),
        MetadataKey::Description => descriptor.description = Some(value.to_string()),
        MetadataKey::Tags => descriptor.tags.extend(words),
        MetadataKey::Type => {
            for token in value.split_whitespace() {
                match phases::from_str(token) {
                    Some(phase) => {
                        descriptor.declared_types.insert(phase);
                    }
                    None => errors.push(FixtureError::UnknownPhase {
                        token: token.to_string(),
                        span: token_span(entry, token),
                    }),
                }
            }
        }
        MetadataKey::ShouldFailBecause => descriptor.should_fail_because = Some(value.to_string()),
        MetadataKey::Incdirs => descriptor.incdirs.extend(words),
        MetadataKey::Defines => descriptor.defines.extend(words),
        MetadataKey::TopModule => descriptor.top_module = Some(value.to_string()),
        MetadataKey::Timeout => match value.parse::<f64>().ok().and_then(positive_seconds) {
            Some(timeout) => descriptor.timeout = Some(timeout),
            None => errors.push(FixtureError::InvalidTimeout {
                value: value.to_string(),
                span: span(entry.offset, entry.len),
            }),
        },
    }
}

/// Seconds as a non-zero `Duration`; `None` for NaN, negatives, overflow and sub-nanosecond values.
fn positive_seconds(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok().filter(|d| !d.is_zero())
}

/// Span of `token` inside the entry's line, falling back to the whole entry.
fn token_span(entry: &HeaderEntry, token: &str) -> miette::SourceSpan {
    let value_start = entry.offset + entry.len - entry.value.len();
    let within = entry.value.find(token).unwrap_or(0);
    span(value_start + within, token.len())
}
