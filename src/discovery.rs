//! Fixture discovery
//!
//! Walks the given roots, reads every file with a fixture extension and runs the Metadata Extractor on it.
//! Only an inability to enumerate or read the corpus is an error here; malformed fixtures are collected and
//! reported per case.

use std::fs;
use std::path::{Path, PathBuf};

use svconform_syntax::{MalformedFixture, TestCaseDescriptor, extract_bytes};
use thiserror::Error;

/// Errors that make the corpus impossible to enumerate.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("path does not exist: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything found under the discovery roots.
#[derive(Debug, Default)]
pub struct Corpus {
    /// Well-formed fixtures, sorted by path.
    pub cases: Vec<TestCaseDescriptor>,
    /// Fixtures that failed extraction, sorted by path.
    pub malformed: Vec<MalformedFixture>,
}

impl Corpus {
    /// Number of fixture files found.
    pub fn len(&self) -> usize {
        self.cases.len() + self.malformed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Directory names never descended into.
fn is_ignored_dir(name: &str) -> bool {
    name.starts_with('.') || name == "target" || name == "node_modules"
}

/// Collect fixture files under `roots`, sorted and deduplicated.
///
/// A root that is a file is taken as-is, whatever its extension.
pub fn discover_fixture_files(roots: &[PathBuf], is_fixture: &dyn Fn(&Path) -> bool) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            files.push(root.clone());
        } else if root.is_dir() {
            walk(root, is_fixture, &mut files)?;
        } else {
            return Err(DiscoveryError::MissingRoot(root.clone()));
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk(dir: &Path, is_fixture: &dyn Fn(&Path) -> bool, files: &mut Vec<PathBuf>) -> Result<(), DiscoveryError> {
    let io_err = |source| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry_path = entry.map_err(io_err)?.path();
        if entry_path.is_dir() {
            let name = entry_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if !is_ignored_dir(name) {
                walk(&entry_path, is_fixture, files)?;
            }
        } else if is_fixture(&entry_path) {
            files.push(entry_path);
        }
    }
    Ok(())
}

/// Discover and extract every fixture under `roots`.
#[tracing::instrument(skip_all, fields(roots = roots.len()))]
pub fn load_corpus(roots: &[PathBuf], is_fixture: &dyn Fn(&Path) -> bool) -> Result<Corpus, DiscoveryError> {
    let files = discover_fixture_files(roots, is_fixture)?;
    tracing::info!(files = files.len(), "discovered fixture files");

    let mut corpus = Corpus::default();
    for path in files {
        let bytes = fs::read(&path).map_err(|source| DiscoveryError::Io {
            path: path.clone(),
            source,
        })?;
        match extract_bytes(&path, &bytes) {
            Ok(case) => corpus.cases.push(case),
            Err(malformed) => {
                tracing::warn!(path = %path.display(), errors = malformed.errors.len(), "malformed fixture");
                corpus.malformed.push(malformed);
            }
        }
    }

    tracing::info!(cases = corpus.cases.len(), malformed = corpus.malformed.len(), "discovery complete");
    Ok(corpus)
}
