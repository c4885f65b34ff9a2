//! Fixture metadata vocabulary.
//!
//! Fixtures carry a header comment made of `:key: value` lines. This registry names the keys the harness
//! understands; anything else is preserved verbatim by the scanner.

use crate::lang::registry::{self, VocabInfo, info};

/// Marker token that starts every assertion line, both in directive templates and in front-end output.
pub const ASSERT_MARKER: &str = ":assert:";

/// Output primitives whose first string argument may carry an assertion directive.
pub const OUTPUT_PRIMITIVES: &[&str] = &["$display", "$write", "$strobe", "$monitor", "$info"];

/// Stable identifier for recognized metadata keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKey {
    Name,
    Description,
    Tags,
    Type,
    ShouldFailBecause,
    Incdirs,
    Defines,
    TopModule,
    Timeout,
}

/// How the value of a key is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Single value; declaring the key twice is an error.
    Scalar,
    /// Whitespace-separated set; repeated declarations merge.
    List,
}

/// Metadata entry for a key.
pub type MetadataKeyInfo = VocabInfo<MetadataKey>;

/// Registry of recognized metadata keys.
pub const METADATA_KEYS: &[MetadataKeyInfo] = &[
    info(MetadataKey::Name, "name", &[], "Short identifier, unique within a run."),
    info(MetadataKey::Description, "description", &[], "Free text."),
    info(MetadataKey::Tags, "tags", &[], "Selection tags."),
    info(MetadataKey::Type, "type", &[], "Phases the fixture is valid for."),
    info(
        MetadataKey::ShouldFailBecause,
        "should_fail_because",
        &[],
        "The front end is expected to reject the fixture, for the given reason.",
    ),
    info(MetadataKey::Incdirs, "incdirs", &[], "Include directories relative to the fixture."),
    info(MetadataKey::Defines, "defines", &[], "Preprocessor macros as NAME or NAME=VALUE."),
    info(MetadataKey::TopModule, "top_module", &[], "Top-level design unit."),
    info(MetadataKey::Timeout, "timeout", &[], "Per-fixture timeout override in seconds."),
];

impl MetadataKey {
    /// Value interpretation for this key.
    pub fn shape(self) -> ValueShape {
        match self {
            MetadataKey::Tags | MetadataKey::Type | MetadataKey::Incdirs | MetadataKey::Defines => ValueShape::List,
            _ => ValueShape::Scalar,
        }
    }
}

/// Resolve a key spelling to its id.
pub fn from_str(name: &str) -> Option<MetadataKey> {
    registry::lookup(METADATA_KEYS, name)
}

/// Return the canonical spelling for a key.
pub fn as_str(id: MetadataKey) -> &'static str {
    METADATA_KEYS
        .iter()
        .find(|k| k.id == id)
        .map(|k| k.canonical)
        .expect("metadata key info missing")
}
