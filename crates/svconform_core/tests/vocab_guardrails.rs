use std::collections::HashMap;

use svconform_core::lang::{metadata, phases};

#[test]
fn phase_spellings_unique_and_resolvable() {
    let mut seen: HashMap<&'static str, phases::Phase> = HashMap::new();

    for info in phases::PHASES {
        assert_eq!(
            phases::from_str(info.canonical),
            Some(info.id),
            "phase canonical spelling not resolvable: {}",
            info.canonical
        );
        assert_eq!(phases::as_str(info.id), info.canonical);

        for spelling in std::iter::once(&info.canonical).chain(info.aliases.iter()) {
            if let Some(prev) = seen.insert(spelling, info.id) {
                panic!("duplicate phase spelling {:?}: {:?} and {:?}", spelling, prev, info.id);
            }
        }
    }

    assert_eq!(phases::PHASES.len(), phases::Phase::ALL.len());
}

#[test]
fn metadata_keys_unique_and_resolvable() {
    let mut seen: HashMap<&'static str, metadata::MetadataKey> = HashMap::new();

    for info in metadata::METADATA_KEYS {
        assert_eq!(metadata::from_str(info.canonical), Some(info.id));
        assert_eq!(metadata::as_str(info.id), info.canonical);
        assert!(!info.description.is_empty(), "missing description for {}", info.canonical);
        if let Some(prev) = seen.insert(info.canonical, info.id) {
            panic!("duplicate metadata key {:?}: {:?} and {:?}", info.canonical, prev, info.id);
        }
    }
}

#[test]
fn assert_marker_is_a_metadata_style_token() {
    assert!(metadata::ASSERT_MARKER.starts_with(':') && metadata::ASSERT_MARKER.ends_with(':'));
    assert!(metadata::from_str(metadata::ASSERT_MARKER.trim_matches(':')).is_none());
}
