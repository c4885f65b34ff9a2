//! Processing phase vocabulary.
//!
//! A phase is the depth of processing requested from a front end for one fixture: parse only,
//! parse + elaborate, or parse + elaborate + simulate.

use std::fmt;

use crate::lang::registry::{self, VocabInfo, info};

/// Stable identifier for a processing phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Phase {
    Parsing,
    Elaboration,
    Simulation,
}

/// Metadata entry for a phase.
pub type PhaseInfo = VocabInfo<Phase>;

/// Registry of phases, in increasing processing depth.
pub const PHASES: &[PhaseInfo] = &[
    info(Phase::Parsing, "parsing", &["parse"], "Syntax check only."),
    info(
        Phase::Elaboration,
        "elaboration",
        &["elaborate"],
        "Parse and elaborate the design hierarchy.",
    ),
    info(
        Phase::Simulation,
        "simulation",
        &["simulate"],
        "Parse, elaborate and run the design.",
    ),
];

impl Phase {
    /// All phases in increasing processing depth.
    pub const ALL: [Phase; 3] = [Phase::Parsing, Phase::Elaboration, Phase::Simulation];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(as_str(*self))
    }
}

/// Resolve a phase spelling (canonical or alias) to its id.
pub fn from_str(name: &str) -> Option<Phase> {
    registry::lookup(PHASES, name)
}

/// Return the canonical spelling for a phase.
pub fn as_str(id: Phase) -> &'static str {
    info_for(id).canonical
}

/// Return the metadata entry for a phase.
pub fn info_for(id: Phase) -> &'static PhaseInfo {
    PHASES.iter().find(|p| p.id == id).expect("phase info missing")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_resolve() {
        assert_eq!(from_str("parse"), Some(Phase::Parsing));
        assert_eq!(from_str("elaborate"), Some(Phase::Elaboration));
        assert_eq!(from_str("simulate"), Some(Phase::Simulation));
        assert_eq!(from_str("synthesis"), None);
    }

    #[test]
    fn test_phase_order_is_processing_depth() {
        assert!(Phase::Parsing < Phase::Elaboration);
        assert!(Phase::Elaboration < Phase::Simulation);
    }

    #[test]
    fn test_display_uses_canonical_spelling() {
        assert_eq!(Phase::Elaboration.to_string(), "elaboration");
    }
}
