//! Harness vocabulary registries.
//!
//! This module is the “front door” for fixture-level vocabulary: processing phases, metadata keys and the
//! assertion marker protocol.
//!
//! Callers work with **stable IDs** (`Phase`, `MetadataKey`) and look up spellings/metadata via registry
//! tables instead of scattering string comparisons across the scanner, the config loader and the CLI.
//!
//! ## Examples
//! ```rust
//! use svconform_core::lang::phases::{self, Phase};
//!
//! assert_eq!(phases::from_str("simulation"), Some(Phase::Simulation));
//! assert_eq!(phases::as_str(Phase::Parsing), "parsing");
//! ```

pub mod metadata;
pub mod phases;
pub mod registry;
