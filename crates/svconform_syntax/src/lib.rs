//! Fixture scanning for the svconform harness: metadata headers, assertion directives, diagnostics.
//!
//! This crate turns the raw text of one HDL fixture into a [`TestCaseDescriptor`]. It never executes
//! anything and never interprets HDL semantics; it only scans text.
//!
//! ## Notes
//! - Comments and string literals are tracked so directives inside comments are ignored.
//! - Vocabulary (metadata keys, phases, the `:assert:` marker) comes from `svconform_core::lang`.
//!
//! ## Examples
//! ```rust
//! use std::path::Path;
//! use svconform_syntax::extract;
//!
//! let source = "/*\n:name: smoke\n:type: parsing\n*/\nmodule top; endmodule\n";
//! let case = extract(Path::new("smoke.sv"), source).unwrap();
//! assert_eq!(case.name, "smoke");
//! assert!(case.directives.is_empty());
//! ```

pub mod diagnostics;
pub mod directive;
pub mod fixture;
pub mod header;
pub mod scanner;

pub use diagnostics::{FixtureError, MalformedFixture};
pub use directive::AssertionDirective;
pub use fixture::{TestCaseDescriptor, derived_name, extract, extract_bytes};
