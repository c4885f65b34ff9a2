//! Provide shared, pure vocabulary and rendering semantics for the svconform harness.
//!
//! This crate is intentionally small and dependency-free. It contains deterministic helpers that both:
//! - the fixture scanner uses to recognize metadata keys, phases and assertion directives, and
//! - the harness uses to render directive templates exactly the way a front end prints them.
//!
//! ## Notes
//!
//! - This is a “semantic core” crate: **no IO**, no global state, no async, no process handling.
//! - Current scope: phase and metadata vocabulary, terminal case statuses, 4-state logic literals and
//!   printf-style template rendering with explicit coercion rules.

pub mod format;
pub mod lang;
pub mod logic;
pub mod status;

pub use format::{
    Arg, CoercionRules, FormatError, Piece, Placeholder, PlaceholderKind, RenderedLine, Segment, SymbolicPolicy, Template,
};
pub use lang::metadata::ASSERT_MARKER;
pub use lang::phases::Phase;
pub use logic::{Bit, LiteralError, LogicValue};
pub use status::CaseStatus;
