#![deny(unsafe_code)]
//! svconform: conformance test harness for HDL front ends
//!
//! Discovers annotated HDL fixtures, extracts their metadata and embedded `:assert:` directives, drives each
//! (fixture, phase) pair through an external parser, elaborator, or simulator, and classifies the result by
//! comparing what the front end printed against what the fixture declared.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Per-case failures**: Never `Err`. A crashed, hung, or malformed case becomes a status on its outcome; only
//!   configuration, corpus enumeration, and report output are fatal to a run.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod matcher;
pub mod outcome;
pub mod report;
pub mod request;
pub mod runner;
pub mod scheduler;
pub mod suite;

pub use aggregate::{Aggregator, NameConflict, Report};
pub use config::{FrontendProfile, HarnessConfig, PhaseProfile, UntypedPolicy};
pub use error::{HarnessError, HarnessResult};
pub use outcome::CaseOutcome;
pub use request::{ExecutionRequest, Selection};
pub use runner::{CaseExecutor, ProcessExecutor};
pub use suite::{SuiteOptions, run_suite};

pub use svconform_core::{CaseStatus, Phase};
pub use svconform_syntax::{AssertionDirective, TestCaseDescriptor};
