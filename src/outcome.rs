//! Case outcomes
//!
//! A [`CaseOutcome`] is the terminal record for one scheduled request, or for one fixture that never reached
//! the scheduler (malformed or skipped).

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use svconform_core::{CaseStatus, Phase};
use svconform_syntax::{MalformedFixture, TestCaseDescriptor};

use crate::request::{ExecutionRequest, SkippedCase};

/// Result of one execution request (or of a fixture that was never executed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub name: String,
    pub path: PathBuf,
    /// `None` for fixtures that were never scheduled.
    pub phase: Option<Phase>,
    pub tags: BTreeSet<String>,
    pub status: CaseStatus,
    /// Why the status is not `pass`; empty for passing cases.
    pub reasons: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    /// Indices into the descriptor's directives that claimed a runtime line.
    pub matched_directives: Vec<usize>,
    /// Indices into the descriptor's directives that claimed nothing.
    pub unmatched_directives: Vec<usize>,
    pub duration: Duration,
}

impl CaseOutcome {
    fn blank(case: &TestCaseDescriptor, phase: Option<Phase>, status: CaseStatus) -> Self {
        Self {
            name: case.name.clone(),
            path: case.path.clone(),
            phase,
            tags: case.tags.clone(),
            status,
            reasons: Vec::new(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            matched_directives: Vec::new(),
            unmatched_directives: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Outcome for a request, with the status still to be decided.
    pub fn for_request(request: &ExecutionRequest, status: CaseStatus) -> Self {
        Self::blank(&request.case, Some(request.phase), status)
    }

    /// A fixture excluded by filters or phase policy.
    pub fn skipped(skipped: &SkippedCase) -> Self {
        let mut outcome = Self::blank(&skipped.case, None, CaseStatus::Skipped);
        outcome.reasons.push(skipped.reason.clone());
        outcome
    }

    /// A request that never started because the run was cancelled.
    pub fn cancelled_before_start(request: &ExecutionRequest) -> Self {
        let mut outcome = Self::for_request(request, CaseStatus::Cancelled);
        outcome.reasons.push("run cancelled before the case started".to_string());
        outcome
    }

    /// A fixture that failed extraction.
    pub fn malformed(fixture: &MalformedFixture) -> Self {
        Self {
            name: fixture.name.clone(),
            path: fixture.path.clone(),
            phase: None,
            tags: fixture.tags.iter().cloned().collect(),
            status: CaseStatus::Malformed,
            reasons: fixture.reasons(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            matched_directives: Vec::new(),
            unmatched_directives: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Attach a reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }
}
