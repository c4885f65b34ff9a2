//! Terminal case statuses.
//!
//! Every scheduled (fixture, phase) pair and every fixture that never reached the scheduler ends in exactly
//! one of these statuses. Keeping them in one closed enum lets the aggregator's tallies stay exhaustive.

use std::fmt;

/// Final classification of one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CaseStatus {
    /// Front end accepted the fixture and every assertion matched.
    Pass,
    /// Front end ran but an assertion was unmatched, orphaned, or an expected rejection did not happen.
    Fail,
    /// Front end crashed, could not be launched, or exited with an unexpected code.
    ToolError,
    /// The bounded duration elapsed and the process was killed.
    Timeout,
    /// The run was cancelled while the case was queued or running.
    Cancelled,
    /// Metadata or directive syntax is invalid; the fixture never ran.
    Malformed,
    /// Excluded by a tag/name/phase filter.
    Skipped,
}

impl CaseStatus {
    /// All statuses, in report order.
    pub const ALL: [CaseStatus; 7] = [
        CaseStatus::Pass,
        CaseStatus::Fail,
        CaseStatus::ToolError,
        CaseStatus::Timeout,
        CaseStatus::Cancelled,
        CaseStatus::Malformed,
        CaseStatus::Skipped,
    ];

    /// Canonical lowercase spelling used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            CaseStatus::Pass => "pass",
            CaseStatus::Fail => "fail",
            CaseStatus::ToolError => "tool-error",
            CaseStatus::Timeout => "timeout",
            CaseStatus::Cancelled => "cancelled",
            CaseStatus::Malformed => "malformed",
            CaseStatus::Skipped => "skipped",
        }
    }

    /// Whether this status makes the whole run unsuccessful.
    pub fn fails_run(self) -> bool {
        !matches!(self, CaseStatus::Pass | CaseStatus::Skipped)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pass_and_skipped_keep_run_green() {
        let green: Vec<_> = CaseStatus::ALL.into_iter().filter(|s| !s.fails_run()).collect();
        assert_eq!(green, vec![CaseStatus::Pass, CaseStatus::Skipped]);
    }

    #[test]
    fn test_spellings_are_unique() {
        let mut names: Vec<_> = CaseStatus::ALL.iter().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CaseStatus::ALL.len());
    }
}
