//! Result Aggregator
//!
//! Collects every [`CaseOutcome`] of a run, detects fixtures that share a declared name, tallies totals per
//! status and per tag, and produces a [`Report`] in a deterministic order regardless of completion order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use svconform_core::{CaseStatus, Phase};

use crate::discovery::Corpus;
use crate::outcome::CaseOutcome;

/// Two or more fixtures declaring the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameConflict {
    pub name: String,
    pub paths: Vec<PathBuf>,
}

/// Totals for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    /// Count per status; every status is present, zeros included.
    pub by_status: BTreeMap<CaseStatus, usize>,
    /// Count per tag and status; only statuses that occurred for the tag.
    pub by_tag: BTreeMap<String, BTreeMap<CaseStatus, usize>>,
}

impl Summary {
    pub fn count(&self, status: CaseStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

/// One line of the machine-readable report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseRecord {
    pub name: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    pub status: CaseStatus,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl From<&CaseOutcome> for CaseRecord {
    fn from(outcome: &CaseOutcome) -> Self {
        Self {
            name: outcome.name.clone(),
            path: outcome.path.clone(),
            phase: outcome.phase,
            status: outcome.status,
            reasons: outcome.reasons.clone(),
            exit_code: outcome.exit_code,
            duration_ms: u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Final, ordered result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub summary: Summary,
    pub conflicts: Vec<NameConflict>,
    pub cases: Vec<CaseRecord>,
}

impl Report {
    /// Every case passed or was skipped, and no names conflict.
    pub fn is_success(&self) -> bool {
        self.conflicts.is_empty() && self.cases.iter().all(|c| !c.status.fails_run())
    }

    /// Cases that make the run unsuccessful, in report order.
    pub fn failures(&self) -> impl Iterator<Item = &CaseRecord> {
        self.cases.iter().filter(|c| c.status.fails_run())
    }
}

/// Serializes outcome recording; one instance per run.
#[derive(Debug, Default)]
pub struct Aggregator {
    names: BTreeMap<String, BTreeSet<PathBuf>>,
    outcomes: Vec<CaseOutcome>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note that `path` declares `name`.
    pub fn register(&mut self, name: &str, path: &Path) {
        self.names.entry(name.to_string()).or_default().insert(path.to_path_buf());
    }

    /// Register every fixture of a corpus, well-formed or not.
    pub fn register_corpus(&mut self, corpus: &Corpus) {
        for case in &corpus.cases {
            self.register(&case.name, &case.path);
        }
        for fixture in &corpus.malformed {
            self.register(&fixture.name, &fixture.path);
        }
    }

    /// Record one terminal outcome.
    pub fn record(&mut self, outcome: CaseOutcome) {
        self.register(&outcome.name, &outcome.path);
        self.outcomes.push(outcome);
    }

    /// Outcomes recorded so far, in recording order.
    pub fn outcomes(&self) -> &[CaseOutcome] {
        &self.outcomes
    }

    /// Names declared by more than one fixture.
    pub fn conflicts(&self) -> Vec<NameConflict> {
        self.names
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(name, paths)| NameConflict {
                name: name.clone(),
                paths: paths.iter().cloned().collect(),
            })
            .collect()
    }

    /// Build the sorted report.
    pub fn finish(self) -> Report {
        let conflicts = self.conflicts();
        for conflict in &conflicts {
            tracing::warn!(name = %conflict.name, fixtures = conflict.paths.len(), "duplicate fixture name");
        }

        let mut outcomes = self.outcomes;
        outcomes.sort_by(|a, b| (&a.path, a.phase).cmp(&(&b.path, b.phase)));

        let mut summary = Summary {
            total: outcomes.len(),
            by_status: CaseStatus::ALL.into_iter().map(|s| (s, 0)).collect(),
            by_tag: BTreeMap::new(),
        };
        for outcome in &outcomes {
            *summary.by_status.entry(outcome.status).or_default() += 1;
            for tag in &outcome.tags {
                *summary
                    .by_tag
                    .entry(tag.clone())
                    .or_default()
                    .entry(outcome.status)
                    .or_default() += 1;
            }
        }

        Report {
            summary,
            conflicts,
            cases: outcomes.iter().map(CaseRecord::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use super::*;

    fn outcome(name: &str, path: &str, phase: Option<Phase>, status: CaseStatus, tags: &[&str]) -> CaseOutcome {
        CaseOutcome {
            name: name.to_string(),
            path: PathBuf::from(path),
            phase,
            tags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
            status,
            reasons: Vec::new(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            matched_directives: Vec::new(),
            unmatched_directives: Vec::new(),
            duration: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_report_is_sorted_by_path_then_phase() {
        let mut agg = Aggregator::new();
        agg.record(outcome("b", "z/b.sv", Some(Phase::Simulation), CaseStatus::Pass, &[]));
        agg.record(outcome("a", "a/a.sv", Some(Phase::Simulation), CaseStatus::Pass, &[]));
        agg.record(outcome("b", "z/b.sv", Some(Phase::Parsing), CaseStatus::Pass, &[]));
        let report = agg.finish();

        let order: Vec<_> = report.cases.iter().map(|c| (c.name.as_str(), c.phase)).collect();
        assert_eq!(
            order,
            vec![
                ("a", Some(Phase::Simulation)),
                ("b", Some(Phase::Parsing)),
                ("b", Some(Phase::Simulation)),
            ]
        );
        assert!(report.conflicts.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn test_tallies_cover_every_status_and_tag() {
        let mut agg = Aggregator::new();
        agg.record(outcome("a", "a.sv", Some(Phase::Parsing), CaseStatus::Pass, &["12.5"]));
        agg.record(outcome("b", "b.sv", Some(Phase::Parsing), CaseStatus::Timeout, &["12.5", "16"]));
        agg.record(outcome("c", "c.sv", None, CaseStatus::Skipped, &[]));
        let report = agg.finish();

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.by_status.len(), CaseStatus::ALL.len());
        assert_eq!(report.summary.count(CaseStatus::Pass), 1);
        assert_eq!(report.summary.count(CaseStatus::Fail), 0);
        assert_eq!(report.summary.by_tag["12.5"][&CaseStatus::Timeout], 1);
        assert_eq!(report.summary.by_tag["16"].len(), 1);
        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_duplicate_names_are_reported_not_overwritten() {
        let mut agg = Aggregator::new();
        agg.record(outcome("past_function", "a/past.sv", Some(Phase::Simulation), CaseStatus::Pass, &[]));
        agg.record(outcome("past_function", "b/past.sv", Some(Phase::Simulation), CaseStatus::Pass, &[]));
        let report = agg.finish();

        assert_eq!(report.cases.len(), 2);
        assert_eq!(
            report.conflicts,
            vec![NameConflict {
                name: "past_function".to_string(),
                paths: vec![PathBuf::from("a/past.sv"), PathBuf::from("b/past.sv")],
            }]
        );
        assert!(!report.is_success());
    }

    #[test]
    fn test_skipped_only_run_succeeds() {
        let mut agg = Aggregator::new();
        agg.record(outcome("a", "a.sv", None, CaseStatus::Skipped, &[]));
        assert!(agg.finish().is_success());
        assert!(Aggregator::new().finish().is_success());
    }

    #[test]
    fn test_json_shape() {
        let mut agg = Aggregator::new();
        agg.record(outcome("a", "a.sv", None, CaseStatus::Malformed, &[]));
        let json = serde_json::to_value(agg.finish()).unwrap();
        assert_eq!(json["summary"]["by_status"]["tool-error"], 0);
        assert_eq!(json["cases"][0]["status"], "malformed");
        assert!(json["cases"][0].get("phase").is_none());
        assert_eq!(json["cases"][0]["duration_ms"], 3);
    }
}
