//! Run pipeline
//!
//! `filesystem → discovery → plan → scheduler (runner + matcher) → aggregator → reporter`.
//!
//! ## Notes
//!
//! - Malformed and skipped fixtures are recorded before anything is dispatched; they never reach a worker.
//! - Only configuration, corpus enumeration, and report output can fail the whole run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use svconform_core::CaseStatus;
use tokio::sync::watch;

use crate::aggregate::{Aggregator, Report};
use crate::config::HarnessConfig;
use crate::discovery::load_corpus;
use crate::error::HarnessResult;
use crate::outcome::CaseOutcome;
use crate::report::{Collection, Reporter};
use crate::request::{Selection, plan};
use crate::runner::CaseExecutor;
use crate::scheduler::Scheduler;

/// What to run.
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    /// Files or directories to discover fixtures under.
    pub roots: Vec<PathBuf>,
    pub selection: Selection,
    /// Front-end profile name; the configured default when `None`.
    pub frontend: Option<String>,
}

impl SuiteOptions {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            selection: Selection::default(),
            frontend: None,
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_frontend(mut self, frontend: impl Into<String>) -> Self {
        self.frontend = Some(frontend.into());
        self
    }
}

/// Run the whole suite and return the sorted report.
#[tracing::instrument(skip_all, fields(roots = options.roots.len()))]
pub async fn run_suite<E: CaseExecutor>(
    config: &HarnessConfig,
    options: &SuiteOptions,
    executor: E,
    reporter: &mut dyn Reporter,
    cancel: watch::Receiver<bool>,
) -> HarnessResult<Report> {
    let start = Instant::now();
    let (frontend, profile) = config.frontend(options.frontend.as_deref())?;
    tracing::debug!(frontend, program = %profile.program, "front end selected");

    let corpus = load_corpus(&options.roots, &|path: &Path| config.is_fixture(path))?;
    let mut aggregator = Aggregator::new();
    aggregator.register_corpus(&corpus);

    let mut early = Vec::new();
    for fixture in &corpus.malformed {
        let tags = fixture.tags.iter().cloned().collect();
        let mut outcome = CaseOutcome::malformed(fixture);
        if let Some(reason) = options.selection.exclusion(&fixture.name, &tags) {
            outcome.status = CaseStatus::Skipped;
            outcome.reasons = vec![reason];
        }
        early.push(outcome);
    }

    let fixtures = corpus.len();
    let cases: Vec<_> = corpus.cases.into_iter().map(Arc::new).collect();
    let run_plan = plan(&cases, &options.selection, config, profile);
    early.extend(run_plan.skipped.iter().map(CaseOutcome::skipped));

    reporter.on_collection_complete(&Collection {
        fixtures,
        requests: run_plan.requests.len(),
        skipped: early.iter().filter(|o| o.status == CaseStatus::Skipped).count(),
        malformed: early.iter().filter(|o| o.status == CaseStatus::Malformed).count(),
    })?;
    for outcome in early {
        reporter.on_case_complete(&outcome)?;
        aggregator.record(outcome);
    }

    let scheduler = Scheduler::new(executor, config.worker_count());
    let mut report_error = None;
    let outcomes = scheduler
        .run(run_plan.requests, cancel, &mut |outcome: &CaseOutcome| {
            if report_error.is_none() {
                if let Err(err) = reporter.on_case_complete(outcome) {
                    tracing::warn!(error = %err, "progress output failed");
                    report_error = Some(err);
                }
            }
        })
        .await;
    for outcome in outcomes {
        aggregator.record(outcome);
    }

    let report = aggregator.finish();
    tracing::info!(
        total = report.summary.total,
        failed = report.failures().count(),
        conflicts = report.conflicts.len(),
        "run complete"
    );
    reporter.on_run_complete(&report, start.elapsed())?;
    Ok(report)
}
