//! Reporters
//!
//! The pipeline calls a [`Reporter`] at three points: once the corpus is collected and planned, as each case
//! reaches a terminal status (completion order), and once with the sorted [`Report`]. Presentation lives
//! entirely here; nothing upstream formats text for humans.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use svconform_core::CaseStatus;

use crate::aggregate::{CaseRecord, Report};
use crate::outcome::CaseOutcome;

// ============================================================================
// Reporter Trait
// ============================================================================

/// What the run is about to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Collection {
    /// Fixture files found.
    pub fixtures: usize,
    /// (fixture, phase) pairs scheduled.
    pub requests: usize,
    /// Fixtures excluded by filters or phase policy.
    pub skipped: usize,
    pub malformed: usize,
}

/// Receives run progress.
pub trait Reporter: Send {
    /// Called once discovery and planning are done, before anything runs
    fn on_collection_complete(&mut self, collection: &Collection) -> io::Result<()>;

    /// Called as each case reaches a terminal status
    fn on_case_complete(&mut self, outcome: &CaseOutcome) -> io::Result<()>;

    /// Called with the final, sorted report
    fn on_run_complete(&mut self, report: &Report, elapsed: Duration) -> io::Result<()>;
}

// ============================================================================
// Console Reporter
// ============================================================================

const GREEN: &str = "32";
const RED: &str = "31";
const YELLOW: &str = "33";

fn status_color(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::Pass => GREEN,
        CaseStatus::Skipped | CaseStatus::Cancelled => YELLOW,
        _ => RED,
    }
}

fn progress_char(status: CaseStatus) -> char {
    match status {
        CaseStatus::Pass => '.',
        CaseStatus::Fail => 'F',
        CaseStatus::ToolError => 'E',
        CaseStatus::Timeout => 'T',
        CaseStatus::Cancelled => 'C',
        CaseStatus::Malformed => 'M',
        CaseStatus::Skipped => 's',
    }
}

/// pytest-style progress and summary.
pub struct ConsoleReporter<W: Write + Send = io::Stdout> {
    out: W,
    verbose: bool,
    color: bool,
    progress_open: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            color: true,
            progress_open: false,
        }
    }

    /// Enable or disable ANSI colors
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    fn label(outcome_name: &str, phase: Option<svconform_core::Phase>) -> String {
        match phase {
            Some(phase) => format!("{}[{}]", outcome_name, phase),
            None => outcome_name.to_string(),
        }
    }

    fn end_progress(&mut self) -> io::Result<()> {
        if self.progress_open {
            writeln!(self.out)?;
            self.progress_open = false;
        }
        Ok(())
    }

    fn write_failure(&mut self, case: &CaseRecord) -> io::Result<()> {
        let title = format!("____ {} ____", Self::label(&case.name, case.phase));
        let title = self.paint(&title, RED);
        writeln!(self.out, "{}", title)?;
        writeln!(self.out, "{}: {}", case.path.display(), case.status)?;
        for reason in &case.reasons {
            writeln!(self.out, "  {}", reason)?;
        }
        Ok(())
    }
}

impl<W: Write + Send> Reporter for ConsoleReporter<W> {
    fn on_collection_complete(&mut self, collection: &Collection) -> io::Result<()> {
        if collection.fixtures == 0 {
            return writeln!(self.out, "No fixtures collected");
        }
        writeln!(
            self.out,
            "collected {} fixtures: {} cases to run, {} skipped, {} malformed",
            collection.fixtures, collection.requests, collection.skipped, collection.malformed
        )
    }

    fn on_case_complete(&mut self, outcome: &CaseOutcome) -> io::Result<()> {
        if self.verbose {
            let status = outcome.status.as_str().to_uppercase();
            let status = self.paint(&status, status_color(outcome.status));
            write!(
                self.out,
                "{}::{} {}",
                outcome.path.display(),
                Self::label(&outcome.name, outcome.phase),
                status
            )?;
            match outcome.status {
                CaseStatus::Skipped | CaseStatus::Malformed => {
                    writeln!(self.out, " ({})", outcome.reasons.join("; "))?;
                }
                _ => writeln!(self.out, " ({}ms)", outcome.duration.as_millis())?,
            }
        } else {
            let mark = progress_char(outcome.status).to_string();
            let mark = self.paint(&mark, status_color(outcome.status));
            write!(self.out, "{}", mark)?;
            self.progress_open = true;
        }
        self.out.flush()
    }

    fn on_run_complete(&mut self, report: &Report, elapsed: Duration) -> io::Result<()> {
        self.end_progress()?;

        if !report.conflicts.is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "====== NAME CONFLICTS ======")?;
            for conflict in &report.conflicts {
                let name = self.paint(&conflict.name, RED);
                writeln!(self.out, "{} is declared by:", name)?;
                for path in &conflict.paths {
                    writeln!(self.out, "  {}", path.display())?;
                }
            }
        }

        let failures: Vec<&CaseRecord> = report.failures().collect();
        if !failures.is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "====== FAILURES ======")?;
            for case in failures {
                self.write_failure(case)?;
            }
        }

        let mut parts = Vec::new();
        for status in CaseStatus::ALL {
            let count = report.summary.count(status);
            if count > 0 {
                let part = format!("{} {}", count, status);
                parts.push(self.paint(&part, status_color(status)));
            }
        }
        if !report.conflicts.is_empty() {
            let part = format!("{} name conflicts", report.conflicts.len());
            parts.push(self.paint(&part, RED));
        }
        if parts.is_empty() {
            parts.push("no cases".to_string());
        }

        writeln!(self.out)?;
        writeln!(
            self.out,
            "====== {} in {:.2}s ======",
            parts.join(", "),
            elapsed.as_secs_f64()
        )?;
        self.out.flush()
    }
}

// ============================================================================
// JSON Reporter
// ============================================================================

/// Writes the report as pretty JSON once the run completes.
#[derive(Debug, Default)]
pub struct JsonReporter {
    /// Destination file; stdout when `None`.
    output: Option<PathBuf>,
}

impl JsonReporter {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }

    fn write_to(writer: impl Write, report: &Report) -> io::Result<()> {
        let mut writer = BufWriter::new(writer);
        serde_json::to_writer_pretty(&mut writer, report)?;
        writeln!(writer)?;
        writer.flush()
    }
}

impl Reporter for JsonReporter {
    fn on_collection_complete(&mut self, collection: &Collection) -> io::Result<()> {
        tracing::info!(
            fixtures = collection.fixtures,
            requests = collection.requests,
            skipped = collection.skipped,
            malformed = collection.malformed,
            "collection complete"
        );
        Ok(())
    }

    fn on_case_complete(&mut self, _outcome: &CaseOutcome) -> io::Result<()> {
        Ok(())
    }

    fn on_run_complete(&mut self, report: &Report, _elapsed: Duration) -> io::Result<()> {
        match &self.output {
            Some(path) => {
                tracing::debug!(path = %path.display(), "writing JSON report");
                Self::write_to(File::create(path)?, report)
            }
            None => Self::write_to(io::stdout().lock(), report),
        }
    }
}
