//! Assertion Matcher
//!
//! Decides a request's final status from the runner's output: the exit judgment first, then (when the phase
//! checks assertions and the fixture declares directives) a one-to-one matching between directives and the
//! `:assert:` lines the front end printed.
//!
//! ## Notes
//!
//! - Every directive must claim exactly one runtime line and every runtime `:assert:` line must be claimed.
//! - The matching is a maximum bipartite matching, so a loose (wildcard) directive never takes a line that a
//!   stricter directive needed.
//! - Lines are split on `\n`; a trailing `\r` is dropped before comparison.

use svconform_core::{ASSERT_MARKER, CaseStatus, CoercionRules, RenderedLine};
use svconform_syntax::AssertionDirective;

use crate::outcome::CaseOutcome;
use crate::request::ExecutionRequest;
use crate::runner::{ExitJudgment, ProcessExit, RunOutput, judge_exit};

/// Result of matching directives against runtime output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// (directive index, runtime line index) pairs.
    pub pairs: Vec<(usize, usize)>,
    /// Directives that claimed no runtime line.
    pub unmatched: Vec<usize>,
    /// Runtime `:assert:` lines no directive claimed.
    pub orphans: Vec<String>,
    /// Problems rendering a directive, by directive index.
    pub render_errors: Vec<(usize, String)>,
}

impl MatchReport {
    /// Every directive matched and no orphan line remains.
    pub fn is_clean(&self) -> bool {
        self.unmatched.is_empty() && self.orphans.is_empty() && self.render_errors.is_empty()
    }
}

/// Lines of `stdout` that begin with the `:assert:` marker.
pub fn assertion_lines(stdout: &str) -> Vec<&str> {
    stdout
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| line.starts_with(ASSERT_MARKER))
        .collect()
}

/// Match `directives` one-to-one against the `:assert:` lines in `stdout`.
pub fn match_directives(directives: &[AssertionDirective], stdout: &str, rules: &CoercionRules) -> MatchReport {
    let lines = assertion_lines(stdout);
    let mut report = MatchReport::default();

    let mut rendered: Vec<Option<RenderedLine>> = Vec::with_capacity(directives.len());
    for (idx, directive) in directives.iter().enumerate() {
        match directive.render(rules) {
            Ok(line) => rendered.push(Some(line)),
            Err(err) => {
                report.render_errors.push((idx, err.to_string()));
                rendered.push(None);
            }
        }
    }

    let candidates: Vec<Vec<usize>> = rendered
        .iter()
        .map(|r| match r {
            Some(expected) => (0..lines.len()).filter(|&l| expected.matches(lines[l])).collect(),
            None => Vec::new(),
        })
        .collect();

    let owner = maximum_matching(&candidates, lines.len());

    let mut claimed_by: Vec<Option<usize>> = vec![None; directives.len()];
    for (line, directive) in owner.iter().enumerate() {
        if let Some(d) = directive {
            claimed_by[*d] = Some(line);
        }
    }

    for (d, line) in claimed_by.iter().enumerate() {
        match line {
            Some(l) => report.pairs.push((d, *l)),
            None if rendered[d].is_some() => report.unmatched.push(d),
            None => {}
        }
    }
    report.orphans = owner
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_none())
        .map(|(l, _)| lines[l].to_string())
        .collect();
    report
}

/// Maximum bipartite matching (augmenting paths). Returns, per line, the directive that owns it.
fn maximum_matching(candidates: &[Vec<usize>], line_count: usize) -> Vec<Option<usize>> {
    fn augment(d: usize, candidates: &[Vec<usize>], owner: &mut [Option<usize>], visited: &mut [bool]) -> bool {
        for &line in &candidates[d] {
            if visited[line] {
                continue;
            }
            visited[line] = true;
            let free = match owner[line] {
                None => true,
                Some(other) => augment(other, candidates, owner, visited),
            };
            if free {
                owner[line] = Some(d);
                return true;
            }
        }
        false
    }

    let mut owner = vec![None; line_count];
    for d in 0..candidates.len() {
        let mut visited = vec![false; line_count];
        augment(d, candidates, &mut owner, &mut visited);
    }
    owner
}

fn expected_text(directive: &AssertionDirective, rules: &CoercionRules) -> String {
    directive
        .render(rules)
        .map(|line| line.to_string())
        .unwrap_or_else(|_| directive.template.source().to_string())
}

/// Classify one request from what the runner observed.
pub fn decide(request: &ExecutionRequest, output: RunOutput) -> CaseOutcome {
    let mut outcome = CaseOutcome::for_request(request, CaseStatus::Pass);
    outcome.duration = output.duration;

    let code = match &output.exit {
        ProcessExit::Exited(code) => {
            outcome.exit_code = Some(*code);
            Some(*code)
        }
        ProcessExit::Crashed { signal } => {
            outcome.status = CaseStatus::ToolError;
            outcome.reasons.push(match signal {
                Some(sig) => format!("front end terminated by signal {}", sig),
                None => "front end terminated without an exit code".to_string(),
            });
            None
        }
        ProcessExit::TimedOut => {
            outcome.status = CaseStatus::Timeout;
            outcome
                .reasons
                .push(format!("exceeded timeout of {:.1}s; process killed", request.timeout.as_secs_f64()));
            None
        }
        ProcessExit::Cancelled => {
            outcome.status = CaseStatus::Cancelled;
            outcome.reasons.push("run cancelled; process killed".to_string());
            None
        }
        ProcessExit::LaunchFailed(reason) => {
            outcome.status = CaseStatus::ToolError;
            outcome.reasons.push(reason.clone());
            None
        }
    };

    if let Some(code) = code {
        let case = &request.case;
        match (judge_exit(code, &request.accept_exit_codes), &case.should_fail_because) {
            (ExitJudgment::Rejected(_), Some(_)) => {}
            (ExitJudgment::Accepted, Some(reason)) => {
                outcome.status = CaseStatus::Fail;
                outcome
                    .reasons
                    .push(format!("expected the front end to reject the fixture ({}), but it exited {}", reason, code));
            }
            (ExitJudgment::Rejected(code), None) => {
                outcome.status = CaseStatus::ToolError;
                outcome
                    .reasons
                    .push(format!("exit code {} is not accepted for phase {}", code, request.phase));
            }
            (ExitJudgment::Accepted, None) if request.check_assertions && !case.directives.is_empty() => {
                let report = match_directives(&case.directives, &output.stdout, &request.coercion);
                outcome.matched_directives = report.pairs.iter().map(|(d, _)| *d).collect();
                outcome.unmatched_directives = report.unmatched.clone();
                if !report.is_clean() {
                    outcome.status = CaseStatus::Fail;
                }
                for (d, err) in &report.render_errors {
                    outcome.unmatched_directives.push(*d);
                    outcome
                        .reasons
                        .push(format!("line {}: cannot render directive: {}", case.directives[*d].line, err));
                }
                for d in &report.unmatched {
                    let directive = &case.directives[*d];
                    outcome.reasons.push(format!(
                        "line {}: no output matched `{}`",
                        directive.line,
                        expected_text(directive, &request.coercion)
                    ));
                }
                for line in &report.orphans {
                    outcome.reasons.push(format!("orphan assertion output: `{}`", line));
                }
            }
            (ExitJudgment::Accepted, None) => {}
        }
    }

    outcome.stdout = output.stdout;
    outcome.stderr = output.stderr;
    tracing::debug!(case = %request.label(), status = %outcome.status, "case decided");
    outcome
}
