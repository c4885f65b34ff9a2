//! Execution planning
//!
//! Turns descriptors into [`ExecutionRequest`]s, one per (fixture, phase) pair selected for the run. Fixtures
//! that end up with no phase, or that the tag and name filters exclude, become skip records instead.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use svconform_core::{CoercionRules, Phase};
use svconform_syntax::TestCaseDescriptor;

use crate::config::{FILE_PLACEHOLDER, FrontendProfile, HarnessConfig, UntypedPolicy};

/// Resolved front-end invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// One unit of work for the Case Runner.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub case: Arc<TestCaseDescriptor>,
    pub phase: Phase,
    pub command: CommandLine,
    pub timeout: Duration,
    /// Exit codes meaning the front end accepted the fixture in this phase.
    pub accept_exit_codes: Vec<i32>,
    /// Whether `:assert:` output is matched against the fixture's directives.
    pub check_assertions: bool,
    pub coercion: CoercionRules,
}

impl ExecutionRequest {
    /// `name[phase]`, used in logs and console output.
    pub fn label(&self) -> String {
        format!("{}[{}]", self.case.name, self.phase)
    }
}

/// Which cases and phases a run covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Run only fixtures carrying at least one of these tags. Empty means no tag filter.
    pub tags: BTreeSet<String>,
    /// Phases requested explicitly. Empty means every phase.
    pub phases: BTreeSet<Phase>,
    /// Run only fixtures whose name contains this substring.
    pub name_filter: Option<String>,
    /// Overrides the configured default timeout (a fixture's own `:timeout:` still wins).
    pub timeout: Option<Duration>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to fixtures with any of `tags`
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Request phases explicitly
    pub fn with_phases(mut self, phases: impl IntoIterator<Item = Phase>) -> Self {
        self.phases = phases.into_iter().collect();
        self
    }

    /// Restrict to names containing `filter`
    pub fn with_name_filter(mut self, filter: impl Into<String>) -> Self {
        self.name_filter = Some(filter.into());
        self
    }

    /// Override the default timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Why the tag and name filters exclude a fixture, if they do.
    pub fn exclusion(&self, name: &str, tags: &BTreeSet<String>) -> Option<String> {
        if let Some(filter) = &self.name_filter {
            if !name.contains(filter.as_str()) {
                return Some(format!("name does not match `{}`", filter));
            }
        }
        if !self.tags.is_empty() && tags.is_disjoint(&self.tags) {
            return Some("no selected tag".to_string());
        }
        None
    }

    fn selected_phases(&self) -> BTreeSet<Phase> {
        if self.phases.is_empty() {
            Phase::ALL.into_iter().collect()
        } else {
            self.phases.clone()
        }
    }
}

/// A fixture that will not run, and why.
#[derive(Debug, Clone)]
pub struct SkippedCase {
    pub case: Arc<TestCaseDescriptor>,
    pub reason: String,
}

/// Requests in dispatch order plus the cases left out.
#[derive(Debug, Default)]
pub struct RunPlan {
    pub requests: Vec<ExecutionRequest>,
    pub skipped: Vec<SkippedCase>,
}

/// Phases `case` runs in under `selection` and `policy`, or the reason it runs in none.
pub fn phases_for(case: &TestCaseDescriptor, selection: &Selection, policy: UntypedPolicy) -> Result<Vec<Phase>, String> {
    let selected = selection.selected_phases();

    if case.is_typed() {
        let phases: Vec<Phase> = case.declared_types.intersection(&selected).copied().collect();
        if phases.is_empty() {
            return Err(format!("declared phases ({}) not selected", join(&case.declared_types)));
        }
        return Ok(phases);
    }

    match policy {
        UntypedPolicy::All => Ok(selected.into_iter().collect()),
        UntypedPolicy::None => Err("no `:type:` declared".to_string()),
        UntypedPolicy::RequestedOnly if selection.phases.is_empty() => {
            Err("no `:type:` declared and no phase requested with --type".to_string())
        }
        UntypedPolicy::RequestedOnly => Ok(selection.phases.iter().copied().collect()),
    }
}

fn join(phases: &BTreeSet<Phase>) -> String {
    phases.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
}

/// Build the front-end command for `case` in `phase`.
///
/// Argument order: common args, phase args, include dirs, defines, top module. The fixture path replaces every
/// `{file}` placeholder, or is appended last when there is none.
pub fn build_command(profile: &FrontendProfile, phase: Phase, case: &TestCaseDescriptor) -> CommandLine {
    let file = absolute(&case.path);
    let file = file.to_string_lossy();

    let mut args: Vec<String> = profile
        .args
        .iter()
        .chain(profile.phase(phase).args.iter())
        .cloned()
        .collect();
    args.extend(
        case.resolved_incdirs()
            .iter()
            .map(|dir| format!("{}{}", profile.incdir_prefix, absolute(dir).display())),
    );
    args.extend(case.defines.iter().map(|d| format!("{}{}", profile.define_prefix, d)));
    if let (Some(prefix), Some(top)) = (&profile.top_module_prefix, &case.top_module) {
        args.push(format!("{}{}", prefix, top));
    }

    let mut substituted = false;
    for arg in &mut args {
        if arg.contains(FILE_PLACEHOLDER) {
            *arg = arg.replace(FILE_PLACEHOLDER, &file);
            substituted = true;
        }
    }
    if !substituted {
        args.push(file.into_owned());
    }

    CommandLine {
        program: profile.program.clone(),
        args,
    }
}

/// Requests run in a scratch directory, so paths handed to the front end must not be relative.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Plan a run: one request per selected (fixture, phase) pair, in fixture order then phase order.
#[tracing::instrument(skip_all, fields(cases = cases.len()))]
pub fn plan(
    cases: &[Arc<TestCaseDescriptor>],
    selection: &Selection,
    config: &HarnessConfig,
    profile: &FrontendProfile,
) -> RunPlan {
    let default_timeout = selection.timeout.unwrap_or_else(|| config.timeout());
    let mut plan = RunPlan::default();

    for case in cases {
        if let Some(reason) = selection.exclusion(&case.name, &case.tags) {
            plan.skipped.push(SkippedCase {
                case: Arc::clone(case),
                reason,
            });
            continue;
        }

        let phases = match phases_for(case, selection, config.untyped_policy) {
            Ok(phases) => phases,
            Err(reason) => {
                plan.skipped.push(SkippedCase {
                    case: Arc::clone(case),
                    reason,
                });
                continue;
            }
        };

        for phase in phases {
            let phase_profile = profile.phase(phase);
            plan.requests.push(ExecutionRequest {
                case: Arc::clone(case),
                phase,
                command: build_command(profile, phase, case),
                timeout: case.timeout.unwrap_or(default_timeout),
                accept_exit_codes: phase_profile.accept_exit_codes,
                check_assertions: profile.checks_assertions(phase),
                coercion: profile.coercion.clone(),
            });
        }
    }

    tracing::debug!(requests = plan.requests.len(), skipped = plan.skipped.len(), "run planned");
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhaseProfile;

    fn case(src: &str) -> Arc<TestCaseDescriptor> {
        Arc::new(svconform_syntax::extract(Path::new("/corpus/t/case.sv"), src).unwrap())
    }

    fn typed(types: &str, tags: &str) -> Arc<TestCaseDescriptor> {
        case(&format!("/*\n:name: c\n:type: {}\n:tags: {}\n*/\n", types, tags))
    }

    // ========================================
    // Phase policy tests
    // ========================================

    #[test]
    fn test_typed_case_runs_declared_and_selected() {
        let c = typed("parsing simulation", "a");
        let all = phases_for(&c, &Selection::new(), UntypedPolicy::RequestedOnly).unwrap();
        assert_eq!(all, vec![Phase::Parsing, Phase::Simulation]);

        let only_sim = Selection::new().with_phases([Phase::Simulation, Phase::Elaboration]);
        assert_eq!(
            phases_for(&c, &only_sim, UntypedPolicy::RequestedOnly).unwrap(),
            vec![Phase::Simulation]
        );

        let only_elab = Selection::new().with_phases([Phase::Elaboration]);
        assert!(phases_for(&c, &only_elab, UntypedPolicy::RequestedOnly).is_err());
    }

    #[test]
    fn test_untyped_policies() {
        let bare = case("module m; endmodule\n");
        let none_requested = Selection::new();
        let requested = Selection::new().with_phases([Phase::Parsing]);

        assert!(phases_for(&bare, &none_requested, UntypedPolicy::RequestedOnly).is_err());
        assert_eq!(
            phases_for(&bare, &requested, UntypedPolicy::RequestedOnly).unwrap(),
            vec![Phase::Parsing]
        );
        assert_eq!(phases_for(&bare, &none_requested, UntypedPolicy::All).unwrap().len(), 3);
        assert!(phases_for(&bare, &requested, UntypedPolicy::None).is_err());
    }

    // ========================================
    // Command construction tests
    // ========================================

    #[test]
    fn test_command_appends_file_last() {
        let c = case("/*\n:name: c\n:incdirs: inc\n:defines: A B=1\n:top_module: top\n*/\n");
        let mut profile = FrontendProfile::new("sim")
            .with_args(["-q"])
            .with_phase(Phase::Parsing, PhaseProfile {
                args: vec!["--parse".into()],
                ..PhaseProfile::default()
            });
        profile.top_module_prefix = Some("--top=".into());

        let cmd = build_command(&profile, Phase::Parsing, &c);
        assert_eq!(cmd.program, "sim");
        assert_eq!(
            cmd.args,
            vec!["-q", "--parse", "+incdir+/corpus/t/inc", "+define+A", "+define+B=1", "--top=top", "/corpus/t/case.sv"]
        );
    }

    #[test]
    fn test_command_substitutes_placeholder() {
        let c = case("/*\n:name: c\n*/\n");
        let profile = FrontendProfile::new("sim").with_args(["--input={file}", "--run"]);
        let cmd = build_command(&profile, Phase::Simulation, &c);
        assert_eq!(cmd.args, vec!["--input=/corpus/t/case.sv", "--run"]);
        assert_eq!(cmd.to_string(), "sim --input=/corpus/t/case.sv --run");
    }

    // ========================================
    // Planning tests
    // ========================================

    #[test]
    fn test_plan_filters_and_orders() {
        let cases = vec![
            typed("parsing simulation", "12.5"),
            typed("parsing", "16.9"),
            case("/*\n:name: slow\n:type: parsing\n:tags: 12.5\n:timeout: 1\n*/\n"),
        ];
        let config = HarnessConfig::default();
        let profile = FrontendProfile::new("sim");
        let selection = Selection::new().with_tags(["12.5"]);

        let plan = plan(&cases, &selection, &config, &profile);
        let labels: Vec<_> = plan.requests.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec!["c[parsing]", "c[simulation]", "slow[parsing]"]);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].reason, "no selected tag");

        assert!(!plan.requests[0].check_assertions);
        assert!(plan.requests[1].check_assertions);
        assert_eq!(plan.requests[0].timeout, Duration::from_secs(30));
        assert_eq!(plan.requests[2].timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_plan_name_filter_and_timeout_override() {
        let cases = vec![typed("parsing", "x")];
        let selection = Selection::new()
            .with_name_filter("zzz")
            .with_timeout(Duration::from_secs(3));
        let plan = plan(&cases, &selection, &HarnessConfig::default(), &FrontendProfile::new("sim"));
        assert!(plan.requests.is_empty());
        assert_eq!(plan.skipped[0].reason, "name does not match `zzz`");

        let selection = Selection::new().with_name_filter("c").with_timeout(Duration::from_secs(3));
        let plan = super::plan(&cases, &selection, &HarnessConfig::default(), &FrontendProfile::new("sim"));
        assert_eq!(plan.requests[0].timeout, Duration::from_secs(3));
    }
}
