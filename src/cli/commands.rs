//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use svconform_core::Phase;
use tokio::sync::watch;

use crate::aggregate::Aggregator;
use crate::config::HarnessConfig;
use crate::discovery::{Corpus, load_corpus};
use crate::error::HarnessError;
use crate::report::{ConsoleReporter, JsonReporter, Reporter};
use crate::request::Selection;
use crate::runner::ProcessExecutor;
use crate::suite::{self, SuiteOptions};

use super::{CliError, CliResult, ExitCode, OutputFormat};

/// Arguments of the `run` subcommand after parsing.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub paths: Vec<PathBuf>,
    pub tags: Vec<String>,
    pub phases: Vec<Phase>,
    pub workers: Option<usize>,
    pub timeout: Option<Duration>,
    pub frontend: Option<String>,
    pub config: Option<PathBuf>,
    pub filter: Option<String>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub verbose: bool,
}

// ============================================================================
// Shared setup
// ============================================================================

/// Load the config: `--config`, else `svconform.toml` in the working directory, else defaults.
fn load_config(explicit: Option<&Path>) -> CliResult<HarnessConfig> {
    let cwd = env::current_dir().map_err(|e| CliError::failure(format!("Error: cannot read working directory: {}", e)))?;
    HarnessConfig::load(explicit, &cwd).map_err(|e| CliError::usage(format!("Error: {}", e)))
}

fn load(paths: &[PathBuf], config: &HarnessConfig) -> CliResult<Corpus> {
    load_corpus(paths, &|path: &Path| config.is_fixture(path)).map_err(|e| CliError::failure(format!("Error: {}", e)))
}

fn harness_error(err: HarnessError) -> CliError {
    match err {
        HarnessError::Config(e) => CliError::usage(format!("Error: {}", e)),
        other => CliError::failure(format!("Error: {}", other)),
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Run the suite and report.
pub fn run_suite(args: RunArgs) -> CliResult<ExitCode> {
    if args.output.is_some() && args.format != OutputFormat::Json {
        return Err(CliError::usage("Error: --output requires --format json"));
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }

    let mut selection = Selection::new()
        .with_tags(args.tags)
        .with_phases(args.phases);
    if let Some(filter) = args.filter {
        selection = selection.with_name_filter(filter);
    }
    if let Some(timeout) = args.timeout {
        selection = selection.with_timeout(timeout);
    }

    let mut options = SuiteOptions::new(args.paths).with_selection(selection);
    if let Some(frontend) = args.frontend {
        options = options.with_frontend(frontend);
    }

    let mut reporter: Box<dyn Reporter> = match args.format {
        OutputFormat::Console => Box::new(ConsoleReporter::stdout(args.verbose)),
        OutputFormat::Json => Box::new(JsonReporter::new(args.output)),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| harness_error(HarnessError::Runtime(e)))?;

    let report = runtime
        .block_on(async {
            let (cancel_tx, cancel_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupted; cancelling run");
                    let _ = cancel_tx.send(true);
                }
            });
            suite::run_suite(&config, &options, ProcessExecutor, reporter.as_mut(), cancel_rx).await
        })
        .map_err(harness_error)?;

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Summary already printed
        Err(CliError::new("", ExitCode::FAILURE))
    }
}

/// Print every discovered fixture.
pub fn list_fixtures(paths: &[PathBuf], config: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config)?;
    let corpus = load(paths, &config)?;

    for case in &corpus.cases {
        let types = if case.declared_types.is_empty() {
            "-".to_string()
        } else {
            case.declared_types.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(",")
        };
        let tags = case.tags.iter().cloned().collect::<Vec<_>>().join(",");
        println!(
            "{}  {}  types={}  tags={}  directives={}",
            case.path.display(),
            case.name,
            types,
            if tags.is_empty() { "-" } else { tags.as_str() },
            case.directives.len()
        );
    }
    for fixture in &corpus.malformed {
        println!(
            "{}  {}  MALFORMED ({} error(s))",
            fixture.path.display(),
            fixture.name,
            fixture.errors.len()
        );
    }

    println!("\n{} fixture(s), {} malformed", corpus.len(), corpus.malformed.len());
    Ok(ExitCode::SUCCESS)
}

/// Extract every fixture without running anything and render diagnostics.
pub fn check_fixtures(paths: &[PathBuf], config: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config)?;
    let corpus = load(paths, &config)?;

    let mut aggregator = Aggregator::new();
    aggregator.register_corpus(&corpus);
    let conflicts = aggregator.conflicts();

    let total = corpus.len();
    let malformed = corpus.malformed.len();
    for fixture in corpus.malformed {
        eprintln!("{:?}", miette::Report::new(fixture));
    }
    for conflict in &conflicts {
        eprintln!("Error: fixture name `{}` is declared by:", conflict.name);
        for path in &conflict.paths {
            eprintln!("  {}", path.display());
        }
    }

    if malformed > 0 || !conflicts.is_empty() {
        return Err(CliError::failure(format!(
            "\n{} fixture(s) checked: {} malformed, {} name conflict(s)",
            total,
            malformed,
            conflicts.len()
        )));
    }

    println!("✓ {} fixture(s) OK", total);
    Ok(ExitCode::SUCCESS)
}
