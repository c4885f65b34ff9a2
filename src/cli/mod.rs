//! CLI module for the svconform harness
//!
//! ## Commands
//!
//! - `run [path...]` - Run fixtures through the configured front end and report
//! - `list [path...]` - List discovered fixtures with their phases, tags, and directive counts
//! - `check [path...]` - Validate fixture metadata and directives without running anything
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use svconform_core::Phase;
use svconform_core::lang::phases;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    /// Bad configuration or command line, before any case ran.
    pub const USAGE: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create a usage error (exit code 2).
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::USAGE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Conformance test harness for HDL front ends
#[derive(Parser, Debug)]
#[command(name = "svconform")]
#[command(version = VERSION)]
#[command(about = "Run annotated HDL fixtures through a front end and check what it prints", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Console,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run fixtures and report
    Run {
        /// Fixture files or directories
        #[arg(value_name = "PATH", default_value = ".")]
        paths: Vec<PathBuf>,
        /// Only fixtures carrying any of these tags
        #[arg(long, value_delimiter = ',', value_name = "TAG")]
        tags: Vec<String>,
        /// Only these phases (repeatable)
        #[arg(long = "type", value_name = "PHASE", value_parser = parse_phase)]
        phases: Vec<Phase>,
        /// Concurrent front-end processes
        #[arg(short = 'j', long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
        workers: Option<u16>,
        /// Default per-case timeout in seconds
        #[arg(long, value_name = "SECS", value_parser = parse_timeout)]
        timeout: Option<Duration>,
        /// Front-end profile from the config file
        #[arg(long, value_name = "NAME")]
        frontend: Option<String>,
        /// Config file (default: ./svconform.toml when present)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Only fixtures whose name contains this substring
        #[arg(short = 'k', value_name = "NAME")]
        filter: Option<String>,
        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
        format: OutputFormat,
        /// Write the JSON report to a file instead of stdout
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List discovered fixtures
    List {
        #[arg(value_name = "PATH", default_value = ".")]
        paths: Vec<PathBuf>,
        /// Config file (default: ./svconform.toml when present)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Validate fixtures without running them
    Check {
        #[arg(value_name = "PATH", default_value = ".")]
        paths: Vec<PathBuf>,
        /// Config file (default: ./svconform.toml when present)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn parse_phase(text: &str) -> Result<Phase, String> {
    phases::from_str(text).ok_or_else(|| {
        let known: Vec<_> = Phase::ALL.iter().map(|p| p.to_string()).collect();
        format!("unknown phase `{}` (expected one of: {})", text, known.join(", "))
    })
}

fn parse_timeout(text: &str) -> Result<Duration, String> {
    text.parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .filter(|timeout| !timeout.is_zero())
        .ok_or_else(|| format!("`{}` is not a positive number of seconds", text))
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Install the stderr log subscriber; stdout is reserved for reports.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .try_init();
}

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run {
            paths,
            tags,
            phases,
            workers,
            timeout,
            frontend,
            config,
            filter,
            format,
            output,
        } => commands::run_suite(commands::RunArgs {
            paths,
            tags,
            phases,
            workers: workers.map(usize::from),
            timeout,
            frontend,
            config,
            filter,
            format,
            output,
            verbose: cli.verbose,
        }),
        Command::List { paths, config } => commands::list_fixtures(&paths, config.as_deref()),
        Command::Check { paths, config } => commands::check_fixtures(&paths, config.as_deref()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::try_parse_from(["svconform", "run"]).unwrap();
        if let Command::Run {
            paths,
            tags,
            phases,
            format,
            ..
        } = cli.command
        {
            assert_eq!(paths, vec![PathBuf::from(".")]);
            assert!(tags.is_empty());
            assert!(phases.is_empty());
            assert_eq!(format, OutputFormat::Console);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_filters() {
        let cli = Cli::try_parse_from([
            "svconform",
            "run",
            "--tags",
            "12.5,16.9",
            "--type",
            "simulate",
            "--type",
            "parsing",
            "--workers",
            "4",
            "--timeout",
            "2.5",
            "-k",
            "unique",
            "-v",
            "corpus/",
        ])
        .unwrap();
        assert!(cli.verbose);
        if let Command::Run {
            paths,
            tags,
            phases,
            workers,
            timeout,
            filter,
            ..
        } = cli.command
        {
            assert_eq!(paths, vec![PathBuf::from("corpus/")]);
            assert_eq!(tags, vec!["12.5", "16.9"]);
            assert_eq!(phases, vec![Phase::Simulation, Phase::Parsing]);
            assert_eq!(workers, Some(4));
            assert_eq!(timeout, Some(Duration::from_millis(2500)));
            assert_eq!(filter.as_deref(), Some("unique"));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        assert!(Cli::try_parse_from(["svconform", "run", "--type", "synthesis"]).is_err());
        assert!(Cli::try_parse_from(["svconform", "run", "--workers", "0"]).is_err());
        assert!(Cli::try_parse_from(["svconform", "run", "--timeout", "-1"]).is_err());
        assert!(Cli::try_parse_from(["svconform", "run", "--timeout", "1e30"]).is_err());
        assert!(Cli::try_parse_from(["svconform", "run", "--timeout", "1e-12"]).is_err());
        assert!(Cli::try_parse_from(["svconform", "run", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_cli_parse_json_output() {
        let cli = Cli::try_parse_from(["svconform", "run", "--format", "json", "--output", "r.json"]).unwrap();
        if let Command::Run { format, output, .. } = cli.command {
            assert_eq!(format, OutputFormat::Json);
            assert_eq!(output, Some(PathBuf::from("r.json")));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_list_and_check() {
        let cli = Cli::try_parse_from(["svconform", "list", "a", "b"]).unwrap();
        assert!(matches!(cli.command, Command::List { ref paths, .. } if paths.len() == 2));

        let cli = Cli::try_parse_from(["svconform", "check", "--config", "x.toml"]).unwrap();
        assert!(matches!(cli.command, Command::Check { config: Some(_), .. }));
    }
}
