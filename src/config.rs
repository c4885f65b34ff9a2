//! Harness configuration
//!
//! Configuration is layered: built-in defaults, then an optional TOML file, then CLI flags. The file is either
//! given explicitly (`--config`) or picked up as `svconform.toml` in the working directory.
//!
//! ```toml
//! workers = 8
//! timeout = 30
//! default_frontend = "sv-parser"
//!
//! [frontends.sv-parser]
//! program = "parse_sv"
//! args = ["--quiet"]
//!
//! [frontends.sv-parser.phases.parsing]
//! args = ["--syntax-only"]
//!
//! [frontends.sv-parser.phases.simulation]
//! args = ["--run", "{file}"]
//! accept_exit_codes = [0]
//!
//! [frontends.sv-parser.coercion]
//! symbolic = "coerce"
//! indeterminate_numeric = "0"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use svconform_core::lang::phases;
use svconform_core::{CoercionRules, Phase};
use thiserror::Error;

/// Name of the configuration file picked up from the working directory.
pub const CONFIG_FILE_NAME: &str = "svconform.toml";

/// Placeholder replaced by the fixture path in front-end arguments.
pub const FILE_PLACEHOLDER: &str = "{file}";

const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

/// Errors raised while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("no front end configured; add a [frontends.<name>] table to {CONFIG_FILE_NAME}")]
    NoFrontend,

    #[error("unknown front end `{0}`")]
    UnknownFrontend(String),

    #[error("several front ends are configured ({}); pick one with --frontend or default_frontend", .0.join(", "))]
    AmbiguousFrontend(Vec<String>),
}

/// Phase selection policy for fixtures that declare no `:type:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UntypedPolicy {
    /// Run only for phases explicitly requested with `--type`.
    #[default]
    RequestedOnly,
    /// Run for every selected phase.
    All,
    /// Never run; report as skipped.
    None,
}

/// Per-phase front-end settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhaseProfile {
    /// Arguments appended after the profile's common arguments.
    pub args: Vec<String>,
    /// Exit codes that mean the front end accepted the fixture.
    pub accept_exit_codes: Vec<i32>,
    /// Whether `:assert:` output is checked in this phase. Defaults to true only for simulation.
    pub check_assertions: Option<bool>,
}

impl Default for PhaseProfile {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            accept_exit_codes: vec![0],
            check_assertions: None,
        }
    }
}

/// How to invoke one front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrontendProfile {
    /// Executable to launch.
    pub program: String,
    /// Arguments common to every phase.
    pub args: Vec<String>,
    /// Prefix for each include directory (`+incdir+<dir>`).
    pub incdir_prefix: String,
    /// Prefix for each macro definition (`+define+<NAME=VALUE>`).
    pub define_prefix: String,
    /// Prefix for the top module, when the front end accepts one.
    pub top_module_prefix: Option<String>,
    /// Keyed by phase spelling (`parsing`, `elaboration`, `simulation` or an alias).
    pub phases: BTreeMap<String, PhaseProfile>,
    /// How directive arguments the harness cannot evaluate are rendered.
    pub coercion: CoercionRules,
}

impl Default for FrontendProfile {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            incdir_prefix: "+incdir+".to_string(),
            define_prefix: "+define+".to_string(),
            top_module_prefix: None,
            phases: BTreeMap::new(),
            coercion: CoercionRules::default(),
        }
    }
}

impl FrontendProfile {
    /// Create a profile launching `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Set the common arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the settings for one phase
    pub fn with_phase(mut self, phase: Phase, profile: PhaseProfile) -> Self {
        self.phases.insert(phase.to_string(), profile);
        self
    }

    /// Set the coercion rules
    pub fn with_coercion(mut self, coercion: CoercionRules) -> Self {
        self.coercion = coercion;
        self
    }

    fn phase_entry(&self, phase: Phase) -> Option<&PhaseProfile> {
        self.phases
            .iter()
            .find(|(key, _)| phases::from_str(key) == Some(phase))
            .map(|(_, profile)| profile)
    }

    /// Settings for `phase`, falling back to defaults.
    pub fn phase(&self, phase: Phase) -> PhaseProfile {
        self.phase_entry(phase).cloned().unwrap_or_default()
    }

    /// Whether assertions are checked in `phase`.
    pub fn checks_assertions(&self, phase: Phase) -> bool {
        self.phase_entry(phase)
            .and_then(|p| p.check_assertions)
            .unwrap_or(phase == Phase::Simulation)
    }
}

/// Top-level harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Worker pool width. `None` means available parallelism.
    pub workers: Option<usize>,
    /// Default per-request timeout in seconds.
    pub timeout: f64,
    /// File extensions treated as fixtures.
    pub extensions: Vec<String>,
    pub untyped_policy: UntypedPolicy,
    pub default_frontend: Option<String>,
    pub frontends: BTreeMap<String, FrontendProfile>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workers: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            extensions: vec!["sv".to_string(), "v".to_string()],
            untyped_policy: UntypedPolicy::default(),
            default_frontend: None,
            frontends: BTreeMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document. `origin` is only used in error messages.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: HarnessConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Load `explicit` if given, else `svconform.toml` in `dir` when present, else defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        let implicit = dir.join(CONFIG_FILE_NAME);
        if implicit.is_file() {
            tracing::debug!(path = %implicit.display(), "loading implicit config");
            Self::from_path(&implicit)
        } else {
            Ok(Self::default())
        }
    }

    /// Check values serde cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if positive_seconds(self.timeout).is_none() {
            return Err(ConfigError::Invalid(format!("timeout must be a positive number of seconds, got {}", self.timeout)));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid("extensions must not be empty".to_string()));
        }
        for (name, profile) in &self.frontends {
            if profile.program.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("front end `{}` has no program", name)));
            }
            if let Some(key) = profile.phases.keys().find(|key| phases::from_str(key).is_none()) {
                return Err(ConfigError::Invalid(format!("front end `{}` configures unknown phase `{}`", name, key)));
            }
        }
        if let Some(name) = &self.default_frontend {
            if !self.frontends.contains_key(name) {
                return Err(ConfigError::UnknownFrontend(name.clone()));
            }
        }
        Ok(())
    }

    /// Set the worker pool width
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set the default timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.as_secs_f64();
        self
    }

    /// Set the untyped-fixture policy
    pub fn with_untyped_policy(mut self, policy: UntypedPolicy) -> Self {
        self.untyped_policy = policy;
        self
    }

    /// Register a front-end profile
    pub fn with_frontend(mut self, name: impl Into<String>, profile: FrontendProfile) -> Self {
        self.frontends.insert(name.into(), profile);
        self
    }

    /// Effective worker pool width.
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }

    /// Default per-request timeout.
    pub fn timeout(&self) -> Duration {
        positive_seconds(self.timeout).unwrap_or(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
    }

    /// Resolve the front end to use: `requested`, else `default_frontend`, else the only profile.
    pub fn frontend(&self, requested: Option<&str>) -> Result<(&str, &FrontendProfile), ConfigError> {
        let name = match requested.or(self.default_frontend.as_deref()) {
            Some(name) => name,
            None => match self.frontends.len() {
                0 => return Err(ConfigError::NoFrontend),
                1 => self.frontends.keys().next().map(String::as_str).ok_or(ConfigError::NoFrontend)?,
                _ => return Err(ConfigError::AmbiguousFrontend(self.frontends.keys().cloned().collect())),
            },
        };
        self.frontends
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownFrontend(name.to_string()))
    }

    /// Whether `path` has one of the configured fixture extensions.
    pub fn is_fixture(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| want == ext))
    }
}

/// Seconds as a non-zero `Duration`; `None` when the value cannot be represented.
fn positive_seconds(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok().filter(|d| !d.is_zero())
}
