//! Run-fatal errors.
//!
//! Per-case problems never surface here; they become statuses on the case's outcome. A [`HarnessError`] means
//! the run as a whole could not proceed.

use thiserror::Error;

use crate::config::ConfigError;
use crate::discovery::DiscoveryError;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),

    #[error("failed to start the worker runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
