//! CLI command implementations for Grove.

pub(crate) mod demo;
pub(crate) mod evolve;

mod output;

use clap::ValueEnum;
use std::error::Error;
use std::fmt;

/// Output format for run summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<grove::LoadError> for CliError {
    fn from(e: grove::LoadError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<grove::ConfigError> for CliError {
    fn from(e: grove::ConfigError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<grove::gp::EvolutionError> for CliError {
    fn from(e: grove::gp::EvolutionError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {e}"))
    }
}
