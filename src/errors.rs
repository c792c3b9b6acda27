use std::io;

use fintrack_config::ConfigError;
use fintrack_core::ApiError;
use thiserror::Error;

/// Failures that stop the shell or prevent it from starting.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Command error: {0}")]
    Command(String),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Backend error: {0}")]
    Backend(#[from] ApiError),
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Input(err.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for CliError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        CliError::Input(err.to_string())
    }
}
