//! Error handling for turbine.
//! Defines the error type and result alias used throughout the application.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for turbine operations.
///
/// Configuration errors are raised before any network or filesystem activity.
/// Upstream errors abort the run before anything is written. Per-file errors
/// are subject to the configured write-failure policy.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Argument parsing errors raised by clap itself (including `--help`)
    #[error(transparent)]
    Cli(#[from] clap::Error),

    /// A required option is missing or an option carries an invalid value
    #[error("{message}\n\n{usage}")]
    Usage { message: String, usage: String },

    /// Represents errors that occur during configuration parsing or processing
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// The requested command does not name a registered generator
    #[error("Unknown generator: '{0}'.")]
    UnknownGenerator(String),

    /// Template compilation or rendering failure
    #[error("Template error: {0}.")]
    MinijinjaError(#[from] minijinja::Error),

    /// The request to the external data source failed
    #[error("Request failed: {0}.")]
    HttpError(#[from] reqwest::Error),

    /// The external data source answered with a non-success status
    #[error("Upstream returned HTTP {status}.")]
    UpstreamStatus { status: u16 },

    /// The external response does not match the expected shape
    #[error("Validation error: {0}.")]
    ValidationError(String),

    #[error("JSON error: {0}.")]
    JsonError(#[from] serde_json::Error),

    /// A rendered filename failed the validity check
    #[error("Invalid filename: '{filename}'.")]
    InvalidFilename { filename: String },

    /// A directory creation or file write failed
    #[error("Failed to write '{}': {source}.", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Some emissions failed under the `continue` policy
    #[error("{failed} of {total} files could not be written.")]
    EmissionFailed { failed: usize, total: usize },

    /// An emission task panicked or was cancelled
    #[error("Task error: {0}.")]
    TaskError(#[from] tokio::task::JoinError),
}

/// Convenience type alias for Results with turbine's Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// Clap errors exit through clap so that `--help` and `--version` keep their
/// zero status. Everything else prints to stderr and exits with status 1.
pub fn default_error_handler(err: Error) -> ! {
    match err {
        Error::Cli(e) => e.exit(),
        err => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
