//! CLI failures and their process exit codes.
//!
//! Exit codes:
//! - 0:  success
//! - 2:  clap arg parse error (automatic, before our code runs)
//! - 10: tracking error (unknown field, bad tracking config, worker failure)
//! - 11: curves could not be written
//! - 12: bad `--params` JSON or seed options
//! - 13: curves or summary could not be serialized

use fibertrace_core::TrackError;
use std::path::PathBuf;
use thiserror::Error;

/// A failed CLI run, mapped to an exit code by [`CliError::exit_code`].
#[derive(Debug, Error)]
pub enum CliError {
    /// The tracker rejected its setup or failed while running.
    #[error(transparent)]
    Track(#[from] TrackError),

    /// The output file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// `--params` is not valid JSON.
    #[error("invalid --params JSON: {0}")]
    Params(#[source] serde_json::Error),

    /// The seed lattice options are out of range.
    #[error("invalid seed options: {0}")]
    Seeds(#[source] TrackError),

    /// Curves or the run summary could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Track(_) => 10,
            CliError::Write { .. } => 11,
            CliError::Params(_) | CliError::Seeds(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}
