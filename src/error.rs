//! Error taxonomy shared by the parser and the analyzer.
//!
//! Every variant is fatal for the run that produced it: there is no
//! best-effort mode that keeps partial results.

use std::path::PathBuf;

/// Errors raised while parsing logs, persisting results or analyzing them
#[derive(Debug, thiserror::Error)]
pub enum ResultError {
    /// Text that had to follow a known grammar did not
    #[error("malformed input: {0}")]
    Format(String),

    /// Numeric value outside its domain
    #[error("value out of range: {0}")]
    Range(String),

    /// Cross-line consistency check failed
    #[error("inconsistent log at line {line}: {reason}")]
    InconsistentLog { line: usize, reason: String },

    /// Simulator log does not end with a matching shutdown banner
    #[error("simulation did not shut down cleanly: {0}")]
    UncleanShutdown(String),

    /// Persisted result was written by a different format version
    #[error("file {path} has format version {found}, expected {expected}")]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// None of the candidate paths for a required log exists
    #[error("no log file found, tried: {}", display_paths(.tried))]
    MissingLog { tried: Vec<PathBuf> },

    /// Running counters of a host do not span the analysis cutoff
    #[error("host {host}: {reason}")]
    InsufficientReports { host: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] bincode::Error),
}

impl ResultError {
    pub(crate) fn inconsistent(line: usize, reason: impl Into<String>) -> Self {
        ResultError::InconsistentLog {
            line,
            reason: reason.into(),
        }
    }

    /// Prefix format and range messages with the offending line number
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            ResultError::Format(msg) => ResultError::Format(format!("line {}: {}", line, msg)),
            ResultError::Range(msg) => ResultError::Range(format!("line {}: {}", line, msg)),
            other => other,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
