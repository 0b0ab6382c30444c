//! Error taxonomy for case configuration and execution.
//!
//! Every variant is fatal. Nothing here is retried; recovery is an operator
//! re-invoking with corrected inputs.
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by resolution, compilation, and the case lifecycle.
#[derive(Debug, Error)]
pub enum CaseError {
    /// The descriptor is missing, ambiguous, or references unknown data.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// A phase precondition does not hold (missing root, missing template,
    /// case-directory collision, out-of-order phase).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// An external toolchain step exited unsuccessfully.
    #[error("{step} failed: {detail}{}", log_hint(.log))]
    Toolchain {
        step: String,
        detail: String,
        log: Option<PathBuf>,
    },

    /// Scheduler output did not carry a parsable job identifier.
    #[error("could not parse job id from scheduler output: {output:?}")]
    SubmissionParse { output: String },

    /// Filesystem access failed.
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CaseError {
    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

fn log_hint(log: &Option<PathBuf>) -> String {
    match log {
        Some(path) => format!(" (see {} for details)", path.display()),
        None => String::new(),
    }
}

pub type CaseResult<T> = Result<T, CaseError>;
