//! Error types for the floorplan2png library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the run cannot start at all (unreadable
//!   manifest, malformed extra arguments, invalid configuration). Returned as
//!   `Err(ConvertError)` from the loading and `run*` functions.
//!
//! * [`JobError`] — **Non-fatal**: a single job failed (the converter exited
//!   non-zero, was not installed, or wrote nothing) but the run carries on
//!   with the next job. Stored inside [`crate::output::JobOutcome`] so callers
//!   can aggregate failures or ignore them entirely.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the floorplan2png library.
///
/// Per-job failures use [`JobError`] and are stored in
/// [`crate::output::JobOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Manifest errors ───────────────────────────────────────────────────
    /// Manifest file could not be read.
    #[error("Failed to read manifest '{path}': {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest file is not valid JSON or does not match the recipe schema.
    #[error("Manifest '{path}' is malformed: {detail}")]
    ManifestParse { path: PathBuf, detail: String },

    /// No built-in recipe has this name.
    #[error("Unknown recipe '{name}'. Available: {available}")]
    UnknownRecipe { name: String, available: String },

    // ── Job definition errors ─────────────────────────────────────────────
    /// Extra arguments of a job could not be interpreted.
    #[error("Invalid extra arguments '{fragment}': {reason}")]
    InvalidExtraArgs { fragment: String, reason: String },

    /// A crop value is not a converter geometry such as `1200x862+215+148`.
    #[error("Invalid crop geometry '{0}': expected e.g. 1200x862+215+148")]
    InvalidGeometry(String),

    /// A job has an empty source or destination path.
    #[error("Job {index} is missing its {field} path")]
    IncompleteJob { index: usize, field: &'static str },

    // ── Run errors ────────────────────────────────────────────────────────
    /// Some jobs failed.
    ///
    /// Returned by [`crate::output::RunReport::into_result`] when the caller
    /// wants to treat any job failure as an error.
    #[error("{failed}/{total} jobs failed")]
    PartialFailure {
        succeeded: usize,
        failed: usize,
        total: usize,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single conversion job.
///
/// Stored alongside [`crate::output::JobOutcome`] when a job fails.
/// The run always continues with the next job.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum JobError {
    /// The converter ran and exited unsuccessfully.
    ///
    /// `code` is `None` when the process was terminated by a signal.
    #[error("{program} exited with {}", describe_code(.code))]
    ExitFailure { program: String, code: Option<i32> },

    /// The converter could not be started (typically not installed or not on PATH).
    #[error("Failed to start '{program}': {detail}")]
    SpawnFailed { program: String, detail: String },

    /// The converter reported success but no output file was written.
    #[error("'{program}' exited successfully but wrote no output to '{path}'")]
    MissingOutput { program: String, path: PathBuf },

    /// The staged output could not be moved onto the destination.
    #[error("Failed to replace '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
