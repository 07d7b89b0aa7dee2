//! Run results: one [`JobOutcome`] per job plus aggregate [`RunStats`].

use crate::error::{ConvertError, JobError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    /// 1-indexed position in the job list.
    pub index: usize,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// The command line that was run, shell-quoted for display.
    pub command: String,
    /// Converter exit code, when it ran to completion.
    pub exit_code: Option<i32>,
    /// `None` on success.
    pub error: Option<JobError>,
    pub duration_ms: u64,
}

impl JobOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate numbers for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_duration_ms: u64,
}

/// Result of [`crate::convert::run`].
///
/// A report is returned even when every job failed; the default policy is
/// to carry on regardless. Use [`RunReport::into_result`] to treat any
/// failure as an error instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub outcomes: Vec<JobOutcome>,
    pub stats: RunStats,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn all_succeeded(&self) -> bool {
        self.stats.failed == 0
    }

    /// `Err` if any job failed.
    pub fn into_result(self) -> Result<Self, ConvertError> {
        if self.all_succeeded() {
            Ok(self)
        } else {
            Err(ConvertError::PartialFailure {
                succeeded: self.stats.succeeded,
                failed: self.stats.failed,
                total: self.stats.total_jobs,
            })
        }
    }
}
