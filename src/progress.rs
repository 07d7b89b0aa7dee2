//! Progress-callback trait for per-job conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConverterConfigBuilder::progress_callback`] to receive
//! events as the converter works through the job list. The CLI uses this to
//! print the `Processing <file>` notice and drive its progress bar.
//!
//! # Example
//!
//! ```rust
//! use floorplan2png::{ConversionProgressCallback, ConverterConfig};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! struct Announce;
//!
//! impl ConversionProgressCallback for Announce {
//!     fn on_job_start(&self, _index: usize, _total: usize, source: &Path) {
//!         println!("Processing {}", source.display());
//!     }
//! }
//!
//! let config = ConverterConfig::builder()
//!     .progress_callback(Arc::new(Announce))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the converter as it processes each job.
///
/// Jobs run one at a time, so calls arrive strictly in order:
/// `on_run_start`, then for each job `on_job_start` followed by exactly one
/// of `on_job_complete` / `on_job_error`, then `on_run_complete`.
/// All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first job.
    fn on_run_start(&self, total_jobs: usize) {
        let _ = total_jobs;
    }

    /// Called just before the converter is invoked for a job.
    ///
    /// # Arguments
    /// * `index`  — 1-indexed job number
    /// * `total`  — number of jobs in the run
    /// * `source` — the job's source file
    fn on_job_start(&self, index: usize, total: usize, source: &Path) {
        let _ = (index, total, source);
    }

    /// Called when a job's destination has been written.
    fn on_job_complete(&self, index: usize, total: usize, destination: &Path) {
        let _ = (index, total, destination);
    }

    /// Called when a job failed. The run continues with the next job.
    fn on_job_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every job has been attempted.
    fn on_run_complete(&self, total_jobs: usize, success_count: usize) {
        let _ = (total_jobs, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConverterConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        run_total: AtomicUsize,
        run_success: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_run_start(&self, total_jobs: usize) {
            self.run_total.store(total_jobs, Ordering::SeqCst);
        }

        fn on_job_start(&self, _index: usize, _total: usize, _source: &Path) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_complete(&self, _index: usize, _total: usize, _destination: &Path) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_error(&self, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _total_jobs: usize, success_count: usize) {
            self.run_success.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_job_start(1, 2, Path::new("a.pdf"));
        cb.on_job_complete(1, 2, Path::new("a.png"));
        cb.on_job_error(2, 2, "exit code 1");
        cb.on_run_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_run_start(2);
        tracker.on_job_start(1, 2, Path::new("hebb_basement.pdf"));
        tracker.on_job_complete(1, 2, Path::new("hebb_intermediate_0000.png"));
        tracker.on_job_start(2, 2, Path::new("hebb_groundfloor.pdf"));
        tracker.on_job_error(2, 2, "convert exited with exit code 1");
        tracker.on_run_complete(2, 1);

        assert_eq!(tracker.run_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.run_success.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(1);
        cb.on_job_start(1, 1, Path::new("x.pdf"));
    }
}
