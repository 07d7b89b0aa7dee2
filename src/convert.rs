//! Batch conversion entry points.
//!
//! Jobs run strictly one after another: each converter process is awaited
//! before the next job starts, and a failed job never stops the run. Every
//! job produces a [`JobOutcome`] so callers can aggregate failures or ignore
//! them.

use crate::command::{CommandTemplate, Invocation};
use crate::config::ConverterConfig;
use crate::error::{ConvertError, JobError};
use crate::executor::{Executor, SystemExecutor};
use crate::job::ConversionJob;
use crate::output::{JobOutcome, RunReport, RunStats};
use crate::recipe::Recipe;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// Convert every job in order using the system converter.
///
/// # Returns
/// `Ok(RunReport)` once every job has been attempted, even if some or all
/// of them failed (check `report.stats.failed`).
///
/// # Errors
/// Returns `Err(ConvertError)` only before the first job runs: invalid
/// configuration or a job with an empty path.
pub async fn run(
    jobs: &[ConversionJob],
    config: &ConverterConfig,
) -> Result<RunReport, ConvertError> {
    run_with(&SystemExecutor, jobs, config).await
}

/// Run a recipe, applying its rotation unless `config` sets one.
pub async fn run_recipe(
    recipe: &Recipe,
    config: &ConverterConfig,
) -> Result<RunReport, ConvertError> {
    let mut config = config.clone();
    recipe.apply_to(&mut config);
    info!("Running recipe '{}' ({} jobs)", recipe.name, recipe.jobs.len());
    run(&recipe.jobs, &config).await
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(
    jobs: &[ConversionJob],
    config: &ConverterConfig,
) -> Result<RunReport, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(jobs, config))
}

/// The invocations a run would perform, without running anything.
pub fn plan(
    jobs: &[ConversionJob],
    config: &ConverterConfig,
) -> Result<Vec<Invocation>, ConvertError> {
    validate(jobs, config)?;
    let template = CommandTemplate::from_config(config);
    Ok(jobs.iter().map(|job| template.render(job)).collect())
}

/// [`run`] with a caller-supplied [`Executor`].
pub async fn run_with<E: Executor>(
    executor: &E,
    jobs: &[ConversionJob],
    config: &ConverterConfig,
) -> Result<RunReport, ConvertError> {
    validate(jobs, config)?;

    let total_start = Instant::now();
    let template = CommandTemplate::from_config(config);
    let total = jobs.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    let mut outcomes = Vec::with_capacity(total);
    for (i, job) in jobs.iter().enumerate() {
        let index = i + 1;
        info!("Processing {}", job.source().display());
        if let Some(ref cb) = config.progress_callback {
            cb.on_job_start(index, total, job.source());
        }

        let outcome = run_job(executor, &template, job, index, config).await;

        match &outcome.error {
            None => {
                debug!("Wrote {}", job.destination().display());
                if let Some(ref cb) = config.progress_callback {
                    cb.on_job_complete(index, total, job.destination());
                }
            }
            Some(e) => {
                warn!(
                    "Job {}/{} ({}) failed: {}",
                    index,
                    total,
                    job.source().display(),
                    e
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_job_error(index, total, &e.to_string());
                }
            }
        }
        outcomes.push(outcome);
    }

    let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
    let stats = RunStats {
        total_jobs: total,
        succeeded,
        failed: total - succeeded,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Run complete: {}/{} jobs succeeded, {}ms total",
        succeeded, total, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total, succeeded);
    }

    Ok(RunReport { outcomes, stats })
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn validate(jobs: &[ConversionJob], config: &ConverterConfig) -> Result<(), ConvertError> {
    config.validate()?;
    jobs.iter()
        .enumerate()
        .try_for_each(|(i, job)| job.validate(i + 1))
}

/// Execute one job and record what happened. Never fails the run.
async fn run_job<E: Executor>(
    executor: &E,
    template: &CommandTemplate,
    job: &ConversionJob,
    index: usize,
    config: &ConverterConfig,
) -> JobOutcome {
    let start = Instant::now();
    let workdir = config.working_dir.as_deref();
    let destination = on_disk(workdir, job.destination());

    if !tokio::fs::try_exists(on_disk(workdir, job.source()))
        .await
        .unwrap_or(false)
    {
        warn!(
            "Source {} not found; running converter anyway",
            job.source().display()
        );
    }

    let staging = if config.atomic_output {
        stage(&destination)
    } else {
        None
    };

    let staged_at = staging.as_ref().map(|tmp| tmp.to_path_buf());
    let invocation = match staging {
        Some(ref tmp) => template.render_to(job, &tool_output_path(job.destination(), tmp)),
        None => template.render(job),
    };
    let command = invocation.to_string();
    debug!("Running: {}", command);

    let program = template.tool().to_string();
    let (exit_code, error) = match executor.execute(&invocation).await {
        Err(e) => (
            None,
            Some(JobError::SpawnFailed {
                program,
                detail: e.to_string(),
            }),
        ),
        Ok(exit) if !exit.success() => (
            exit.code,
            Some(JobError::ExitFailure {
                program,
                code: exit.code,
            }),
        ),
        Ok(exit) => (exit.code, commit(staging, &destination, program).await.err()),
    };

    if let (Some(_), Some(staged_at)) = (&error, &staged_at) {
        let pages = discard_page_files(staged_at).await;
        if pages > 0 {
            warn!(
                "Converter split {} into {} page files; multi-page sources are not supported",
                job.source().display(),
                pages
            );
        }
    }

    JobOutcome {
        index,
        source: job.source.clone(),
        destination: job.destination.clone(),
        command,
        exit_code,
        error,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

/// Resolve a job path against the converter's working directory.
fn on_disk(workdir: Option<&Path>, path: &Path) -> PathBuf {
    match workdir {
        Some(dir) => dir.join(path),
        None => path.to_path_buf(),
    }
}

/// Reserve a hidden sibling of `destination` with the same extension, so
/// the converter still infers the output format from the file name.
///
/// Returns `None` (direct write) if the directory is not writable; the
/// converter will then report the problem itself.
fn stage(destination: &Path) -> Option<TempPath> {
    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = destination
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let prefix = format!(".{stem}.partial-");
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(&suffix);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // 0666 less the umask, the mode the converter itself would create.
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }

    match builder.tempfile_in(dir) {
        Ok(file) => Some(file.into_temp_path()),
        Err(e) => {
            debug!(
                "Cannot stage output next to {}: {}; writing directly",
                destination.display(),
                e
            );
            None
        }
    }
}

/// The staging path as the converter sees it: relative to its working
/// directory, in the same directory as the job's destination.
fn tool_output_path(destination: &Path, staging: &Path) -> PathBuf {
    match staging.file_name() {
        Some(name) => destination.with_file_name(name),
        None => staging.to_path_buf(),
    }
}

/// Move a successful conversion into place.
async fn commit(
    staging: Option<TempPath>,
    destination: &Path,
    program: String,
) -> Result<(), JobError> {
    let Some(tmp) = staging else {
        return Ok(());
    };

    let written = tokio::fs::metadata(&tmp)
        .await
        .map(|m| m.len() > 0)
        .unwrap_or(false);
    if !written {
        return Err(JobError::MissingOutput {
            program,
            path: destination.to_path_buf(),
        });
    }

    if let Ok(existing) = tokio::fs::metadata(destination).await {
        if let Err(e) = tokio::fs::set_permissions(&tmp, existing.permissions()).await {
            debug!(
                "Cannot carry permissions of {} over: {}",
                destination.display(),
                e
            );
        }
    }

    tmp.persist(destination)
        .map_err(|e| JobError::OutputWriteFailed {
            path: destination.to_path_buf(),
            detail: e.error.to_string(),
        })
}

/// Remove the numbered siblings (`<staging stem>-<n>.<ext>`) a converter
/// writes instead of the staging file when it splits a multi-page source.
/// Returns how many were removed.
async fn discard_page_files(staging: &Path) -> usize {
    let (Some(dir), Some(stem)) = (staging.parent(), staging.file_stem()) else {
        return 0;
    };
    let stem = stem.to_string_lossy();
    let ext = staging.extension().map(|e| e.to_string_lossy().into_owned());

    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        if !is_page_file(&stem, ext.as_deref(), &name.to_string_lossy()) {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("Cannot remove {}: {}", entry.path().display(), e),
        }
    }
    removed
}

fn is_page_file(stem: &str, ext: Option<&str>, name: &str) -> bool {
    let base = match ext {
        Some(ext) => name.strip_suffix(ext).and_then(|n| n.strip_suffix('.')),
        None => Some(name),
    };
    base.and_then(|n| n.strip_prefix(stem))
        .and_then(|n| n.strip_prefix('-'))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}
