//! # floorplan2png
//!
//! Batch-convert PDF floor plans into trimmed PNGs with a transparent
//! surround, using ImageMagick's `convert` as the rendering engine.
//!
//! Each building has a *recipe*: an ordered list of conversion jobs
//! (source PDF, extra flags such as a crop window, destination PNG) and an
//! optional rotation shared by all of them. Every job becomes one
//! invocation of
//!
//! ```text
//! convert -density 150 <extra> -trim -background white -alpha remove
//!         [-rotate <deg>] -fuzz 5% -fill none -floodfill +0+0 white
//!         -trim <source> <destination>
//! ```
//!
//! run without a shell, one at a time, in listed order. A failing job is
//! recorded and the run moves on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use floorplan2png::{run_recipe, ConverterConfig, Recipe};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let recipe = Recipe::builtin("henn")?;
//!     let config = ConverterConfig::builder()
//!         .working_dir("static/maps/henn")
//!         .build()?;
//!     let report = run_recipe(&recipe, &config).await?;
//!     eprintln!("{}/{} floors converted", report.stats.succeeded, report.stats.total_jobs);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `floorplan2png` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod command;
pub mod config;
pub mod convert;
pub mod error;
pub mod executor;
pub mod job;
pub mod output;
pub mod progress;
pub mod recipe;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use command::{CommandTemplate, Invocation};
pub use config::{ConverterConfig, ConverterConfigBuilder, Rotation, DEFAULT_TOOL};
pub use convert::{plan, run, run_recipe, run_sync, run_with};
pub use error::{ConvertError, JobError};
pub use executor::{Executor, ProcessExit, SystemExecutor};
pub use job::{ConversionJob, Crop, ExtraArgs};
pub use output::{JobOutcome, RunReport, RunStats};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use recipe::{Recipe, BUILTIN_RECIPES};
