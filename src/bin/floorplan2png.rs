//! CLI binary for floorplan2png.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConverterConfig`, picks a recipe and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use floorplan2png::{
    plan, run_recipe, ConversionProgressCallback, ConverterConfig, ProgressCallback, Recipe,
    RunReport, BUILTIN_RECIPES,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback ────────────────────────────────────────────────────

/// Prints `Processing <file>` before each job and, when attached to a
/// terminal, keeps an [indicatif] bar below the log lines.
struct CliProgressCallback {
    bar: Option<ProgressBar>,
    /// Notices go to stderr when stdout carries JSON.
    notices_to_stderr: bool,
    job_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new(show_bar: bool, notices_to_stderr: bool) -> Arc<Self> {
        let bar = show_bar.then(|| {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {pos:>2}/{len} floors  ⏱ {elapsed_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            bar.set_prefix("Converting");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });

        Arc::new(Self {
            bar,
            notices_to_stderr,
            job_started: Mutex::new(None),
        })
    }

    /// Print a line without tearing the progress bar.
    fn line(&self, text: String, to_stderr: bool) {
        let emit = || {
            if to_stderr {
                eprintln!("{text}");
            } else {
                println!("{text}");
            }
        };
        match self.bar {
            Some(ref bar) => bar.suspend(emit),
            None => emit(),
        }
    }

    fn elapsed(&self) -> String {
        let secs = self
            .job_started
            .lock()
            .unwrap()
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_jobs: usize) {
        if let Some(ref bar) = self.bar {
            bar.set_length(total_jobs as u64);
        }
    }

    fn on_job_start(&self, _index: usize, _total: usize, source: &Path) {
        *self.job_started.lock().unwrap() = Some(Instant::now());
        self.line(
            format!("Processing {}", source.display()),
            self.notices_to_stderr,
        );
        if let Some(ref bar) = self.bar {
            bar.set_message(source.display().to_string());
        }
    }

    fn on_job_complete(&self, index: usize, total: usize, destination: &Path) {
        if let Some(ref bar) = self.bar {
            let elapsed = self.elapsed();
            bar.println(format!(
                "  {} {:>2}/{:<2}  {}  {}",
                green("✓"),
                index,
                total,
                destination.display(),
                elapsed
            ));
            bar.inc(1);
        }
    }

    fn on_job_error(&self, index: usize, total: usize, error: &str) {
        let elapsed = self.elapsed();
        let msg = format!(
            "  {} {:>2}/{:<2}  {}  {}",
            red("✗"),
            index,
            total,
            red(error),
            elapsed
        );
        match self.bar {
            Some(ref bar) => {
                bar.println(msg);
                bar.inc(1);
            }
            None => eprintln!("{msg}"),
        }
    }

    fn on_run_complete(&self, total_jobs: usize, success_count: usize) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
        let failed = total_jobs.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} floors converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} floors converted  ({} failed)",
                if failed == total_jobs {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_jobs,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert the Hennings floors in the current directory
  floorplan2png --recipe henn

  # Same, from the repository root
  floorplan2png --recipe hebb -C static/maps/hebb

  # Show the commands without running them
  floorplan2png --recipe henn --dry-run

  # Custom job list, ImageMagick 7 binary, fail the build on any error
  floorplan2png --manifest annex.json --tool magick --strict

  # Machine-readable report
  floorplan2png --recipe hebb --json > report.json

MANIFEST FORMAT:
  {
    "name": "annex",
    "rotate": 90,
    "jobs": [
      { "source": "annex_first.pdf",
        "extra_args": "-crop 1200x862+215+148",
        "destination": "annex_0001.png" }
    ]
  }

  "rotate" and "extra_args" are optional.

ENVIRONMENT VARIABLES:
  FLOORPLAN2PNG_TOOL      Converter binary (default: convert)
  RUST_LOG                Override the log filter (e.g. floorplan2png=debug)
"#;

/// Batch-convert PDF floor plans to PNG via ImageMagick.
#[derive(Parser, Debug)]
#[command(
    name = "floorplan2png",
    version,
    about = "Batch-convert PDF floor plans to trimmed, background-free PNGs",
    long_about = "Convert each PDF floor plan of a building into a PNG by running ImageMagick \
once per floor with a fixed trim / flatten / flood-fill recipe. Jobs run one at a time in \
listed order; a failing floor is reported and the run continues.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Built-in recipe to run.
    #[arg(
        short,
        long,
        value_parser = clap::builder::PossibleValuesParser::new(BUILTIN_RECIPES),
        conflicts_with = "manifest",
        required_unless_present_any = ["manifest", "list_recipes"]
    )]
    recipe: Option<String>,

    /// JSON manifest describing the jobs to run.
    #[arg(short, long, env = "FLOORPLAN2PNG_MANIFEST")]
    manifest: Option<PathBuf>,

    /// List built-in recipes and exit.
    #[arg(long)]
    list_recipes: bool,

    /// Converter executable.
    #[arg(long, env = "FLOORPLAN2PNG_TOOL", default_value = floorplan2png::DEFAULT_TOOL)]
    tool: String,

    /// Rasterisation density (DPI).
    #[arg(long, env = "FLOORPLAN2PNG_DENSITY", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(1..=1200))]
    density: u32,

    /// Rotate every page clockwise by this many degrees (overrides the recipe).
    #[arg(long, allow_hyphen_values = true, conflicts_with = "no_rotate")]
    rotate: Option<i32>,

    /// Never rotate, even if the recipe asks for it.
    #[arg(long)]
    no_rotate: bool,

    /// Flood-fill colour tolerance in percent.
    #[arg(long, env = "FLOORPLAN2PNG_FUZZ", default_value_t = 5,
          value_parser = clap::value_parser!(u8).range(0..=100))]
    fuzz: u8,

    /// Background colour to flatten onto and flood-fill away.
    #[arg(long, default_value = "white")]
    background: String,

    /// Run the converter in this directory; job paths are relative to it.
    #[arg(short = 'C', long = "dir", env = "FLOORPLAN2PNG_DIR")]
    dir: Option<PathBuf>,

    /// Let the converter write destinations directly instead of staging them.
    #[arg(long)]
    no_atomic: bool,

    /// Print each command line and exit without running anything.
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Exit non-zero if any job failed.
    #[arg(long, env = "FLOORPLAN2PNG_STRICT")]
    strict: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Per-job notices come from the progress callback, so library INFO lines
    // would only duplicate them.
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Recipe listing ───────────────────────────────────────────────────
    if cli.list_recipes {
        return list_recipes(cli.json);
    }

    let recipe = load_recipe(&cli).await?;

    let show_bar = !cli.quiet && !cli.no_progress && !cli.json && !cli.dry_run;
    let progress_cb: Option<ProgressCallback> = if cli.quiet {
        None
    } else {
        let cb = CliProgressCallback::new(show_bar, cli.json);
        Some(cb as Arc<dyn ConversionProgressCallback>)
    };

    let mut config = build_config(&cli, progress_cb)?;
    recipe.apply_to(&mut config);

    // ── Dry run ──────────────────────────────────────────────────────────
    if cli.dry_run {
        for invocation in plan(&recipe.jobs, &config).context("Invalid job list")? {
            println!("{invocation}");
        }
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run_recipe(&recipe, &config)
        .await
        .context("Conversion could not start")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_summary(&report);
    }

    if cli.strict {
        report.into_result().context("Some floors failed to convert")?;
    }

    Ok(())
}

/// Resolve `--recipe` / `--manifest` into a recipe.
async fn load_recipe(cli: &Cli) -> Result<Recipe> {
    match (&cli.recipe, &cli.manifest) {
        (Some(name), _) => Recipe::builtin(name).context("Unknown recipe"),
        (None, Some(path)) => Recipe::load(path)
            .await
            .with_context(|| format!("Failed to load manifest {}", path.display())),
        (None, None) => anyhow::bail!("Specify --recipe <NAME> or --manifest <FILE>"),
    }
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder()
        .tool(cli.tool.clone())
        .density(cli.density)
        .fuzz_percent(cli.fuzz)
        .background(cli.background.clone())
        .atomic_output(!cli.no_atomic);

    if let Some(deg) = cli.rotate {
        builder = builder.rotate(deg);
    }
    if cli.no_rotate {
        builder = builder.no_rotate();
    }
    if let Some(ref dir) = cli.dir {
        builder = builder.working_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn list_recipes(json: bool) -> Result<()> {
    let recipes = BUILTIN_RECIPES
        .iter()
        .map(|name| Recipe::builtin(name))
        .collect::<Result<Vec<_>, _>>()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&recipes).context("Failed to serialise recipes")?
        );
        return Ok(());
    }

    for recipe in recipes {
        let rotate = recipe
            .rotate
            .map(|r| format!("rotate {r}°"))
            .unwrap_or_else(|| "no rotation".to_string());
        println!(
            "{:<6} {} jobs, {}",
            bold(&recipe.name),
            recipe.jobs.len(),
            dim(&rotate)
        );
        for job in &recipe.jobs {
            println!(
                "         {} → {}",
                job.source.display(),
                job.destination.display()
            );
        }
    }
    Ok(())
}

/// Per-failure detail after the run; the callback already printed the tally.
fn print_summary(report: &RunReport) {
    for outcome in report.failures() {
        eprintln!(
            "  {} {}: {}",
            red("✗"),
            outcome.source.display(),
            outcome
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default()
        );
        eprintln!("    {}", dim(&outcome.command));
    }
    eprintln!(
        "   {} ms total",
        dim(&report.stats.total_duration_ms.to_string())
    );
}
