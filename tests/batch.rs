//! Integration tests that spawn a real child process.
//!
//! ImageMagick is not required: a small shell script stands in for
//! `convert`. It appends its argument list to `calls.log` in its working
//! directory, fails when the source is missing, and otherwise copies the
//! source bytes to the output path.

#![cfg(unix)]

use floorplan2png::{
    run, run_recipe, run_sync, ConversionJob, ConverterConfig, Crop, ExtraArgs, JobError, Recipe,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

// ── Test helpers ─────────────────────────────────────────────────────────────

const FAKE_CONVERT: &str = r#"#!/bin/sh
for arg in "$@"; do src="$dst"; dst="$arg"; done
echo "$*" >> calls.log
[ -f "$src" ] || { echo "fake-convert: unable to open $src" >&2; exit 1; }
cat "$src" > "$dst"
"#;

/// Behaves like the converter on a two-page document: writes
/// `<out>-0.<ext>` and `<out>-1.<ext>` instead of `<out>`.
const FAKE_PAGED_CONVERT: &str = r#"#!/bin/sh
for arg in "$@"; do dst="$arg"; done
echo "page 0" > "${dst%.*}-0.${dst##*.}"
echo "page 1" > "${dst%.*}-1.${dst##*.}"
"#;

struct FakeTools {
    convert: PathBuf,
    paged: PathBuf,
}

/// Paths of the fake converters, written once per test binary so no test
/// can fork while a script is still open for writing.
fn fake_tools() -> &'static FakeTools {
    static TOOLS: OnceLock<FakeTools> = OnceLock::new();
    TOOLS.get_or_init(|| {
        let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR"));
        let write = |name: &str, body: &str| {
            let path = dir.join(name);
            fs::write(&path, body).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        };
        FakeTools {
            convert: write("fake-convert.sh", FAKE_CONVERT),
            paged: write("fake-paged-convert.sh", FAKE_PAGED_CONVERT),
        }
    })
}

fn fake_convert() -> &'static Path {
    &fake_tools().convert
}

fn mode(path: &Path) -> u32 {
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

/// Route library logs through the test harness; `RUST_LOG=debug` shows
/// every command line.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config_in(dir: &Path) -> ConverterConfig {
    init_tracing();
    ConverterConfig::builder()
        .tool(fake_convert().to_string_lossy())
        .working_dir(dir)
        .build()
        .unwrap()
}

fn calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn leftover_staging(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.contains(".partial-"))
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn existing_destinations_are_replaced() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hebb_basement.pdf"), "basement v2").unwrap();
    fs::write(dir.path().join("hebb_groundfloor.pdf"), "ground v2").unwrap();
    fs::write(dir.path().join("hebb_intermediate_0000.png"), "stale").unwrap();

    let jobs = vec![
        ConversionJob::new("hebb_basement.pdf", ExtraArgs::none(), "hebb_intermediate_0000.png"),
        ConversionJob::new("hebb_groundfloor.pdf", ExtraArgs::none(), "hebb_intermediate_0001.png"),
    ];

    let report = run(&jobs, &config_in(dir.path())).await.unwrap();

    assert!(report.all_succeeded(), "{report:?}");
    assert_eq!(
        fs::read_to_string(dir.path().join("hebb_intermediate_0000.png")).unwrap(),
        "basement v2"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("hebb_intermediate_0001.png")).unwrap(),
        "ground v2"
    );
    assert!(leftover_staging(dir.path()).is_empty());
}

#[tokio::test]
async fn failed_job_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("first.pdf"), "one").unwrap();
    fs::write(dir.path().join("third.pdf"), "three").unwrap();
    fs::write(dir.path().join("second.png"), "previous render").unwrap();

    let jobs = vec![
        ConversionJob::new("first.pdf", ExtraArgs::none(), "first.png"),
        ConversionJob::new("second.pdf", ExtraArgs::none(), "second.png"),
        ConversionJob::new("third.pdf", ExtraArgs::none(), "third.png"),
    ];

    let report = run(&jobs, &config_in(dir.path())).await.unwrap();

    let log = calls(dir.path());
    assert_eq!(log.len(), 3, "every job must invoke the converter once");
    assert!(log[0].contains("first.pdf"));
    assert!(log[1].contains("second.pdf"));
    assert!(log[2].contains("third.pdf"));

    assert_eq!(report.stats.succeeded, 2);
    assert_eq!(report.stats.failed, 1);
    assert!(matches!(
        report.outcomes[1].error,
        Some(JobError::ExitFailure { code: Some(1), .. })
    ));
    assert_eq!(
        fs::read_to_string(dir.path().join("second.png")).unwrap(),
        "previous render",
        "a failed job must not clobber the previous output"
    );
    assert_eq!(fs::read_to_string(dir.path().join("third.png")).unwrap(), "three");
    assert!(leftover_staging(dir.path()).is_empty());
}

#[tokio::test]
async fn recipe_flags_reach_the_converter() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = Recipe {
        name: "mini-henn".into(),
        rotate: Some(332),
        jobs: vec![ConversionJob::new(
            "hennings_firstfloor.pdf",
            ExtraArgs::crop(Crop::new(1200, 862, 215, 148)),
            "henn_0001.png",
        )],
    };
    fs::write(dir.path().join("hennings_firstfloor.pdf"), "%PDF").unwrap();

    let report = run_recipe(&recipe, &config_in(dir.path())).await.unwrap();
    assert!(report.all_succeeded());

    let log = calls(dir.path());
    assert!(
        log[0].starts_with("-density 150 -crop 1200x862+215+148 -trim -background white"),
        "{}",
        log[0]
    );
    assert!(log[0].contains("-alpha remove -rotate 332 -fuzz 5%"), "{}", log[0]);
    assert!(report.outcomes[0].command.contains("-rotate 332"));
}

#[tokio::test]
async fn direct_mode_writes_destination_itself() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.pdf"), "alpha").unwrap();
    let config = ConverterConfig::builder()
        .tool(fake_convert().to_string_lossy())
        .working_dir(dir.path())
        .atomic_output(false)
        .build()
        .unwrap();

    let jobs = [ConversionJob::new("a.pdf", ExtraArgs::none(), "a.png")];
    let report = run(&jobs, &config).await.unwrap();

    assert!(report.all_succeeded());
    assert!(calls(dir.path())[0].ends_with("a.pdf a.png"));
    assert_eq!(fs::read_to_string(dir.path().join("a.png")).unwrap(), "alpha");
}

#[tokio::test]
async fn missing_converter_is_reported_per_job() {
    // Initialise the shared scripts first so no fork races their creation.
    let _ = fake_tools();
    let dir = tempfile::tempdir().unwrap();
    let config = ConverterConfig::builder()
        .tool("floorplan2png-missing-converter")
        .working_dir(dir.path())
        .build()
        .unwrap();
    let jobs = Recipe::builtin("hebb").unwrap().jobs;

    let report = run(&jobs, &config).await.unwrap();

    assert_eq!(report.outcomes.len(), 7);
    assert!(report
        .outcomes
        .iter()
        .all(|o| matches!(o.error, Some(JobError::SpawnFailed { .. }))));
    assert!(leftover_staging(dir.path()).is_empty());
}

#[test]
fn sync_wrapper_runs_jobs() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.pdf"), "alpha").unwrap();
    let jobs = [ConversionJob::new("a.pdf", ExtraArgs::none(), "a.png")];

    let report = run_sync(&jobs, &config_in(dir.path())).unwrap();

    assert_eq!(report.stats.succeeded, 1);
    assert!(dir.path().join("a.png").exists());
}

#[tokio::test]
async fn staged_and_direct_outputs_get_the_same_mode() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.pdf"), "alpha").unwrap();
    let jobs = [
        ConversionJob::new("a.pdf", ExtraArgs::none(), "direct.png"),
        ConversionJob::new("a.pdf", ExtraArgs::none(), "staged.png"),
    ];

    let direct = ConverterConfig::builder()
        .tool(fake_convert().to_string_lossy())
        .working_dir(dir.path())
        .atomic_output(false)
        .build()
        .unwrap();
    assert!(run(&jobs[..1], &direct).await.unwrap().all_succeeded());
    assert!(run(&jobs[1..], &config_in(dir.path())).await.unwrap().all_succeeded());

    assert_eq!(
        mode(&dir.path().join("staged.png")),
        mode(&dir.path().join("direct.png"))
    );
}

#[tokio::test]
async fn replaced_destination_keeps_its_mode() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("henn_0001.png");
    fs::write(dir.path().join("a.pdf"), "fresh").unwrap();
    fs::write(&dest, "stale").unwrap();
    fs::set_permissions(&dest, fs::Permissions::from_mode(0o640)).unwrap();

    let jobs = [ConversionJob::new("a.pdf", ExtraArgs::none(), "henn_0001.png")];
    let report = run(&jobs, &config_in(dir.path())).await.unwrap();

    assert!(report.all_succeeded());
    assert_eq!(fs::read_to_string(&dest).unwrap(), "fresh");
    assert_eq!(mode(&dest), 0o640);
}

#[tokio::test]
async fn split_pages_are_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.pdf"), "%PDF two pages").unwrap();
    let config = ConverterConfig::builder()
        .tool(fake_tools().paged.to_string_lossy())
        .working_dir(dir.path())
        .build()
        .unwrap();

    let jobs = [ConversionJob::new("a.pdf", ExtraArgs::none(), "a.png")];
    let report = run(&jobs, &config).await.unwrap();

    assert!(matches!(
        report.outcomes[0].error,
        Some(JobError::MissingOutput { .. })
    ));
    let mut left: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, ["a.pdf"]);
}
