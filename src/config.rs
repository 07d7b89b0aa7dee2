//! Configuration types for batch floor-plan conversion.
//!
//! All converter behaviour is controlled through [`ConverterConfig`], built
//! via its [`ConverterConfigBuilder`]. The job list itself is not part of the
//! config: it is passed to [`crate::convert::run`] separately so "which files"
//! and "how to convert a file" stay independent.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Converter binary used when none is configured.
pub const DEFAULT_TOOL: &str = "convert";

/// Rotation setting for a run.
///
/// Recipes carry their own angle; [`Rotation::Inherit`] lets it through,
/// while [`Rotation::Off`] and [`Rotation::Degrees`] override it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rotation {
    /// Use the recipe's angle, if any.
    #[default]
    Inherit,
    /// Never rotate.
    Off,
    /// Clockwise angle in `0..360`.
    Degrees(i32),
}

impl Rotation {
    /// The angle to pass as `-rotate`, if one applies.
    pub fn degrees(self) -> Option<i32> {
        match self {
            Rotation::Degrees(d) => Some(d),
            Rotation::Inherit | Rotation::Off => None,
        }
    }
}

/// Configuration for a conversion run.
///
/// Built via [`ConverterConfig::builder()`] or using
/// [`ConverterConfig::default()`].
///
/// # Example
/// ```rust
/// use floorplan2png::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .tool("magick")
///     .rotate(332)
///     .build()
///     .unwrap();
/// assert_eq!(config.density, 150);
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Converter executable, looked up on `PATH`. Default: `convert`.
    pub tool: String,

    /// Rasterisation density passed as `-density`. Range: 1–1200. Default: 150.
    pub density: u32,

    /// Rotation override. Default: [`Rotation::Inherit`] (no `-rotate` flag
    /// unless a recipe supplies an angle).
    pub rotate: Rotation,

    /// Flood-fill colour tolerance in percent. Range: 0–100. Default: 5.
    pub fuzz_percent: u8,

    /// Colour used to flatten transparency and seed the flood fill. Default: `white`.
    pub background: String,

    /// Directory the converter runs in; job paths are relative to it.
    /// Default: the current process directory.
    pub working_dir: Option<PathBuf>,

    /// Write to a staging file and rename it over the destination only on
    /// success. Default: true.
    ///
    /// With this off the converter writes the destination directly, so a
    /// failing run may leave a truncated file behind.
    pub atomic_output: bool,

    /// Optional progress callback for per-job events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            tool: DEFAULT_TOOL.to_string(),
            density: 150,
            rotate: Rotation::Inherit,
            fuzz_percent: 5,
            background: "white".to_string(),
            working_dir: None,
            atomic_output: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("tool", &self.tool)
            .field("density", &self.density)
            .field("rotate", &self.rotate)
            .field("fuzz_percent", &self.fuzz_percent)
            .field("background", &self.background)
            .field("working_dir", &self.working_dir)
            .field("atomic_output", &self.atomic_output)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check constraints the builder cannot enforce through clamping.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.tool.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "converter tool name must not be empty".into(),
            ));
        }
        if self.density == 0 || self.density > 1200 {
            return Err(ConvertError::InvalidConfig(format!(
                "density must be 1–1200, got {}",
                self.density
            )));
        }
        if self.fuzz_percent > 100 {
            return Err(ConvertError::InvalidConfig(format!(
                "fuzz must be 0–100%, got {}",
                self.fuzz_percent
            )));
        }
        if self.background.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "background colour must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ConverterConfig`].
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.config.tool = tool.into();
        self
    }

    pub fn density(mut self, density: u32) -> Self {
        self.config.density = density.clamp(1, 1200);
        self
    }

    /// Set the rotation angle. Angles are normalised into `0..360`.
    pub fn rotate(mut self, degrees: i32) -> Self {
        self.config.rotate = Rotation::Degrees(degrees.rem_euclid(360));
        self
    }

    /// Disable rotation, including any angle a recipe asks for.
    pub fn no_rotate(mut self) -> Self {
        self.config.rotate = Rotation::Off;
        self
    }

    pub fn fuzz_percent(mut self, pct: u8) -> Self {
        self.config.fuzz_percent = pct.min(100);
        self
    }

    pub fn background(mut self, colour: impl Into<String>) -> Self {
        self.config.background = colour.into();
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.working_dir = Some(dir.into());
        self
    }

    pub fn atomic_output(mut self, v: bool) -> Self {
        self.config.atomic_output = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
