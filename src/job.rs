//! Conversion jobs: one (source, extra arguments, destination) triple each.
//!
//! Extra arguments are authored as a single flag fragment such as
//! `-crop 1200x862+215+148`. They are split on whitespace into separate
//! argument tokens and never handed to a shell, so a fragment can add flags
//! to the converter but cannot chain commands or expand globs.

use crate::error::ConvertError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Pixel geometry with offsets: `<width>x<height>+<x>+<y>`.
static GEOMETRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)x(\d+)([+-]\d+)([+-]\d+)$").expect("geometry regex is valid")
});

/// Any ImageMagick geometry: optional size (percent allowed), size flags,
/// optional offsets. Matches `1200x862`, `50%x50%+0+0`, `x862`, `800>`.
static LOOSE_GEOMETRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d+(\.\d+)?%?)?(x(\d+(\.\d+)?%?)?)?[%!<>^@]*([+-]\d+(\.\d+)?){0,2}$",
    )
    .expect("loose geometry regex is valid")
});

/// Whether `value` is something the converter accepts as a geometry.
fn is_geometry(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit()) && LOOSE_GEOMETRY_RE.is_match(value)
}

/// A crop rectangle in the converter's geometry syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    pub width: u32,
    pub height: u32,
    pub x_offset: i32,
    pub y_offset: i32,
}

impl Crop {
    pub fn new(width: u32, height: u32, x_offset: i32, y_offset: i32) -> Self {
        Self {
            width,
            height,
            x_offset,
            y_offset,
        }
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}{:+}{:+}",
            self.width, self.height, self.x_offset, self.y_offset
        )
    }
}

impl FromStr for Crop {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConvertError::InvalidGeometry(s.to_string());
        let caps = GEOMETRY_RE.captures(s.trim()).ok_or_else(invalid)?;
        let num = |i: usize| caps.get(i).map(|m| m.as_str()).ok_or_else(invalid);

        Ok(Self {
            width: num(1)?.parse().map_err(|_| invalid())?,
            height: num(2)?.parse().map_err(|_| invalid())?,
            x_offset: num(3)?.parse().map_err(|_| invalid())?,
            y_offset: num(4)?.parse().map_err(|_| invalid())?,
        })
    }
}

/// Extra converter flags inserted after the density flag.
///
/// Stored as individual argument tokens. An empty fragment yields no
/// tokens, so it contributes nothing to the invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraArgs(Vec<String>);

impl ExtraArgs {
    pub fn none() -> Self {
        Self::default()
    }

    /// The `-crop <geometry>` fragment.
    pub fn crop(crop: Crop) -> Self {
        Self(vec!["-crop".to_string(), crop.to_string()])
    }

    /// Parse an authored flag fragment.
    ///
    /// Tokens are split on whitespace. A `-crop` flag must be followed by
    /// something shaped like a geometry (sizes, percentages and offsets are
    /// all accepted); other flags pass through uninterpreted.
    pub fn parse(fragment: &str) -> Result<Self, ConvertError> {
        let tokens: Vec<String> = fragment.split_whitespace().map(str::to_string).collect();

        let mut iter = tokens.iter();
        while let Some(tok) = iter.next() {
            if tok == "-crop" {
                let value = iter.next().ok_or_else(|| ConvertError::InvalidExtraArgs {
                    fragment: fragment.to_string(),
                    reason: "-crop requires a geometry value".to_string(),
                })?;
                if !is_geometry(value) {
                    return Err(ConvertError::InvalidGeometry(value.clone()));
                }
            }
        }

        Ok(Self(tokens))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// The crop geometry these arguments request, if any.
    pub fn crop_geometry(&self) -> Option<Crop> {
        self.0
            .windows(2)
            .find(|w| w[0] == "-crop")
            .and_then(|w| w[1].parse().ok())
    }
}

impl fmt::Display for ExtraArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl Serialize for ExtraArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ExtraArgs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fragment = String::deserialize(deserializer)?;
        ExtraArgs::parse(&fragment).map_err(serde::de::Error::custom)
    }
}

/// One file conversion: render `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    pub source: PathBuf,
    #[serde(default, skip_serializing_if = "ExtraArgs::is_empty")]
    pub extra_args: ExtraArgs,
    pub destination: PathBuf,
}

impl ConversionJob {
    pub fn new(
        source: impl Into<PathBuf>,
        extra_args: ExtraArgs,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: source.into(),
            extra_args,
            destination: destination.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Reject jobs with an empty source or destination.
    pub(crate) fn validate(&self, index: usize) -> Result<(), ConvertError> {
        if self.source.as_os_str().is_empty() {
            return Err(ConvertError::IncompleteJob {
                index,
                field: "source",
            });
        }
        if self.destination.as_os_str().is_empty() {
            return Err(ConvertError::IncompleteJob {
                index,
                field: "destination",
            });
        }
        Ok(())
    }
}
