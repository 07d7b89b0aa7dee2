//! Recipes: a building's job list plus the rotation shared by all its jobs.
//!
//! Recipes come either from the built-in presets ([`Recipe::builtin`]) or
//! from a JSON manifest ([`Recipe::load`]):
//!
//! ```json
//! {
//!   "name": "henn",
//!   "rotate": 332,
//!   "jobs": [
//!     { "source": "hennings_firstfloor.pdf",
//!       "extra_args": "-crop 1200x862+215+148",
//!       "destination": "henn_0001.png" }
//!   ]
//! }
//! ```

use crate::config::{ConverterConfig, Rotation};
use crate::error::ConvertError;
use crate::job::{ConversionJob, Crop, ExtraArgs};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Names accepted by [`Recipe::builtin`].
pub const BUILTIN_RECIPES: &[&str] = &["henn", "hebb"];

/// A named, ordered job list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub name: String,
    /// Clockwise rotation applied to every job. `None` means no `-rotate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<i32>,
    pub jobs: Vec<ConversionJob>,
}

impl Recipe {
    /// Look up a built-in recipe by name.
    pub fn builtin(name: &str) -> Result<Self, ConvertError> {
        match name {
            "henn" => Ok(henn()),
            "hebb" => Ok(hebb()),
            other => Err(ConvertError::UnknownRecipe {
                name: other.to_string(),
                available: BUILTIN_RECIPES.join(", "),
            }),
        }
    }

    /// Load a recipe from a JSON manifest file.
    ///
    /// A manifest without a `name` takes the file stem.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConvertError::ManifestRead {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut recipe = Self::from_json(&text).map_err(|e| match e {
            ConvertError::ManifestParse { detail, .. } => ConvertError::ManifestParse {
                path: path.to_path_buf(),
                detail,
            },
            other => other,
        })?;

        if recipe.name.is_empty() {
            recipe.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        debug!(
            "Loaded recipe '{}' ({} jobs) from {}",
            recipe.name,
            recipe.jobs.len(),
            path.display()
        );
        Ok(recipe)
    }

    /// Parse a recipe from manifest JSON and validate its jobs.
    pub fn from_json(text: &str) -> Result<Self, ConvertError> {
        let recipe: Recipe =
            serde_json::from_str(text).map_err(|e| ConvertError::ManifestParse {
                path: Default::default(),
                detail: e.to_string(),
            })?;
        recipe.validate()?;
        Ok(recipe)
    }

    pub fn validate(&self) -> Result<(), ConvertError> {
        self.jobs
            .iter()
            .enumerate()
            .try_for_each(|(i, job)| job.validate(i + 1))
    }

    /// Apply this recipe's rotation to `config` unless the config overrides
    /// it with an explicit angle or [`Rotation::Off`].
    pub fn apply_to(&self, config: &mut ConverterConfig) {
        if config.rotate != Rotation::Inherit {
            return;
        }
        if let Some(deg) = self.rotate {
            config.rotate = Rotation::Degrees(deg.rem_euclid(360));
        }
    }
}

/// Hennings: every floor shares one crop window and a 332° rotation.
fn henn() -> Recipe {
    let crop = Crop::new(1200, 862, 215, 148);
    let floors = [
        "firstfloor",
        "secondfloor",
        "mezzanine",
        "thirdfloor",
        "penthouses",
    ];
    Recipe {
        name: "henn".to_string(),
        rotate: Some(332),
        jobs: floors
            .iter()
            .enumerate()
            .map(|(i, floor)| {
                ConversionJob::new(
                    format!("hennings_{floor}.pdf"),
                    ExtraArgs::crop(crop),
                    format!("henn_{:04}.png", i + 1),
                )
            })
            .collect(),
    }
}

/// Hebb: untouched pages, no rotation, numbered from the basement up.
fn hebb() -> Recipe {
    let floors = [
        "basement",
        "groundfloor",
        "secondfloor",
        "thirdfloor",
        "fourthfloor",
        "fifthfloor",
        "penthouse",
    ];
    Recipe {
        name: "hebb".to_string(),
        rotate: None,
        jobs: floors
            .iter()
            .enumerate()
            .map(|(i, floor)| {
                ConversionJob::new(
                    format!("hebb_{floor}.pdf"),
                    ExtraArgs::none(),
                    format!("hebb_intermediate_{i:04}.png"),
                )
            })
            .collect(),
    }
}
