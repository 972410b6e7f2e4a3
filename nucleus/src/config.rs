//! Configuration for nucleus segmentation, measurement and persistence.
//!
//! A single flat [`Config`] drives every stage. Parameters are grouped by
//! comments into the stage they tune. [`Config::validate`] checks all numeric
//! ranges once, before any image is processed.

use std::fs;
use std::path::{Path, PathBuf};

use common::{FileExtensionError, SerdeFormat};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

// ============================================================================
// Enums
// ============================================================================

/// Pixel connectivity used by the labeler and the declumping cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Horizontal and vertical neighbors only.
    Four,
    /// Horizontal, vertical and diagonal neighbors.
    #[default]
    Eight,
}

/// Which segmenter produces the foreground mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmenterKind {
    /// Local threshold against a smoothed neighborhood estimate.
    #[default]
    Adaptive,
    /// One Otsu threshold for the whole plane.
    GlobalOtsu,
}

/// Kernel used to estimate the local background of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalMethod {
    /// Gaussian-weighted mean, sigma = radius / 3, truncated at 4 sigma.
    #[default]
    Gaussian,
    /// Uniform mean over the (2r+1)² window.
    Mean,
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while loading or validating a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("neighborhood_radius must be at least 1, got {0}")]
    NeighborhoodRadius(usize),

    #[error("offset must be finite and non-negative, got {0}")]
    Offset(f32),

    #[error("min_area must be at least 1 pixel, got {0}")]
    MinArea(usize),

    #[error("declump_min_distance must be finite and positive, got {0}")]
    DeclumpMinDistance(f32),

    #[error("{name} must be at most {max}, got {value}")]
    RadiusTooLarge {
        name: &'static str,
        value: usize,
        max: usize,
    },

    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Format(#[from] FileExtensionError),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Largest structuring-element radius accepted for closing/opening.
const MAX_MORPHOLOGY_RADIUS: usize = 32;

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // -- Segmentation --------------------------------------------------------
    pub segmenter: SegmenterKind,
    /// Radius in pixels of the window used for the local background estimate.
    pub neighborhood_radius: usize,
    /// How far above the local background a pixel must be to count as foreground.
    pub offset: f32,
    pub local_method: LocalMethod,

    // -- Plane selection -----------------------------------------------------
    pub z_index: usize,
    pub channel_index: usize,

    // -- Cleanup -------------------------------------------------------------
    /// Disk radius for binary closing before cleanup. 0 disables.
    pub closing_radius: usize,
    /// Disk radius for binary opening before cleanup. 0 disables.
    pub opening_radius: usize,
    /// Largest enclosed background hole that gets filled. 0 disables.
    pub max_hole_area: usize,
    /// Smallest accepted nucleus, in pixels.
    pub min_area: usize,
    /// Drop objects touching the image border.
    pub clear_border: bool,
    pub declump: bool,
    /// Minimum distance between declumping seeds, in pixels.
    pub declump_min_distance: f32,
    pub connectivity: Connectivity,

    // -- Persistence ---------------------------------------------------------
    /// Wipe the whole store before the run instead of replacing per image.
    pub overwrite_existing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            segmenter: SegmenterKind::Adaptive,
            neighborhood_radius: 100,
            offset: 0.0,
            local_method: LocalMethod::Gaussian,

            z_index: 0,
            channel_index: 0,

            closing_radius: 3,
            opening_radius: 1,
            max_hole_area: 64,
            min_area: 5,
            clear_border: true,
            declump: false,
            declump_min_distance: 5.0,
            connectivity: Connectivity::Eight,

            overwrite_existing: false,
        }
    }
}

impl Config {
    /// Check every numeric range. Called once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neighborhood_radius == 0 {
            return Err(ConfigError::NeighborhoodRadius(self.neighborhood_radius));
        }
        if !self.offset.is_finite() || self.offset < 0.0 {
            return Err(ConfigError::Offset(self.offset));
        }
        if self.min_area == 0 {
            return Err(ConfigError::MinArea(self.min_area));
        }
        if !self.declump_min_distance.is_finite() || self.declump_min_distance <= 0.0 {
            return Err(ConfigError::DeclumpMinDistance(self.declump_min_distance));
        }
        for (name, value) in [
            ("closing_radius", self.closing_radius),
            ("opening_radius", self.opening_radius),
        ] {
            if value > MAX_MORPHOLOGY_RADIUS {
                return Err(ConfigError::RadiusTooLarge {
                    name,
                    value,
                    max: MAX_MORPHOLOGY_RADIUS,
                });
            }
        }
        Ok(())
    }

    /// Load a config from a YAML or JSON file and validate it.
    ///
    /// Missing fields take their default values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = SerdeFormat::from_path(path)?;
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text, format)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Parse and validate a config from text in the given format.
    pub fn parse(text: &str, format: SerdeFormat) -> Result<Self, ConfigError> {
        let config: Self = match format {
            SerdeFormat::Yaml => serde_yml::from_str(text)?,
            SerdeFormat::Json => serde_json::from_str(text)?,
        };
        config.validate()?;
        Ok(config)
    }
}
