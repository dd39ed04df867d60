use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_CORNER_QUALITY, DEFAULT_DETECT_GRID, DEFAULT_DETECT_RESOLUTION,
    DEFAULT_FEATURES_PER_CELL, DEFAULT_MIN_FEATURE_DISTANCE, DEFAULT_MOTION_RESOLUTION,
    DEFAULT_SAMPLE_SIZE_THRESHOLD, DEFAULT_STABILITY_THRESHOLD, DEFAULT_UNIFORMITY_THRESHOLD,
    MIN_FIELD_COLS, MIN_FIELD_ROWS, MIN_SAMPLE_SIZE_THRESHOLD,
};
use crate::error::{Result, StabError};
use crate::frame::Resolution;

/// Settings for [`MotionTracker`](super::MotionTracker).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Grid size of the produced motion fields. 2×2 tracks a single global
    /// transform; anything larger fits local motion.
    #[serde(default = "default_motion_resolution")]
    pub motion_resolution: Resolution,
    /// Frames are downsampled to this resolution before tracking.
    #[serde(default = "default_detect_resolution")]
    pub detect_resolution: Resolution,
    /// Minimum number of correspondences needed to track a frame.
    #[serde(default = "default_sample_size_threshold")]
    pub sample_size_threshold: usize,
    /// Minimum feature distribution quality (0.0..=1.0).
    #[serde(default = "default_uniformity_threshold")]
    pub uniformity_threshold: f32,
    /// Minimum inlier ratio (0.0..=1.0).
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold: f32,
    #[serde(default)]
    pub detector: DetectorConfig,
}

fn default_motion_resolution() -> Resolution {
    DEFAULT_MOTION_RESOLUTION.into()
}

fn default_detect_resolution() -> Resolution {
    DEFAULT_DETECT_RESOLUTION.into()
}

fn default_sample_size_threshold() -> usize {
    DEFAULT_SAMPLE_SIZE_THRESHOLD
}

fn default_uniformity_threshold() -> f32 {
    DEFAULT_UNIFORMITY_THRESHOLD
}

fn default_stability_threshold() -> f32 {
    DEFAULT_STABILITY_THRESHOLD
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            motion_resolution: default_motion_resolution(),
            detect_resolution: default_detect_resolution(),
            sample_size_threshold: default_sample_size_threshold(),
            uniformity_threshold: default_uniformity_threshold(),
            stability_threshold: default_stability_threshold(),
            detector: DetectorConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Whether the tracker estimates a single global transform.
    pub fn is_global(&self) -> bool {
        self.motion_resolution == Resolution::new(MIN_FIELD_COLS, MIN_FIELD_ROWS)
    }

    /// Check every setting, describing the first invalid one.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(StabError::InvalidConfig(msg));

        if self.motion_resolution.width < MIN_FIELD_COLS
            || self.motion_resolution.height < MIN_FIELD_ROWS
        {
            return invalid(format!(
                "motion_resolution must be at least {MIN_FIELD_COLS}x{MIN_FIELD_ROWS}, got {}",
                self.motion_resolution
            ));
        }
        if self.detect_resolution.area() == 0 {
            return invalid(format!(
                "detect_resolution must be non-empty, got {}",
                self.detect_resolution
            ));
        }
        if self.sample_size_threshold < MIN_SAMPLE_SIZE_THRESHOLD {
            return invalid(format!(
                "sample_size_threshold must be at least {MIN_SAMPLE_SIZE_THRESHOLD}, got {}",
                self.sample_size_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.uniformity_threshold) {
            return invalid(format!(
                "uniformity_threshold must be in [0, 1], got {}",
                self.uniformity_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.stability_threshold) {
            return invalid(format!(
                "stability_threshold must be in [0, 1], got {}",
                self.stability_threshold
            ));
        }
        self.detector.validate()
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: TrackerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Settings for the feature detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Features are spread over a grid of this many cells (cols × rows).
    #[serde(default = "default_detect_grid")]
    pub grid: Resolution,
    /// Maximum features kept per grid cell.
    #[serde(default = "default_features_per_cell")]
    pub features_per_cell: usize,
    /// Corner responses below this fraction of the strongest are ignored.
    #[serde(default = "default_corner_quality")]
    pub corner_quality: f32,
    /// Minimum spacing between features, in tracking pixels.
    #[serde(default = "default_min_feature_distance")]
    pub min_feature_distance: f32,
}

fn default_detect_grid() -> Resolution {
    DEFAULT_DETECT_GRID.into()
}

fn default_features_per_cell() -> usize {
    DEFAULT_FEATURES_PER_CELL
}

fn default_corner_quality() -> f32 {
    DEFAULT_CORNER_QUALITY
}

fn default_min_feature_distance() -> f32 {
    DEFAULT_MIN_FEATURE_DISTANCE
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            grid: default_detect_grid(),
            features_per_cell: default_features_per_cell(),
            corner_quality: default_corner_quality(),
            min_feature_distance: default_min_feature_distance(),
        }
    }
}

impl DetectorConfig {
    /// Upper bound on the number of features one detection can return.
    pub fn capacity(&self) -> usize {
        self.grid.area() * self.features_per_cell
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid.area() == 0 {
            return Err(StabError::InvalidConfig(format!(
                "detector grid must be non-empty, got {}",
                self.grid
            )));
        }
        if self.features_per_cell == 0 {
            return Err(StabError::InvalidConfig(
                "detector features_per_cell must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.corner_quality) {
            return Err(StabError::InvalidConfig(format!(
                "detector corner_quality must be in [0, 1], got {}",
                self.corner_quality
            )));
        }
        if self.min_feature_distance.is_nan() || self.min_feature_distance < 0.0 {
            return Err(StabError::InvalidConfig(format!(
                "detector min_feature_distance must be non-negative, got {}",
                self.min_feature_distance
            )));
        }
        Ok(())
    }
}
