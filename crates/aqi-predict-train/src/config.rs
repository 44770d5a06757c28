//! Training configuration.
//!
//! [`TrainingConfig`] is the single source of truth for every knob the
//! trained stages share: the global seed, the holdout fraction, the outlier
//! rule, the forest size, the classifier depth grid, and the minimum
//! per-city row count. It is serializable via [`serde`] so a build can be
//! stored next to the artifacts it produced.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration for one artifact build.
///
/// All fields have documented defaults. Use [`TrainingConfig::default()`]
/// as a starting point and override individual fields as needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Global seed for every shuffle and bootstrap draw. Default: **42**.
    pub seed: u64,

    /// Fraction of each model's rows held out for evaluation. Default: **0.2**.
    pub holdout_fraction: f64,

    /// IQR multiplier for the outlier rule: rows outside
    /// `[q1 - m*iqr, q3 + m*iqr]` on any monitored column are dropped.
    /// Default: **1.5**.
    pub iqr_multiplier: f64,

    /// Number of bootstrap trees in each median forest. Default: **100**.
    pub forest_trees: usize,

    /// Smallest tree depth tried by the severity depth grid search.
    /// Default: **2**.
    pub depth_grid_min: usize,

    /// Largest tree depth tried by the severity depth grid search
    /// (inclusive). Default: **14**.
    pub depth_grid_max: usize,

    /// Number of cross-validation folds in the depth grid search.
    /// Default: **5**.
    pub cv_folds: usize,

    /// Minimum qualifying rows before a per-city median model is trained;
    /// cities below this are skipped. Default: **5**.
    pub min_city_rows: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            seed: 42,
            holdout_fraction: 0.2,
            iqr_multiplier: 1.5,
            forest_trees: 100,
            depth_grid_min: 2,
            depth_grid_max: 14,
            cv_folds: 5,
            min_city_rows: 5,
        }
    }
}

impl TrainingConfig {
    /// Load a [`TrainingConfig`] from a JSON file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileAccess`] if the file cannot be read,
    /// [`ConfigError::Parse`] for malformed JSON, and any validation error
    /// the loaded values trip.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: TrainingConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize this configuration to pretty-printed JSON at `path`,
    /// creating parent directories if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileAccess`] if the directory cannot be
    /// created or the file cannot be written.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileAccess {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileAccess {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate all fields and return the first problem found.
    ///
    /// # Validated invariants
    ///
    /// - `holdout_fraction` lies strictly inside `(0.0, 1.0)`.
    /// - `iqr_multiplier` is non-negative and finite.
    /// - `forest_trees` is at least 1.
    /// - `depth_grid_min` is at least 1 and at most `depth_grid_max`.
    /// - `cv_folds` is at least 2.
    /// - `min_city_rows` is at least 2 (a split needs both sides).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.holdout_fraction > 0.0 && self.holdout_fraction < 1.0) {
            return Err(ConfigError::invalid_value(
                "holdout_fraction",
                "must be in (0.0, 1.0)",
            ));
        }
        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(ConfigError::invalid_value(
                "iqr_multiplier",
                "must be finite and >= 0.0",
            ));
        }
        if self.forest_trees == 0 {
            return Err(ConfigError::invalid_value("forest_trees", "must be > 0"));
        }
        if self.depth_grid_min == 0 {
            return Err(ConfigError::invalid_value("depth_grid_min", "must be > 0"));
        }
        if self.depth_grid_min > self.depth_grid_max {
            return Err(ConfigError::invalid_value(
                "depth_grid_min",
                "must be <= depth_grid_max",
            ));
        }
        if self.cv_folds < 2 {
            return Err(ConfigError::invalid_value("cv_folds", "must be >= 2"));
        }
        if self.min_city_rows < 2 {
            return Err(ConfigError::invalid_value("min_city_rows", "must be >= 2"));
        }
        Ok(())
    }
}
