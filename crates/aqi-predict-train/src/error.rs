//! Error types for the model machinery crate.
//!
//! ## Hierarchy
//!
//! ```text
//! TrainError (top-level)
//! ├── ConfigError        (configuration validation / file loading)
//! ├── InsufficientData   (too few rows for a keyed model; logged skip)
//! ├── SplitInfeasible    (cannot hold out at least one sample per side)
//! ├── EmptyDataset       (nothing to train on at all)
//! └── Numerical          (singular system, degenerate input)
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Convenient `Result` alias for training operations.
pub type TrainResult<T> = Result<T, TrainError>;

/// Top-level error type for model training.
#[derive(Debug, Error)]
pub enum TrainError {
    /// A configuration validation or loading error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A keyed model has too few qualifying rows and was not trained.
    ///
    /// Training-time callers treat this as a skip signal for the affected
    /// key, not as a batch failure.
    #[error("insufficient training data for city '{city}' (scope {scope}): {rows} rows, need {required}")]
    InsufficientData {
        /// City whose model was skipped.
        city: String,
        /// Scope the model would have covered.
        scope: String,
        /// Qualifying rows found.
        rows: usize,
        /// Minimum rows required.
        required: usize,
    },

    /// A holdout split cannot place at least one sample on each side.
    #[error("cannot split {n} samples into train and holdout sets")]
    SplitInfeasible {
        /// Total number of samples.
        n: usize,
    },

    /// The dataset is empty and no training can be performed.
    #[error("dataset is empty")]
    EmptyDataset,

    /// A numerical failure (singular system, degenerate input).
    #[error("numerical error: {0}")]
    Numerical(String),
}

impl TrainError {
    /// Construct a [`TrainError::InsufficientData`].
    pub fn insufficient_data(
        city: impl Into<String>,
        scope: impl Into<String>,
        rows: usize,
        required: usize,
    ) -> Self {
        TrainError::InsufficientData {
            city: city.into(),
            scope: scope.into(),
            rows,
            required,
        }
    }

    /// Construct a [`TrainError::Numerical`].
    pub fn numerical<S: Into<String>>(msg: S) -> Self {
        TrainError::Numerical(msg.into())
    }
}

/// Errors produced when loading or validating a [`TrainingConfig`].
///
/// [`TrainingConfig`]: crate::config::TrainingConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A configuration file could not be read or written.
    #[error("cannot access config file `{path}`: {source}")]
    FileAccess {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file contains malformed JSON.
    #[error("cannot parse config file `{path}`: {source}")]
    Parse {
        /// Path being parsed.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Construct a [`ConfigError::InvalidValue`].
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::InvalidValue { field, reason: reason.into() }
    }
}
