//! Error types for the serving pipeline.
//!
//! ## Hierarchy
//!
//! ```text
//! PipelineError (top-level)
//! ├── MalformedQuery          (query rejected before any stage runs)
//! ├── NoTrainedArtifact       (per-city model absent; absorbed by the
//! │                            orchestrator as absent output fields)
//! ├── MissingFeatureColumns   (stage input incomplete; fatal to the query)
//! ├── KeyMismatch             (narrow/wide record identities diverged)
//! ├── Core / Train            (coerced lower-layer errors)
//! └── Store*                  (artifact persistence)
//! ```
//!
//! The orchestrator's propagation policy: failures with a defined
//! omit-and-continue semantics (`NoTrainedArtifact`) are absorbed; every
//! other failure aborts the query and carries stage, city, and column
//! context so it can be diagnosed without re-running.

use aqi_predict_core::CoreError;
use aqi_predict_train::TrainError;
use std::path::PathBuf;
use thiserror::Error;

/// Convenient `Result` alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Top-level error type for the serving pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The query could not be parsed into the expected shape.
    #[error("malformed query: field `{field}`: {reason}")]
    MalformedQuery {
        /// Query field that failed to parse.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A stage has no trained model for the requested city.
    #[error("no trained artifact for stage `{stage}`, city '{city}'")]
    NoTrainedArtifact {
        /// Stage that was asked to predict.
        stage: &'static str,
        /// City without a model.
        city: String,
    },

    /// A stage's input lacks required feature columns.
    #[error("stage `{stage}` is missing feature columns for city '{city}': {columns:?}")]
    MissingFeatureColumns {
        /// Stage whose input was incomplete.
        stage: &'static str,
        /// City the query addressed.
        city: String,
        /// Names of the absent columns.
        columns: Vec<&'static str>,
    },

    /// The narrow and wide record views disagree on their (Date, City) key.
    #[error("record key mismatch: narrow view has {narrow}, wide view has {wide}")]
    KeyMismatch {
        /// Key of the narrow per-query record.
        narrow: String,
        /// Key of the pivoted wide record.
        wide: String,
    },

    /// A domain-level error (pollutant parsing, data ingestion).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A model training error surfaced by a rebuild.
    #[error(transparent)]
    Train(#[from] TrainError),

    /// Artifact store I/O failure.
    #[error("artifact store I/O at `{path}`: {source}")]
    StoreIo {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Artifact (de)serialization failure.
    #[error("artifact encoding failed: {message}")]
    StoreEncode {
        /// Description of the failure.
        message: String,
    },

    /// An artifact file does not fit the store layout.
    #[error("unrecognised artifact file `{path}`: {message}")]
    StoreFormat {
        /// Offending path.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },
}

impl PipelineError {
    /// Construct a [`PipelineError::MalformedQuery`].
    pub fn malformed_query<S: Into<String>>(field: &'static str, reason: S) -> Self {
        PipelineError::MalformedQuery { field, reason: reason.into() }
    }

    /// Construct a [`PipelineError::NoTrainedArtifact`].
    pub fn no_artifact(stage: &'static str, city: impl Into<String>) -> Self {
        PipelineError::NoTrainedArtifact { stage, city: city.into() }
    }

    /// Construct a [`PipelineError::MissingFeatureColumns`].
    pub fn missing_features(
        stage: &'static str,
        city: impl Into<String>,
        columns: Vec<&'static str>,
    ) -> Self {
        PipelineError::MissingFeatureColumns { stage, city: city.into(), columns }
    }

    /// Construct a [`PipelineError::StoreIo`].
    pub fn store_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::StoreIo { path: path.into(), source }
    }

    /// Construct a [`PipelineError::StoreEncode`].
    pub fn store_encode<S: Into<String>>(message: S) -> Self {
        PipelineError::StoreEncode { message: message.into() }
    }

    /// Construct a [`PipelineError::StoreFormat`].
    pub fn store_format<S: Into<String>>(path: impl Into<PathBuf>, message: S) -> Self {
        PipelineError::StoreFormat { path: path.into(), message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_features_lists_columns() {
        let err = PipelineError::missing_features("median", "Sydney", vec!["count", "variance"]);
        let msg = err.to_string();
        assert!(msg.contains("median"));
        assert!(msg.contains("Sydney"));
        assert!(msg.contains("count"));
        assert!(msg.contains("variance"));
    }

    #[test]
    fn core_errors_coerce() {
        let err: PipelineError = CoreError::unknown_pollutant("nox").into();
        assert!(err.to_string().contains("nox"));
    }
}
