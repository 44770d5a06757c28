//! Error types for the core crate.
//!
//! Every module in this crate imports its error type from here rather than
//! defining it inline, keeping the hierarchy centralised. Higher layers
//! coerce [`CoreError`] into their own error types via `#[from]`.

use std::path::PathBuf;
use thiserror::Error;

/// Convenient `Result` alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors produced by domain parsing and historical data ingestion.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A pollutant code outside the six known codes was supplied.
    ///
    /// This is a hard error: the breakpoint table has no default row and
    /// conversion must never silently fall back.
    #[error("unknown pollutant code '{code}' (expected one of co, no2, o3, pm10, pm2.5, so2)")]
    UnknownPollutant {
        /// The code that failed to parse.
        code: String,
    },

    /// A date string matched none of the accepted formats.
    #[error("cannot parse date '{value}': expected dd/mm/yyyy or yyyy-mm-dd")]
    InvalidDate {
        /// The rejected date string.
        value: String,
    },

    /// The historical data file could not be opened or read.
    #[error("cannot read historical data at `{path}`: {source}")]
    Io {
        /// Path being accessed when the error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The historical data file is not valid CSV.
    #[error("CSV error in `{path}`: {source}")]
    Csv {
        /// Path of the malformed file.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// A required column is absent from the historical data header.
    #[error("historical data in `{path}` is missing required column '{column}'")]
    MissingColumn {
        /// Path of the offending file.
        path: PathBuf,
        /// Name of the missing column.
        column: &'static str,
    },
}

impl CoreError {
    /// Construct a [`CoreError::UnknownPollutant`].
    pub fn unknown_pollutant<S: Into<String>>(code: S) -> Self {
        CoreError::UnknownPollutant { code: code.into() }
    }

    /// Construct a [`CoreError::InvalidDate`].
    pub fn invalid_date<S: Into<String>>(value: S) -> Self {
        CoreError::InvalidDate { value: value.into() }
    }

    /// Construct a [`CoreError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io { path: path.into(), source }
    }

    /// Construct a [`CoreError::Csv`].
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        CoreError::Csv { path: path.into(), source }
    }
}
