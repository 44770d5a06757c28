//! # AQI-Predict Core
//!
//! Domain vocabulary and deterministic leaf components for the AQI severity
//! prediction pipeline:
//!
//! - [`pollutant`]: the six monitored pollutant codes and the median-model
//!   scope (one pollutant or all pollutants pooled).
//! - [`breakpoints`]: the regulator-defined piecewise-linear concentration to
//!   AQI conversion.
//! - [`severity`]: the six ordered AQI severity categories and their fixed
//!   thresholds.
//! - [`observation`]: the immutable historical observation record, the
//!   `(Date, City)` record key, and CSV ingestion.
//!
//! ## Quick start
//!
//! ```rust
//! use aqi_predict_core::breakpoints::convert;
//! use aqi_predict_core::pollutant::Pollutant;
//! use aqi_predict_core::severity::Severity;
//!
//! let aqi = convert(3.0, Pollutant::Co);
//! assert!((aqi - 16.5).abs() < 1e-12);
//! assert_eq!(Severity::from_aqi(aqi), Severity::VeryGood);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod breakpoints;
pub mod error;
pub mod observation;
pub mod pollutant;
pub mod severity;

// Convenient re-exports at the crate root.
pub use breakpoints::{convert, round_aqi};
pub use error::{CoreError, CoreResult};
pub use observation::{load_observations, Observation, RecordKey};
pub use pollutant::{MedianScope, Pollutant};
pub use severity::Severity;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
