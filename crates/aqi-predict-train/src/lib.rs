//! # AQI-Predict Model Machinery
//!
//! Deterministic building blocks for the AQI prediction pipeline's trained
//! stages:
//!
//! - [`split`]: seeded shuffles, holdout splits, stratified splits, and
//!   stratified k-fold assignment. Fully reproducible across platforms.
//! - [`outliers`]: interquartile-range outlier bounds and row filtering.
//! - [`regression`]: the standardise → degree-2 polynomial expand → linear
//!   fit pipeline used by the per-city summary-statistic models.
//! - [`forest`]: CART regression trees and the bootstrap-aggregated forest
//!   used by the per-city median models.
//! - [`classifier`]: the depth-limited, class-weight-balanced decision tree
//!   and its cross-validated depth grid search.
//! - [`metrics`]: regression and classification evaluation reports.
//! - [`config`]: the serializable training configuration.
//!
//! Nothing in this crate draws on OS randomness or wall-clock time; every
//! stochastic step is driven by a seed carried in [`config::TrainingConfig`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod classifier;
pub mod config;
pub mod error;
pub mod forest;
pub mod metrics;
pub mod outliers;
pub mod regression;
pub mod split;

// Convenient re-exports at the crate root.
pub use classifier::{balanced_class_weights, tune_depth, ClassificationTree};
pub use config::TrainingConfig;
pub use error::{ConfigError, TrainError, TrainResult};
pub use forest::ForestRegressor;
pub use metrics::{ClassificationReport, RegressionReport};
pub use regression::PolyPipeline;
pub use split::XorShift64;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
