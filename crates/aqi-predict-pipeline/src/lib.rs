//! # AQI-Predict Serving Pipeline
//!
//! The three trained stages of the AQI severity pipeline, the artifact
//! cache that holds them, and the orchestrator that sequences them for a
//! single (date, city, pollutant) query.
//!
//! ## Architecture
//!
//! ```text
//! history ──► ArtifactSet::train ──► ArtifactCache (RwLock<Arc<…>>)
//!                                          │ snapshot()
//!                                          ▼
//! Query ──► Orchestrator ──► summary ──► median ──► AQI convert
//!                │                                        │
//!                └──► wide pivot ──► severity ──► join by (Date, City)
//!                                                         │
//!                                                         ▼
//!                                                   QueryRecord
//! ```
//!
//! Stage outputs are typed `Option` fields: a city without a trained
//! artifact produces absent fields, not defaults. Every query either
//! completes the whole sequence or fails with stage, city, and column
//! context; there is no partial-result contract beyond the absent-field
//! semantics.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use aqi_predict_core::load_observations;
//! use aqi_predict_pipeline::{Orchestrator, Query};
//! use aqi_predict_train::TrainingConfig;
//! use std::path::Path;
//!
//! let history = load_observations(Path::new("air_quality.csv")).unwrap();
//! let orchestrator = Orchestrator::train(&history, &TrainingConfig::default()).unwrap();
//!
//! let query = Query::parse("2025-10-14", "Sydney", "pm2.5").unwrap();
//! let record = orchestrator.query(&query).unwrap();
//! println!("median={:?} severity={:?}", record.median, record.severity);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod features;
pub mod median;
pub mod orchestrator;
pub mod severity_model;
pub mod store;
pub mod summary;

// Convenient re-exports at the crate root.
pub use error::{PipelineError, PipelineResult};
pub use median::MedianPredictor;
pub use orchestrator::{Orchestrator, Query, QueryRecord, WideQueryRecord};
pub use severity_model::SeverityModel;
pub use store::{ArtifactCache, ArtifactSet, ArtifactStore, FsArtifactStore};
pub use summary::{SummaryPrediction, SummaryPredictor, SummaryTarget};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
