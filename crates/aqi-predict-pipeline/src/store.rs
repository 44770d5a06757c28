//! The artifact set, the shared cache, and persistence.
//!
//! One rebuild produces an immutable [`ArtifactSet`]: every summary
//! pipeline, the median forests for all scopes, the severity classifier,
//! and the configuration they were built with. Queries never train —
//! [`ArtifactCache`] hands them an `Arc` snapshot, and `rebuild` swaps in a
//! fully-built replacement under a single writer. A failed rebuild leaves
//! the previous snapshot untouched.
//!
//! [`ArtifactStore`] is the persistence seam: `FsArtifactStore` lays the
//! set out as one `bincode` file per keyed artifact,
//!
//! ```text
//! <root>/
//!   config.json
//!   summary/<city>__<target>.bin
//!   median/<scope>__<city>.bin
//!   severity/classifier.bin
//! ```

use crate::error::{PipelineError, PipelineResult};
use crate::median::MedianPredictor;
use crate::severity_model::SeverityModel;
use crate::summary::{SummaryPredictor, SummaryTarget};
use aqi_predict_core::{MedianScope, Observation, Pollutant};
use aqi_predict_train::config::TrainingConfig;
use aqi_predict_train::error::TrainResult;
use aqi_predict_train::forest::ForestRegressor;
use aqi_predict_train::regression::PolyPipeline;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

// ---------------------------------------------------------------------------
// ArtifactSet
// ---------------------------------------------------------------------------

/// The immutable product of one training pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSet {
    /// Per-(city, target) summary pipelines.
    pub summary: SummaryPredictor,
    /// Per-scope median predictors.
    pub median: HashMap<MedianScope, MedianPredictor>,
    /// The global severity classifier.
    pub severity: SeverityModel,
    /// Configuration this set was built with.
    pub config: TrainingConfig,
}

impl ArtifactSet {
    /// Every median scope built at rebuild time: the six single-pollutant
    /// scopes plus the pooled scope.
    pub const MEDIAN_SCOPES: [MedianScope; 7] = [
        MedianScope::Single(Pollutant::Co),
        MedianScope::Single(Pollutant::No2),
        MedianScope::Single(Pollutant::O3),
        MedianScope::Single(Pollutant::Pm10),
        MedianScope::Single(Pollutant::Pm25),
        MedianScope::Single(Pollutant::So2),
        MedianScope::All,
    ];

    /// Train a complete artifact set over the historical table.
    ///
    /// # Errors
    ///
    /// Propagates configuration validation and stage training errors; an
    /// empty history is rejected before any stage runs.
    pub fn train(history: &[Observation], config: &TrainingConfig) -> TrainResult<Self> {
        config.validate()?;

        let summary = SummaryPredictor::train(history, config)?;

        let mut median = HashMap::new();
        for scope in Self::MEDIAN_SCOPES {
            let predictor = MedianPredictor::train(history, scope, config)?;
            median.insert(scope, predictor);
        }

        let severity = SeverityModel::train(history, config)?;

        info!(
            "artifact set trained: {} summary pipelines, {} median scopes, \
             severity tree depth {}",
            summary.len(),
            median.len(),
            severity.depth()
        );

        Ok(ArtifactSet {
            summary,
            median,
            severity,
            config: config.clone(),
        })
    }

    /// The median predictor for a scope, if that scope holds any model.
    #[must_use]
    pub fn median_for(&self, scope: MedianScope) -> Option<&MedianPredictor> {
        self.median.get(&scope)
    }
}

// ---------------------------------------------------------------------------
// ArtifactCache
// ---------------------------------------------------------------------------

/// Process-wide, read-mostly cache of the current [`ArtifactSet`].
///
/// Readers clone an `Arc` and keep using their snapshot even while a
/// rebuild is in flight; the writer builds the replacement set entirely
/// off-lock and swaps it in atomically, so no query ever observes a
/// partially retrained model.
#[derive(Debug)]
pub struct ArtifactCache {
    current: RwLock<Arc<ArtifactSet>>,
}

impl ArtifactCache {
    /// Wrap an already-built artifact set.
    #[must_use]
    pub fn new(set: ArtifactSet) -> Self {
        ArtifactCache { current: RwLock::new(Arc::new(set)) }
    }

    /// Train an initial artifact set and wrap it.
    ///
    /// # Errors
    ///
    /// Propagates [`ArtifactSet::train`] failures.
    pub fn train(history: &[Observation], config: &TrainingConfig) -> TrainResult<Self> {
        Ok(Self::new(ArtifactSet::train(history, config)?))
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ArtifactSet> {
        self.current.read().clone()
    }

    /// Retrain from a fresh history snapshot and swap the result in.
    ///
    /// # Errors
    ///
    /// On failure the previous snapshot stays installed.
    pub fn rebuild(&self, history: &[Observation], config: &TrainingConfig) -> TrainResult<()> {
        let replacement = Arc::new(ArtifactSet::train(history, config)?);
        *self.current.write() = replacement;
        info!("artifact cache rebuilt from {} observations", history.len());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ArtifactStore
// ---------------------------------------------------------------------------

/// Persistence seam for trained artifact sets.
pub trait ArtifactStore {
    /// Persist a complete artifact set, replacing any previous contents.
    ///
    /// # Errors
    ///
    /// Implementation-specific I/O or encoding failures.
    fn save(&self, set: &ArtifactSet) -> PipelineResult<()>;

    /// Load a previously persisted artifact set.
    ///
    /// # Errors
    ///
    /// Implementation-specific I/O, decoding, or layout failures.
    fn load(&self) -> PipelineResult<ArtifactSet>;
}

/// Filesystem-backed artifact store: one `bincode` file per keyed artifact.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// A store rooted at `root` (created on first save).
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsArtifactStore { root: root.into() }
    }

    fn summary_dir(&self) -> PathBuf {
        self.root.join("summary")
    }

    fn median_dir(&self) -> PathBuf {
        self.root.join("median")
    }

    fn severity_path(&self) -> PathBuf {
        self.root.join("severity").join("classifier.bin")
    }

    fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Recreate a stage directory, dropping any stale artifact files.
    fn reset_dir(dir: &Path) -> PipelineResult<()> {
        if dir.exists() {
            fs::remove_dir_all(dir).map_err(|e| PipelineError::store_io(dir, e))?;
        }
        fs::create_dir_all(dir).map_err(|e| PipelineError::store_io(dir, e))
    }

    fn write_artifact<T: Serialize>(path: &Path, artifact: &T) -> PipelineResult<()> {
        let bytes = bincode::serialize(artifact)
            .map_err(|e| PipelineError::store_encode(e.to_string()))?;
        fs::write(path, bytes).map_err(|e| PipelineError::store_io(path, e))
    }

    fn read_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> PipelineResult<T> {
        let bytes = fs::read(path).map_err(|e| PipelineError::store_io(path, e))?;
        bincode::deserialize(&bytes).map_err(|e| PipelineError::store_encode(e.to_string()))
    }

    /// File stems of every `.bin` entry in `dir`, sorted.
    fn artifact_stems(dir: &Path) -> PipelineResult<Vec<String>> {
        let mut stems = Vec::new();
        let entries = fs::read_dir(dir).map_err(|e| PipelineError::store_io(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| PipelineError::store_io(dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bin") {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| PipelineError::store_format(&path, "non-UTF-8 file name"))?;
            stems.push(stem.to_string());
        }
        stems.sort_unstable();
        Ok(stems)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn save(&self, set: &ArtifactSet) -> PipelineResult<()> {
        let summary_dir = self.summary_dir();
        Self::reset_dir(&summary_dir)?;
        for ((city, target), pipeline) in set.summary.models() {
            let path = summary_dir.join(format!("{city}__{}.bin", target.as_str()));
            Self::write_artifact(&path, pipeline)?;
        }

        let median_dir = self.median_dir();
        Self::reset_dir(&median_dir)?;
        for (scope, predictor) in &set.median {
            for (city, forest) in predictor.models() {
                let path = median_dir.join(format!("{scope}__{city}.bin"));
                Self::write_artifact(&path, forest)?;
            }
        }

        let severity_path = self.severity_path();
        Self::reset_dir(severity_path.parent().expect("severity path has a parent"))?;
        Self::write_artifact(&severity_path, &set.severity)?;

        set.config.to_json(&self.config_path()).map_err(|e| {
            PipelineError::store_encode(format!("config snapshot failed: {e}"))
        })?;

        info!("artifact set saved under {}", self.root.display());
        Ok(())
    }

    fn load(&self) -> PipelineResult<ArtifactSet> {
        let config = TrainingConfig::from_json(&self.config_path())
            .map_err(aqi_predict_train::TrainError::from)
            .map_err(PipelineError::from)?;

        let summary_dir = self.summary_dir();
        let mut summary_models = HashMap::new();
        for stem in Self::artifact_stems(&summary_dir)? {
            let path = summary_dir.join(format!("{stem}.bin"));
            let (city, target_name) = stem.rsplit_once("__").ok_or_else(|| {
                PipelineError::store_format(&path, "expected `<city>__<target>.bin`")
            })?;
            let target = SummaryTarget::from_str_opt(target_name).ok_or_else(|| {
                PipelineError::store_format(&path, format!("unknown target `{target_name}`"))
            })?;
            let pipeline: PolyPipeline = Self::read_artifact(&path)?;
            summary_models.insert((city.to_string(), target), pipeline);
        }

        let median_dir = self.median_dir();
        let mut median_models: HashMap<MedianScope, HashMap<String, ForestRegressor>> =
            HashMap::new();
        for stem in Self::artifact_stems(&median_dir)? {
            let path = median_dir.join(format!("{stem}.bin"));
            let (scope_name, city) = stem.split_once("__").ok_or_else(|| {
                PipelineError::store_format(&path, "expected `<scope>__<city>.bin`")
            })?;
            let scope: MedianScope = scope_name.parse()?;
            let forest: ForestRegressor = Self::read_artifact(&path)?;
            median_models
                .entry(scope)
                .or_default()
                .insert(city.to_string(), forest);
        }
        let median = median_models
            .into_iter()
            .map(|(scope, models)| (scope, MedianPredictor::from_models(scope, models)))
            .collect();

        let severity: SeverityModel = Self::read_artifact(&self.severity_path())?;

        Ok(ArtifactSet {
            summary: SummaryPredictor::from_models(summary_models),
            median,
            severity,
            config,
        })
    }
}
