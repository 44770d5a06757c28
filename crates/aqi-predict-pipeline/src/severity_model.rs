//! The global severity classifier.
//!
//! Historical observations are pivoted to one row per `(Date, City)` with a
//! column per pollutant holding the mean median concentration (absent
//! pollutants contribute 0). Each row is labelled with the severity of the
//! maximum AQI observed for that `(Date, City)` across all pollutants, and
//! a single depth-tuned, class-weight-balanced decision tree is trained on
//! the result.
//!
//! Serving takes the canonical six-pollutant median vector; a pollutant not
//! supplied is concentration 0, not missing data.

use aqi_predict_core::breakpoints::convert;
use aqi_predict_core::{Observation, RecordKey, Severity};
use aqi_predict_train::classifier::{balanced_class_weights, tune_depth, ClassificationTree};
use aqi_predict_train::config::TrainingConfig;
use aqi_predict_train::error::{TrainError, TrainResult};
use aqi_predict_train::metrics::ClassificationReport;
use aqi_predict_train::split::stratified_holdout;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Number of severity classes.
const N_CLASSES: usize = Severity::ALL.len();

/// One pivoted training row: per-pollutant mean medians plus the label.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTrainingRow {
    /// The `(Date, City)` identity of the row.
    pub key: RecordKey,
    /// Mean median concentration per pollutant, canonical order.
    pub medians: [f64; 6],
    /// Severity of the maximum AQI over the group.
    pub label: Severity,
}

/// Pivot observations into wide training rows.
///
/// Grouping is by [`RecordKey`]; within a group each pollutant column is
/// the mean of that pollutant's medians and the label comes from the
/// maximum derived AQI.
#[must_use]
pub fn pivot_history(history: &[Observation]) -> Vec<WideTrainingRow> {
    struct Accumulator {
        sums: [f64; 6],
        counts: [usize; 6],
        max_aqi: f64,
    }

    let mut groups: BTreeMap<RecordKey, Accumulator> = BTreeMap::new();
    for obs in history {
        let aqi = convert(obs.median, obs.pollutant);
        let acc = groups.entry(obs.key()).or_insert(Accumulator {
            sums: [0.0; 6],
            counts: [0; 6],
            max_aqi: f64::NEG_INFINITY,
        });
        let i = obs.pollutant.index();
        acc.sums[i] += obs.median;
        acc.counts[i] += 1;
        acc.max_aqi = acc.max_aqi.max(aqi);
    }

    groups
        .into_iter()
        .map(|(key, acc)| {
            let mut medians = [0.0; 6];
            for i in 0..6 {
                if acc.counts[i] > 0 {
                    #[allow(clippy::cast_precision_loss)]
                    {
                        medians[i] = acc.sums[i] / acc.counts[i] as f64;
                    }
                }
            }
            WideTrainingRow {
                key,
                medians,
                label: Severity::from_aqi(acc.max_aqi),
            }
        })
        .collect()
}

/// The trained global severity classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityModel {
    tree: ClassificationTree,
    depth: usize,
}

impl SeverityModel {
    /// Train the classifier over the full historical table.
    ///
    /// The pivoted rows are split with a class-stratified holdout; the tree
    /// depth comes from a cross-validated grid search on the training side,
    /// and the winning depth's balanced tree is refit on that side. The
    /// holdout classification report is logged.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::EmptyDataset`] when `history` is empty.
    pub fn train(history: &[Observation], config: &TrainingConfig) -> TrainResult<Self> {
        let rows = pivot_history(history);
        if rows.is_empty() {
            return Err(TrainError::EmptyDataset);
        }

        let mut x = Array2::zeros((rows.len(), 6));
        for (r, row) in rows.iter().enumerate() {
            x.row_mut(r).assign(&Array1::from_iter(row.medians));
        }
        let labels: Vec<usize> = rows.iter().map(|r| r.label.index()).collect();

        let (train_idx, eval_idx) =
            stratified_holdout(&labels, config.holdout_fraction, config.seed)?;
        let x_train = x.select(Axis(0), &train_idx);
        let y_train: Vec<usize> = train_idx.iter().map(|&i| labels[i]).collect();

        let depth = tune_depth(
            &x_train,
            &y_train,
            N_CLASSES,
            config.depth_grid_min,
            config.depth_grid_max,
            config.cv_folds,
            config.seed,
        )?;

        let weights = balanced_class_weights(&y_train, N_CLASSES);
        let tree = ClassificationTree::fit(&x_train, &y_train, N_CLASSES, &weights, depth)?;

        if eval_idx.is_empty() {
            debug!("severity training: holdout empty, evaluation skipped");
        } else {
            let y_eval: Vec<usize> = eval_idx.iter().map(|&i| labels[i]).collect();
            let predictions: Vec<usize> = eval_idx
                .iter()
                .map(|&i| tree.predict_row(x.row(i)))
                .collect();
            let report = ClassificationReport::evaluate(&y_eval, &predictions, N_CLASSES);
            info!("severity classifier (depth {depth}): {}", report.summary());
        }

        Ok(SeverityModel { tree, depth })
    }

    /// Predict the severity for a canonical six-pollutant median vector.
    #[must_use]
    pub fn predict(&self, medians: &[f64; 6]) -> Severity {
        let row = Array1::from_iter(*medians);
        let class = self.tree.predict_row(row.view());
        Severity::from_index(class).expect("classifier emits labels on the severity scale")
    }

    /// The depth selected by the grid search.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }
}
