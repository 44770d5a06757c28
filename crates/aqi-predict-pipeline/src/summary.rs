//! Per-city summary-statistic models.
//!
//! For every city, four independent polynomial regression pipelines map the
//! calendar + one-hot pollutant features to the summary statistics
//! `{count, variance, min, max}`. Artifacts are keyed by (city, target);
//! a missing key yields a typed `None` in the prediction, never a default
//! value — callers must tolerate partial results.

use crate::features;
use aqi_predict_core::{Observation, Pollutant};
use chrono::NaiveDate;
use aqi_predict_train::config::TrainingConfig;
use aqi_predict_train::error::{TrainError, TrainResult};
use aqi_predict_train::metrics::RegressionReport;
use aqi_predict_train::outliers::iqr_filter;
use aqi_predict_train::regression::PolyPipeline;
use aqi_predict_train::split::holdout_split;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// One of the four summary-statistic targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryTarget {
    /// Number of raw measurements in the window.
    Count,
    /// Variance of the measured concentrations.
    Variance,
    /// Minimum measured concentration.
    Min,
    /// Maximum measured concentration.
    Max,
}

impl SummaryTarget {
    /// All targets, in training order.
    pub const ALL: [SummaryTarget; 4] = [
        SummaryTarget::Count,
        SummaryTarget::Variance,
        SummaryTarget::Min,
        SummaryTarget::Max,
    ];

    /// Column name of this target.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SummaryTarget::Count => "count",
            SummaryTarget::Variance => "variance",
            SummaryTarget::Min => "min",
            SummaryTarget::Max => "max",
        }
    }

    /// Parse a column name back into a target.
    #[must_use]
    pub fn from_str_opt(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Read this target's value from an observation.
    #[must_use]
    pub fn value_of(self, obs: &Observation) -> f64 {
        match self {
            SummaryTarget::Count => obs.count,
            SummaryTarget::Variance => obs.variance,
            SummaryTarget::Min => obs.min,
            SummaryTarget::Max => obs.max,
        }
    }
}

/// Per-target outputs of one summary prediction.
///
/// A `None` field means the (city, target) artifact was absent; the column
/// is omitted rather than defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryPrediction {
    /// Predicted measurement count.
    pub count: Option<f64>,
    /// Predicted concentration variance, clamped to be non-negative.
    pub variance: Option<f64>,
    /// Predicted minimum concentration.
    pub min: Option<f64>,
    /// Predicted maximum concentration.
    pub max: Option<f64>,
}

impl SummaryPrediction {
    /// Names of the absent fields, in the median model's feature order.
    #[must_use]
    pub fn missing_columns(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.count.is_none() {
            missing.push("count");
        }
        if self.min.is_none() {
            missing.push("min");
        }
        if self.max.is_none() {
            missing.push("max");
        }
        if self.variance.is_none() {
            missing.push("variance");
        }
        missing
    }

    /// Returns `true` when every field is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_columns().is_empty()
    }
}

/// Trained summary-statistic models, keyed by (city, target).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryPredictor {
    models: HashMap<(String, SummaryTarget), PolyPipeline>,
}

impl SummaryPredictor {
    /// Train one pipeline per (city, target) over the historical table.
    ///
    /// Rows outside the global IQR bounds of any of the four targets are
    /// dropped first. Cities that cannot be split into train and holdout
    /// sides produce no artifacts and are logged, not fatal.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::EmptyDataset`] when `history` is empty.
    pub fn train(history: &[Observation], config: &TrainingConfig) -> TrainResult<Self> {
        if history.is_empty() {
            return Err(TrainError::EmptyDataset);
        }

        let rows = iqr_filter(
            history.to_vec(),
            &[
                &|o: &Observation| o.count,
                &|o: &Observation| o.variance,
                &|o: &Observation| o.min,
                &|o: &Observation| o.max,
            ],
            config.iqr_multiplier,
        );
        debug!(
            "summary training: {} of {} rows within outlier bounds",
            rows.len(),
            history.len()
        );

        let mut by_city: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, obs) in rows.iter().enumerate() {
            by_city.entry(obs.city.as_str()).or_default().push(i);
        }

        let mut models = HashMap::new();
        for (city, indices) in by_city {
            let n = indices.len();
            let (train_idx, eval_idx) = match holdout_split(n, config.holdout_fraction, config.seed)
            {
                Ok(split) => split,
                Err(TrainError::SplitInfeasible { .. }) => {
                    warn!("summary training: city '{city}' has {n} usable rows, no model built");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let mut x = Array2::zeros((n, features::FEATURE_COUNT));
            for (r, &i) in indices.iter().enumerate() {
                x.row_mut(r)
                    .assign(&features::encode(rows[i].date, rows[i].pollutant));
            }
            let x_train = x.select(Axis(0), &train_idx);
            let x_eval = x.select(Axis(0), &eval_idx);

            for target in SummaryTarget::ALL {
                let y = Array1::from_iter(indices.iter().map(|&i| target.value_of(&rows[i])));
                let y_train = y.select(Axis(0), &train_idx);
                let y_eval = y.select(Axis(0), &eval_idx);

                let pipeline = match PolyPipeline::fit(&x_train, &y_train) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(
                            "summary training: {city}/{} fit failed ({e}), no model built",
                            target.as_str()
                        );
                        continue;
                    }
                };

                let report = RegressionReport::evaluate(&y_eval, &pipeline.predict(&x_eval));
                debug!("summary {city}/{}: {}", target.as_str(), report.summary());

                models.insert((city.to_string(), target), pipeline);
            }
        }

        Ok(SummaryPredictor { models })
    }

    /// Predict the four summary statistics for one query.
    ///
    /// Targets without an artifact for `city` come back as `None`. The
    /// variance prediction is clamped to be non-negative.
    #[must_use]
    pub fn predict(&self, city: &str, date: NaiveDate, pollutant: Pollutant) -> SummaryPrediction {
        let row = features::encode(date, pollutant);
        let value = |target: SummaryTarget| {
            self.models
                .get(&(city.to_string(), target))
                .map(|m| m.predict_one(&row))
        };

        SummaryPrediction {
            count: value(SummaryTarget::Count),
            variance: value(SummaryTarget::Variance).map(|v| v.max(0.0)),
            min: value(SummaryTarget::Min),
            max: value(SummaryTarget::Max),
        }
    }

    /// Returns `true` when at least one target model exists for `city`.
    #[must_use]
    pub fn has_city(&self, city: &str) -> bool {
        SummaryTarget::ALL
            .into_iter()
            .any(|t| self.models.contains_key(&(city.to_string(), t)))
    }

    /// Number of trained (city, target) artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` when no artifact was trained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub(crate) fn models(&self) -> &HashMap<(String, SummaryTarget), PolyPipeline> {
        &self.models
    }

    pub(crate) fn from_models(models: HashMap<(String, SummaryTarget), PolyPipeline>) -> Self {
        SummaryPredictor { models }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqi_predict_core::Pollutant;
    use chrono::NaiveDate;

    fn obs(day: u32, city: &str, pollutant: Pollutant, base: f64) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(2021, 3, 1).unwrap() + chrono::Days::new(u64::from(day)),
            city: city.to_string(),
            pollutant,
            count: 20.0 + base,
            min: base,
            max: base * 3.0 + 1.0,
            variance: base / 2.0 + 0.5,
            median: base * 1.5,
        }
    }

    fn small_history(city: &str) -> Vec<Observation> {
        (0..30)
            .map(|d| obs(d, city, Pollutant::Pm25, 2.0 + f64::from(d % 7)))
            .collect()
    }

    #[test]
    fn trains_all_targets_for_a_city() {
        let history = small_history("Sydney");
        let predictor = SummaryPredictor::train(&history, &TrainingConfig::default()).unwrap();
        assert_eq!(predictor.len(), 4);
        assert!(predictor.has_city("Sydney"));
        assert!(!predictor.has_city("Perth"));
    }

    #[test]
    fn predictions_are_complete_for_trained_city() {
        let history = small_history("Sydney");
        let predictor = SummaryPredictor::train(&history, &TrainingConfig::default()).unwrap();
        let p = predictor.predict(
            "Sydney",
            NaiveDate::from_ymd_opt(2021, 3, 10).unwrap(),
            Pollutant::Pm25,
        );
        assert!(p.is_complete());
        assert!(p.variance.unwrap() >= 0.0);
    }

    #[test]
    fn unknown_city_gets_all_none() {
        let history = small_history("Sydney");
        let predictor = SummaryPredictor::train(&history, &TrainingConfig::default()).unwrap();
        let p = predictor.predict(
            "Perth",
            NaiveDate::from_ymd_opt(2021, 3, 10).unwrap(),
            Pollutant::Pm25,
        );
        assert_eq!(p.missing_columns(), vec!["count", "min", "max", "variance"]);
        assert!(!p.is_complete());
    }

    #[test]
    fn single_row_city_is_skipped_not_fatal() {
        let mut history = small_history("Sydney");
        history.push(obs(3, "Tiny", Pollutant::Co, 4.0));
        let predictor = SummaryPredictor::train(&history, &TrainingConfig::default()).unwrap();
        assert!(predictor.has_city("Sydney"));
        assert!(!predictor.has_city("Tiny"));
    }

    #[test]
    fn empty_history_is_rejected() {
        assert!(matches!(
            SummaryPredictor::train(&[], &TrainingConfig::default()),
            Err(TrainError::EmptyDataset)
        ));
    }

    #[test]
    fn target_names_round_trip() {
        for t in SummaryTarget::ALL {
            assert_eq!(SummaryTarget::from_str_opt(t.as_str()), Some(t));
        }
        assert_eq!(SummaryTarget::from_str_opt("median"), None);
    }
}
