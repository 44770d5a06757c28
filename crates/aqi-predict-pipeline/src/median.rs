//! Per-city median concentration models.
//!
//! For each city inside a [`MedianScope`], a bootstrap forest maps the four
//! summary statistics `[count, min, max, variance]` to a median
//! concentration. Cities with fewer than the configured minimum of
//! qualifying rows are skipped at training time: they are simply absent
//! from the artifact map, which serving reports as an explicit
//! no-trained-artifact outcome, never a guess.
//!
//! Serving requires all four features; an incomplete input fails with the
//! exact list of missing column names. The returned median is clamped to be
//! non-negative — a concentration cannot be negative, so the clamp is a
//! correctness invariant rather than a heuristic.

use crate::error::{PipelineError, PipelineResult};
use crate::summary::SummaryPrediction;
use aqi_predict_core::{MedianScope, Observation};
use aqi_predict_train::config::TrainingConfig;
use aqi_predict_train::error::{TrainError, TrainResult};
use aqi_predict_train::forest::ForestRegressor;
use aqi_predict_train::metrics::RegressionReport;
use aqi_predict_train::outliers::iqr_filter;
use aqi_predict_train::split::holdout_split;
use ndarray::{array, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Stage name used in error context.
const STAGE: &str = "median";

/// Trained median models for one scope, keyed by city.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedianPredictor {
    scope: MedianScope,
    models: HashMap<String, ForestRegressor>,
}

impl MedianPredictor {
    /// Train one forest per city with enough qualifying rows.
    ///
    /// Outlier bounds are computed globally over all pollutants before the
    /// scope filter is applied, so a scope sees the same row set the pooled
    /// model would.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::EmptyDataset`] when `history` is empty.
    pub fn train(
        history: &[Observation],
        scope: MedianScope,
        config: &TrainingConfig,
    ) -> TrainResult<Self> {
        if history.is_empty() {
            return Err(TrainError::EmptyDataset);
        }

        let rows = iqr_filter(
            history.to_vec(),
            &[
                &|o: &Observation| o.count,
                &|o: &Observation| o.min,
                &|o: &Observation| o.max,
                &|o: &Observation| o.variance,
                &|o: &Observation| o.median,
            ],
            config.iqr_multiplier,
        );

        let mut by_city: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, obs) in rows.iter().enumerate() {
            if scope.contains(obs.pollutant) {
                by_city.entry(obs.city.as_str()).or_default().push(i);
            }
        }

        let mut models = HashMap::new();
        for (city, indices) in by_city {
            let n = indices.len();
            if n < config.min_city_rows {
                let skip = TrainError::insufficient_data(
                    city,
                    scope.to_string(),
                    n,
                    config.min_city_rows,
                );
                info!("median training: skipping: {skip}");
                continue;
            }

            let (train_idx, eval_idx) = match holdout_split(n, config.holdout_fraction, config.seed)
            {
                Ok(split) => split,
                Err(TrainError::SplitInfeasible { .. }) => {
                    warn!("median training: city '{city}' cannot be split, no model built");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let mut x = Array2::zeros((n, 4));
            for (r, &i) in indices.iter().enumerate() {
                let o = &rows[i];
                x.row_mut(r).assign(&array![o.count, o.min, o.max, o.variance]);
            }
            let y = Array1::from_iter(indices.iter().map(|&i| rows[i].median));

            let x_train = x.select(Axis(0), &train_idx);
            let y_train = y.select(Axis(0), &train_idx);
            let forest = ForestRegressor::fit(&x_train, &y_train, config.forest_trees, config.seed)?;

            let x_eval = x.select(Axis(0), &eval_idx);
            let y_eval = y.select(Axis(0), &eval_idx);
            let predictions =
                Array1::from_iter(x_eval.rows().into_iter().map(|r| forest.predict_row(r)));
            let report = RegressionReport::evaluate(&y_eval, &predictions);
            debug!("median {city} (scope {scope}): {}", report.summary());

            models.insert(city.to_string(), forest);
        }

        Ok(MedianPredictor { scope, models })
    }

    /// Predict the median concentration for one query.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NoTrainedArtifact`] when `city` has no model in
    ///   this scope.
    /// - [`PipelineError::MissingFeatureColumns`] when any of the four
    ///   summary features is absent, naming exactly the missing columns.
    pub fn predict(&self, city: &str, summary: &SummaryPrediction) -> PipelineResult<f64> {
        let forest = self
            .models
            .get(city)
            .ok_or_else(|| PipelineError::no_artifact(STAGE, city))?;

        match (summary.count, summary.min, summary.max, summary.variance) {
            (Some(count), Some(min), Some(max), Some(variance)) => {
                let row = array![count, min, max, variance];
                // A median concentration cannot be negative.
                Ok(forest.predict_row(row.view()).max(0.0))
            }
            _ => Err(PipelineError::missing_features(
                STAGE,
                city,
                summary.missing_columns(),
            )),
        }
    }

    /// The scope this predictor was trained for.
    #[must_use]
    pub fn scope(&self) -> MedianScope {
        self.scope
    }

    /// Cities with a trained model, sorted.
    #[must_use]
    pub fn trained_cities(&self) -> Vec<&str> {
        let mut cities: Vec<&str> = self.models.keys().map(String::as_str).collect();
        cities.sort_unstable();
        cities
    }

    /// Returns `true` when `city` has a trained model.
    #[must_use]
    pub fn has_city(&self, city: &str) -> bool {
        self.models.contains_key(city)
    }

    pub(crate) fn models(&self) -> &HashMap<String, ForestRegressor> {
        &self.models
    }

    pub(crate) fn from_models(scope: MedianScope, models: HashMap<String, ForestRegressor>) -> Self {
        MedianPredictor { scope, models }
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

    fn history() -> Vec<Observation> {
        let mut rows = Vec::new();
        for d in 0..30 {
            rows.push(obs(d, "Sydney", Pollutant::Pm25, 2.0 + f64::from(d % 7)));
        }
        // Only 4 pm2.5 rows for Perth: below the default minimum of 5.
        for d in 0..4 {
            rows.push(obs(d, "Perth", Pollutant::Pm25, 3.0 + f64::from(d)));
        }
        rows
    }

    fn complete_summary(base: f64) -> SummaryPrediction {
        SummaryPrediction {
            count: Some(20.0 + base),
            variance: Some(base / 2.0 + 0.5),
            min: Some(base),
            max: Some(base * 3.0 + 1.0),
        }
    }

    #[test]
    fn predicts_non_negative_median_for_trained_city() {
        let cfg = TrainingConfig { forest_trees: 20, ..TrainingConfig::default() };
        let predictor =
            MedianPredictor::train(&history(), MedianScope::Single(Pollutant::Pm25), &cfg).unwrap();
        let m = predictor.predict("Sydney", &complete_summary(4.0)).unwrap();
        assert!(m >= 0.0);
        // Training medians sit in [3, 12]; the forest should stay nearby.
        assert!(m <= 12.0 + 1e-9, "median {m} outside training range");
    }

    #[test]
    fn city_below_minimum_rows_is_absent() {
        let cfg = TrainingConfig { forest_trees: 10, ..TrainingConfig::default() };
        let predictor =
            MedianPredictor::train(&history(), MedianScope::Single(Pollutant::Pm25), &cfg).unwrap();
        assert!(predictor.has_city("Sydney"));
        assert!(!predictor.has_city("Perth"));
        assert_eq!(predictor.trained_cities(), vec!["Sydney"]);
    }

    #[test]
    fn unknown_city_is_an_explicit_no_artifact() {
        let cfg = TrainingConfig { forest_trees: 10, ..TrainingConfig::default() };
        let predictor =
            MedianPredictor::train(&history(), MedianScope::Single(Pollutant::Pm25), &cfg).unwrap();
        let err = predictor.predict("Hobart", &complete_summary(4.0)).unwrap_err();
        assert!(matches!(err, PipelineError::NoTrainedArtifact { city, .. } if city == "Hobart"));
    }

    #[test]
    fn missing_features_are_named() {
        let cfg = TrainingConfig { forest_trees: 10, ..TrainingConfig::default() };
        let predictor =
            MedianPredictor::train(&history(), MedianScope::Single(Pollutant::Pm25), &cfg).unwrap();

        let partial = SummaryPrediction {
            count: Some(24.0),
            variance: None,
            min: None,
            max: Some(13.0),
        };
        let err = predictor.predict("Sydney", &partial).unwrap_err();
        match err {
            PipelineError::MissingFeatureColumns { columns, .. } => {
                assert_eq!(columns, vec!["min", "variance"]);
            }
            other => panic!("expected MissingFeatureColumns, got {other}"),
        }
    }

    #[test]
    fn scope_filter_excludes_other_pollutants() {
        let mut rows = history();
        // Plenty of co rows for Hobart, but none for pm2.5.
        for d in 0..20 {
            rows.push(obs(d, "Hobart", Pollutant::Co, 1.0 + f64::from(d % 5)));
        }
        let cfg = TrainingConfig { forest_trees: 10, ..TrainingConfig::default() };
        let pm = MedianPredictor::train(&rows, MedianScope::Single(Pollutant::Pm25), &cfg).unwrap();
        assert!(!pm.has_city("Hobart"));

        let pooled = MedianPredictor::train(&rows, MedianScope::All, &cfg).unwrap();
        assert!(pooled.has_city("Hobart"));
    }

    #[test]
    fn clamp_applies_to_adversarial_inputs() {
        let cfg = TrainingConfig { forest_trees: 10, ..TrainingConfig::default() };
        let predictor =
            MedianPredictor::train(&history(), MedianScope::Single(Pollutant::Pm25), &cfg).unwrap();

        // Far outside the training range in every direction.
        let adversarial = SummaryPrediction {
            count: Some(-1.0e9),
            variance: Some(-1.0e9),
            min: Some(-1.0e9),
            max: Some(-1.0e9),
        };
        let m = predictor.predict("Sydney", &adversarial).unwrap();
        assert!(m >= 0.0);
    }

    #[test]
    fn empty_history_is_rejected() {
        assert!(matches!(
            MedianPredictor::train(&[], MedianScope::All, &TrainingConfig::default()),
            Err(TrainError::EmptyDataset)
        ));
    }
}
