//! Query orchestration: one (date, city, pollutant) in, one record out.
//!
//! The orchestrator sequences the trained stages over a cache snapshot:
//!
//! 1. Build the 1-row query record.
//! 2. Summary stage: merge whatever per-target predictions exist for the
//!    city (absent artifacts leave the fields `None`).
//! 3. Median stage, scoped to the query's pollutant: a missing per-city
//!    artifact is absorbed (the median stays absent); incomplete summary
//!    input aborts the query with the missing column names.
//! 4. AQI conversion when a median exists, else AQI and its rounding stay
//!    absent.
//! 5. Pivot into the wide per-pollutant layout (the query's pollutant
//!    column carries the median, every other column is 0).
//! 6. Severity classification over the wide layout.
//! 7. Join the label back onto the narrow record by `(Date, City)` key;
//!    a key mismatch between the two views is surfaced, never ignored.
//!
//! With an unchanged snapshot the whole sequence is a pure function of the
//! query: identical queries produce identical records.

use crate::error::{PipelineError, PipelineResult};
use crate::store::ArtifactCache;
use aqi_predict_core::breakpoints::{convert, round_aqi};
use aqi_predict_core::{MedianScope, Observation, Pollutant, RecordKey, Severity};
use aqi_predict_train::config::TrainingConfig;
use aqi_predict_train::error::TrainResult;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A parsed, validated prediction query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Date the prediction is for.
    pub date: NaiveDate,
    /// City the prediction is for (case-sensitive model key).
    pub city: String,
    /// Pollutant whose median and AQI are requested.
    pub pollutant: Pollutant,
}

impl Query {
    /// Build a query from already-typed parts.
    ///
    /// # Errors
    ///
    /// Rejects an empty city name.
    pub fn new(date: NaiveDate, city: impl Into<String>, pollutant: Pollutant) -> PipelineResult<Self> {
        let city = city.into();
        if city.trim().is_empty() {
            return Err(PipelineError::malformed_query("city", "must not be empty"));
        }
        Ok(Query { date, city, pollutant })
    }

    /// Parse a query from wire strings.
    ///
    /// The date must be ISO-8601 (`yyyy-mm-dd`) and the pollutant one of
    /// the six known codes. Parsing failures reject the query before any
    /// stage runs.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MalformedQuery`] naming the offending field.
    pub fn parse(date: &str, city: &str, pollutant: &str) -> PipelineResult<Self> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            PipelineError::malformed_query("date", format!("`{date}` is not a yyyy-mm-dd date"))
        })?;
        let pollutant: Pollutant = pollutant
            .parse()
            .map_err(|e| PipelineError::malformed_query("pollutant", format!("{e}")))?;
        Self::new(date, city, pollutant)
    }

    /// The `(Date, City)` identity of this query.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.date, self.city.clone())
    }
}

// ---------------------------------------------------------------------------
// Record shapes
// ---------------------------------------------------------------------------

/// The enriched single-row result of one query.
///
/// Fields of failed or skipped stages are absent rather than defaulted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRecord {
    /// Query date.
    pub date: NaiveDate,
    /// Query city.
    pub city: String,
    /// Query pollutant.
    pub pollutant: Pollutant,
    /// Predicted measurement count.
    pub count: Option<f64>,
    /// Predicted concentration variance.
    pub variance: Option<f64>,
    /// Predicted minimum concentration.
    pub min: Option<f64>,
    /// Predicted maximum concentration.
    pub max: Option<f64>,
    /// Predicted median concentration (never negative when present).
    pub median: Option<f64>,
    /// AQI derived from the median.
    pub aqi: Option<f64>,
    /// AQI rounded to the nearest integer, ties to even.
    pub rounded_aqi: Option<i64>,
    /// Predicted severity category.
    pub severity: Option<Severity>,
}

impl QueryRecord {
    /// The `(Date, City)` identity of this record.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.date, self.city.clone())
    }
}

/// The wide per-pollutant view of one query, sharing the narrow record's
/// `(Date, City)` identity.
#[derive(Debug, Clone, PartialEq)]
pub struct WideQueryRecord {
    /// The `(Date, City)` identity shared with the narrow record.
    pub key: RecordKey,
    /// Median concentration per pollutant in canonical order; pollutants
    /// the query did not supply are 0.
    pub medians: [f64; 6],
}

impl WideQueryRecord {
    /// Pivot a single query into the wide layout.
    #[must_use]
    pub fn from_query(query: &Query, median: Option<f64>) -> Self {
        let mut medians = [0.0; 6];
        if let Some(m) = median {
            medians[query.pollutant.index()] = m;
        }
        WideQueryRecord { key: query.key(), medians }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Sequences the trained stages for individual queries.
#[derive(Debug)]
pub struct Orchestrator {
    cache: ArtifactCache,
}

impl Orchestrator {
    /// Wrap an existing artifact cache.
    #[must_use]
    pub fn new(cache: ArtifactCache) -> Self {
        Orchestrator { cache }
    }

    /// Train an initial artifact set and wrap it.
    ///
    /// # Errors
    ///
    /// Propagates training failures.
    pub fn train(history: &[Observation], config: &TrainingConfig) -> TrainResult<Self> {
        Ok(Self::new(ArtifactCache::train(history, config)?))
    }

    /// The underlying cache (for rebuilds and snapshot inspection).
    #[must_use]
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Retrain all artifacts from a fresh history snapshot.
    ///
    /// # Errors
    ///
    /// On failure the previously installed artifacts keep serving.
    pub fn rebuild(&self, history: &[Observation], config: &TrainingConfig) -> TrainResult<()> {
        self.cache.rebuild(history, config)
    }

    /// Run the full stage sequence for one query.
    ///
    /// # Errors
    ///
    /// Aborts on incomplete median input ([`PipelineError::MissingFeatureColumns`])
    /// and on a narrow/wide key mismatch; absent per-city artifacts are
    /// absorbed as absent output fields.
    pub fn query(&self, query: &Query) -> PipelineResult<QueryRecord> {
        let snapshot = self.cache.snapshot();
        info!(
            "query: date={} city='{}' pollutant={}",
            query.date, query.city, query.pollutant
        );

        // Summary stage: absent (city, target) artifacts stay None.
        let summary = snapshot
            .summary
            .predict(&query.city, query.date, query.pollutant);

        // Median stage, scoped to the query's pollutant.
        let scope = MedianScope::Single(query.pollutant);
        let median = match snapshot.median_for(scope) {
            None => {
                debug!("median scope {scope} holds no artifacts; median omitted");
                None
            }
            Some(predictor) => match predictor.predict(&query.city, &summary) {
                Ok(m) => Some(m),
                Err(PipelineError::NoTrainedArtifact { stage, city }) => {
                    debug!("no {stage} artifact for city '{city}'; median omitted");
                    None
                }
                Err(e) => return Err(e),
            },
        };

        // AQI conversion requires a median.
        let (aqi, rounded_aqi) = match median {
            Some(m) => {
                let aqi = convert(m, query.pollutant);
                (Some(aqi), Some(round_aqi(aqi)))
            }
            None => (None, None),
        };

        // Pivot to the wide layout and classify severity.
        let wide = WideQueryRecord::from_query(query, median);
        let severity = snapshot.severity.predict(&wide.medians);

        // Join the label back by (Date, City) identity.
        let narrow_key = query.key();
        if wide.key != narrow_key {
            return Err(PipelineError::KeyMismatch {
                narrow: narrow_key.to_string(),
                wide: wide.key.to_string(),
            });
        }

        Ok(QueryRecord {
            date: query.date,
            city: query.city.clone(),
            pollutant: query.pollutant,
            count: summary.count,
            variance: summary.variance,
            min: summary.min,
            max: summary.max,
            median,
            aqi,
            rounded_aqi,
            severity: Some(severity),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_iso_queries() {
        let q = Query::parse("2021-06-15", "Sydney", "pm2.5").unwrap();
        assert_eq!(q.date, NaiveDate::from_ymd_opt(2021, 6, 15).unwrap());
        assert_eq!(q.pollutant, Pollutant::Pm25);
        assert_eq!(q.city, "Sydney");
    }

    #[test]
    fn parse_rejects_bad_dates() {
        let err = Query::parse("15/06/2021", "Sydney", "pm2.5").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedQuery { field: "date", .. }));
    }

    #[test]
    fn parse_rejects_unknown_pollutants() {
        let err = Query::parse("2021-06-15", "Sydney", "nox").unwrap_err();
        match err {
            PipelineError::MalformedQuery { field, reason } => {
                assert_eq!(field, "pollutant");
                assert!(reason.contains("nox"));
            }
            other => panic!("expected MalformedQuery, got {other}"),
        }
    }

    #[test]
    fn parse_rejects_empty_city() {
        let err = Query::parse("2021-06-15", "  ", "co").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedQuery { field: "city", .. }));
    }

    #[test]
    fn wide_pivot_places_median_on_query_pollutant() {
        let query = Query::parse("2021-06-15", "Sydney", "o3").unwrap();
        let wide = WideQueryRecord::from_query(&query, Some(42.0));
        for p in Pollutant::ALL {
            let expected = if p == Pollutant::O3 { 42.0 } else { 0.0 };
            assert_eq!(wide.medians[p.index()], expected);
        }
        assert_eq!(wide.key, query.key());
    }

    #[test]
    fn wide_pivot_without_median_is_all_zero() {
        let query = Query::parse("2021-06-15", "Sydney", "o3").unwrap();
        let wide = WideQueryRecord::from_query(&query, None);
        assert_eq!(wide.medians, [0.0; 6]);
    }
}
