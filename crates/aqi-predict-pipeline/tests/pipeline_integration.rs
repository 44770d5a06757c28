//! End-to-end pipeline scenarios over a deterministic synthetic history.
//!
//! The history generator is analytic: every value is computed from the
//! (city, day, pollutant) indices alone, so the whole suite is reproducible
//! without any random fixtures. Clean days keep every pollutant in the
//! lowest severity band; every third day is a "smoky" day whose pm2.5
//! median pushes the maximum AQI into the Fair band, giving the severity
//! classifier two classes to learn.

use aqi_predict_core::{Observation, Pollutant, Severity};
use aqi_predict_pipeline::{
    ArtifactCache, ArtifactStore, FsArtifactStore, Orchestrator, PipelineError, Query,
};
use aqi_predict_train::TrainingConfig;
use chrono::NaiveDate;

const CITIES: [&str; 2] = ["Sydney", "Melbourne"];
const DAYS: u32 = 45;

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Typical median concentration per pollutant on a clean day.
fn base_median(pollutant: Pollutant) -> f64 {
    match pollutant {
        Pollutant::Co => 2.0,
        Pollutant::No2 => 30.0,
        Pollutant::O3 => 25.0,
        Pollutant::Pm10 => 20.0,
        Pollutant::Pm25 => 8.0,
        Pollutant::So2 => 40.0,
    }
}

fn synth_obs(city_idx: usize, day: u32, pollutant: Pollutant) -> Observation {
    // Smooth deterministic variation in [1.0, 1.3].
    let phase = (day as usize * 7 + pollutant.index() * 3 + city_idx * 5) % 10;
    let wave = 1.0 + 0.03 * phase as f64;

    // Every third day is smoky: the pm2.5 median jumps into the Fair band.
    let smoky = day % 3 == 0 && pollutant == Pollutant::Pm25;
    let median = if smoky { 60.0 * wave } else { base_median(pollutant) * wave };

    Observation {
        date: start_date() + chrono::Days::new(u64::from(day)),
        city: CITIES[city_idx].to_string(),
        pollutant,
        count: 22.0 + f64::from(day % 5),
        min: median * 0.4,
        max: median * 2.2,
        variance: median * 0.5,
        median,
    }
}

fn synthetic_history() -> Vec<Observation> {
    let mut rows = Vec::new();
    for city_idx in 0..CITIES.len() {
        for day in 0..DAYS {
            for pollutant in Pollutant::ALL {
                rows.push(synth_obs(city_idx, day, pollutant));
            }
        }
    }
    rows
}

fn test_config() -> TrainingConfig {
    TrainingConfig {
        forest_trees: 15,
        depth_grid_max: 6,
        ..TrainingConfig::default()
    }
}

fn trained_orchestrator() -> Orchestrator {
    Orchestrator::train(&synthetic_history(), &test_config()).unwrap()
}

#[test]
fn end_to_end_complete_record() {
    let orchestrator = trained_orchestrator();
    let query = Query::parse("2024-02-01", "Sydney", "pm2.5").unwrap();
    let record = orchestrator.query(&query).unwrap();

    assert!(record.count.is_some());
    assert!(record.variance.is_some());
    assert!(record.min.is_some());
    assert!(record.max.is_some());

    let median = record.median.expect("median should be predicted");
    assert!(median >= 0.0);
    assert!(record.variance.unwrap() >= 0.0);

    let aqi = record.aqi.expect("AQI should be derived");
    assert!((0.0..=200.0).contains(&aqi));
    assert!(record.rounded_aqi.is_some());

    let severity = record.severity.expect("severity should be classified");
    assert!(Severity::ALL.contains(&severity));
}

#[test]
fn identical_queries_are_idempotent() {
    let orchestrator = trained_orchestrator();
    let query = Query::parse("2024-01-20", "Melbourne", "no2").unwrap();

    let first = orchestrator.query(&query).unwrap();
    let second = orchestrator.query(&query).unwrap();
    assert_eq!(first, second);

    // Byte-identical once serialized, too.
    let a = serde_json::to_string(&first).unwrap();
    let b = serde_json::to_string(&second).unwrap();
    assert_eq!(a, b);
}

#[test]
fn city_below_minimum_rows_never_enters_the_artifact_map() {
    let mut history = synthetic_history();
    for day in 0..4 {
        history.push(Observation {
            city: "Tiny".to_string(),
            ..synth_obs(0, day, Pollutant::Pm25)
        });
    }

    let orchestrator = Orchestrator::train(&history, &test_config()).unwrap();
    let snapshot = orchestrator.cache().snapshot();
    let scope = aqi_predict_core::MedianScope::Single(Pollutant::Pm25);
    let predictor = snapshot.median_for(scope).unwrap();
    assert!(!predictor.trained_cities().contains(&"Tiny"));

    // The query is still served: the summary models exist (4 rows split
    // fine), only the median stage is absorbed as absent columns.
    let query = Query::parse("2024-01-02", "Tiny", "pm2.5").unwrap();
    let record = orchestrator.query(&query).unwrap();
    assert!(record.count.is_some());
    assert!(record.median.is_none());
    assert!(record.aqi.is_none());
    assert!(record.rounded_aqi.is_none());
    assert!(record.severity.is_some());
}

#[test]
fn unknown_city_is_served_with_absent_fields() {
    let orchestrator = trained_orchestrator();
    let query = Query::parse("2024-02-01", "Atlantis", "co").unwrap();
    let record = orchestrator.query(&query).unwrap();

    assert!(record.count.is_none());
    assert!(record.variance.is_none());
    assert!(record.min.is_none());
    assert!(record.max.is_none());
    assert!(record.median.is_none());
    assert!(record.aqi.is_none());
    // The severity stage still runs over the all-zero wide layout.
    assert!(record.severity.is_some());
}

#[test]
fn malformed_queries_fail_before_any_stage() {
    assert!(matches!(
        Query::parse("01-02-2024", "Sydney", "pm2.5"),
        Err(PipelineError::MalformedQuery { field: "date", .. })
    ));
    assert!(matches!(
        Query::parse("2024-02-01", "Sydney", "smog"),
        Err(PipelineError::MalformedQuery { field: "pollutant", .. })
    ));
    assert!(matches!(
        Query::parse("2024-02-01", "", "pm2.5"),
        Err(PipelineError::MalformedQuery { field: "city", .. })
    ));
}

#[test]
fn rebuild_extends_coverage_to_new_cities() {
    let orchestrator = trained_orchestrator();
    let query = Query::parse("2024-01-15", "Perth", "o3").unwrap();

    let before = orchestrator.query(&query).unwrap();
    assert!(before.median.is_none());

    let mut history = synthetic_history();
    for day in 0..DAYS {
        for pollutant in Pollutant::ALL {
            history.push(Observation {
                city: "Perth".to_string(),
                ..synth_obs(1, day, pollutant)
            });
        }
    }
    orchestrator.rebuild(&history, &test_config()).unwrap();

    let after = orchestrator.query(&query).unwrap();
    assert!(after.median.is_some());
    assert!(after.aqi.is_some());
}

#[test]
fn persisted_artifacts_serve_identical_records() {
    let orchestrator = trained_orchestrator();
    let query = Query::parse("2024-01-10", "Sydney", "so2").unwrap();
    let original = orchestrator.query(&query).unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::new(tmp.path());
    store.save(&orchestrator.cache().snapshot()).unwrap();

    let restored = Orchestrator::new(ArtifactCache::new(store.load().unwrap()));
    let replayed = restored.query(&query).unwrap();
    assert_eq!(original, replayed);
}

#[test]
fn training_twice_yields_identical_predictions() {
    let a = trained_orchestrator();
    let b = trained_orchestrator();
    let query = Query::parse("2024-02-05", "Melbourne", "pm10").unwrap();
    assert_eq!(a.query(&query).unwrap(), b.query(&query).unwrap());
}
