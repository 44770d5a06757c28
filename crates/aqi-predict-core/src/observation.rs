//! Historical observation records and CSV ingestion.
//!
//! An [`Observation`] is one `(Date, City, Pollutant)` aggregation window
//! from the historical table: the observation count plus min / max /
//! variance / median of the measured concentrations. Observations are
//! immutable once loaded; AQI values are always derived from the median via
//! [`crate::breakpoints::convert`], never stored as measurements.
//!
//! [`RecordKey`] is the `(Date, City)` identity that the narrow per-query
//! record and the wide per-pollutant layout share.

use crate::error::{CoreError, CoreResult};
use crate::pollutant::Pollutant;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

/// A single historical aggregation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Calendar date of the window.
    pub date: NaiveDate,
    /// City the window was recorded in. City names are case-sensitive keys.
    pub city: String,
    /// Pollutant the window aggregates.
    pub pollutant: Pollutant,
    /// Number of raw measurements in the window.
    pub count: f64,
    /// Minimum measured concentration.
    pub min: f64,
    /// Maximum measured concentration.
    pub max: f64,
    /// Variance of the measured concentrations.
    pub variance: f64,
    /// Median measured concentration.
    pub median: f64,
}

impl Observation {
    /// The `(Date, City)` identity of this observation.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey {
            date: self.date,
            city: self.city.clone(),
        }
    }
}

/// The `(Date, City)` identity shared by the narrow and wide record shapes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    /// Calendar date.
    pub date: NaiveDate,
    /// City name (case-sensitive).
    pub city: String,
}

impl RecordKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(date: NaiveDate, city: impl Into<String>) -> Self {
        RecordKey { date, city: city.into() }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.date, self.city)
    }
}

/// Parse a historical-table date.
///
/// The source tables use day-first `dd/mm/yyyy`; ISO-8601 `yyyy-mm-dd` is
/// accepted as a fallback so regenerated tables load unchanged.
pub fn parse_history_date(value: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| CoreError::invalid_date(value))
}

/// Column names required in the historical CSV header.
const REQUIRED_COLUMNS: [&str; 8] = [
    "Date", "City", "Pollutant", "count", "min", "max", "variance", "median",
];

/// Load the historical observation table from a CSV file.
///
/// Rows with a missing or unparseable value in any required column are
/// skipped and counted; rows naming a pollutant outside the six known codes
/// are likewise skipped. The table header must contain every required
/// column (extra columns are ignored).
///
/// # Errors
///
/// Returns [`CoreError::Io`] / [`CoreError::Csv`] for file access problems
/// and [`CoreError::MissingColumn`] when the header is incomplete.
pub fn load_observations(path: &Path) -> CoreResult<Vec<Observation>> {
    let file = File::open(path).map_err(|source| CoreError::io(path, source))?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader
        .headers()
        .map_err(|source| CoreError::csv(path, source))?
        .clone();

    let mut column_idx = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, column) in REQUIRED_COLUMNS.into_iter().enumerate() {
        column_idx[slot] = headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or(CoreError::MissingColumn { path: path.to_path_buf(), column })?;
    }

    let mut observations = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record.map_err(|source| CoreError::csv(path, source))?;
        match parse_row(&record, &column_idx) {
            Some(obs) => observations.push(obs),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(
            "Skipped {skipped} incomplete or unparseable rows in {}",
            path.display()
        );
    }
    info!(
        "Loaded {} historical observations from {}",
        observations.len(),
        path.display()
    );

    Ok(observations)
}

/// Parse one CSV row into an [`Observation`], or `None` if any required
/// field is missing or unparseable.
fn parse_row(record: &csv::StringRecord, column_idx: &[usize; 8]) -> Option<Observation> {
    let field = |slot: usize| record.get(column_idx[slot]).map(str::trim);

    let date = parse_history_date(field(0)?).ok()?;
    let city = field(1)?;
    if city.is_empty() {
        return None;
    }
    let pollutant = field(2)?.parse::<Pollutant>().ok()?;

    let numeric = |slot: usize| field(slot)?.parse::<f64>().ok().filter(|v| v.is_finite());
    let count = numeric(3)?;
    let min = numeric(4)?;
    let max = numeric(5)?;
    let variance = numeric(6)?;
    let median = numeric(7)?;

    Some(Observation {
        date,
        city: city.to_string(),
        pollutant,
        count,
        min,
        max,
        variance,
        median,
    })
}
