//! Feature encoding for the summary-statistic models.
//!
//! A query or observation is encoded as four calendar features followed by
//! the one-hot pollutant block in canonical order:
//!
//! ```text
//! [day_of_year, year, month, weekday, co, no2, o3, pm10, pm2.5, so2]
//! ```
//!
//! Weekday is Monday = 0. Pollutant codes absent from a given row are
//! zero-filled; only the row's own pollutant column carries a 1.

use aqi_predict_core::pollutant::Pollutant;
use chrono::{Datelike, NaiveDate};
use ndarray::Array1;

/// Number of calendar features preceding the one-hot block.
pub const CALENDAR_FEATURES: usize = 4;

/// Total feature count seen by every summary model.
pub const FEATURE_COUNT: usize = CALENDAR_FEATURES + Pollutant::ALL.len();

/// Encode one (date, pollutant) pair as a model input row.
#[must_use]
pub fn encode(date: NaiveDate, pollutant: Pollutant) -> Array1<f64> {
    let mut row = Array1::zeros(FEATURE_COUNT);
    row[0] = f64::from(date.ordinal());
    row[1] = f64::from(date.year());
    row[2] = f64::from(date.month());
    row[3] = f64::from(date.weekday().num_days_from_monday());
    row[CALENDAR_FEATURES + pollutant.index()] = 1.0;
    row
}
