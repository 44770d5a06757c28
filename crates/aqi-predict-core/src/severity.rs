//! AQI severity categories.
//!
//! Severity is a classification target derived from an AQI value through
//! fixed thresholds. It is never interpolated: every AQI value maps to
//! exactly one of the six ordered categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six ordered AQI severity categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// AQI up to 32.
    VeryGood,
    /// AQI 33 to 65.
    Good,
    /// AQI 66 to 98.
    Fair,
    /// AQI 99 to 148.
    Poor,
    /// AQI 149 to 199.
    VeryPoor,
    /// AQI 200 and above.
    ExtremelyPoor,
}

impl Severity {
    /// All categories from least to most severe.
    pub const ALL: [Severity; 6] = [
        Severity::VeryGood,
        Severity::Good,
        Severity::Fair,
        Severity::Poor,
        Severity::VeryPoor,
        Severity::ExtremelyPoor,
    ];

    /// Classify an AQI value.
    ///
    /// Total over all of `f64`: thresholds are `<= 32`, `<= 65`, `<= 98`,
    /// `<= 148`, `<= 199`, and everything else (including NaN) is the
    /// highest category.
    #[must_use]
    pub fn from_aqi(aqi: f64) -> Self {
        if aqi <= 32.0 {
            Severity::VeryGood
        } else if aqi <= 65.0 {
            Severity::Good
        } else if aqi <= 98.0 {
            Severity::Fair
        } else if aqi <= 148.0 {
            Severity::Poor
        } else if aqi <= 199.0 {
            Severity::VeryPoor
        } else {
            Severity::ExtremelyPoor
        }
    }

    /// Position of this category on the ordered scale (0 = least severe).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Severity::VeryGood => 0,
            Severity::Good => 1,
            Severity::Fair => 2,
            Severity::Poor => 3,
            Severity::VeryPoor => 4,
            Severity::ExtremelyPoor => 5,
        }
    }

    /// Category at the given scale position, if any.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The reporting label for this category.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Severity::VeryGood => "1 (Very Good)",
            Severity::Good => "2 (Good)",
            Severity::Fair => "3 (Fair)",
            Severity::Poor => "4 (Poor)",
            Severity::VeryPoor => "5 (Very Poor)",
            Severity::ExtremelyPoor => "6 (Extremely Poor)",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
