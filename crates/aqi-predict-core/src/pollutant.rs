//! Pollutant codes and median-model scope.
//!
//! [`Pollutant`] enumerates the six monitored pollutants. The declaration
//! order is canonical: it fixes both the one-hot feature order used by the
//! summary-statistic regressors and the column order of the wide
//! per-pollutant layout consumed by the severity classifier.
//!
//! [`MedianScope`] selects which observations a median model is trained on:
//! a single pollutant, or all pollutants pooled into one model per city.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six monitored pollutants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pollutant {
    /// Carbon monoxide.
    Co,
    /// Nitrogen dioxide.
    No2,
    /// Ozone.
    O3,
    /// Particulate matter up to 10 micrometres.
    Pm10,
    /// Particulate matter up to 2.5 micrometres.
    Pm25,
    /// Sulfur dioxide.
    So2,
}

impl Pollutant {
    /// All pollutants in canonical (feature) order.
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Co,
        Pollutant::No2,
        Pollutant::O3,
        Pollutant::Pm10,
        Pollutant::Pm25,
        Pollutant::So2,
    ];

    /// The wire code for this pollutant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Pollutant::Co => "co",
            Pollutant::No2 => "no2",
            Pollutant::O3 => "o3",
            Pollutant::Pm10 => "pm10",
            Pollutant::Pm25 => "pm2.5",
            Pollutant::So2 => "so2",
        }
    }

    /// Position of this pollutant in the canonical feature order.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Pollutant::Co => 0,
            Pollutant::No2 => 1,
            Pollutant::O3 => 2,
            Pollutant::Pm10 => 3,
            Pollutant::Pm25 => 4,
            Pollutant::So2 => 5,
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pollutant {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "co" => Ok(Pollutant::Co),
            "no2" => Ok(Pollutant::No2),
            "o3" => Ok(Pollutant::O3),
            "pm10" => Ok(Pollutant::Pm10),
            "pm2.5" => Ok(Pollutant::Pm25),
            "so2" => Ok(Pollutant::So2),
            other => Err(CoreError::unknown_pollutant(other)),
        }
    }
}

/// Scope of a per-city median model.
///
/// The median regressors can be trained either on a single pollutant's
/// observations or on every pollutant pooled together. The pooled case is an
/// explicit variant here, not a sentinel string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MedianScope {
    /// Observations of one pollutant only.
    Single(Pollutant),
    /// Observations of every pollutant pooled together.
    All,
}

impl MedianScope {
    /// Returns `true` when `pollutant` falls inside this scope.
    #[must_use]
    pub fn contains(self, pollutant: Pollutant) -> bool {
        match self {
            MedianScope::Single(p) => p == pollutant,
            MedianScope::All => true,
        }
    }
}

impl fmt::Display for MedianScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MedianScope::Single(p) => f.write_str(p.as_str()),
            MedianScope::All => f.write_str("all"),
        }
    }
}

impl FromStr for MedianScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(MedianScope::All)
        } else {
            s.parse::<Pollutant>().map(MedianScope::Single)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for p in Pollutant::ALL {
            assert_eq!(p.as_str().parse::<Pollutant>().unwrap(), p);
        }
    }

    #[test]
    fn canonical_order_matches_index() {
        for (i, p) in Pollutant::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = "nox".parse::<Pollutant>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownPollutant { .. }));
    }

    #[test]
    fn case_sensitive_codes() {
        assert!("CO".parse::<Pollutant>().is_err());
        assert!("PM2.5".parse::<Pollutant>().is_err());
    }

    #[test]
    fn scope_parses_all_and_codes() {
        assert_eq!("all".parse::<MedianScope>().unwrap(), MedianScope::All);
        assert_eq!(
            "pm2.5".parse::<MedianScope>().unwrap(),
            MedianScope::Single(Pollutant::Pm25)
        );
        assert!("everything".parse::<MedianScope>().is_err());
    }

    #[test]
    fn scope_membership() {
        assert!(MedianScope::All.contains(Pollutant::O3));
        assert!(MedianScope::Single(Pollutant::O3).contains(Pollutant::O3));
        assert!(!MedianScope::Single(Pollutant::O3).contains(Pollutant::Co));
    }
}
