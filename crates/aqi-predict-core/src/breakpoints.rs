//! Regulator-defined concentration to AQI conversion.
//!
//! Each pollutant has an ordered sequence of concentration breakpoints; the
//! AQI axis `[0, 33, 66, 99, 149, 200]` is shared by all pollutants. A
//! concentration is mapped onto the AQI scale by locating its breakpoint
//! segment and interpolating linearly within it.
//!
//! The final segment of every pollutant is unbounded above. Its
//! interpolation slope is therefore zero, and every concentration at or
//! above the last finite breakpoint maps to the second-to-last AQI bound
//! (**149**), not the nominal maximum of 200. The "exceeds all ranges"
//! fallback consequently only fires for inputs no segment admits (negative
//! or non-finite concentrations). This behaviour is load-bearing for
//! compatibility with historical records and must not be "fixed".

use crate::pollutant::Pollutant;

/// AQI axis shared by every pollutant.
pub const AQI_BREAKPOINTS: [f64; 6] = [0.0, 33.0, 66.0, 99.0, 149.0, 200.0];

/// Concentration breakpoints for one pollutant, lowest first.
///
/// The last entry is `f64::INFINITY`: the final segment is right-unbounded.
#[must_use]
pub const fn concentration_breakpoints(pollutant: Pollutant) -> [f64; 6] {
    match pollutant {
        Pollutant::Co => [0.0, 6.0, 9.0, 13.5, 18.0, f64::INFINITY],
        Pollutant::No2 => [0.0, 80.0, 120.0, 180.0, 240.0, f64::INFINITY],
        Pollutant::O3 => [0.0, 67.0, 100.0, 150.0, 200.0, f64::INFINITY],
        Pollutant::Pm10 => [0.0, 50.0, 100.0, 200.0, 600.0, f64::INFINITY],
        Pollutant::Pm25 => [0.0, 25.0, 50.0, 100.0, 300.0, f64::INFINITY],
        Pollutant::So2 => [0.0, 133.0, 200.0, 300.0, 400.0, f64::INFINITY],
    }
}

/// Convert a pollutant concentration to an AQI value.
///
/// Scans the pollutant's segments in order and selects the first with
/// `c_low <= concentration < c_high`. Equal AQI bounds yield that constant;
/// otherwise:
///
/// ```text
/// aqi = (i_high - i_low) / (c_high - c_low) * (concentration - c_low) + i_low
/// ```
///
/// Concentrations admitted by no segment (negative or non-finite) fall
/// through to the top of the AQI axis.
#[must_use]
pub fn convert(concentration: f64, pollutant: Pollutant) -> f64 {
    let c = concentration_breakpoints(pollutant);
    let i = AQI_BREAKPOINTS;

    for seg in 0..c.len() - 1 {
        let (c_low, c_high) = (c[seg], c[seg + 1]);
        let (i_low, i_high) = (i[seg], i[seg + 1]);

        if c_low <= concentration && concentration < c_high {
            if i_low == i_high {
                return i_high;
            }
            // For the unbounded final segment the slope is exactly 0.0,
            // which pins the whole segment to i_low.
            return (i_high - i_low) / (c_high - c_low) * (concentration - c_low) + i_low;
        }
    }

    *i.last().expect("AQI axis is non-empty")
}

/// Round an AQI value to the nearest integer, ties to even.
#[must_use]
pub fn round_aqi(aqi: f64) -> i64 {
    aqi.round_ties_even() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn known_co_values() {
        assert_abs_diff_eq!(convert(6.0, Pollutant::Co), 33.0, epsilon = 1e-12);
        assert_abs_diff_eq!(convert(3.0, Pollutant::Co), 16.5, epsilon = 1e-12);
        // At or above the last finite breakpoint the unbounded segment pins
        // the result to 149, not 200.
        assert_abs_diff_eq!(convert(20.0, Pollutant::Co), 149.0, epsilon = 1e-12);
        assert_abs_diff_eq!(convert(18.0, Pollutant::Co), 149.0, epsilon = 1e-12);
        assert_abs_diff_eq!(convert(1.0e6, Pollutant::Co), 149.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_concentration_is_zero_aqi() {
        for p in Pollutant::ALL {
            assert_abs_diff_eq!(convert(0.0, p), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn monotone_within_each_finite_segment() {
        for p in Pollutant::ALL {
            let c = concentration_breakpoints(p);
            for seg in 0..4 {
                let (lo, hi) = (c[seg], c[seg + 1]);
                let mut prev = convert(lo, p);
                for step in 1..=20 {
                    let x = lo + (hi - lo) * f64::from(step) / 20.5;
                    let aqi = convert(x, p);
                    assert!(
                        aqi >= prev - 1e-12,
                        "{p}: AQI decreased within segment {seg} at {x}"
                    );
                    prev = aqi;
                }
            }
        }
    }

    #[test]
    fn continuous_at_interior_breakpoints() {
        for p in Pollutant::ALL {
            let c = concentration_breakpoints(p);
            for seg in 1..5 {
                let boundary = c[seg];
                // Value reached from the left of the boundary.
                let from_left = convert(boundary - 1e-9, p);
                // Value at the boundary (owned by the right segment).
                let at_boundary = convert(boundary, p);
                assert_abs_diff_eq!(from_left, at_boundary, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn segment_boundaries_map_to_aqi_axis() {
        for p in Pollutant::ALL {
            let c = concentration_breakpoints(p);
            for seg in 0..5 {
                assert_abs_diff_eq!(convert(c[seg], p), AQI_BREAKPOINTS[seg], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn negative_concentration_falls_through() {
        // No segment admits negative input, so the fallback fires.
        assert_abs_diff_eq!(convert(-1.0, Pollutant::Pm25), 200.0, epsilon = 1e-12);
    }

    #[test]
    fn rounding_is_ties_to_even() {
        assert_eq!(round_aqi(16.5), 16);
        assert_eq!(round_aqi(17.5), 18);
        assert_eq!(round_aqi(16.4), 16);
        assert_eq!(round_aqi(16.6), 17);
    }
}
