//! Interquartile-range outlier filtering.
//!
//! Quantiles use linear interpolation over the sorted sample
//! (`pos = q * (n - 1)`), matching the tabular library the historical data
//! was prepared with. Outlier bounds are always computed globally — over the
//! entire dataset before any per-city split — and a row is dropped when ANY
//! monitored column falls outside its bounds.

/// Inclusive lower/upper bounds produced by the IQR rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    /// Lower bound: `q1 - multiplier * iqr`.
    pub lo: f64,
    /// Upper bound: `q3 + multiplier * iqr`.
    pub hi: f64,
}

impl IqrBounds {
    /// Returns `true` when `value` lies inside the bounds (inclusive).
    #[must_use]
    pub fn contains(self, value: f64) -> bool {
        self.lo <= value && value <= self.hi
    }
}

/// Linear-interpolation quantile of an unsorted sample.
///
/// `q` is clamped to `[0, 1]`. Returns `None` for an empty sample.
#[must_use]
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("quantile input must not contain NaN"));

    let q = q.clamp(0.0, 1.0);
    #[allow(clippy::cast_precision_loss)]
    let pos = q * (sorted.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let below = pos.floor() as usize;
    let above = pos.ceil() as usize;
    let frac = pos - pos.floor();

    Some(sorted[below] + (sorted[above] - sorted[below]) * frac)
}

/// IQR bounds of a sample with the given multiplier.
///
/// Returns `None` for an empty sample.
#[must_use]
pub fn iqr_bounds(values: &[f64], multiplier: f64) -> Option<IqrBounds> {
    let q1 = quantile(values, 0.25)?;
    let q3 = quantile(values, 0.75)?;
    let iqr = q3 - q1;
    Some(IqrBounds {
        lo: q1 - multiplier * iqr,
        hi: q3 + multiplier * iqr,
    })
}

/// Drop rows with an outlying value in any monitored column.
///
/// `columns` supplies one accessor per monitored column; bounds for each
/// column are computed over ALL rows first, then rows are retained only when
/// every column value lies within its bounds.
#[must_use]
pub fn iqr_filter<T>(rows: Vec<T>, columns: &[&dyn Fn(&T) -> f64], multiplier: f64) -> Vec<T> {
    if rows.is_empty() || columns.is_empty() {
        return rows;
    }

    let bounds: Vec<IqrBounds> = columns
        .iter()
        .map(|accessor| {
            let values: Vec<f64> = rows.iter().map(|r| accessor(r)).collect();
            iqr_bounds(&values, multiplier).expect("rows are non-empty")
        })
        .collect();

    rows.into_iter()
        .filter(|row| {
            columns
                .iter()
                .zip(&bounds)
                .all(|(accessor, b)| b.contains(accessor(row)))
        })
        .collect()
}
