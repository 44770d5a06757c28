//! Polynomial regression pipeline: standardise, expand, linear fit.
//!
//! [`PolyPipeline`] chains three steps the per-city summary models share:
//!
//! 1. [`StandardScaler`] — per-column zero-mean / unit-variance scaling
//!    (population variance; constant columns keep unit scale).
//! 2. [`PolynomialFeatures`] — degree-2 expansion with a bias column:
//!    `[1, x_i, x_i * x_j (i <= j)]`.
//! 3. [`LinearRegressor`] — least squares via the normal equations.
//!
//! The normal matrix receives a tiny Tikhonov term. Squaring a 0/1 one-hot
//! column reproduces the column itself, so the expanded design matrix is
//! rank-deficient by construction and an unregularised pivoting solve would
//! reject it.

use crate::error::{TrainError, TrainResult};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Relative weight of the Tikhonov term added to the normal matrix diagonal.
const RIDGE_EPS: f64 = 1e-8;

// ---------------------------------------------------------------------------
// StandardScaler
// ---------------------------------------------------------------------------

/// Per-column zero-mean / unit-variance scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations.
    ///
    /// Columns with zero variance keep a unit scale so constant features
    /// pass through as zeros rather than NaN.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::EmptyDataset`] when `x` has no rows.
    pub fn fit(x: &Array2<f64>) -> TrainResult<Self> {
        let mean = x.mean_axis(Axis(0)).ok_or(TrainError::EmptyDataset)?;

        #[allow(clippy::cast_precision_loss)]
        let n = x.nrows() as f64;
        let mut scale = Array1::zeros(x.ncols());
        for (j, s) in scale.iter_mut().enumerate() {
            let var = x.column(j).iter().map(|v| (v - mean[j]).powi(2)).sum::<f64>() / n;
            *s = if var > 0.0 { var.sqrt() } else { 1.0 };
        }

        Ok(StandardScaler { mean, scale })
    }

    /// Scale every row of `x`.
    #[must_use]
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for mut row in out.rows_mut() {
            for j in 0..row.len() {
                row[j] = (row[j] - self.mean[j]) / self.scale[j];
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// PolynomialFeatures
// ---------------------------------------------------------------------------

/// Degree-2 polynomial feature expansion with a bias column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolynomialFeatures {
    n_inputs: usize,
}

impl PolynomialFeatures {
    /// Expansion for `n_inputs` input columns.
    #[must_use]
    pub fn new(n_inputs: usize) -> Self {
        PolynomialFeatures { n_inputs }
    }

    /// Number of output columns: `1 + n + n*(n+1)/2`.
    #[must_use]
    pub fn n_outputs(&self) -> usize {
        1 + self.n_inputs + self.n_inputs * (self.n_inputs + 1) / 2
    }

    /// Expand every row of `x`.
    ///
    /// Output column order: bias, the linear terms, then the degree-2 terms
    /// `x_i * x_j` for `i <= j` in lexicographic order.
    #[must_use]
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = self.n_inputs;
        let mut out = Array2::zeros((x.nrows(), self.n_outputs()));
        for (r, row) in x.rows().into_iter().enumerate() {
            out[[r, 0]] = 1.0;
            for i in 0..n {
                out[[r, 1 + i]] = row[i];
            }
            let mut c = 1 + n;
            for i in 0..n {
                for j in i..n {
                    out[[r, c]] = row[i] * row[j];
                    c += 1;
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// LinearRegressor
// ---------------------------------------------------------------------------

/// Least-squares linear model over an already-expanded design matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    coefficients: Array1<f64>,
}

impl LinearRegressor {
    /// Fit coefficients by solving the (lightly ridged) normal equations.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::EmptyDataset`] for an empty design matrix and
    /// [`TrainError::Numerical`] when the system cannot be solved.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> TrainResult<Self> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(TrainError::EmptyDataset);
        }
        if x.nrows() != y.len() {
            return Err(TrainError::numerical(format!(
                "design matrix has {} rows but target has {} entries",
                x.nrows(),
                y.len()
            )));
        }

        #[allow(clippy::cast_precision_loss)]
        let lambda = RIDGE_EPS * x.nrows() as f64;

        let mut xtx = x.t().dot(x);
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += lambda;
        }
        let xty = x.t().dot(y);

        let coefficients = solve_linear_system(xtx, xty)?;
        Ok(LinearRegressor { coefficients })
    }

    /// Predict one value per row of `x`.
    #[must_use]
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.coefficients)
    }
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
fn solve_linear_system(mut a: Array2<f64>, mut b: Array1<f64>) -> TrainResult<Array1<f64>> {
    let n = a.nrows();
    debug_assert_eq!(a.ncols(), n);
    debug_assert_eq!(b.len(), n);

    for col in 0..n {
        // Pivot: largest magnitude in the remaining column.
        let mut pivot_row = col;
        let mut pivot_val = a[[col, col]].abs();
        for row in col + 1..n {
            let v = a[[row, col]].abs();
            if v > pivot_val {
                pivot_row = row;
                pivot_val = v;
            }
        }
        if pivot_val < 1e-12 {
            return Err(TrainError::numerical(format!(
                "singular normal matrix at column {col}"
            )));
        }
        if pivot_row != col {
            for k in 0..n {
                let tmp = a[[col, k]];
                a[[col, k]] = a[[pivot_row, k]];
                a[[pivot_row, k]] = tmp;
            }
            b.swap(col, pivot_row);
        }

        // Eliminate below the pivot.
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution.
    let mut x = Array1::zeros(n);
    for col in (0..n).rev() {
        let mut acc = b[col];
        for k in col + 1..n {
            acc -= a[[col, k]] * x[k];
        }
        x[col] = acc / a[[col, col]];
    }
    Ok(x)
}

// ---------------------------------------------------------------------------
// PolyPipeline
// ---------------------------------------------------------------------------

/// The full standardise → expand → fit pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolyPipeline {
    scaler: StandardScaler,
    poly: PolynomialFeatures,
    linear: LinearRegressor,
}

impl PolyPipeline {
    /// Fit the pipeline on raw (unscaled) features.
    ///
    /// # Errors
    ///
    /// Propagates scaler and solver failures.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> TrainResult<Self> {
        let scaler = StandardScaler::fit(x)?;
        let poly = PolynomialFeatures::new(x.ncols());
        let expanded = poly.transform(&scaler.transform(x));
        let linear = LinearRegressor::fit(&expanded, y)?;
        Ok(PolyPipeline { scaler, poly, linear })
    }

    /// Predict one value per row of raw features.
    #[must_use]
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        let expanded = self.poly.transform(&self.scaler.transform(x));
        self.linear.predict(&expanded)
    }

    /// Predict for a single raw feature row.
    #[must_use]
    pub fn predict_one(&self, row: &Array1<f64>) -> f64 {
        let x = row.clone().insert_axis(Axis(0));
        self.predict(&x)[0]
    }
}
