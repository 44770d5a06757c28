//! Evaluation metrics for the trained stages.
//!
//! Regression models are summarised by R², mean absolute error, and root
//! mean squared error; the severity classifier by accuracy plus
//! support-weighted precision / recall / F1 and a confusion matrix. The
//! reports exist to be logged at training time and asserted on in tests —
//! nothing downstream branches on them.

use ndarray::Array1;

// ---------------------------------------------------------------------------
// Regression
// ---------------------------------------------------------------------------

/// Coefficient of determination.
///
/// Returns 1.0 for a perfect fit of a constant target and 0.0 for an
/// imperfect one (the usual convention when total variance is zero).
#[must_use]
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    assert_eq!(y_true.len(), y_pred.len());
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Mean absolute error.
#[must_use]
pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    assert_eq!(y_true.len(), y_pred.len());
    #[allow(clippy::cast_precision_loss)]
    let n = y_true.len().max(1) as f64;
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n
}

/// Root mean squared error.
#[must_use]
pub fn root_mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    assert_eq!(y_true.len(), y_pred.len());
    #[allow(clippy::cast_precision_loss)]
    let n = y_true.len().max(1) as f64;
    (y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n)
        .sqrt()
}

/// Holdout summary for one regression model.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionReport {
    /// Coefficient of determination.
    pub r2: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error.
    pub rmse: f64,
}

impl RegressionReport {
    /// Evaluate predictions against the holdout targets.
    #[must_use]
    pub fn evaluate(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        RegressionReport {
            r2: r2_score(y_true, y_pred),
            mae: mean_absolute_error(y_true, y_pred),
            rmse: root_mean_squared_error(y_true, y_pred),
        }
    }

    /// A log line for training output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("R2={:.4}  MAE={:.4}  RMSE={:.4}", self.r2, self.mae, self.rmse)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Holdout summary for the severity classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    /// Fraction of correct predictions.
    pub accuracy: f64,
    /// Support-weighted precision.
    pub precision: f64,
    /// Support-weighted recall.
    pub recall: f64,
    /// Support-weighted F1.
    pub f1: f64,
    /// `confusion[true][predicted]` counts.
    pub confusion: Vec<Vec<usize>>,
}

impl ClassificationReport {
    /// Evaluate predicted class indices against true ones.
    ///
    /// # Panics
    ///
    /// Panics when the slices differ in length or a label is out of range,
    /// both of which indicate a caller bug.
    #[must_use]
    pub fn evaluate(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Self {
        assert_eq!(y_true.len(), y_pred.len());

        let mut confusion = vec![vec![0usize; n_classes]; n_classes];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            confusion[t][p] += 1;
        }

        #[allow(clippy::cast_precision_loss)]
        let n = y_true.len().max(1) as f64;
        let correct: usize = (0..n_classes).map(|c| confusion[c][c]).sum();
        #[allow(clippy::cast_precision_loss)]
        let accuracy = correct as f64 / n;

        let mut precision = 0.0;
        let mut recall = 0.0;
        let mut f1 = 0.0;
        for c in 0..n_classes {
            let support: usize = confusion[c].iter().sum();
            if support == 0 {
                continue;
            }
            let tp = confusion[c][c];
            let predicted: usize = (0..n_classes).map(|t| confusion[t][c]).sum();

            #[allow(clippy::cast_precision_loss)]
            let (tp_f, support_f, predicted_f) = (tp as f64, support as f64, predicted as f64);
            let class_precision = if predicted == 0 { 0.0 } else { tp_f / predicted_f };
            let class_recall = tp_f / support_f;
            let class_f1 = if class_precision + class_recall == 0.0 {
                0.0
            } else {
                2.0 * class_precision * class_recall / (class_precision + class_recall)
            };

            let weight = support_f / n;
            precision += weight * class_precision;
            recall += weight * class_recall;
            f1 += weight * class_f1;
        }

        ClassificationReport { accuracy, precision, recall, f1, confusion }
    }

    /// A log line for training output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "acc={:.4}  precision={:.4}  recall={:.4}  f1={:.4}",
            self.accuracy, self.precision, self.recall, self.f1
        )
    }
}
