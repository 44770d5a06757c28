//! Depth-limited decision tree classification with balanced class weights.
//!
//! The tree minimises the weighted Gini impurity of its children at every
//! split. Class weights counter label skew: with
//! [`balanced_class_weights`] each class contributes equally to impurity
//! regardless of its support, matching the `balanced` weighting rule
//! (`n_samples / (n_present_classes * count_c)`).
//!
//! [`tune_depth`] selects the serving depth by stratified k-fold
//! cross-validation over an inclusive depth grid, scoring mean accuracy and
//! breaking ties toward the shallower tree.

use crate::error::{TrainError, TrainResult};
use crate::split::stratified_kfold;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One node of an arena-encoded classification tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum ClassNode {
    /// Terminal node carrying the winning class of its training rows.
    Leaf { class: usize },
    /// Internal split: rows with `row[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A depth-limited CART classification tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationTree {
    nodes: Vec<ClassNode>,
    n_classes: usize,
    max_depth: usize,
}

impl ClassificationTree {
    /// Grow a tree with per-class sample weights.
    ///
    /// `class_weights` must provide one weight per class in `[0, n_classes)`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::EmptyDataset`] when `x` has no rows and
    /// [`TrainError::Numerical`] on shape mismatches.
    pub fn fit(
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        class_weights: &[f64],
        max_depth: usize,
    ) -> TrainResult<Self> {
        if x.nrows() == 0 {
            return Err(TrainError::EmptyDataset);
        }
        if x.nrows() != y.len() {
            return Err(TrainError::numerical(format!(
                "feature matrix has {} rows but {} labels were given",
                x.nrows(),
                y.len()
            )));
        }
        if class_weights.len() != n_classes {
            return Err(TrainError::numerical(format!(
                "{} class weights for {n_classes} classes",
                class_weights.len()
            )));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(TrainError::numerical(format!(
                "label {bad} out of range for {n_classes} classes"
            )));
        }

        let mut nodes = Vec::new();
        let indices: Vec<usize> = (0..x.nrows()).collect();
        build_class_node(&mut nodes, x, y, class_weights, n_classes, indices, 0, max_depth);
        Ok(ClassificationTree { nodes, n_classes, max_depth })
    }

    /// Predict the class index for one feature row.
    #[must_use]
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> usize {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                ClassNode::Leaf { class } => return *class,
                ClassNode::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Number of classes this tree distinguishes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Depth limit the tree was grown with.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Recursively grow the subtree for `indices` at `depth`.
#[allow(clippy::too_many_arguments)]
fn build_class_node(
    nodes: &mut Vec<ClassNode>,
    x: &Array2<f64>,
    y: &[usize],
    class_weights: &[f64],
    n_classes: usize,
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
) -> usize {
    let class = weighted_majority(y, class_weights, n_classes, &indices);
    let pure = indices.iter().all(|&i| y[i] == y[indices[0]]);

    if pure || indices.len() < 2 || depth >= max_depth {
        nodes.push(ClassNode::Leaf { class });
        return nodes.len() - 1;
    }

    let Some((feature, threshold)) = best_class_split(x, y, class_weights, n_classes, &indices)
    else {
        nodes.push(ClassNode::Leaf { class });
        return nodes.len() - 1;
    };

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| x[[i, feature]] <= threshold);

    let slot = nodes.len();
    nodes.push(ClassNode::Split { feature, threshold, left: 0, right: 0 });

    let left = build_class_node(nodes, x, y, class_weights, n_classes, left_rows, depth + 1, max_depth);
    let right = build_class_node(nodes, x, y, class_weights, n_classes, right_rows, depth + 1, max_depth);
    if let ClassNode::Split { left: l, right: r, .. } = &mut nodes[slot] {
        *l = left;
        *r = right;
    }
    slot
}

/// Class with the largest weighted support; ties go to the lowest class.
fn weighted_majority(
    y: &[usize],
    class_weights: &[f64],
    n_classes: usize,
    indices: &[usize],
) -> usize {
    let mut totals = vec![0.0_f64; n_classes];
    for &i in indices {
        totals[y[i]] += class_weights[y[i]];
    }
    let mut best = 0;
    for (c, &w) in totals.iter().enumerate() {
        if w > totals[best] {
            best = c;
        }
    }
    best
}

/// Best (feature, threshold) by weighted child Gini, or `None` when every
/// feature is constant over `indices`.
fn best_class_split(
    x: &Array2<f64>,
    y: &[usize],
    class_weights: &[f64],
    n_classes: usize,
    indices: &[usize],
) -> Option<(usize, f64)> {
    let mut best: Option<(f64, usize, f64)> = None;

    for feature in 0..x.ncols() {
        let mut pairs: Vec<(f64, usize)> =
            indices.iter().map(|&i| (x[[i, feature]], y[i])).collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("feature values must not be NaN"));

        let n = pairs.len();
        let mut total = vec![0.0_f64; n_classes];
        for &(_, c) in &pairs {
            total[c] += class_weights[c];
        }

        let mut left = vec![0.0_f64; n_classes];
        for k in 1..n {
            let c = pairs[k - 1].1;
            left[c] += class_weights[c];

            if pairs[k - 1].0 == pairs[k].0 {
                continue;
            }

            let right: Vec<f64> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
            let cost = weighted_gini(&left) + weighted_gini(&right);

            if best.map_or(true, |(c0, _, _)| cost < c0) {
                let threshold = (pairs[k - 1].0 + pairs[k].0) / 2.0;
                best = Some((cost, feature, threshold));
            }
        }
    }

    best.map(|(_, feature, threshold)| (feature, threshold))
}

/// Weighted Gini contribution of one child: `w * (1 - sum((w_c / w)^2))`.
fn weighted_gini(class_totals: &[f64]) -> f64 {
    let w: f64 = class_totals.iter().sum();
    if w <= 0.0 {
        return 0.0;
    }
    let sq: f64 = class_totals.iter().map(|c| (c / w) * (c / w)).sum();
    w * (1.0 - sq)
}

/// Balanced class weights: `n_samples / (n_present_classes * count_c)`.
///
/// Classes absent from `y` receive weight zero (they can never appear in a
/// node either).
#[must_use]
pub fn balanced_class_weights(y: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0usize; n_classes];
    for &c in y {
        counts[c] += 1;
    }
    let present = counts.iter().filter(|&&c| c > 0).count();

    #[allow(clippy::cast_precision_loss)]
    let weights = counts
        .iter()
        .map(|&c| {
            if c == 0 {
                0.0
            } else {
                y.len() as f64 / (present as f64 * c as f64)
            }
        })
        .collect();
    weights
}

/// Select a tree depth by stratified k-fold cross-validation.
///
/// Every depth in `depth_min..=depth_max` is scored by mean accuracy over
/// the folds (balanced class weights recomputed per fold); the best depth
/// wins and ties go to the shallower tree. Folds that end up without
/// evaluation samples are skipped; if no fold is usable the grid minimum is
/// returned with a warning.
///
/// # Errors
///
/// Returns [`TrainError::EmptyDataset`] for an empty label set.
pub fn tune_depth(
    x: &Array2<f64>,
    y: &[usize],
    n_classes: usize,
    depth_min: usize,
    depth_max: usize,
    folds: usize,
    seed: u64,
) -> TrainResult<usize> {
    if y.is_empty() {
        return Err(TrainError::EmptyDataset);
    }

    let fold_sets = stratified_kfold(y, folds, seed);
    let mut best: Option<(f64, usize)> = None;

    for depth in depth_min..=depth_max {
        let mut scores = Vec::new();

        for eval in &fold_sets {
            if eval.is_empty() {
                continue;
            }
            let in_eval: std::collections::HashSet<usize> = eval.iter().copied().collect();
            let train: Vec<usize> = (0..y.len()).filter(|i| !in_eval.contains(i)).collect();
            if train.is_empty() {
                continue;
            }

            let x_train = x.select(Axis(0), &train);
            let y_train: Vec<usize> = train.iter().map(|&i| y[i]).collect();
            let weights = balanced_class_weights(&y_train, n_classes);

            let tree = ClassificationTree::fit(&x_train, &y_train, n_classes, &weights, depth)?;

            let correct = eval
                .iter()
                .filter(|&&i| tree.predict_row(x.row(i)) == y[i])
                .count();
            #[allow(clippy::cast_precision_loss)]
            scores.push(correct as f64 / eval.len() as f64);
        }

        if scores.is_empty() {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        debug!("depth {depth}: mean CV accuracy {mean:.4}");

        if best.map_or(true, |(score, _)| mean > score) {
            best = Some((mean, depth));
        }
    }

    match best {
        Some((score, depth)) => {
            debug!("selected depth {depth} (mean CV accuracy {score:.4})");
            Ok(depth)
        }
        None => {
            warn!("no usable cross-validation fold; falling back to depth {depth_min}");
            Ok(depth_min)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    /// Two clearly separated classes on one feature.
    fn separable() -> (Array2<f64>, Vec<usize>) {
        let mut values = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let (v, c) = if i < 12 { (f64::from(i), 0) } else { (f64::from(i) + 50.0, 1) };
            values.push(v);
            labels.push(c);
        }
        (Array2::from_shape_vec((20, 1), values).unwrap(), labels)
    }

    #[test]
    fn balanced_weights_match_rule() {
        let y = vec![0, 0, 0, 1];
        let w = balanced_class_weights(&y, 2);
        assert_abs_diff_eq!(w[0], 4.0 / (2.0 * 3.0), epsilon = 1e-12);
        assert_abs_diff_eq!(w[1], 4.0 / (2.0 * 1.0), epsilon = 1e-12);
    }

    #[test]
    fn absent_classes_get_zero_weight() {
        let y = vec![0, 0, 2];
        let w = balanced_class_weights(&y, 3);
        assert_abs_diff_eq!(w[1], 0.0, epsilon = 1e-12);
        // Present classes use the number of present classes, not n_classes.
        assert_abs_diff_eq!(w[0], 3.0 / (2.0 * 2.0), epsilon = 1e-12);
    }

    #[test]
    fn tree_separates_clean_classes() {
        let (x, y) = separable();
        let weights = balanced_class_weights(&y, 2);
        let tree = ClassificationTree::fit(&x, &y, 2, &weights, 4).unwrap();
        for i in 0..x.nrows() {
            assert_eq!(tree.predict_row(x.row(i)), y[i]);
        }
    }

    #[test]
    fn depth_one_builds_a_stump() {
        let (x, y) = separable();
        let weights = balanced_class_weights(&y, 2);
        let tree = ClassificationTree::fit(&x, &y, 2, &weights, 1).unwrap();
        assert!(tree.node_count() <= 3);
    }

    #[test]
    fn depth_zero_is_a_single_leaf() {
        let (x, y) = separable();
        let weights = balanced_class_weights(&y, 2);
        let tree = ClassificationTree::fit(&x, &y, 2, &weights, 0).unwrap();
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn class_weights_steer_unsplittable_leaves() {
        // All rows identical: no split possible, so the leaf's weighted
        // majority decides. Upweighting the minority class flips it.
        let x = Array2::from_shape_vec((3, 1), vec![1.0; 3]).unwrap();
        let y = vec![0, 0, 1];

        let plain = ClassificationTree::fit(&x, &y, 2, &[1.0, 1.0], 4).unwrap();
        assert_eq!(plain.predict_row(x.row(0)), 0);

        let skewed = ClassificationTree::fit(&x, &y, 2, &[1.0, 10.0], 4).unwrap();
        assert_eq!(skewed.predict_row(x.row(0)), 1);
    }

    #[test]
    fn out_of_range_label_is_rejected() {
        let x = array![[1.0], [2.0]];
        let err = ClassificationTree::fit(&x, &[0, 5], 2, &[1.0, 1.0], 3).unwrap_err();
        assert!(matches!(err, TrainError::Numerical(_)));
    }

    #[test]
    fn tune_depth_stays_in_grid_and_is_deterministic() {
        let (x, y) = separable();
        let a = tune_depth(&x, &y, 2, 2, 14, 5, 42).unwrap();
        let b = tune_depth(&x, &y, 2, 2, 14, 5, 42).unwrap();
        assert_eq!(a, b);
        assert!((2..=14).contains(&a));
    }

    #[test]
    fn tune_depth_prefers_shallow_trees_on_clean_data() {
        // One threshold separates the classes perfectly, so every depth
        // scores 1.0 and the tie must fall to the grid minimum.
        let (x, y) = separable();
        let depth = tune_depth(&x, &y, 2, 2, 14, 5, 42).unwrap();
        assert_eq!(depth, 2);
    }

    #[test]
    fn tune_depth_rejects_empty_labels() {
        let x = Array2::<f64>::zeros((0, 1));
        assert!(matches!(
            tune_depth(&x, &[], 2, 2, 14, 5, 42),
            Err(TrainError::EmptyDataset)
        ));
    }

    #[test]
    fn classifier_serde_round_trip() {
        let (x, y) = separable();
        let weights = balanced_class_weights(&y, 2);
        let tree = ClassificationTree::fit(&x, &y, 2, &weights, 4).unwrap();

        let json = serde_json::to_string(&tree).unwrap();
        let restored: ClassificationTree = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.n_classes(), 2);
        for i in 0..x.nrows() {
            assert_eq!(restored.predict_row(x.row(i)), tree.predict_row(x.row(i)));
        }
    }
}
