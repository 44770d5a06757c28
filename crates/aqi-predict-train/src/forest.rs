//! CART regression trees and the bootstrap-aggregated forest.
//!
//! Trees are grown greedily: at every node the (feature, threshold) pair
//! with the lowest total squared error over the two children wins, with
//! candidate thresholds at the midpoints of consecutive distinct sorted
//! feature values. A node becomes a leaf when it is pure, has fewer than two
//! samples, or admits no valid split. Trees are grown to full depth.
//!
//! [`ForestRegressor`] aggregates `n` trees, each fit on a bootstrap sample
//! (drawn with replacement, same size as the input) from a per-tree RNG
//! stream, and predicts the mean of the per-tree outputs.

use crate::error::{TrainError, TrainResult};
use crate::split::XorShift64;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// One node of an arena-encoded regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    /// Terminal node carrying the mean target of its training rows.
    Leaf { value: f64 },
    /// Internal split: rows with `row[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single CART regression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree on the given rows.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::EmptyDataset`] when `x` has no rows.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> TrainResult<Self> {
        if x.nrows() == 0 {
            return Err(TrainError::EmptyDataset);
        }
        if x.nrows() != y.len() {
            return Err(TrainError::numerical(format!(
                "feature matrix has {} rows but target has {} entries",
                x.nrows(),
                y.len()
            )));
        }

        let mut nodes = Vec::new();
        let indices: Vec<usize> = (0..x.nrows()).collect();
        build_node(&mut nodes, x, y, indices);
        Ok(RegressionTree { nodes })
    }

    /// Predict the target for one feature row.
    #[must_use]
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Recursively grow the subtree for `indices`; returns the node's arena slot.
fn build_node(nodes: &mut Vec<Node>, x: &Array2<f64>, y: &Array1<f64>, indices: Vec<usize>) -> usize {
    let mean = mean_of(y, &indices);
    let pure = indices.iter().all(|&i| (y[i] - y[indices[0]]).abs() == 0.0);

    if indices.len() < 2 || pure {
        nodes.push(Node::Leaf { value: mean });
        return nodes.len() - 1;
    }

    let Some((feature, threshold)) = best_split(x, y, &indices) else {
        nodes.push(Node::Leaf { value: mean });
        return nodes.len() - 1;
    };

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| x[[i, feature]] <= threshold);

    let slot = nodes.len();
    nodes.push(Node::Split { feature, threshold, left: 0, right: 0 });

    let left = build_node(nodes, x, y, left_rows);
    let right = build_node(nodes, x, y, right_rows);
    if let Node::Split { left: l, right: r, .. } = &mut nodes[slot] {
        *l = left;
        *r = right;
    }
    slot
}

/// Best (feature, threshold) by total child squared error, or `None` when
/// every feature is constant over `indices`.
fn best_split(x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> Option<(usize, f64)> {
    let mut best: Option<(f64, usize, f64)> = None;

    for feature in 0..x.ncols() {
        let mut pairs: Vec<(f64, f64)> =
            indices.iter().map(|&i| (x[[i, feature]], y[i])).collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("feature values must not be NaN"));

        let n = pairs.len();
        let total_sum: f64 = pairs.iter().map(|p| p.1).sum();
        let total_sq: f64 = pairs.iter().map(|p| p.1 * p.1).sum();

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 1..n {
            left_sum += pairs[k - 1].1;
            left_sq += pairs[k - 1].1 * pairs[k - 1].1;

            // Only split between distinct feature values.
            if pairs[k - 1].0 == pairs[k].0 {
                continue;
            }

            #[allow(clippy::cast_precision_loss)]
            let cost = {
                let nl = k as f64;
                let nr = (n - k) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                (left_sq - left_sum * left_sum / nl) + (right_sq - right_sum * right_sum / nr)
            };

            if best.map_or(true, |(c, _, _)| cost < c) {
                let threshold = (pairs[k - 1].0 + pairs[k].0) / 2.0;
                best = Some((cost, feature, threshold));
            }
        }
    }

    best.map(|(_, feature, threshold)| (feature, threshold))
}

fn mean_of(y: &Array1<f64>, indices: &[usize]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = indices.len().max(1) as f64;
    indices.iter().map(|&i| y[i]).sum::<f64>() / n
}

// ---------------------------------------------------------------------------
// ForestRegressor
// ---------------------------------------------------------------------------

/// Bootstrap-aggregated ensemble of regression trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestRegressor {
    trees: Vec<RegressionTree>,
}

impl ForestRegressor {
    /// Fit `n_trees` trees, each on its own bootstrap sample.
    ///
    /// The bootstrap for tree `t` is drawn from stream `t` of `seed`, so the
    /// whole ensemble is reproducible from the pair (data, seed).
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::EmptyDataset`] when `x` has no rows.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, n_trees: usize, seed: u64) -> TrainResult<Self> {
        if x.nrows() == 0 {
            return Err(TrainError::EmptyDataset);
        }

        let n = x.nrows();
        let mut trees = Vec::with_capacity(n_trees);
        for t in 0..n_trees {
            let mut rng = XorShift64::for_stream(seed, t as u64);
            let sample: Vec<usize> = (0..n).map(|_| rng.next_index(n)).collect();
            let xb = x.select(Axis(0), &sample);
            let yb = y.select(Axis(0), &sample);
            trees.push(RegressionTree::fit(&xb, &yb)?);
        }
        Ok(ForestRegressor { trees })
    }

    /// Predict the mean of the per-tree outputs for one feature row.
    #[must_use]
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let n = self.trees.len().max(1) as f64;
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n
    }

    /// Number of trees in the ensemble.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        // y jumps from 0 to 10 at x = 5.
        let x = Array2::from_shape_vec((10, 1), (0..10).map(f64::from).collect()).unwrap();
        let y = Array1::from_iter((0..10).map(|i| if i < 5 { 0.0 } else { 10.0 }));
        (x, y)
    }

    #[test]
    fn tree_learns_step_function() {
        let (x, y) = step_data();
        let tree = RegressionTree::fit(&x, &y).unwrap();
        assert_abs_diff_eq!(tree.predict_row(array![2.0].view()), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(tree.predict_row(array![7.0].view()), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn fully_grown_tree_memorises_distinct_rows() {
        let x = Array2::from_shape_vec((8, 1), (0..8).map(f64::from).collect()).unwrap();
        let y = array![3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let tree = RegressionTree::fit(&x, &y).unwrap();
        for i in 0..8 {
            assert_abs_diff_eq!(tree.predict_row(x.row(i)), y[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn constant_target_gives_single_leaf() {
        let x = Array2::from_shape_vec((6, 2), vec![0.0; 12]).unwrap();
        let y = Array1::from_elem(6, 4.2);
        let tree = RegressionTree::fit(&x, &y).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_abs_diff_eq!(tree.predict_row(array![9.0, 9.0].view()), 4.2, epsilon = 1e-12);
    }

    #[test]
    fn duplicate_features_with_mixed_targets_become_mean_leaf() {
        let x = Array2::from_shape_vec((4, 1), vec![1.0; 4]).unwrap();
        let y = array![0.0, 2.0, 4.0, 6.0];
        let tree = RegressionTree::fit(&x, &y).unwrap();
        assert_abs_diff_eq!(tree.predict_row(array![1.0].view()), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_input_is_rejected() {
        let x = Array2::<f64>::zeros((0, 1));
        let y = Array1::<f64>::zeros(0);
        assert!(matches!(RegressionTree::fit(&x, &y), Err(TrainError::EmptyDataset)));
        assert!(matches!(
            ForestRegressor::fit(&x, &y, 10, 42),
            Err(TrainError::EmptyDataset)
        ));
    }

    #[test]
    fn forest_is_deterministic_for_a_seed() {
        let (x, y) = step_data();
        let a = ForestRegressor::fit(&x, &y, 20, 42).unwrap();
        let b = ForestRegressor::fit(&x, &y, 20, 42).unwrap();
        let probe = array![4.6];
        assert_abs_diff_eq!(
            a.predict_row(probe.view()),
            b.predict_row(probe.view()),
            epsilon = 1e-12
        );
    }

    #[test]
    fn forest_prediction_stays_within_target_range() {
        let (x, y) = step_data();
        let forest = ForestRegressor::fit(&x, &y, 30, 7).unwrap();
        for i in 0..10 {
            let p = forest.predict_row(x.row(i));
            assert!((0.0..=10.0).contains(&p), "prediction {p} out of target range");
        }
    }

    #[test]
    fn forest_tracks_step_function_far_from_the_jump() {
        let (x, y) = step_data();
        let forest = ForestRegressor::fit(&x, &y, 50, 42).unwrap();
        assert!(forest.predict_row(array![0.5].view()) < 2.0);
        assert!(forest.predict_row(array![9.0].view()) > 8.0);
    }

    #[test]
    fn forest_serde_round_trip() {
        let (x, y) = step_data();
        let forest = ForestRegressor::fit(&x, &y, 10, 42).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let restored: ForestRegressor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.tree_count(), 10);
        let probe = array![3.0];
        assert_abs_diff_eq!(
            restored.predict_row(probe.view()),
            forest.predict_row(probe.view()),
            epsilon = 1e-12
        );
    }
}
