//! Deterministic resampling: shuffles, holdout splits, and k-fold folds.
//!
//! All randomness flows through [`XorShift64`], a 64-bit xorshift PRNG with
//! an explicit seed. Given the same seed and input sizes every split is
//! identical across runs and platforms; no external RNG state is involved.

use crate::error::{TrainError, TrainResult};

/// A 64-bit xorshift PRNG.
///
/// Small, fast, and fully deterministic. Not suitable for cryptography;
/// entirely suitable for reproducible shuffles and bootstrap draws.
#[derive(Debug, Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Create a generator from a seed. A zero seed is remapped to a fixed
    /// non-zero constant (xorshift has an all-zero fixed point).
    #[must_use]
    pub fn new(seed: u64) -> Self {
        XorShift64 {
            state: if seed == 0 { 0x853c_49e6_748f_ea9b } else { seed },
        }
    }

    /// Derive a generator for an auxiliary stream (per tree, per class, …)
    /// so that streams drawn from one base seed do not overlap trivially.
    #[must_use]
    pub fn for_stream(seed: u64, stream: u64) -> Self {
        // SplitMix64 finalizer over (seed, stream).
        let mut z = seed
            .wrapping_add(stream.wrapping_mul(0x9e37_79b9_7f4a_7c15))
            .wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        Self::new(z ^ (z >> 31))
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Uniform-ish index in `[0, bound)`. `bound` must be non-zero.
    pub fn next_index(&mut self, bound: usize) -> usize {
        debug_assert!(bound > 0, "next_index bound must be > 0");
        (self.next_u64() as usize) % bound
    }

    /// In-place Fisher-Yates shuffle.
    pub fn shuffle(&mut self, indices: &mut [usize]) {
        for i in (1..indices.len()).rev() {
            let j = self.next_index(i + 1);
            indices.swap(i, j);
        }
    }
}

/// Split `n` samples into shuffled (train, holdout) index sets.
///
/// The holdout takes `round(holdout_fraction * n)` samples, clamped so both
/// sides keep at least one sample.
///
/// # Errors
///
/// Returns [`TrainError::SplitInfeasible`] when `n < 2`.
pub fn holdout_split(
    n: usize,
    holdout_fraction: f64,
    seed: u64,
) -> TrainResult<(Vec<usize>, Vec<usize>)> {
    if n < 2 {
        return Err(TrainError::SplitInfeasible { n });
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n_holdout = ((holdout_fraction * n as f64).round() as usize).clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    XorShift64::new(seed).shuffle(&mut indices);

    let holdout = indices.split_off(n - n_holdout);
    Ok((indices, holdout))
}

/// Split labelled samples into (train, holdout) index sets, holding out
/// `holdout_fraction` of each class.
///
/// Classes with a single sample contribute that sample to the training side
/// only. The holdout set is therefore empty exactly when every class is a
/// singleton; callers that evaluate on the holdout must tolerate that.
pub fn stratified_holdout(
    labels: &[usize],
    holdout_fraction: f64,
    seed: u64,
) -> TrainResult<(Vec<usize>, Vec<usize>)> {
    if labels.is_empty() {
        return Err(TrainError::EmptyDataset);
    }

    let mut train = Vec::new();
    let mut holdout = Vec::new();

    for (class, mut members) in group_by_class(labels) {
        XorShift64::for_stream(seed, class as u64).shuffle(&mut members);
        let n_c = members.len();
        if n_c < 2 {
            train.extend(members);
            continue;
        }
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n_holdout = ((holdout_fraction * n_c as f64).round() as usize).clamp(1, n_c - 1);
        let class_holdout = members.split_off(n_c - n_holdout);
        train.extend(members);
        holdout.extend(class_holdout);
    }

    train.sort_unstable();
    holdout.sort_unstable();
    Ok((train, holdout))
}

/// Assign labelled samples to `k` stratified folds.
///
/// Returns one index list per fold (the fold's evaluation set). Each class
/// is shuffled and dealt round-robin across folds, so class proportions are
/// preserved as closely as integer counts allow. Folds may be empty when
/// there are fewer samples than folds.
pub fn stratified_kfold(labels: &[usize], k: usize, seed: u64) -> Vec<Vec<usize>> {
    assert!(k >= 2, "k-fold needs at least 2 folds");
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];

    for (class, mut members) in group_by_class(labels) {
        XorShift64::for_stream(seed, class as u64).shuffle(&mut members);
        for (i, idx) in members.into_iter().enumerate() {
            folds[i % k].push(idx);
        }
    }

    for fold in &mut folds {
        fold.sort_unstable();
    }
    folds
}

/// Group sample indices by class label, classes in ascending order.
fn group_by_class(labels: &[usize]) -> Vec<(usize, Vec<usize>)> {
    let mut classes: Vec<usize> = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();

    classes
        .into_iter()
        .map(|class| {
            let members: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter_map(|(i, &l)| (l == class).then_some(i))
                .collect();
            (class, members)
        })
        .collect()
}
