//! Response-variable views used to score candidate partitions.
//!
//! A [`Target`] borrows a column and exposes only impurity and prediction.
//! Categorical columns are Gini classification targets and numeric columns
//! are variance regression targets; [`EntropyTarget`] and [`AdaBoostTarget`]
//! wrap a categorical column with a different scoring rule.

use std::fmt;

use crate::allocs::{SideStats, SplitCounts};
use crate::categorical::{CatFeature, argmax};
use crate::criterion::SplitCriterion;
use crate::numeric::NumFeature;

/// The representative value predicted for a set of cases.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Prediction {
    /// Most frequent category.
    Class(String),
    /// Mean response.
    Value(f64),
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Class(c) => f.write_str(c),
            Prediction::Value(v) => write!(f, "{v}"),
        }
    }
}

/// Impurity and prediction capabilities of a response variable.
///
/// `split_impurity` scores a partition from scratch and leaves per-side
/// statistics in `scratch`; `update_split_impurity` then rescores after the
/// `moved_r_to_l` cases cross from the right side to the left side, touching
/// only those cases. The two must agree on any partition reachable by moves.
/// Cases missing in the response contribute to no side.
pub trait Target {
    /// Name of the response column.
    fn name(&self) -> &str;

    /// Number of response categories; `0` for a numeric response.
    fn n_cats(&self) -> usize;

    /// Impurity of `cases`.
    fn impurity(&self, cases: &[usize], scratch: &mut SplitCounts) -> f64;

    /// Weighted mean impurity over the left, right and (if given) missing
    /// sides.
    fn split_impurity(
        &self,
        left: &[usize],
        right: &[usize],
        missing: Option<&[usize]>,
        scratch: &mut SplitCounts,
    ) -> f64;

    /// Rescore the partition held in `scratch` after moving `moved_r_to_l`.
    fn update_split_impurity(&self, moved_r_to_l: &[usize], scratch: &mut SplitCounts) -> f64;

    /// Representative prediction for `cases`; `None` if none are present.
    fn predicted(&self, cases: &[usize]) -> Option<Prediction>;
}

/// A [`Target`] that reweights itself between trees.
///
/// Invoked by the forest-growing loop after each tree, never by the search.
pub trait BoostingTarget: Target {
    /// Score a grown tree by its leaf partition, returning the tree's weight
    /// and adjusting the target for the next tree.
    fn boost(&mut self, partition: &[Vec<usize>]) -> f64;
}

/// Shared scoring for classification targets over (optionally weighted)
/// category counts.
struct ClassScorer<'a> {
    feature: &'a CatFeature,
    weights: Option<&'a [f64]>,
    criterion: SplitCriterion,
}

impl ClassScorer<'_> {
    fn weight(&self, c: usize) -> f64 {
        self.weights.map_or(1.0, |w| w[c])
    }

    fn side_impurity(&self, side: &SideStats) -> f64 {
        self.criterion.impurity(&side.counts, side.weight)
    }

    fn impurity(&self, cases: &[usize], scratch: &mut SplitCounts) -> f64 {
        scratch.left.reset(self.feature.n_cats());
        for &c in cases {
            self.feature.accumulate(c, self.weight(c), &mut scratch.left);
        }
        self.side_impurity(&scratch.left)
    }

    fn split_impurity(
        &self,
        left: &[usize],
        right: &[usize],
        missing: Option<&[usize]>,
        scratch: &mut SplitCounts,
    ) -> f64 {
        scratch.reset(self.feature.n_cats());
        for &c in left {
            self.feature.accumulate(c, self.weight(c), &mut scratch.left);
        }
        for &c in right {
            self.feature.accumulate(c, self.weight(c), &mut scratch.right);
        }
        for &c in missing.unwrap_or_default() {
            self.feature.accumulate(c, self.weight(c), &mut scratch.missing);
        }
        scratch.weighted_impurity(|s| self.side_impurity(s))
    }

    fn update_split_impurity(&self, moved: &[usize], scratch: &mut SplitCounts) -> f64 {
        match self.weights {
            None => self.feature.move_counts_r_to_l(moved, scratch),
            Some(_) => {
                for &c in moved {
                    let w = self.weight(c);
                    self.feature.withdraw(c, w, &mut scratch.right);
                    self.feature.accumulate(c, w, &mut scratch.left);
                }
            }
        }
        scratch.weighted_impurity(|s| self.side_impurity(s))
    }

    fn predicted(&self, cases: &[usize]) -> Option<Prediction> {
        let mut counts = vec![0.0; self.feature.n_cats()];
        for &c in cases {
            if let Some(code) = self.feature.geti(c) {
                counts[code] += self.weight(c);
            }
        }
        let code = argmax(counts.into_iter())?;
        self.feature
            .num_to_cat(code)
            .map(|cat| Prediction::Class(cat.to_string()))
    }
}

/// Gini classification.
impl Target for CatFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_cats(&self) -> usize {
        self.map.n_cats()
    }

    fn impurity(&self, cases: &[usize], scratch: &mut SplitCounts) -> f64 {
        gini_scorer(self).impurity(cases, scratch)
    }

    fn split_impurity(
        &self,
        left: &[usize],
        right: &[usize],
        missing: Option<&[usize]>,
        scratch: &mut SplitCounts,
    ) -> f64 {
        gini_scorer(self).split_impurity(left, right, missing, scratch)
    }

    fn update_split_impurity(&self, moved_r_to_l: &[usize], scratch: &mut SplitCounts) -> f64 {
        gini_scorer(self).update_split_impurity(moved_r_to_l, scratch)
    }

    fn predicted(&self, cases: &[usize]) -> Option<Prediction> {
        self.mode(cases).map(|m| Prediction::Class(m.to_string()))
    }
}

fn gini_scorer(feature: &CatFeature) -> ClassScorer<'_> {
    ClassScorer {
        feature,
        weights: None,
        criterion: SplitCriterion::Gini,
    }
}

impl NumFeature {
    /// First present response among `groups`, used as the accumulation
    /// reference.
    fn reference<'c>(&self, groups: impl IntoIterator<Item = &'c [usize]>) -> f64 {
        groups
            .into_iter()
            .flatten()
            .find_map(|&c| self.get(c))
            .unwrap_or(0.0)
    }

    fn accumulate(&self, c: usize, shift: f64, side: &mut SideStats) {
        if !self.missing[c] {
            let v = self.values[c] - shift;
            side.weight += 1.0;
            side.sum += v;
            side.sum_sq += v * v;
        }
    }

    fn withdraw(&self, c: usize, shift: f64, side: &mut SideStats) {
        if !self.missing[c] {
            let v = self.values[c] - shift;
            side.weight -= 1.0;
            side.sum -= v;
            side.sum_sq -= v * v;
        }
    }
}

/// Variance regression.
impl Target for NumFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_cats(&self) -> usize {
        0
    }

    fn impurity(&self, cases: &[usize], scratch: &mut SplitCounts) -> f64 {
        let shift = self.reference([cases]);
        scratch.left.reset(0);
        for &c in cases {
            self.accumulate(c, shift, &mut scratch.left);
        }
        scratch.left.variance()
    }

    fn split_impurity(
        &self,
        left: &[usize],
        right: &[usize],
        missing: Option<&[usize]>,
        scratch: &mut SplitCounts,
    ) -> f64 {
        let missing = missing.unwrap_or_default();
        scratch.reset(0);
        let shift = self.reference([left, right, missing]);
        scratch.shift = shift;
        for &c in left {
            self.accumulate(c, shift, &mut scratch.left);
        }
        for &c in right {
            self.accumulate(c, shift, &mut scratch.right);
        }
        for &c in missing {
            self.accumulate(c, shift, &mut scratch.missing);
        }
        scratch.weighted_impurity(SideStats::variance)
    }

    fn update_split_impurity(&self, moved_r_to_l: &[usize], scratch: &mut SplitCounts) -> f64 {
        let shift = scratch.shift;
        for &c in moved_r_to_l {
            self.withdraw(c, shift, &mut scratch.right);
            self.accumulate(c, shift, &mut scratch.left);
        }
        scratch.weighted_impurity(SideStats::variance)
    }

    fn predicted(&self, cases: &[usize]) -> Option<Prediction> {
        self.mean(cases).map(Prediction::Value)
    }
}

/// Classification target scored by information entropy.
#[derive(Debug, Clone, Copy)]
pub struct EntropyTarget<'a> {
    feature: &'a CatFeature,
}

impl<'a> EntropyTarget<'a> {
    /// Wrap a categorical response column.
    #[must_use]
    pub fn new(feature: &'a CatFeature) -> Self {
        Self { feature }
    }

    fn scorer(&self) -> ClassScorer<'a> {
        ClassScorer {
            feature: self.feature,
            weights: None,
            criterion: SplitCriterion::Entropy,
        }
    }
}

impl Target for EntropyTarget<'_> {
    fn name(&self) -> &str {
        self.feature.name()
    }

    fn n_cats(&self) -> usize {
        self.feature.n_cats()
    }

    fn impurity(&self, cases: &[usize], scratch: &mut SplitCounts) -> f64 {
        self.scorer().impurity(cases, scratch)
    }

    fn split_impurity(
        &self,
        left: &[usize],
        right: &[usize],
        missing: Option<&[usize]>,
        scratch: &mut SplitCounts,
    ) -> f64 {
        self.scorer().split_impurity(left, right, missing, scratch)
    }

    fn update_split_impurity(&self, moved_r_to_l: &[usize], scratch: &mut SplitCounts) -> f64 {
        self.scorer().update_split_impurity(moved_r_to_l, scratch)
    }

    fn predicted(&self, cases: &[usize]) -> Option<Prediction> {
        self.scorer().predicted(cases)
    }
}

/// Error rates are clamped into `[BOOST_EPS, 1 - BOOST_EPS]` so a perfect or
/// hopeless tree still gets a finite weight.
const BOOST_EPS: f64 = 1e-10;

/// AdaBoost classification: case-weighted Gini whose weights shift toward
/// misclassified cases after each tree.
#[derive(Debug, Clone)]
pub struct AdaBoostTarget<'a> {
    feature: &'a CatFeature,
    weights: Vec<f64>,
}

impl<'a> AdaBoostTarget<'a> {
    /// Wrap a categorical response column with uniform case weights.
    #[must_use]
    pub fn new(feature: &'a CatFeature) -> Self {
        let n = feature.len();
        let w = if n == 0 { 0.0 } else { 1.0 / n as f64 };
        Self {
            feature,
            weights: vec![w; n],
        }
    }

    /// Current case weights; they sum to 1.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn scorer(&self) -> ClassScorer<'_> {
        ClassScorer {
            feature: self.feature,
            weights: Some(&self.weights),
            criterion: SplitCriterion::Gini,
        }
    }
}

impl Target for AdaBoostTarget<'_> {
    fn name(&self) -> &str {
        self.feature.name()
    }

    fn n_cats(&self) -> usize {
        self.feature.n_cats()
    }

    fn impurity(&self, cases: &[usize], scratch: &mut SplitCounts) -> f64 {
        self.scorer().impurity(cases, scratch)
    }

    fn split_impurity(
        &self,
        left: &[usize],
        right: &[usize],
        missing: Option<&[usize]>,
        scratch: &mut SplitCounts,
    ) -> f64 {
        self.scorer().split_impurity(left, right, missing, scratch)
    }

    fn update_split_impurity(&self, moved_r_to_l: &[usize], scratch: &mut SplitCounts) -> f64 {
        self.scorer().update_split_impurity(moved_r_to_l, scratch)
    }

    fn predicted(&self, cases: &[usize]) -> Option<Prediction> {
        self.scorer().predicted(cases)
    }
}

impl BoostingTarget for AdaBoostTarget<'_> {
    /// Each leaf predicts its weighted mode. The tree weight is
    /// `ln((1 - err) / err)` for weighted error `err`; misclassified cases
    /// are scaled by `exp(weight)` and all weights renormalized.
    fn boost(&mut self, partition: &[Vec<usize>]) -> f64 {
        let mut counts = vec![0.0; self.feature.n_cats()];
        let mut misclassified = Vec::new();
        let mut err = 0.0;
        let mut total = 0.0;

        for leaf in partition {
            counts.fill(0.0);
            for &c in leaf {
                if let Some(code) = self.feature.geti(c) {
                    counts[code] += self.weights[c];
                }
            }
            let Some(pred) = argmax(counts.iter().copied()) else {
                continue;
            };
            for &c in leaf {
                let Some(code) = self.feature.geti(c) else {
                    continue;
                };
                total += self.weights[c];
                if code != pred {
                    err += self.weights[c];
                    misclassified.push(c);
                }
            }
        }

        if total <= 0.0 {
            return 0.0;
        }
        let err = (err / total).clamp(BOOST_EPS, 1.0 - BOOST_EPS);
        let weight = ((1.0 - err) / err).ln();

        let scale = weight.exp();
        for c in misclassified {
            self.weights[c] *= scale;
        }
        let sum: f64 = self.weights.iter().sum();
        if sum > 0.0 {
            self.weights.iter_mut().for_each(|w| *w /= sum);
        }
        weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> CatFeature {
        CatFeature::from_strs("C:y", &values.iter().map(|v| Some(*v)).collect::<Vec<_>>())
    }

    #[test]
    fn gini_target_impurity_matches_feature_gini() {
        let y = labels(&["a", "b", "a", "c", "a"]);
        let mut scratch = SplitCounts::default();
        let cases = [0, 1, 2, 3, 4];
        assert!((y.impurity(&cases, &mut scratch) - y.gini(&cases)).abs() < 1e-12);
        assert_eq!(Target::n_cats(&y), 3);
    }

    #[test]
    fn gini_split_impurity_weights_sides() {
        let y = labels(&["a", "a", "b", "b"]);
        let mut scratch = SplitCounts::default();
        let imp = y.split_impurity(&[0, 2], &[1, 3], None, &mut scratch);
        assert!((imp - 0.5).abs() < 1e-12);
        let pure = y.split_impurity(&[0, 1], &[2, 3], None, &mut scratch);
        assert!(pure.abs() < 1e-12);
    }

    #[test]
    fn gini_incremental_matches_full() {
        let y = labels(&["a", "b", "a", "c", "b", "a", "c"]);
        let order = [3, 0, 6, 1, 5, 2, 4];
        let missing: &[usize] = &[];
        let mut inc = SplitCounts::default();
        let mut full = SplitCounts::default();
        y.split_impurity(&order[..1], &order[1..], Some(missing), &mut inc);
        for i in 2..order.len() {
            let a = y.update_split_impurity(&order[i - 1..i], &mut inc);
            let b = y.split_impurity(&order[..i], &order[i..], Some(missing), &mut full);
            assert!((a - b).abs() < 1e-12, "step {i}: {a} vs {b}");
        }
    }

    #[test]
    fn regression_incremental_matches_full() {
        let y = NumFeature::from_options(
            "N:y",
            &[Some(1.0), Some(4.0), None, Some(2.5), Some(10.0), Some(-3.0)],
        );
        let order = [5, 0, 3, 2, 1, 4];
        let mut inc = SplitCounts::default();
        let mut full = SplitCounts::default();
        y.split_impurity(&order[..1], &order[1..], None, &mut inc);
        for i in 2..order.len() {
            let a = y.update_split_impurity(&order[i - 1..i], &mut inc);
            let b = y.split_impurity(&order[..i], &order[i..], None, &mut full);
            assert!((a - b).abs() < 1e-9, "step {i}: {a} vs {b}");
        }
    }

    #[test]
    fn regression_impurity_is_variance() {
        let y = NumFeature::from_values("N:y", vec![1.0, 2.0, 3.0, 4.0]);
        let mut scratch = SplitCounts::default();
        assert!((y.impurity(&[0, 1, 2, 3], &mut scratch) - 1.25).abs() < 1e-12);
        assert_eq!(y.predicted(&[0, 1, 2, 3]), Some(Prediction::Value(2.5)));
        assert_eq!(Target::n_cats(&y), 0);
    }

    #[test]
    fn regression_ignores_large_response_offset() {
        // Parity of the response is independent of any cut below.
        let y = NumFeature::from_values("N:y", (0..8).map(|i| 1e9 + f64::from(i % 2)).collect());
        let mut scratch = SplitCounts::default();
        let all: Vec<usize> = (0..8).collect();
        assert!((y.impurity(&all, &mut scratch) - 0.25).abs() < 1e-12);

        let inner = y.split_impurity(&all[..2], &all[2..], None, &mut scratch);
        assert!((inner - 0.25).abs() < 1e-12);
        let moved = y.update_split_impurity(&all[2..4], &mut scratch);
        assert!((moved - 0.25).abs() < 1e-12);
    }

    #[test]
    fn classification_prediction_is_mode() {
        let y = labels(&["a", "b", "b"]);
        assert_eq!(y.predicted(&[0, 1, 2]), Some(Prediction::Class("b".into())));
        assert_eq!(y.predicted(&[]), None);
    }

    #[test]
    fn entropy_target_scores_with_entropy() {
        let y = labels(&["a", "b", "a", "b"]);
        let t = EntropyTarget::new(&y);
        let mut scratch = SplitCounts::default();
        assert!((t.impurity(&[0, 1, 2, 3], &mut scratch) - 2.0_f64.ln()).abs() < 1e-12);
        assert_eq!(t.name(), "C:y");
    }

    #[test]
    fn adaboost_starts_uniform_and_matches_gini() {
        let y = labels(&["a", "b", "a", "b"]);
        let t = AdaBoostTarget::new(&y);
        assert!(t.weights().iter().all(|&w| (w - 0.25).abs() < 1e-12));
        let mut scratch = SplitCounts::default();
        let cases = [0, 1, 2, 3];
        assert!((t.impurity(&cases, &mut scratch) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn adaboost_weighted_incremental_matches_full() {
        let y = labels(&["a", "b", "a", "b", "a"]);
        let mut t = AdaBoostTarget::new(&y);
        t.boost(&[vec![0, 1, 2], vec![3, 4]]);
        let order = [4, 1, 0, 3, 2];
        let mut inc = SplitCounts::default();
        let mut full = SplitCounts::default();
        t.split_impurity(&order[..1], &order[1..], None, &mut inc);
        for i in 2..order.len() {
            let a = t.update_split_impurity(&order[i - 1..i], &mut inc);
            let b = t.split_impurity(&order[..i], &order[i..], None, &mut full);
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn adaboost_upweights_misclassified_cases() {
        let y = labels(&["a", "a", "a", "b"]);
        let mut t = AdaBoostTarget::new(&y);
        // One leaf predicting "a": case 3 is wrong, err = 0.25.
        let weight = t.boost(&[vec![0, 1, 2, 3]]);
        assert!((weight - 3.0_f64.ln()).abs() < 1e-12);
        let w = t.weights();
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((w[3] - 0.5).abs() < 1e-12);
        assert!((w[0] - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn adaboost_perfect_tree_gets_finite_weight() {
        let y = labels(&["a", "b"]);
        let mut t = AdaBoostTarget::new(&y);
        let weight = t.boost(&[vec![0], vec![1]]);
        assert!(weight.is_finite() && weight > 0.0);
    }
}
