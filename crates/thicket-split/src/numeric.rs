//! Dense numeric columns and sorted threshold search.

use rand::Rng;

use crate::allocs::{BestSplitAllocs, CaseBuffers};
use crate::config::{CONSTANT_CUTOFF, MIN_IMP, SplitConfig};
use crate::feature::{CodedSplit, SplitCandidate};
use crate::splitter::Partition;
use crate::target::Target;

/// A numeric column: one `f64` per case plus a parallel missing mask.
///
/// Missing cases hold a placeholder `0.0` that is never read as a value.
#[derive(Debug, Clone, PartialEq)]
pub struct NumFeature {
    pub(crate) name: String,
    pub(crate) values: Vec<f64>,
    pub(crate) missing: Vec<bool>,
}

impl NumFeature {
    /// Create an empty column with room for `capacity` cases.
    #[must_use]
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            values: Vec::with_capacity(capacity),
            missing: Vec::with_capacity(capacity),
        }
    }

    /// Create a column with no missing values.
    #[must_use]
    pub fn from_values(name: impl Into<String>, values: Vec<f64>) -> Self {
        let missing = vec![false; values.len()];
        Self {
            name: name.into(),
            values,
            missing,
        }
    }

    /// Create a column where `None` marks a missing case.
    #[must_use]
    pub fn from_options(name: impl Into<String>, values: &[Option<f64>]) -> Self {
        Self {
            name: name.into(),
            values: values.iter().map(|v| v.unwrap_or(0.0)).collect(),
            missing: values.iter().map(Option::is_none).collect(),
        }
    }

    /// Return the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the number of cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` if the column holds no cases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Return the value at case `i`, or `None` when missing.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<f64> {
        (!self.missing[i]).then(|| self.values[i])
    }

    /// Store `v` at case `i` and mark it present.
    pub fn put(&mut self, i: usize, v: f64) {
        self.values[i] = v;
        self.missing[i] = false;
    }

    /// Return `true` if case `i` is missing.
    #[must_use]
    pub fn is_missing(&self, i: usize) -> bool {
        self.missing[i]
    }

    /// Return `true` if any case is missing.
    #[must_use]
    pub fn has_missing(&self) -> bool {
        self.missing.iter().any(|&m| m)
    }

    /// Mark case `i` missing.
    pub fn put_missing(&mut self, i: usize) {
        self.values[i] = 0.0;
        self.missing[i] = true;
    }

    /// Append one case parsed from text; unparseable or non-finite text
    /// becomes missing.
    pub fn append(&mut self, v: &str) {
        match parse_value(v) {
            Some(value) => {
                self.values.push(value);
                self.missing.push(false);
            }
            None => {
                self.values.push(0.0);
                self.missing.push(true);
            }
        }
    }

    /// Strict ordering of two cases' values.
    #[must_use]
    pub fn less(&self, i: usize, j: usize) -> bool {
        self.values[i] < self.values[j]
    }

    /// Mean of the non-missing values among `cases`.
    #[must_use]
    pub fn mean(&self, cases: &[usize]) -> Option<f64> {
        let (sum, n) = cases
            .iter()
            .filter(|&&c| !self.missing[c])
            .fold((0.0, 0usize), |(s, n), &c| (s + self.values[c], n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    /// `max - min` over the non-missing values among `cases`; `0.0` if none.
    #[must_use]
    pub fn span(&self, cases: &[usize]) -> f64 {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &c in cases {
            if !self.missing[c] {
                lo = lo.min(self.values[c]);
                hi = hi.max(self.values[c]);
            }
        }
        if lo > hi { 0.0 } else { hi - lo }
    }

    /// Squared error of case `i` against `predicted`.
    #[must_use]
    pub fn norm(&self, i: usize, predicted: f64) -> f64 {
        let d = self.values[i] - predicted;
        d * d
    }

    /// Mean squared error of the non-missing cases against `predicted`.
    #[must_use]
    pub fn error(&self, cases: &[usize], predicted: f64) -> f64 {
        let (sum, n) = cases
            .iter()
            .filter(|&&c| !self.missing[c])
            .fold((0.0, 0usize), |(s, n), &c| (s + self.norm(c, predicted), n + 1));
        if n == 0 { 0.0 } else { sum / n as f64 }
    }

    /// Fisher-Yates shuffle of the whole column; values and missing flags
    /// move together.
    pub fn shuffle(&mut self, rng: &mut impl Rng) {
        for i in (1..self.values.len()).rev() {
            let j = rng.gen_range(0..=i);
            self.values.swap(i, j);
            self.missing.swap(i, j);
        }
    }

    /// Shuffle values among the positions listed in `cases` only.
    pub fn shuffle_cases(&mut self, cases: &[usize], rng: &mut impl Rng) {
        for i in (1..cases.len()).rev() {
            let j = rng.gen_range(0..=i);
            self.values.swap(cases[i], cases[j]);
            self.missing.swap(cases[i], cases[j]);
        }
    }

    /// Replace every missing value with the mean of the non-missing values.
    ///
    /// A column with no present values is left untouched.
    pub fn impute_missing(&mut self) {
        let all: Vec<usize> = (0..self.len()).collect();
        if let Some(mean) = self.mean(&all) {
            for i in 0..self.len() {
                if self.missing[i] {
                    self.put(i, mean);
                }
            }
        }
    }

    /// Partition `cases` by `value <= threshold`; missing cases go to the third branch.
    #[must_use]
    pub fn split(&self, threshold: f64, cases: &[usize]) -> Partition {
        let mut partition = Partition::with_capacity(cases.len());
        for &c in cases {
            if self.missing[c] {
                partition.missing.push(c);
            } else if self.values[c] <= threshold {
                partition.left.push(c);
            } else {
                partition.right.push(c);
            }
        }
        partition
    }

    /// Find the best threshold over `cases`.
    ///
    /// Present cases are sorted by value and every boundary between two
    /// distinct values that leaves at least `min_leaf_size` cases per side
    /// is a candidate. Randomized search scores only a random subset of the
    /// candidates. Consecutive candidates are scored incrementally: only the
    /// cases that crossed the boundary are moved.
    pub(crate) fn best_split(
        &self,
        target: &dyn Target,
        cases: &[usize],
        parent_imp: f64,
        config: &SplitConfig,
        allocs: &mut BestSplitAllocs,
        rng: &mut impl Rng,
    ) -> SplitCandidate {
        let BestSplitAllocs {
            cases: bufs,
            counts,
            ..
        } = allocs;
        let CaseBuffers {
            present,
            missing,
            positions,
            ..
        } = bufs;

        present.clear();
        missing.clear();
        for &c in cases {
            if self.missing[c] {
                missing.push(c);
            } else {
                present.push(c);
            }
        }

        if present.is_empty() {
            return SplitCandidate::constant();
        }

        let values = &self.values;
        present.sort_unstable_by(|&a, &b| values[a].total_cmp(&values[b]));
        let present: &[usize] = present;
        let n = present.len();

        if values[present[n - 1]] - values[present[0]] < CONSTANT_CUTOFF {
            return SplitCandidate::constant();
        }

        let leaf = config.min_leaf_size;
        if n / 2 < leaf {
            return SplitCandidate::none();
        }

        // Excluded missing cases leave the children, so they leave the parent too.
        let parent_imp = if config.three_way() || missing.is_empty() {
            parent_imp
        } else {
            target.impurity(present, counts)
        };
        let boundaries = (leaf..=n - leaf).filter(|&i| values[present[i - 1]] < values[present[i]]);
        let missing = config.three_way().then_some(missing.as_slice());

        let mut best_decrease = MIN_IMP;
        let mut best_threshold = None;
        let mut last = None;
        let mut score = |i: usize| {
            let inner = match last {
                None => target.split_impurity(&present[..i], &present[i..], missing, counts),
                Some(prev) => target.update_split_impurity(&present[prev..i], counts),
            };
            last = Some(i);
            let decrease = parent_imp - inner;
            if decrease > best_decrease {
                best_decrease = decrease;
                best_threshold = Some(midpoint(values[present[i - 1]], values[present[i]]));
            }
        };

        if config.is_randomized() {
            positions.clear();
            positions.extend(boundaries);
            let take = config.random_candidates;
            if positions.len() > take {
                // Partial Fisher-Yates, then restore ascending order so the
                // incremental path only ever moves cases right to left.
                for j in 0..take {
                    let k = rng.gen_range(j..positions.len());
                    positions.swap(j, k);
                }
                positions.truncate(take);
                positions.sort_unstable();
            }
            positions.iter().copied().for_each(&mut score);
        } else {
            boundaries.for_each(&mut score);
        }

        match best_threshold {
            Some(threshold) => SplitCandidate {
                split: Some(CodedSplit::Threshold(threshold)),
                impurity_decrease: best_decrease,
                constant: false,
            },
            None => SplitCandidate::none(),
        }
    }
}

/// Parse a numeric cell. `NaN` and infinities count as missing.
pub(crate) fn parse_value(v: &str) -> Option<f64> {
    v.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Threshold between two distinct sorted values such that `a` goes left and
/// `b` goes right.
fn midpoint(a: f64, b: f64) -> f64 {
    let m = a + (b - a) / 2.0;
    if m < b { m } else { a }
}
