//! Dense categorical columns.

use rand::Rng;

use crate::allocs::{SideStats, SplitCounts};
use crate::criterion::SplitCriterion;
use crate::encoder::CatMap;
use crate::numeric::NumFeature;
use crate::splitter::Partition;

/// Text values that mark a categorical case missing (compared
/// case-insensitively).
pub const MISSING_TOKENS: [&str; 4] = ["?", "nan", "na", "null"];

/// A categorical column: one category code per case, resolved through a
/// [`CatMap`], plus a parallel missing mask.
///
/// Missing cases hold the placeholder code `0`, which is never counted.
#[derive(Debug, Clone, PartialEq)]
pub struct CatFeature {
    pub(crate) name: String,
    pub(crate) codes: Vec<usize>,
    pub(crate) missing: Vec<bool>,
    pub(crate) map: CatMap,
}

impl CatFeature {
    /// Create an empty column with room for `capacity` cases.
    #[must_use]
    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            codes: Vec::with_capacity(capacity),
            missing: Vec::with_capacity(capacity),
            map: CatMap::new(),
        }
    }

    /// Create a column where `None` marks a missing case.
    #[must_use]
    pub fn from_strs(name: impl Into<String>, values: &[Option<&str>]) -> Self {
        let mut f = Self::with_capacity(name, values.len());
        for v in values {
            match v {
                Some(v) => {
                    let code = f.map.cat_to_num(v);
                    f.codes.push(code);
                    f.missing.push(false);
                }
                None => {
                    f.codes.push(0);
                    f.missing.push(true);
                }
            }
        }
        f
    }

    /// Return the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the number of cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Return `true` if the column holds no cases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Return the number of distinct categories ever encoded.
    #[must_use]
    pub fn n_cats(&self) -> usize {
        self.map.n_cats()
    }

    /// Return the encoder backing this column.
    #[must_use]
    pub fn cat_map(&self) -> &CatMap {
        &self.map
    }

    /// Return the code at case `i`, or `None` when missing.
    #[must_use]
    pub fn geti(&self, i: usize) -> Option<usize> {
        (!self.missing[i]).then(|| self.codes[i])
    }

    /// Store code `code` at case `i` and mark it present.
    ///
    /// `code` must already exist in the encoder.
    pub fn puti(&mut self, i: usize, code: usize) {
        debug_assert!(code < self.n_cats(), "unknown category code {code}");
        self.codes[i] = code;
        self.missing[i] = false;
    }

    /// Return the category string at case `i`, or `None` when missing.
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&str> {
        self.geti(i).and_then(|code| self.map.num_to_cat(code))
    }

    /// Store category `v` at case `i`, encoding it if new.
    pub fn put(&mut self, i: usize, v: &str) {
        let code = self.map.cat_to_num(v);
        self.puti(i, code);
    }

    /// Return the code for `value`, assigning one if unseen.
    pub fn cat_to_num(&mut self, value: &str) -> usize {
        self.map.cat_to_num(value)
    }

    /// Return the category string for `code`.
    #[must_use]
    pub fn num_to_cat(&self, code: usize) -> Option<&str> {
        self.map.num_to_cat(code)
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
        self.codes[i] = 0;
        self.missing[i] = true;
    }

    /// Append one case from text; a [`MISSING_TOKENS`] match becomes missing.
    pub fn append(&mut self, v: &str) {
        if is_missing_token(v) {
            self.codes.push(0);
            self.missing.push(true);
        } else {
            let code = self.map.cat_to_num(v);
            self.codes.push(code);
            self.missing.push(false);
        }
    }

    /// Count non-missing cases per category into `counter`.
    ///
    /// `counter` must have at least [`CatFeature::n_cats`] slots; it is
    /// zeroed first.
    pub fn count_per_cat(&self, cases: &[usize], counter: &mut [usize]) {
        counter.fill(0);
        for &c in cases {
            if !self.missing[c] {
                counter[self.codes[c]] += 1;
            }
        }
    }

    /// Number of distinct categories present among `cases`.
    pub fn distinct_cats(&self, cases: &[usize], counter: &mut [usize]) -> usize {
        self.count_per_cat(cases, counter);
        counter[..self.n_cats()].iter().filter(|&&n| n > 0).count()
    }

    /// Move the target counts of `moved` from the right side to the left
    /// side of `counts`.
    pub fn move_counts_r_to_l(&self, moved: &[usize], counts: &mut SplitCounts) {
        for &c in moved {
            if self.missing[c] {
                continue;
            }
            let code = self.codes[c];
            counts.right.counts[code] -= 1.0;
            counts.right.weight -= 1.0;
            counts.left.counts[code] += 1.0;
            counts.left.weight += 1.0;
        }
    }

    /// Most frequent code among the non-missing `cases`; ties go to the
    /// lowest code.
    #[must_use]
    pub fn modei(&self, cases: &[usize]) -> Option<usize> {
        let mut counter = vec![0usize; self.n_cats()];
        self.count_per_cat(cases, &mut counter);
        argmax(counter.iter().map(|&n| n as f64))
    }

    /// Most frequent category among the non-missing `cases`.
    #[must_use]
    pub fn mode(&self, cases: &[usize]) -> Option<&str> {
        self.modei(cases).and_then(|code| self.map.num_to_cat(code))
    }

    /// Gini impurity of the non-missing `cases`.
    #[must_use]
    pub fn gini(&self, cases: &[usize]) -> f64 {
        let mut counter = vec![0usize; self.n_cats()];
        self.gini_without_allocate(cases, &mut counter)
    }

    /// Gini impurity of the non-missing `cases` using a caller-supplied
    /// counter of at least [`CatFeature::n_cats`] slots.
    pub fn gini_without_allocate(&self, cases: &[usize], counter: &mut [usize]) -> f64 {
        self.count_per_cat(cases, counter);
        let total: usize = counter.iter().sum();
        let counts: Vec<f64> = counter.iter().map(|&n| n as f64).collect();
        SplitCriterion::Gini.impurity(&counts, total as f64)
    }

    /// Fisher-Yates shuffle of the whole column; codes and missing flags
    /// move together.
    pub fn shuffle(&mut self, rng: &mut impl Rng) {
        for i in (1..self.codes.len()).rev() {
            let j = rng.gen_range(0..=i);
            self.codes.swap(i, j);
            self.missing.swap(i, j);
        }
    }

    /// Shuffle codes among the positions listed in `cases` only.
    pub fn shuffle_cases(&mut self, cases: &[usize], rng: &mut impl Rng) {
        for i in (1..cases.len()).rev() {
            let j = rng.gen_range(0..=i);
            self.codes.swap(cases[i], cases[j]);
            self.missing.swap(cases[i], cases[j]);
        }
    }

    /// Replace every missing value with the column mode.
    ///
    /// A column with no present values is left untouched.
    pub fn impute_missing(&mut self) {
        let all: Vec<usize> = (0..self.len()).collect();
        if let Some(mode) = self.modei(&all) {
            for i in 0..self.len() {
                if self.missing[i] {
                    self.puti(i, mode);
                }
            }
        }
    }

    /// Expand into one numeric 0/1 indicator column per category, named
    /// `N:<name>==<category>`. Missing cases stay missing.
    #[must_use]
    pub fn encode_to_num(&self) -> Vec<NumFeature> {
        self.map
            .categories()
            .iter()
            .enumerate()
            .map(|(code, cat)| {
                let values = self
                    .codes
                    .iter()
                    .zip(&self.missing)
                    .map(|(&c, &m)| (!m).then_some(if c == code { 1.0 } else { 0.0 }))
                    .collect::<Vec<_>>();
                NumFeature::from_options(format!("N:{}=={}", self.name, cat), &values)
            })
            .collect()
    }

    /// Partition `cases` by membership of their code in `left_codes`;
    /// missing cases go to the third branch.
    #[must_use]
    pub fn split(&self, left_codes: &[usize], cases: &[usize]) -> Partition {
        let mut goes_left = vec![false; self.n_cats()];
        for &code in left_codes {
            if let Some(slot) = goes_left.get_mut(code) {
                *slot = true;
            }
        }
        let mut partition = Partition::with_capacity(cases.len());
        for &c in cases {
            if self.missing[c] {
                partition.missing.push(c);
            } else if goes_left[self.codes[c]] {
                partition.left.push(c);
            } else {
                partition.right.push(c);
            }
        }
        partition
    }

    /// Add case `c`'s target contribution to `side`; missing cases add nothing.
    pub(crate) fn accumulate(&self, c: usize, weight: f64, side: &mut SideStats) {
        if !self.missing[c] {
            side.counts[self.codes[c]] += weight;
            side.weight += weight;
        }
    }

    /// Remove case `c`'s target contribution from `side`.
    pub(crate) fn withdraw(&self, c: usize, weight: f64, side: &mut SideStats) {
        if !self.missing[c] {
            side.counts[self.codes[c]] -= weight;
            side.weight -= weight;
        }
    }
}

/// Return `true` if `v` is one of the categorical missing-value tokens.
#[must_use]
pub fn is_missing_token(v: &str) -> bool {
    MISSING_TOKENS.iter().any(|t| v.eq_ignore_ascii_case(t))
}

/// Index of the first maximum; `None` if every entry is zero.
pub(crate) fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        if v > 0.0 && best.is_none_or(|(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}
