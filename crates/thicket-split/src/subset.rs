//! Category-subset search for categorical columns.
//!
//! The strategy depends on how many categories are present at the node:
//! small sets are enumerated, mid-sized sets are grown greedily with
//! incremental rescoring, and large sets (or any set in randomized mode)
//! are sampled.

use rand::Rng;

use crate::allocs::{BestSplitAllocs, CaseBuffers, CategoryBuffers, SplitCounts};
use crate::categorical::CatFeature;
use crate::config::{
    MAX_EXHAUSTIVE_CATS, MAX_NON_BIG_CATS, MAX_NON_RANDOM_EXHAUSTIVE, MIN_IMP, SplitConfig,
};
use crate::feature::{CodedSplit, SplitCandidate};
use crate::target::Target;

impl CatFeature {
    /// Find the best bipartition of the categories present in `cases`.
    pub(crate) fn best_split(
        &self,
        target: &dyn Target,
        cases: &[usize],
        parent_imp: f64,
        config: &SplitConfig,
        allocs: &mut BestSplitAllocs,
        rng: &mut impl Rng,
    ) -> SplitCandidate {
        let n_cats = self.n_cats();
        allocs.cats.reset(n_cats);
        let BestSplitAllocs {
            cases: bufs,
            cats,
            counts,
        } = allocs;
        let CaseBuffers {
            left,
            right,
            missing,
            ..
        } = bufs;
        let CategoryBuffers {
            counter,
            offsets,
            by_cat,
            present,
            goes_left,
            best_left,
        } = cats;

        missing.clear();
        for &c in cases {
            if self.missing[c] {
                missing.push(c);
            } else {
                counter[self.codes[c]] += 1;
            }
        }
        present.extend((0..n_cats).filter(|&code| counter[code] > 0));
        if present.len() < 2 {
            return SplitCandidate::constant();
        }
        let n_present = cases.len() - missing.len();
        if n_present / 2 < config.min_leaf_size {
            return SplitCandidate::none();
        }

        // Counting sort of present cases into per-category runs.
        for code in 0..n_cats {
            offsets[code + 1] = offsets[code] + counter[code];
        }
        counter.copy_from_slice(&offsets[..n_cats]);
        by_cat.clear();
        by_cat.resize(n_present, 0);
        for &c in cases {
            if !self.missing[c] {
                let code = self.codes[c];
                by_cat[counter[code]] = c;
                counter[code] += 1;
            }
        }

        let parent_imp = if config.three_way() || missing.is_empty() {
            parent_imp
        } else {
            target.impurity(by_cat, counts)
        };

        let k = present.len();
        let mut search = SubsetSearch {
            target,
            by_cat: by_cat.as_slice(),
            offsets: offsets.as_slice(),
            present: present.as_slice(),
            missing: config.three_way().then_some(missing.as_slice()),
            parent_imp,
            min_leaf_size: config.min_leaf_size,
            left,
            right,
            counts,
            best_decrease: MIN_IMP,
            best_left: best_left.as_mut_slice(),
            found: false,
        };

        if k <= MAX_EXHAUSTIVE_CATS {
            search.enumerate(goes_left);
        } else if config.is_randomized() {
            search.sample(config.random_candidates, goes_left, rng);
        } else if k <= MAX_NON_RANDOM_EXHAUSTIVE {
            search.grow(goes_left);
        } else {
            search.sample(MAX_NON_BIG_CATS, goes_left, rng);
        }

        if !search.found {
            return SplitCandidate::none();
        }
        let codes = search
            .present
            .iter()
            .copied()
            .filter(|&code| search.best_left[code])
            .collect();
        SplitCandidate {
            split: Some(CodedSplit::Categories(codes)),
            impurity_decrease: search.best_decrease,
            constant: false,
        }
    }
}

/// Working state for one column's subset search. Membership is tracked
/// per category code in `goes_left`, which callers own so the search can
/// borrow it mutably alongside this struct.
struct SubsetSearch<'a> {
    target: &'a dyn Target,
    by_cat: &'a [usize],
    offsets: &'a [usize],
    present: &'a [usize],
    missing: Option<&'a [usize]>,
    parent_imp: f64,
    min_leaf_size: usize,
    left: &'a mut Vec<usize>,
    right: &'a mut Vec<usize>,
    counts: &'a mut SplitCounts,
    best_decrease: f64,
    best_left: &'a mut [bool],
    found: bool,
}

impl<'a> SubsetSearch<'a> {
    /// Cases of category `code`.
    fn run(&self, code: usize) -> &'a [usize] {
        let by_cat: &'a [usize] = self.by_cat;
        &by_cat[self.offsets[code]..self.offsets[code + 1]]
    }

    fn run_len(&self, code: usize) -> usize {
        self.offsets[code + 1] - self.offsets[code]
    }

    fn record(&mut self, decrease: f64, goes_left: &[bool]) {
        if decrease > self.best_decrease {
            self.best_decrease = decrease;
            self.best_left.copy_from_slice(goes_left);
            self.found = true;
        }
    }

    /// Score the bipartition in `goes_left` from scratch.
    fn score(&mut self, goes_left: &[bool]) {
        self.left.clear();
        self.right.clear();
        for &code in self.present {
            let run = self.run(code);
            if goes_left[code] {
                self.left.extend_from_slice(run);
            } else {
                self.right.extend_from_slice(run);
            }
        }
        if self.left.len() < self.min_leaf_size || self.right.len() < self.min_leaf_size {
            return;
        }
        let inner = self.target.split_impurity(
            self.left.as_slice(),
            self.right.as_slice(),
            self.missing,
            self.counts,
        );
        self.record(self.parent_imp - inner, goes_left);
    }

    /// Every bipartition with the last present category fixed on the right.
    fn enumerate(&mut self, goes_left: &mut [bool]) {
        let free = self.present.len() - 1;
        for mask in 1..(1usize << free) {
            for (bit, &code) in self.present[..free].iter().enumerate() {
                goes_left[code] = (mask >> bit) & 1 == 1;
            }
            self.score(goes_left);
        }
    }

    /// `draws` random bipartitions: each category goes left with
    /// probability one half, redrawn when every category lands on one side.
    fn sample(&mut self, draws: usize, goes_left: &mut [bool], rng: &mut impl Rng) {
        for _ in 0..draws {
            loop {
                let mut n_left = 0;
                for &code in self.present {
                    goes_left[code] = rng.gen_bool(0.5);
                    n_left += usize::from(goes_left[code]);
                }
                if n_left > 0 && n_left < self.present.len() {
                    break;
                }
            }
            self.score(goes_left);
        }
    }

    /// Greedy growth from an empty left side: repeatedly move the category
    /// whose move gives the lowest split impurity, rescoring incrementally,
    /// until a move no longer helps or one category remains on the right.
    fn grow(&mut self, goes_left: &mut [bool]) {
        goes_left.fill(false);
        self.target
            .split_impurity(&[], self.by_cat, self.missing, self.counts);

        let mut n_left = 0;
        let mut n_right = self.by_cat.len();
        let mut on_right = self.present.len();
        let mut current: Option<f64> = None;

        while on_right > 1 {
            self.counts.save();
            let mut best: Option<(usize, f64)> = None;
            for &code in self.present {
                if goes_left[code] {
                    continue;
                }
                let imp = self.target.update_split_impurity(self.run(code), self.counts);
                self.counts.restore();
                if best.is_none_or(|(_, b)| imp < b) {
                    best = Some((code, imp));
                }
            }
            let Some((code, imp)) = best else {
                break;
            };
            let decrease = self.parent_imp - imp;
            if current.is_some_and(|cur| decrease <= cur) {
                break;
            }

            self.target.update_split_impurity(self.run(code), self.counts);
            goes_left[code] = true;
            n_left += self.run_len(code);
            n_right -= self.run_len(code);
            on_right -= 1;
            current = Some(decrease);

            if n_left >= self.min_leaf_size && n_right >= self.min_leaf_size {
                self.record(decrease, goes_left);
            }
        }
    }
}
