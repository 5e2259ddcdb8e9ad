//! Reusable scratch state for best-split search.
//!
//! One [`BestSplitAllocs`] belongs to one thread of control. It is handed to
//! every search call that thread makes and its contents never carry meaning
//! from one call to the next.

/// Running totals for one side (left, right or missing) of a partition.
///
/// Classification targets fill `counts` (one slot per target category) and
/// `weight`; regression targets fill `weight`, `sum` and `sum_sq` over
/// responses shifted by [`SplitCounts`]'s reference value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideStats {
    pub(crate) counts: Vec<f64>,
    pub(crate) weight: f64,
    pub(crate) sum: f64,
    pub(crate) sum_sq: f64,
}

impl SideStats {
    pub(crate) fn reset(&mut self, n_slots: usize) {
        self.counts.clear();
        self.counts.resize(n_slots, 0.0);
        self.weight = 0.0;
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }

    /// Total weight (case count for unweighted targets) on this side.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Per-category weight on this side; empty for regression targets.
    #[must_use]
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Population variance of the values accumulated on this side.
    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.weight <= 0.0 {
            return 0.0;
        }
        let mean = self.sum / self.weight;
        (self.sum_sq / self.weight - mean * mean).max(0.0)
    }
}

/// Per-side target statistics maintained across incremental updates.
#[derive(Debug, Clone, Default)]
pub struct SplitCounts {
    pub(crate) left: SideStats,
    pub(crate) right: SideStats,
    pub(crate) missing: SideStats,
    /// Subtracted from every regression response before it is summed, so
    /// `sum_sq` stays small when responses share a large offset. Fixed by
    /// the last full scoring call and kept across incremental updates.
    pub(crate) shift: f64,
    saved_left: SideStats,
    saved_right: SideStats,
}

impl SplitCounts {
    pub(crate) fn reset(&mut self, n_slots: usize) {
        self.left.reset(n_slots);
        self.right.reset(n_slots);
        self.missing.reset(n_slots);
        self.shift = 0.0;
    }

    /// Snapshot the left and right sides so a trial move can be undone.
    pub(crate) fn save(&mut self) {
        self.saved_left.clone_from(&self.left);
        self.saved_right.clone_from(&self.right);
    }

    /// Restore the sides captured by the last [`SplitCounts::save`].
    pub(crate) fn restore(&mut self) {
        self.left.clone_from(&self.saved_left);
        self.right.clone_from(&self.saved_right);
    }

    /// Weighted mean of the three side impurities, each side weighted by
    /// its share of the total weight.
    pub(crate) fn weighted_impurity(&self, side_impurity: impl Fn(&SideStats) -> f64) -> f64 {
        let total = self.left.weight + self.right.weight + self.missing.weight;
        if total <= 0.0 {
            return 0.0;
        }
        let mut acc = self.left.weight * side_impurity(&self.left)
            + self.right.weight * side_impurity(&self.right);
        if self.missing.weight > 0.0 {
            acc += self.missing.weight * side_impurity(&self.missing);
        }
        acc / total
    }

    /// Left-side statistics.
    #[must_use]
    pub fn left(&self) -> &SideStats {
        &self.left
    }

    /// Right-side statistics.
    #[must_use]
    pub fn right(&self) -> &SideStats {
        &self.right
    }

    /// Missing-side statistics.
    #[must_use]
    pub fn missing(&self) -> &SideStats {
        &self.missing
    }
}

/// Case-index buffers reused while partitioning a node's cases.
#[derive(Debug, Clone, Default)]
pub(crate) struct CaseBuffers {
    pub(crate) left: Vec<usize>,
    pub(crate) right: Vec<usize>,
    pub(crate) missing: Vec<usize>,
    /// Non-missing cases of the column under evaluation, reordered freely.
    pub(crate) present: Vec<usize>,
    /// Threshold positions drawn by a randomized numeric search.
    pub(crate) positions: Vec<usize>,
}

impl CaseBuffers {
    fn with_capacity(n_cases: usize) -> Self {
        Self {
            left: Vec::with_capacity(n_cases),
            right: Vec::with_capacity(n_cases),
            missing: Vec::with_capacity(n_cases),
            present: Vec::with_capacity(n_cases),
            positions: Vec::new(),
        }
    }
}

/// Category-level buffers for categorical search, sized to the largest
/// cardinality among the matrix's columns.
#[derive(Debug, Clone, Default)]
pub(crate) struct CategoryBuffers {
    /// Per-category case counts over the node.
    pub(crate) counter: Vec<usize>,
    /// Start offset of each category's run in `by_cat`.
    pub(crate) offsets: Vec<usize>,
    /// Non-missing cases grouped by category code.
    pub(crate) by_cat: Vec<usize>,
    /// Codes with at least one case at the node.
    pub(crate) present: Vec<usize>,
    /// Left-membership flags for the partition being scored.
    pub(crate) goes_left: Vec<bool>,
    /// Left-membership flags for the best partition so far.
    pub(crate) best_left: Vec<bool>,
}

impl CategoryBuffers {
    pub(crate) fn reset(&mut self, n_cats: usize) {
        self.counter.clear();
        self.counter.resize(n_cats, 0);
        self.offsets.clear();
        self.offsets.resize(n_cats + 1, 0);
        self.present.clear();
        self.goes_left.clear();
        self.goes_left.resize(n_cats, false);
        self.best_left.clear();
        self.best_left.resize(n_cats, false);
    }
}

/// Scratch allocations for one search worker.
///
/// Create one per concurrent tree (or per thread) and pass it into every
/// [`FeatureMatrix::best_splitter`](crate::FeatureMatrix::best_splitter) call
/// that worker makes. Buffers grow on demand, so sizing is a hint.
#[derive(Debug, Clone, Default)]
pub struct BestSplitAllocs {
    pub(crate) cases: CaseBuffers,
    pub(crate) cats: CategoryBuffers,
    pub(crate) counts: SplitCounts,
}

impl BestSplitAllocs {
    /// Create allocations for nodes of up to `n_cases` cases and columns of
    /// up to `max_cats` categories.
    #[must_use]
    pub fn new(n_cases: usize, max_cats: usize) -> Self {
        let mut cats = CategoryBuffers::default();
        cats.reset(max_cats);
        cats.by_cat.reserve(n_cases);
        let mut counts = SplitCounts::default();
        counts.reset(max_cats);
        Self {
            cases: CaseBuffers::with_capacity(n_cases),
            cats,
            counts,
        }
    }

    /// The per-side target statistics left by the most recent scoring call.
    #[must_use]
    pub fn counts(&self) -> &SplitCounts {
        &self.counts
    }

    /// Mutable access for callers driving a [`Target`](crate::Target) directly.
    pub fn counts_mut(&mut self) -> &mut SplitCounts {
        &mut self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variance_of_known_values() {
        let mut side = SideStats::default();
        side.reset(0);
        for v in [1.0, 2.0, 3.0, 4.0] {
            side.weight += 1.0;
            side.sum += v;
            side.sum_sq += v * v;
        }
        assert!((side.variance() - 1.25).abs() < 1e-12);
    }

    #[test]
    fn empty_side_has_zero_variance() {
        assert_eq!(SideStats::default().variance(), 0.0);
    }

    #[test]
    fn save_restore_round_trip() {
        let mut counts = SplitCounts::default();
        counts.reset(2);
        counts.left.counts[0] = 3.0;
        counts.left.weight = 3.0;
        counts.save();
        counts.left.counts[0] = 7.0;
        counts.right.weight = 9.0;
        counts.restore();
        assert_eq!(counts.left.counts[0], 3.0);
        assert_eq!(counts.right.weight, 0.0);
    }

    #[test]
    fn weighted_impurity_ignores_empty_missing_side() {
        let mut counts = SplitCounts::default();
        counts.reset(0);
        counts.left.weight = 1.0;
        counts.right.weight = 3.0;
        let imp = counts.weighted_impurity(|s| if s.weight == 1.0 { 1.0 } else { 0.0 });
        assert!((imp - 0.25).abs() < 1e-12);
    }

    #[test]
    fn new_sizes_category_buffers() {
        let allocs = BestSplitAllocs::new(100, 12);
        assert_eq!(allocs.cats.counter.len(), 12);
        assert_eq!(allocs.cats.offsets.len(), 13);
        assert_eq!(allocs.counts.left.counts.len(), 12);
    }
}
